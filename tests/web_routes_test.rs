//! Integration tests for the JSON API, with wiremock standing in for the
//! upstream forum site.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use forum_api_proxy::config::Config;
use forum_api_proxy::session::SessionStore;
use forum_api_proxy::upstream::UpstreamClient;
use forum_api_proxy::web::{create_app, AppState};

const LISTING_HTML: &str = r#"<html><body>
<div class="post-list">
    <a class="post-item" href="/t/abc123">
        <div class="post-info">A thread</div>
        <div class="post-meta">
            <span class="author">alice</span>
            <span class="date" time_stamp="1600000100"></span>
        </div>
    </a>
</div>
</body></html>"#;

const THREAD_HTML: &str = r#"<html><body>
<div class="post-list">
    <div class="post-item" id="p900">
        <div class="post-info"><p>hello</p></div>
        <div class="post-meta">
            <a class="author" href="/u/x?uid=5">alice</a>
            <span class="date" time_stamp="1600000100"></span>
        </div>
    </div>
</div>
</body></html>"#;

fn test_config(upstream: &str) -> Config {
    Config {
        upstream_base_url: upstream.trim_end_matches('/').to_string(),
        fetch_timeout: Duration::from_secs(5),
        request_delay: Duration::ZERO,
        web_host: "127.0.0.1".to_string(),
        web_port: 0,
    }
}

fn test_app(upstream: &str) -> Router {
    let config = test_config(upstream);
    let client = UpstreamClient::new(&config).expect("Failed to build upstream client");
    create_app(AppState {
        config: Arc::new(config),
        upstream: client,
        sessions: SessionStore::new(),
    })
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("Failed to build request")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body should be JSON")
}

/// The `session=token` pair from a response's Set-Cookie header.
fn session_cookie(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Set-Cookie header present")
        .to_str()
        .expect("Cookie is valid UTF-8")
        .split(';')
        .next()
        .expect("Cookie has a name=value pair")
        .to_string()
}

#[tokio::test]
async fn auth_status_is_logged_out_by_default() {
    let mock_server = MockServer::start().await;
    let app = test_app(&mock_server.uri());

    let response = app
        .oneshot(get_request("/api/auth/status", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["logged_in"], false);
    assert_eq!(json["email"], serde_json::Value::Null);
}

#[tokio::test]
async fn login_captures_upstream_cookies_and_creates_session() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("user=me%40example.com"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("set-cookie", "sid=upstream123; Path=/"),
        )
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server.uri());

    let response = app
        .clone()
        .oneshot(form_request(
            "/api/auth/login",
            "user=me%40example.com&pass=5f4dcc3b5aa765d61d8327deb882cf99",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);
    assert!(cookie.starts_with("session="));

    let json = body_json(response).await;
    assert_eq!(json["email"], "me@example.com");
    assert_eq!(json["message"], "login successful");

    // The session is now visible through /api/auth/status.
    let response = app
        .oneshot(get_request("/api/auth/status", Some(&cookie)))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["logged_in"], true);
    assert_eq!(json["email"], "me@example.com");
}

#[tokio::test]
async fn login_rejects_missing_or_invalid_credentials() {
    let mock_server = MockServer::start().await;
    let app = test_app(&mock_server.uri());

    let response = app
        .clone()
        .oneshot(form_request("/api/auth/login", "user=me%40example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(form_request("/api/auth/login", "user=not-an-email&pass=x"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid email format");
}

#[tokio::test]
async fn login_maps_upstream_rejection_to_401() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server.uri());
    let response = app
        .oneshot(form_request(
            "/api/auth/login",
            "user=me%40example.com&pass=hash",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "login failed");
}

#[tokio::test]
async fn register_maps_upstream_rejection_to_400() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server.uri());
    let response = app
        .oneshot(form_request(
            "/api/auth/register",
            "user=me%40example.com&pass=hash",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "registration failed, the account may already exist"
    );
}

#[tokio::test]
async fn logout_destroys_session() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "sid=upstream123; Path=/"),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .and(header_eq("cookie", "sid=upstream123"))
        .respond_with(ResponseTemplate::new(302))
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server.uri());

    let response = app
        .clone()
        .oneshot(form_request(
            "/api/auth/login",
            "user=me%40example.com&pass=hash",
        ))
        .await
        .unwrap();
    let cookie = session_cookie(&response);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The old cookie no longer resolves to a session.
    let response = app
        .oneshot(get_request("/api/auth/status", Some(&cookie)))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["logged_in"], false);
}

#[tokio::test]
async fn logout_without_session_is_rejected() {
    let mock_server = MockServer::start().await;
    let app = test_app(&mock_server.uri());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn posts_endpoint_returns_extracted_listing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(LISTING_HTML, "text/html"))
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server.uri());
    let response = app.oneshot(get_request("/api/posts", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["posts"][0]["post_id"], "abc123");
    assert_eq!(json["posts"][0]["title"], "A thread");
    assert_eq!(json["pagination"]["next_timestamp"], "1600000100");
}

#[tokio::test]
async fn posts_endpoint_uses_cursor_path_and_relays_cookies() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("set-cookie", "sid=upstream123; Path=/"),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/l/1600000100"))
        .and(header_eq("cookie", "sid=upstream123"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(LISTING_HTML, "text/html"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server.uri());
    let response = app
        .clone()
        .oneshot(form_request(
            "/api/auth/login",
            "user=me%40example.com&pass=hash",
        ))
        .await
        .unwrap();
    let cookie = session_cookie(&response);

    let response = app
        .oneshot(get_request("/api/posts?timestamp=1600000100", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn posts_endpoint_maps_upstream_failure_to_500() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server.uri());
    let response = app.oneshot(get_request("/api/posts", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "failed to fetch posts");
}

#[tokio::test]
async fn posts_endpoint_maps_missing_container_to_500() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html><body></body></html>", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server.uri());
    let response = app.oneshot(get_request("/api/posts", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "post listing not found");
}

#[tokio::test]
async fn post_detail_returns_extracted_thread() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/t/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(THREAD_HTML, "text/html"))
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server.uri());
    let response = app
        .oneshot(get_request("/api/posts/abc123", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], "abc123");
    assert_eq!(json["posts"][0]["id"], "900");
    assert_eq!(json["posts"][0]["author"]["uid"], 5);
}

#[tokio::test]
async fn post_detail_uses_cursor_path() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/t/abc123/m/1600000500"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(THREAD_HTML, "text/html"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server.uri());
    let response = app
        .oneshot(get_request("/api/posts/abc123?timestamp=1600000500", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn post_detail_maps_missing_container_to_500() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/t/abc123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html><body></body></html>", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server.uri());
    let response = app
        .oneshot(get_request("/api/posts/abc123", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "post content not found");
}
