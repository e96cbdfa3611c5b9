//! The JSON API surface.
//!
//! Every endpoint is a thin relay: one inbound request triggers at most one
//! upstream fetch, and all failures stay local to the request that hit them.

use std::sync::LazyLock;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::scrape;
use crate::session::{MaybeSession, SESSION_COOKIE};
use crate::web::AppState;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/status", get(auth_status))
        .route("/api/posts", get(list_posts))
        .route("/api/posts/:post_id", get(post_detail))
}

/// Credentials as submitted by the frontend; `pass` is already hashed by the
/// caller, this proxy never sees a plaintext password.
#[derive(Debug, Deserialize)]
struct CredentialsForm {
    user: Option<String>,
    pass: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum AuthKind {
    Login,
    Register,
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/")
}

fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

/// POST /api/auth/login - Relay credentials and capture the upstream cookies.
async fn login(State(state): State<AppState>, Form(form): Form<CredentialsForm>) -> Response {
    relay_credentials(state, form, AuthKind::Login).await
}

/// POST /api/auth/register - Same relay as login against the register endpoint.
async fn register(State(state): State<AppState>, Form(form): Form<CredentialsForm>) -> Response {
    relay_credentials(state, form, AuthKind::Register).await
}

async fn relay_credentials(state: AppState, form: CredentialsForm, kind: AuthKind) -> Response {
    let Some(email) = form.user.filter(|u| !u.is_empty()) else {
        return json_error(StatusCode::BAD_REQUEST, "email and password are required");
    };
    let Some(password) = form.pass.filter(|p| !p.is_empty()) else {
        return json_error(StatusCode::BAD_REQUEST, "email and password are required");
    };
    if !EMAIL_PATTERN.is_match(&email) {
        return json_error(StatusCode::BAD_REQUEST, "invalid email format");
    }

    let (path, verb) = match kind {
        AuthKind::Login => ("/login", "login"),
        AuthKind::Register => ("/register", "registration"),
    };

    let fields = [("user", email.as_str()), ("pass", password.as_str())];
    let outcome = match state.upstream.send_form(path, &fields, None).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{verb} relay failed: {e}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "upstream request failed");
        }
    };

    if outcome.is_accepted() {
        let token = state.sessions.create(email.clone(), outcome.cookies).await;
        let cookie = session_cookie(&token);
        let body = json!({ "message": format!("{verb} successful"), "email": email });
        ([(header::SET_COOKIE, cookie)], Json(body)).into_response()
    } else {
        match kind {
            AuthKind::Login => json_error(StatusCode::UNAUTHORIZED, "login failed"),
            AuthKind::Register => json_error(
                StatusCode::BAD_REQUEST,
                "registration failed, the account may already exist",
            ),
        }
    }
}

/// POST /api/auth/logout - Relay the logout upstream, then destroy the local
/// session regardless of what the upstream said.
async fn logout(State(state): State<AppState>, MaybeSession(session): MaybeSession) -> Response {
    let Some((token, session)) = session else {
        return json_error(StatusCode::BAD_REQUEST, "not logged in");
    };

    let outcome = state
        .upstream
        .send_form("/logout", &[], Some(&session.cookie_header()))
        .await;

    state.sessions.remove(&token).await;
    let clear = clear_session_cookie();

    match outcome {
        Ok(outcome) if outcome.is_accepted() => (
            [(header::SET_COOKIE, clear)],
            Json(json!({ "message": "logout successful" })),
        )
            .into_response(),
        Ok(_) => (
            [(header::SET_COOKIE, clear)],
            json_error(StatusCode::BAD_REQUEST, "logout failed"),
        )
            .into_response(),
        Err(e) => {
            error!("logout relay failed: {e}");
            (
                [(header::SET_COOKIE, clear)],
                json_error(StatusCode::BAD_REQUEST, "logout failed"),
            )
                .into_response()
        }
    }
}

/// GET /api/auth/status - Report the session state for this client.
async fn auth_status(MaybeSession(session): MaybeSession) -> Response {
    let body = match session {
        Some((_, session)) => json!({ "logged_in": true, "email": session.email }),
        None => json!({ "logged_in": false, "email": null }),
    };
    Json(body).into_response()
}

/// GET /api/posts - Fetch and extract the post listing.
async fn list_posts(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Query(query): Query<PageQuery>,
) -> Response {
    let path = query
        .timestamp
        .as_deref()
        .filter(|cursor| !cursor.is_empty())
        .map_or_else(|| "/".to_string(), |cursor| format!("/l/{cursor}"));

    let cookie_header = session.map(|(_, s)| s.cookie_header());
    let html = match state
        .upstream
        .fetch_page(&path, cookie_header.as_deref())
        .await
    {
        Ok(html) => html,
        Err(e) => {
            error!("failed to fetch post listing: {e}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch posts");
        }
    };

    let listing = match scrape::extract_listing(&html, &state.config.upstream_base_url) {
        Ok(listing) => listing,
        Err(e) => {
            error!("listing extraction failed: {e}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "post listing not found");
        }
    };

    Json(json!({
        "total": listing.posts.len(),
        "posts": listing.posts,
        "pagination": { "next_timestamp": listing.next_timestamp },
    }))
    .into_response()
}

/// GET /api/posts/:post_id - Fetch and extract one thread page.
async fn post_detail(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    MaybeSession(session): MaybeSession,
    Query(query): Query<PageQuery>,
) -> Response {
    let path = match query.timestamp.as_deref().filter(|cursor| !cursor.is_empty()) {
        Some(cursor) => format!("/t/{post_id}/m/{cursor}"),
        None => format!("/t/{post_id}"),
    };

    let cookie_header = session.map(|(_, s)| s.cookie_header());
    let html = match state
        .upstream
        .fetch_page(&path, cookie_header.as_deref())
        .await
    {
        Ok(html) => html,
        Err(e) => {
            error!(post_id = %post_id, "failed to fetch thread page: {e}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch post");
        }
    };

    let thread = match scrape::extract_thread(&html, &state.config.upstream_base_url) {
        Ok(thread) => thread,
        Err(e) => {
            error!(post_id = %post_id, "thread extraction failed: {e}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "post content not found");
        }
    };

    Json(json!({
        "id": post_id,
        "posts": thread.replies,
        "pagination": {
            "next_timestamp": thread.next_timestamp,
            "prev_timestamp": thread.prev_timestamp,
        },
    }))
    .into_response()
}
