//! Extraction of index (listing) pages.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{
    stripped_text, ExtractError, LastReply, Listing, PostSummary, TimeInfo, DATE_SPAN, POST_INFO,
    POST_LIST, POST_META,
};

static SUMMARY_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.post-item").unwrap());
static AUTHOR_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.author").unwrap());
static REPLIES_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.replies").unwrap());

/// Extract the post listing from an index page.
///
/// Items missing required sub-elements are skipped; the next pagination
/// cursor is the last summary's most recent activity timestamp.
///
/// # Errors
///
/// Returns [`ExtractError::ListingMissing`] when the listing container is
/// absent, which means the upstream page no longer has the expected shape.
pub fn extract_listing(html: &str, base_url: &str) -> Result<Listing, ExtractError> {
    let document = Html::parse_document(html);
    let container = document
        .select(&POST_LIST)
        .next()
        .ok_or(ExtractError::ListingMissing)?;

    let mut posts = Vec::new();
    for item in container.select(&SUMMARY_ITEM) {
        if let Some(summary) = parse_summary(item, base_url) {
            posts.push(summary);
        } else {
            debug!("skipping listing item with missing sub-elements");
        }
    }

    let next_timestamp = posts.last().and_then(next_cursor);
    Ok(Listing {
        posts,
        next_timestamp,
    })
}

/// Cursor for the page after this summary: the last reply's timestamp when
/// the post has reply activity, otherwise its creation timestamp.
fn next_cursor(post: &PostSummary) -> Option<String> {
    post.last_reply.as_ref().map_or_else(
        || post.create_time.timestamp.clone(),
        |reply| reply.timestamp.clone(),
    )
}

fn parse_summary(item: ElementRef<'_>, base_url: &str) -> Option<PostSummary> {
    let info = item.select(&POST_INFO).next()?;
    let meta = item.select(&POST_META).next()?;
    let href = item.value().attr("href")?;

    let author_spans: Vec<_> = meta.select(&AUTHOR_SPAN).collect();
    let date_spans: Vec<_> = meta.select(&DATE_SPAN).collect();

    let create_time = TimeInfo::from_attr(
        date_spans
            .first()
            .and_then(|span| span.value().attr("time_stamp")),
    );

    let mut summary = PostSummary {
        title: stripped_text(info),
        url: format!("{base_url}{href}"),
        post_id: href.rsplit('/').next().unwrap_or_default().to_string(),
        author: author_spans.first().map(|span| stripped_text(*span)),
        create_time,
        replies_count: None,
        last_reply: None,
    };

    // Reply info only exists when the meta row carries a second author/date
    // pair plus the reply counter.
    if author_spans.len() > 1 && date_spans.len() > 1 {
        if let Some(replies_span) = meta.select(&REPLIES_SPAN).next() {
            let reply_timestamp = date_spans
                .last()
                .and_then(|span| span.value().attr("time_stamp"));
            let reply_time = TimeInfo::from_attr(reply_timestamp);

            summary.replies_count = Some(
                stripped_text(replies_span)
                    .replace('❮', "")
                    .trim()
                    .to_string(),
            );
            summary.last_reply = Some(LastReply {
                author: author_spans
                    .last()
                    .map(|span| stripped_text(*span))
                    .unwrap_or_default(),
                timestamp: reply_time.timestamp,
                formatted: reply_time.formatted,
            });
        }
    }

    Some(summary)
}
