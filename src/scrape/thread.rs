//! Extraction of thread (detail) pages.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{
    stripped_text, ActionKind, ExtractError, Reply, ReplyAction, ReplyAuthor, ThreadPage,
    TimeInfo, DATE_SPAN, POST_INFO, POST_LIST, POST_META,
};
use crate::constants::{NEXT_PAGE_LABEL, PREV_PAGE_LABEL};

static REPLY_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.post-item").unwrap());
static QUOTE_BLOCK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("blockquote.blockquote").unwrap());
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());
static AUTHOR_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.author").unwrap());
static ACTION_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.reply, a.edit").unwrap());
static PAGINATION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.pagination").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Extract the replies and pagination cursors from a thread page.
///
/// Replies missing required sub-elements are skipped. A missing reply-list
/// container fails the whole extraction, matching the listing policy.
///
/// # Errors
///
/// Returns [`ExtractError::ThreadMissing`] when the reply-list container is
/// absent.
pub fn extract_thread(html: &str, base_url: &str) -> Result<ThreadPage, ExtractError> {
    let document = Html::parse_document(html);
    let container = document
        .select(&POST_LIST)
        .next()
        .ok_or(ExtractError::ThreadMissing)?;

    let mut replies = Vec::new();
    for item in container.select(&REPLY_ITEM) {
        if let Some(reply) = parse_reply(item, base_url) {
            replies.push(reply);
        } else {
            debug!("skipping reply item with missing sub-elements");
        }
    }

    let (next_timestamp, prev_timestamp) = pagination_cursors(&document);
    Ok(ThreadPage {
        replies,
        next_timestamp,
        prev_timestamp,
    })
}

fn parse_reply(item: ElementRef<'_>, base_url: &str) -> Option<Reply> {
    let info = item.select(&POST_INFO).next()?;
    let meta = item.select(&POST_META).next()?;

    // DOM ids look like "p12345"; the numeric suffix is the reply id.
    let id = item
        .value()
        .attr("id")?
        .trim_start_matches('p')
        .to_string();

    let quote = info
        .select(&QUOTE_BLOCK)
        .next()
        .map(|block| stripped_text(block));

    // The reply's own text is every paragraph not nested inside a quoted
    // block, joined by newlines.
    let content = info
        .select(&PARAGRAPH)
        .filter(|paragraph| !inside_blockquote(*paragraph))
        .map(stripped_text)
        .collect::<Vec<_>>()
        .join("\n");

    let author_link = meta.select(&AUTHOR_LINK).next()?;
    let author = ReplyAuthor {
        name: stripped_text(author_link),
        uid: author_link.value().attr("href").and_then(parse_uid),
    };

    let time = TimeInfo::from_attr(
        meta.select(&DATE_SPAN)
            .next()
            .and_then(|span| span.value().attr("time_stamp")),
    );

    let actions = meta
        .select(&ACTION_LINK)
        .filter_map(|link| parse_action(link, base_url))
        .collect();

    Some(Reply {
        id,
        content,
        quote,
        author,
        time,
        actions,
    })
}

fn inside_blockquote(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().name() == "blockquote")
}

/// Numeric user id out of a profile link's `uid=` query parameter.
fn parse_uid(href: &str) -> Option<u64> {
    let (_, rest) = href.split_once("uid=")?;
    rest.split('&').next()?.parse().ok()
}

fn parse_action(link: ElementRef<'_>, base_url: &str) -> Option<ReplyAction> {
    let kind = if link.value().classes().any(|class| class == "reply") {
        ActionKind::Reply
    } else if link.value().classes().any(|class| class == "edit") {
        ActionKind::Edit
    } else {
        return None;
    };

    let href = link.value().attr("href")?;
    if href.is_empty() || href.starts_with("javascript:") {
        return None;
    }

    let url = if href.starts_with('/') {
        format!("{base_url}{href}")
    } else {
        href.to_string()
    };

    Some(ReplyAction { kind, url })
}

/// Forward/backward cursors from the pagination block, located by the fixed
/// next/previous anchor labels.
fn pagination_cursors(document: &Html) -> (Option<String>, Option<String>) {
    let Some(pagination) = document.select(&PAGINATION).next() else {
        return (None, None);
    };

    let mut next = None;
    let mut prev = None;
    for anchor in pagination.select(&ANCHOR) {
        let label = stripped_text(anchor);
        let cursor = anchor.value().attr("href").and_then(trailing_segment);
        if label == NEXT_PAGE_LABEL {
            next = cursor;
        } else if label == PREV_PAGE_LABEL {
            prev = cursor;
        }
    }
    (next, prev)
}

/// The cursor is the trailing path segment of a pagination link.
fn trailing_segment(href: &str) -> Option<String> {
    href.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
