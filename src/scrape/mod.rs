//! DOM extraction of the upstream forum's markup.
//!
//! The upstream site serves server-rendered HTML; these modules walk it with
//! CSS selectors and emit the normalized records the JSON API returns.
//! Per-item parse failures are skipped (logged at debug), but a missing
//! top-level container is a structural assumption break and fails the whole
//! extraction.

pub mod listing;
pub mod thread;

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use serde::Serialize;
use thiserror::Error;

use crate::timefmt;

pub use listing::extract_listing;
pub use thread::extract_thread;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("post listing container not found")]
    ListingMissing,
    #[error("reply list container not found")]
    ThreadMissing,
}

// Selectors shared by both page shapes. The patterns are fixed literals, so
// parsing them cannot fail at runtime.
pub(crate) static POST_LIST: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.post-list").unwrap());
pub(crate) static POST_INFO: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.post-info").unwrap());
pub(crate) static POST_META: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.post-meta").unwrap());
pub(crate) static DATE_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.date").unwrap());

/// A timestamp as served upstream plus its display form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeInfo {
    pub timestamp: Option<String>,
    pub formatted: Option<String>,
}

impl TimeInfo {
    #[must_use]
    pub fn from_attr(raw: Option<&str>) -> Self {
        Self {
            timestamp: raw.map(str::to_string),
            formatted: raw.map(timefmt::format_time),
        }
    }
}

/// Most recent reply on a listing item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastReply {
    pub author: String,
    pub timestamp: Option<String>,
    pub formatted: Option<String>,
}

/// One item of the index page listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostSummary {
    pub title: String,
    pub url: String,
    pub post_id: String,
    pub author: Option<String>,
    pub create_time: TimeInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reply: Option<LastReply>,
}

/// Extracted index page: ordered summaries plus the next pagination cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub posts: Vec<PostSummary>,
    pub next_timestamp: Option<String>,
}

/// Reply author; `uid` comes out of the profile link's query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyAuthor {
    pub name: String,
    pub uid: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Reply,
    Edit,
}

/// An action link offered on a reply, with its href resolved against the
/// site base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub url: String,
}

/// One reply on a thread page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub id: String,
    pub content: String,
    pub quote: Option<String>,
    pub author: ReplyAuthor,
    pub time: TimeInfo,
    pub actions: Vec<ReplyAction>,
}

/// Extracted thread page: ordered replies plus both pagination cursors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadPage {
    pub replies: Vec<Reply>,
    pub next_timestamp: Option<String>,
    pub prev_timestamp: Option<String>,
}

/// Concatenated text of an element with each text node trimmed, the way the
/// upstream markup is meant to be read (titles and names carry indentation
/// whitespace around a single text node).
pub(crate) fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect()
}
