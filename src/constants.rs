//! Shared constants used across the application.

/// User agent string sent on every upstream request.
///
/// A realistic browser user agent so upstream requests look like normal
/// browser traffic.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Accept header matching the user agent above.
pub const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Accept-Language header; the upstream site is primarily Chinese.
pub const BROWSER_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// Anchor text of the "next page" link on upstream thread pages.
pub const NEXT_PAGE_LABEL: &str = "下页";

/// Anchor text of the "previous page" link on upstream thread pages.
pub const PREV_PAGE_LABEL: &str = "上页";
