//! Forum API proxy library.
//!
//! A service that logs into a cookie-authenticated HTML forum, scrapes its
//! listing and thread pages, and re-exposes the content as a JSON API.

pub mod config;
pub mod constants;
pub mod scrape;
pub mod session;
pub mod timefmt;
pub mod upstream;
pub mod web;
