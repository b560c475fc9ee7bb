//! Static acquisition: URL safety, bounded HTTP, and markup-derived text.
//!
//! Everything here works without a browser. The browser pass in
//! [`crate::browser`] reuses the text and embedded-data extractors on
//! markup captured from a live session.

pub mod http_client;
pub mod page_text;
pub mod structured;
pub mod url_guard;
