#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Fetches a Wikipedia article over HTTP/1.1 and reduces it to plain text.
//!
//! The pipeline is single-threaded and blocking. An [`HttpClient`] writes a request over a
//! [`Transport`], reads the response head in small blocks, stages every header line as a
//! [`HeaderRecord`] and every cookie as a [`CookieRecord`] in slot pools, then reads the body
//! by `Content-Length` or decodes it from chunked framing. Redirects are followed and cached.
//!
//! An [`ArticleExtractor`] cuts the article body out of the page and parses it, stages each
//! paragraph, list, formula and heading as a [`ContentFragment`] in another pool, writes the
//! fragments out in document order and cleans the result up into plain text. TeX formulas are
//! rendered as text by [`render_tex`] and the text can be wrapped and justified by [`reflow`].
//!
//! The pools are [`slot_pool::SlotPool`]s. Records are held by handle, so they stay reachable
//! while the pools grow, and each phase ends by releasing all records in one sweep.
//!
//! # Example
//!
//! ```
//! use wikigrab::ArticleExtractor;
//!
//! let page = br#"<div id="mw-content-text">
//!     <p><b>Rust</b> is a language.&#91;1&#93;</p>
//!     <div class="navbox"><p>Unrelated links</p></div>
//! </div>"#;
//!
//! let mut extractor = ArticleExtractor::new();
//! let text = extractor.extract(page).unwrap();
//!
//! assert_eq!(text, "Rust is a language.\n");
//! ```
//!
//! # Features
//!
//! * `tls` (default) - enables HTTPS through the platform TLS library. Without it, only plain
//!   HTTP connections can be opened.

mod article;
mod buffer;
mod chunked;
mod client;
mod connection;
mod cookies;
mod error;
mod extract;
mod headers;
mod html;
mod http_date;
mod options;
mod records;
mod redirects;
mod request;
mod status;
mod target;
mod tex;
mod text;
mod transport;

pub use article::*;
pub use buffer::ByteBuffer;
pub use chunked::*;
pub use client::*;
pub(crate) use connection::*;
pub use cookies::*;
pub use error::Error;
pub(crate) use error::Result;
pub use extract::*;
pub use headers::*;
pub use http_date::*;
pub use options::*;
pub use records::*;
pub use redirects::*;
pub(crate) use request::*;
pub use status::{is_followable_redirect, reason};
pub(crate) use status::{has_no_body, parse_status_line};
pub use target::*;
pub use tex::*;
pub use text::*;
pub use transport::*;
