//! Incremental, push-style HTTP/1.1 request-header decoder.
//!
//! Designed for memory-constrained systems that cannot buffer an entire
//! request: [`RequestDecoder`] consumes successive chunks of bytes from a
//! connection and emits a stream of semantic events — method, path segments,
//! query string, HTTP version, header names and values — to a
//! [`RequestListener`], without ever holding more than one caller-provided
//! input chunk at a time.
//!
//! The decoder does not decode the message body, chunked transfer encoding,
//! or trailers; does not percent-decode path segments or the query string;
//! and only accepts `HTTP/1.1` origin-form request lines. See the module
//! docs on [`RequestDecoder`] for the full grammar and lifecycle.
//!
//! ```
//! use embernet_http1::{DecodeStatus, RequestDecoder};
//!
//! let mut decoder = RequestDecoder::new();
//! decoder.reset();
//! let (status, remaining) = decoder.feed(b"GET / HTTP/1.1\r\n\r\n", false);
//! assert_eq!(status, DecodeStatus::Complete);
//! assert!(remaining.is_empty());
//! ```

pub mod char_class;
mod decoder;
mod event;
mod status;
mod step;

pub use decoder::{RequestDecoder, MAX_VIEW};
pub use event::{EventKind, NullListener, PartialTokenKind, Position, RequestListener, TokenKind};
pub use status::DecodeStatus;
pub use step::Step;
