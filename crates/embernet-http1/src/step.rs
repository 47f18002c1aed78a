//! The decoder's persistent state: a tagged variant naming the next grammar
//! production to run.
//!
//! The original decoder this crate's behavior is modeled on encodes the
//! current step as a function pointer. Here it is a plain `Copy` enum
//! dispatched through a `match`, which keeps the state comparable and
//! trivially loggable and never embeds a code pointer in data.

/// One grammar production, or one of the two terminal sink steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Scanning the request method.
    DecodeMethod,
    /// Buffer-full fallback: the method did not fit and is rejected outright.
    DecodeMethodError,
    /// Expecting the leading `/` of the request target.
    DecodePathStart,
    /// Scanning one path segment.
    DecodePathSegment,
    /// Inspecting the byte immediately after a path segment.
    AfterSegment,
    /// Expecting the first byte of an optional query string.
    DecodeQueryStringStart,
    /// Continuing a query string already in progress.
    DecodePartialQueryString,
    /// Expecting the space that ends the request target after a query string.
    MatchAfterRequestTarget,
    /// Matching the literal `HTTP/1.1\r\n`.
    DecodeHttpVersion,
    /// Scanning a header field name, or detecting end-of-headers.
    DecodeHeaderLines,
    /// Expecting the `:` after a header field name.
    MatchHeaderNameValueSeparator,
    /// Skipping leading optional whitespace before a header value.
    SkipOptionalWhitespace,
    /// Scanning a header field value.
    DecodeHeaderValue,
    /// Matching the `\r\n` that ends a header line.
    MatchHeaderValueEnd,
    /// Buffer-full fallback: emit the first fragment of an oversize path segment.
    PartialPathSegmentStart,
    /// Continuing an oversize path segment already started.
    PartialPathSegmentContinue,
    /// Buffer-full fallback: emit the first fragment of an oversize header name.
    PartialHeaderNameStart,
    /// Continuing an oversize header name already started.
    PartialHeaderNameContinue,
    /// Buffer-full fallback: emit the first fragment of an oversize header value.
    PartialHeaderValueStart,
    /// Continuing an oversize header value already started.
    PartialHeaderValueContinue,
    /// Sink step: a grammar violation (or listener abort) occurred. Requires
    /// `reset`.
    Error,
    /// Sink step: the header block was fully decoded. Requires `reset`
    /// before decoding another request.
    Completed,
}
