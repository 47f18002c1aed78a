//! Event, token, and listener vocabulary emitted by [`crate::RequestDecoder`].
//!
//! Every enum here is a small `Copy` tag; no variant carries owned data. The
//! bytes associated with a token are passed directly to the listener callback
//! that reports them, never stored on these types.

/// A structural event fired between tokens.
///
/// Unlike [`TokenKind`] and [`PartialTokenKind`], an event carries no bytes —
/// it marks a transition in the grammar (start of path, end of request
/// target, recognized HTTP version, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The leading `/` of the request target was consumed.
    PathStart,
    /// A `/` separating two non-empty path segments was consumed.
    PathSeparator,
    /// The request target ended directly after the path (no query string).
    PathAndUrlEnd,
    /// The path ended and a query string begins (`?` was consumed).
    PathEndQueryStart,
    /// The query string ended and the request target is now complete.
    QueryAndUrlEnd,
    /// The literal `HTTP/1.1` version token was recognized.
    HttpVersion1_1,
}

/// A token whose entire text fit within a single fed slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// The request method, e.g. `GET`.
    HttpMethod,
    /// A single `/`-delimited path segment.
    PathSegment,
    /// A header field name, e.g. `Host`.
    HeaderName,
    /// A header field value, with leading/trailing OWS trimmed.
    HeaderValue,
}

/// A token whose text was too large for one slice and is delivered piecewise.
///
/// See [`Position`] for how the pieces of one token are tagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartialTokenKind {
    /// A path segment delivered in fragments.
    PathSegment,
    /// The query string, always delivered this way (it has no maximum length).
    QueryString,
    /// A header field name delivered in fragments.
    HeaderName,
    /// A header field value delivered in fragments.
    HeaderValue,
}

/// Position of a fragment within a partially-delivered token.
///
/// A single oversize token is always `First`, then zero or more `Middle`,
/// then exactly one `Last` (which may carry an empty slice, e.g. when a query
/// string ends exactly on a slice boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// The first fragment of an oversize token.
    First,
    /// An interior fragment; zero or more of these may occur.
    Middle,
    /// The final fragment; consumption of the token is now complete.
    Last,
}

/// Callback capability the decoder drives as it recognizes grammar productions.
///
/// Every method has a no-op default so a listener only needs to implement the
/// callbacks it cares about. [`RequestListener::should_stop`] is polled by the
/// decoder immediately after every dispatch; returning `true` aborts decoding
/// (the decoder transitions to its error step and the in-flight `feed` call
/// returns `IllFormed`) without an extra [`RequestListener::on_error`] call.
///
/// All byte slices passed to these callbacks borrow directly from the input
/// slice given to [`crate::RequestDecoder::feed`] and are only valid for the
/// duration of the call — do not retain them.
pub trait RequestListener {
    /// A structural event occurred (no associated bytes).
    fn on_event(&mut self, _event: EventKind) {}

    /// A token was recognized whole, within a single fed slice.
    fn on_complete_text(&mut self, _token: TokenKind, _text: &[u8]) {}

    /// A fragment of an oversize token was recognized.
    fn on_partial_text(&mut self, _token: PartialTokenKind, _position: Position, _text: &[u8]) {}

    /// The end of the header block (blank line) was reached.
    fn on_end(&mut self) {}

    /// A grammar violation was detected; `message` is one of the fixed
    /// literal strings documented on [`crate::RequestDecoder`].
    fn on_error(&mut self, _message: &'static str) {}

    /// Polled after every dispatch; return `true` to abort decoding.
    fn should_stop(&self) -> bool {
        false
    }
}

/// A listener that ignores every callback and never requests a stop.
///
/// Attaching this is equivalent to running the decoder with no listener
/// attached at all, except that it lets callers keep `attach_listener`'s
/// lifetime bound satisfied without an `Option` at the call site.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullListener;

impl RequestListener for NullListener {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_listener_never_stops() {
        let listener = NullListener;
        assert!(!listener.should_stop());
    }

    #[test]
    fn events_are_copy_and_comparable() {
        let a = EventKind::PathStart;
        let b = a;
        assert_eq!(a, b);
    }
}
