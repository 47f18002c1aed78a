//! The state machine driver and the one grammar production per [`Step`].

use crate::char_class::{
    find_first_not, is_field_content, is_ows, is_pchar, is_query_char, is_tchar,
    trim_trailing_ows,
};
use crate::event::{EventKind, PartialTokenKind, Position, RequestListener, TokenKind};
use crate::status::DecodeStatus;
use crate::step::Step;

/// Upper bound on the length of any slice passed to [`RequestDecoder::feed`].
///
/// The original implementation this decoder is modeled on stores slice
/// lengths in a 15-bit field; this rewrite fixes a generous but still
/// embedded-appropriate limit instead of parameterizing it, since nothing in
/// the grammar depends on the exact value beyond `MAX_VIEW >= 32` (enough to
/// decode any realistic HTTP method without hitting the oversize-token
/// fallback on every request).
pub const MAX_VIEW: usize = 512;

/// Incremental, push-style HTTP/1.1 request-header decoder.
///
/// A `RequestDecoder` holds no input bytes between calls — only the current
/// [`Step`] and an optional buffer-full fallback step. Callers drive it by
/// repeatedly calling [`RequestDecoder::feed`] with successive chunks of a
/// byte stream; the decoder reports recognized grammar productions through
/// whatever [`RequestListener`] is attached via [`RequestDecoder::attach_listener`].
///
/// A decoder starts in a state that requires an explicit [`RequestDecoder::reset`]
/// before its first `feed` call, and must be reset again after it reaches
/// [`DecodeStatus::Complete`] or [`DecodeStatus::IllFormed`] before decoding
/// another request.
///
/// # Examples
///
/// ```
/// use embernet_http1::{DecodeStatus, EventKind, RequestDecoder, RequestListener, TokenKind};
///
/// #[derive(Default)]
/// struct Recorder {
///     method: Vec<u8>,
/// }
///
/// impl RequestListener for Recorder {
///     fn on_complete_text(&mut self, token: TokenKind, text: &[u8]) {
///         if token == TokenKind::HttpMethod {
///             self.method.extend_from_slice(text);
///         }
///     }
/// }
///
/// let mut recorder = Recorder::default();
/// let mut decoder = RequestDecoder::new();
/// decoder.reset();
/// decoder.attach_listener(&mut recorder);
///
/// let (status, remaining) = decoder.feed(b"GET / HTTP/1.1\r\n\r\n", false);
/// assert_eq!(status, DecodeStatus::Complete);
/// assert!(remaining.is_empty());
/// assert_eq!(recorder.method, b"GET");
/// ```
pub struct RequestDecoder<'l> {
    step: Step,
    listener: Option<&'l mut dyn RequestListener>,
    partial_fallback: Option<Step>,
}

impl<'l> RequestDecoder<'l> {
    /// Create a decoder that requires [`RequestDecoder::reset`] before use.
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: Step::Error,
            listener: None,
            partial_fallback: None,
        }
    }

    /// Return the decoder to `DecodeMethod` and detach any listener.
    ///
    /// This is the only way to recover from [`DecodeStatus::Complete`] or
    /// [`DecodeStatus::IllFormed`], and is also how a fresh decoder is made
    /// ready for its first `feed` call.
    pub fn reset(&mut self) {
        self.step = Step::DecodeMethod;
        self.listener = None;
        self.partial_fallback = None;
    }

    /// Attach a listener that will receive callbacks for this request.
    ///
    /// Replaces any previously attached listener. If no listener is ever
    /// attached, the decoder still advances its state machine and still
    /// reports `Complete` / `IllFormed`, it just emits no callbacks.
    pub fn attach_listener(&mut self, listener: &'l mut dyn RequestListener) {
        self.listener = Some(listener);
    }

    /// Detach the current listener, if any.
    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    /// The current step, mostly useful for tests and diagnostics.
    #[must_use]
    pub fn step(&self) -> Step {
        self.step
    }

    /// The buffer-full fallback step recorded for the current token, if any.
    ///
    /// Exposed so that a long-lived owner (e.g. a `tokio_util::codec::Decoder`
    /// wrapping a request per connection) can save a decoder's progress
    /// between calls without holding onto a borrowed listener the whole time;
    /// see [`RequestDecoder::restore`].
    #[must_use]
    pub fn partial_fallback(&self) -> Option<Step> {
        self.partial_fallback
    }

    /// Rebuild a decoder from previously saved `step`/`partial_fallback`,
    /// with no listener attached.
    ///
    /// Pairs with [`RequestDecoder::step`] and
    /// [`RequestDecoder::partial_fallback`] to let a caller park decoding
    /// state in plain fields between `feed` calls and attach a fresh,
    /// short-lived listener borrow each time, instead of holding one borrow
    /// across the decoder's whole lifetime.
    #[must_use]
    pub fn restore(step: Step, partial_fallback: Option<Step>) -> Self {
        Self {
            step,
            listener: None,
            partial_fallback,
        }
    }

    /// Feed the next chunk of bytes to the decoder.
    ///
    /// `input` must be non-empty (an empty slice is a misuse and yields
    /// [`DecodeStatus::InternalError`]). `buffer_is_full` asserts that the
    /// caller cannot append more bytes before the decoder consumes some of
    /// this slice — i.e. this is as large as the slice will ever get before
    /// progress is required.
    ///
    /// Returns the resulting status and the unconsumed suffix of `input`
    /// (borrowed from `input`, never retained by the decoder past this call).
    ///
    /// # Driver algorithm
    ///
    /// The decoder repeatedly dispatches the current step against the
    /// remaining input. A step returning [`DecodeStatus::DecodingInProgress`]
    /// causes the loop to continue; any other status ends the call, except
    /// that a [`DecodeStatus::NeedMoreInput`] encountered with `buffer_is_full`
    /// set, with zero bytes consumed since this `feed` call began, triggers a
    /// swap into `partial_fallback` (if one was set) before the loop
    /// continues, or [`DecodeStatus::IllFormed`] otherwise.
    pub fn feed<'b>(&mut self, input: &'b [u8], buffer_is_full: bool) -> (DecodeStatus, &'b [u8]) {
        debug_assert!(
            input.len() <= MAX_VIEW,
            "caller must bound slices by MAX_VIEW"
        );

        if input.is_empty() {
            return (DecodeStatus::InternalError, input);
        }
        match self.step {
            Step::Error => return (DecodeStatus::IllFormed, input),
            Step::Completed => return (DecodeStatus::InternalError, input),
            _ => {}
        }

        let entry_len = input.len();
        let mut cursor = input;
        let mut status = DecodeStatus::NeedMoreInput;

        while !cursor.is_empty() {
            let before_len = cursor.len();
            let before_step = self.step;
            status = self.dispatch(&mut cursor);

            match status {
                DecodeStatus::DecodingInProgress => {
                    debug_assert!(
                        cursor.len() < before_len || self.step != before_step,
                        "a step must consume input or change step"
                    );
                    continue;
                }
                DecodeStatus::NeedMoreInput => {
                    let made_no_progress = cursor.len() == entry_len;
                    if buffer_is_full && made_no_progress {
                        if let Some(fallback) = self.partial_fallback.take() {
                            self.step = fallback;
                            continue;
                        }
                        self.step = Step::Error;
                        return (DecodeStatus::IllFormed, cursor);
                    }
                    break;
                }
                _ => break,
            }
        }

        (status, cursor)
    }

    fn dispatch(&mut self, input: &mut &[u8]) -> DecodeStatus {
        match self.step {
            Step::DecodeMethod => self.step_decode_method(input),
            Step::DecodeMethodError => self.fail("HTTP Method too long"),
            Step::DecodePathStart => self.step_decode_path_start(input),
            Step::DecodePathSegment => self.step_decode_path_segment(input),
            Step::AfterSegment => self.step_after_segment(input),
            Step::DecodeQueryStringStart => self.step_decode_query_string_start(input),
            Step::DecodePartialQueryString => self.step_decode_partial_query_string(input),
            Step::MatchAfterRequestTarget => self.step_match_after_request_target(input),
            Step::DecodeHttpVersion => self.step_decode_http_version(input),
            Step::DecodeHeaderLines => self.step_decode_header_lines(input),
            Step::MatchHeaderNameValueSeparator => self.step_match_header_name_value_separator(input),
            Step::SkipOptionalWhitespace => self.step_skip_optional_whitespace(input),
            Step::DecodeHeaderValue => self.step_decode_header_value(input),
            Step::MatchHeaderValueEnd => self.step_match_header_value_end(input),
            Step::PartialPathSegmentStart => self.step_partial_path_segment_start(input),
            Step::PartialPathSegmentContinue => self.step_partial_path_segment_continue(input),
            Step::PartialHeaderNameStart => self.step_partial_header_name_start(input),
            Step::PartialHeaderNameContinue => self.step_partial_header_name_continue(input),
            Step::PartialHeaderValueStart => self.step_partial_header_value_start(input),
            Step::PartialHeaderValueContinue => self.step_partial_header_value_continue(input),
            Step::Error | Step::Completed => {
                unreachable!("feed() returns before dispatching a terminal step")
            }
        }
    }

    // -- listener dispatch helpers -----------------------------------------

    /// Emit a structural event. Returns `true` if the listener requested a
    /// stop, in which case `self.step` has already been set to `Error`.
    fn emit_event(&mut self, event: EventKind) -> bool {
        let stop = match self.listener.as_deref_mut() {
            Some(listener) => {
                listener.on_event(event);
                listener.should_stop()
            }
            None => false,
        };
        if stop {
            self.step = Step::Error;
        }
        stop
    }

    fn emit_complete_text(&mut self, token: TokenKind, text: &[u8]) -> bool {
        let stop = match self.listener.as_deref_mut() {
            Some(listener) => {
                listener.on_complete_text(token, text);
                listener.should_stop()
            }
            None => false,
        };
        if stop {
            self.step = Step::Error;
        }
        stop
    }

    fn emit_partial_text(&mut self, token: PartialTokenKind, position: Position, text: &[u8]) -> bool {
        let stop = match self.listener.as_deref_mut() {
            Some(listener) => {
                listener.on_partial_text(token, position, text);
                listener.should_stop()
            }
            None => false,
        };
        if stop {
            self.step = Step::Error;
        }
        stop
    }

    fn fail(&mut self, message: &'static str) -> DecodeStatus {
        if let Some(listener) = self.listener.as_deref_mut() {
            listener.on_error(message);
        }
        self.step = Step::Error;
        DecodeStatus::IllFormed
    }

    // -- grammar productions -------------------------------------------------

    fn step_decode_method(&mut self, input: &mut &[u8]) -> DecodeStatus {
        if !input[0].is_ascii_uppercase() {
            return self.fail("Invalid or malformed HTTP Method");
        }
        match find_first_not(*input, |b| b.is_ascii_uppercase()) {
            Some(pos) => {
                if input[pos] != b' ' {
                    return self.fail("Invalid or malformed HTTP Method");
                }
                let method = &input[..pos];
                let rest = &input[pos + 1..];
                self.step = Step::DecodePathStart;
                let stopped = self.emit_complete_text(TokenKind::HttpMethod, method);
                *input = rest;
                if stopped {
                    return DecodeStatus::IllFormed;
                }
                DecodeStatus::DecodingInProgress
            }
            None => {
                self.partial_fallback = Some(Step::DecodeMethodError);
                DecodeStatus::NeedMoreInput
            }
        }
    }

    fn step_decode_path_start(&mut self, input: &mut &[u8]) -> DecodeStatus {
        if input[0] != b'/' {
            return self.fail("Invalid path start");
        }
        *input = &input[1..];
        self.step = Step::DecodePathSegment;
        if self.emit_event(EventKind::PathStart) {
            return DecodeStatus::IllFormed;
        }
        DecodeStatus::DecodingInProgress
    }

    fn step_decode_path_segment(&mut self, input: &mut &[u8]) -> DecodeStatus {
        match find_first_not(*input, is_pchar) {
            Some(0) => {
                if input[0] == b'/' {
                    return self.fail("Empty segment in path");
                }
                self.step = Step::AfterSegment;
                DecodeStatus::DecodingInProgress
            }
            Some(pos) => {
                let segment = &input[..pos];
                let rest = &input[pos..];
                self.step = Step::AfterSegment;
                let stopped = self.emit_complete_text(TokenKind::PathSegment, segment);
                *input = rest;
                if stopped {
                    return DecodeStatus::IllFormed;
                }
                DecodeStatus::DecodingInProgress
            }
            None => {
                self.partial_fallback = Some(Step::PartialPathSegmentStart);
                DecodeStatus::NeedMoreInput
            }
        }
    }

    fn step_after_segment(&mut self, input: &mut &[u8]) -> DecodeStatus {
        match input[0] {
            b' ' => {
                *input = &input[1..];
                self.step = Step::DecodeHttpVersion;
                if self.emit_event(EventKind::PathAndUrlEnd) {
                    return DecodeStatus::IllFormed;
                }
                DecodeStatus::DecodingInProgress
            }
            b'?' => {
                *input = &input[1..];
                self.step = Step::DecodeQueryStringStart;
                if self.emit_event(EventKind::PathEndQueryStart) {
                    return DecodeStatus::IllFormed;
                }
                DecodeStatus::DecodingInProgress
            }
            b'/' => {
                *input = &input[1..];
                self.step = Step::DecodePathSegment;
                if self.emit_event(EventKind::PathSeparator) {
                    return DecodeStatus::IllFormed;
                }
                DecodeStatus::DecodingInProgress
            }
            _ => self.fail("Invalid path"),
        }
    }

    fn step_decode_query_string_start(&mut self, input: &mut &[u8]) -> DecodeStatus {
        if !is_query_char(input[0]) {
            self.step = Step::MatchAfterRequestTarget;
            return if self.emit_event(EventKind::QueryAndUrlEnd) {
                DecodeStatus::IllFormed
            } else {
                DecodeStatus::DecodingInProgress
            };
        }
        let pos = find_first_not(*input, is_query_char).unwrap_or(input.len());
        let chunk = &input[..pos];
        let rest = &input[pos..];
        self.step = Step::DecodePartialQueryString;
        let stopped = self.emit_partial_text(PartialTokenKind::QueryString, Position::First, chunk);
        *input = rest;
        if stopped {
            return DecodeStatus::IllFormed;
        }
        DecodeStatus::DecodingInProgress
    }

    fn step_decode_partial_query_string(&mut self, input: &mut &[u8]) -> DecodeStatus {
        match find_first_not(*input, is_query_char) {
            Some(pos) => {
                let chunk = &input[..pos];
                let rest = &input[pos..];
                self.step = Step::MatchAfterRequestTarget;
                let stopped = self.emit_partial_text(PartialTokenKind::QueryString, Position::Last, chunk);
                *input = rest;
                if stopped {
                    return DecodeStatus::IllFormed;
                }
            }
            None => {
                let chunk = *input;
                *input = &input[input.len()..];
                if self.emit_partial_text(PartialTokenKind::QueryString, Position::Middle, chunk) {
                    return DecodeStatus::IllFormed;
                }
            }
        }
        DecodeStatus::DecodingInProgress
    }

    fn step_match_after_request_target(&mut self, input: &mut &[u8]) -> DecodeStatus {
        if input[0] != b' ' {
            return self.fail("Invalid path end");
        }
        *input = &input[1..];
        self.step = Step::DecodeHttpVersion;
        if self.emit_event(EventKind::PathAndUrlEnd) {
            return DecodeStatus::IllFormed;
        }
        DecodeStatus::DecodingInProgress
    }

    fn step_decode_http_version(&mut self, input: &mut &[u8]) -> DecodeStatus {
        const LITERAL: &[u8] = b"HTTP/1.1\r\n";
        match match_literal(*input, LITERAL) {
            LiteralMatch::Matched(rest) => {
                self.step = Step::DecodeHeaderLines;
                *input = rest;
                if self.emit_event(EventKind::HttpVersion1_1) {
                    return DecodeStatus::IllFormed;
                }
                DecodeStatus::DecodingInProgress
            }
            LiteralMatch::Partial => DecodeStatus::NeedMoreInput,
            LiteralMatch::Mismatch => self.fail("Unsupported HTTP version"),
        }
    }

    fn step_decode_header_lines(&mut self, input: &mut &[u8]) -> DecodeStatus {
        match find_first_not(*input, is_tchar) {
            Some(pos) if pos > 0 => {
                let name = &input[..pos];
                let rest = &input[pos..];
                self.step = Step::MatchHeaderNameValueSeparator;
                let stopped = self.emit_complete_text(TokenKind::HeaderName, name);
                *input = rest;
                if stopped {
                    return DecodeStatus::IllFormed;
                }
                DecodeStatus::DecodingInProgress
            }
            Some(_) => match match_literal(*input, b"\r\n") {
                LiteralMatch::Matched(rest) => {
                    *input = rest;
                    self.step = Step::Completed;
                    if let Some(listener) = self.listener.as_deref_mut() {
                        listener.on_end();
                    }
                    DecodeStatus::Complete
                }
                LiteralMatch::Partial => DecodeStatus::NeedMoreInput,
                LiteralMatch::Mismatch => self.fail("Illformed header name"),
            },
            None => {
                self.partial_fallback = Some(Step::PartialHeaderNameStart);
                DecodeStatus::NeedMoreInput
            }
        }
    }

    fn step_match_header_name_value_separator(&mut self, input: &mut &[u8]) -> DecodeStatus {
        if input[0] != b':' {
            return self.fail("Invalid header value start");
        }
        *input = &input[1..];
        self.step = Step::SkipOptionalWhitespace;
        DecodeStatus::DecodingInProgress
    }

    fn step_skip_optional_whitespace(&mut self, input: &mut &[u8]) -> DecodeStatus {
        match find_first_not(*input, is_ows) {
            Some(pos) => {
                *input = &input[pos..];
                self.step = Step::DecodeHeaderValue;
                DecodeStatus::DecodingInProgress
            }
            None => {
                *input = &input[input.len()..];
                DecodeStatus::NeedMoreInput
            }
        }
    }

    fn step_decode_header_value(&mut self, input: &mut &[u8]) -> DecodeStatus {
        match find_first_not(*input, is_field_content) {
            Some(pos) if pos > 0 => {
                let raw = &input[..pos];
                let rest = &input[pos..];
                let trimmed = trim_trailing_ows(raw);
                self.step = Step::MatchHeaderValueEnd;
                let stopped = self.emit_complete_text(TokenKind::HeaderValue, trimmed);
                *input = rest;
                if stopped {
                    return DecodeStatus::IllFormed;
                }
                DecodeStatus::DecodingInProgress
            }
            Some(_) => self.fail("Empty header value"),
            None => {
                self.partial_fallback = Some(Step::PartialHeaderValueStart);
                DecodeStatus::NeedMoreInput
            }
        }
    }

    fn step_match_header_value_end(&mut self, input: &mut &[u8]) -> DecodeStatus {
        match match_literal(*input, b"\r\n") {
            LiteralMatch::Matched(rest) => {
                *input = rest;
                self.step = Step::DecodeHeaderLines;
                DecodeStatus::DecodingInProgress
            }
            LiteralMatch::Partial => DecodeStatus::NeedMoreInput,
            LiteralMatch::Mismatch => self.fail("Missing EOF after header"),
        }
    }

    // -- oversize-token fallback chains --------------------------------------

    fn step_partial_path_segment_start(&mut self, input: &mut &[u8]) -> DecodeStatus {
        let chunk = *input;
        *input = &input[input.len()..];
        self.step = Step::PartialPathSegmentContinue;
        if self.emit_partial_text(PartialTokenKind::PathSegment, Position::First, chunk) {
            return DecodeStatus::IllFormed;
        }
        DecodeStatus::DecodingInProgress
    }

    fn step_partial_path_segment_continue(&mut self, input: &mut &[u8]) -> DecodeStatus {
        match find_first_not(*input, is_pchar) {
            Some(pos) => {
                let chunk = &input[..pos];
                let rest = &input[pos..];
                self.step = Step::AfterSegment;
                let stopped = self.emit_partial_text(PartialTokenKind::PathSegment, Position::Last, chunk);
                *input = rest;
                if stopped {
                    return DecodeStatus::IllFormed;
                }
            }
            None => {
                let chunk = *input;
                *input = &input[input.len()..];
                if self.emit_partial_text(PartialTokenKind::PathSegment, Position::Middle, chunk) {
                    return DecodeStatus::IllFormed;
                }
            }
        }
        DecodeStatus::DecodingInProgress
    }

    fn step_partial_header_name_start(&mut self, input: &mut &[u8]) -> DecodeStatus {
        let chunk = *input;
        *input = &input[input.len()..];
        self.step = Step::PartialHeaderNameContinue;
        if self.emit_partial_text(PartialTokenKind::HeaderName, Position::First, chunk) {
            return DecodeStatus::IllFormed;
        }
        DecodeStatus::DecodingInProgress
    }

    fn step_partial_header_name_continue(&mut self, input: &mut &[u8]) -> DecodeStatus {
        match find_first_not(*input, is_tchar) {
            Some(pos) => {
                let chunk = &input[..pos];
                let rest = &input[pos..];
                self.step = Step::MatchHeaderNameValueSeparator;
                let stopped = self.emit_partial_text(PartialTokenKind::HeaderName, Position::Last, chunk);
                *input = rest;
                if stopped {
                    return DecodeStatus::IllFormed;
                }
            }
            None => {
                let chunk = *input;
                *input = &input[input.len()..];
                if self.emit_partial_text(PartialTokenKind::HeaderName, Position::Middle, chunk) {
                    return DecodeStatus::IllFormed;
                }
            }
        }
        DecodeStatus::DecodingInProgress
    }

    fn step_partial_header_value_start(&mut self, input: &mut &[u8]) -> DecodeStatus {
        let chunk = *input;
        *input = &input[input.len()..];
        self.step = Step::PartialHeaderValueContinue;
        if self.emit_partial_text(PartialTokenKind::HeaderValue, Position::First, chunk) {
            return DecodeStatus::IllFormed;
        }
        DecodeStatus::DecodingInProgress
    }

    fn step_partial_header_value_continue(&mut self, input: &mut &[u8]) -> DecodeStatus {
        match find_first_not(*input, is_field_content) {
            Some(pos) => {
                let raw = &input[..pos];
                let rest = &input[pos..];
                let trimmed = trim_trailing_ows(raw);
                self.step = Step::MatchHeaderValueEnd;
                let stopped = self.emit_partial_text(PartialTokenKind::HeaderValue, Position::Last, trimmed);
                *input = rest;
                if stopped {
                    return DecodeStatus::IllFormed;
                }
            }
            None => {
                let chunk = *input;
                *input = &input[input.len()..];
                if self.emit_partial_text(PartialTokenKind::HeaderValue, Position::Middle, chunk) {
                    return DecodeStatus::IllFormed;
                }
            }
        }
        DecodeStatus::DecodingInProgress
    }
}

impl Default for RequestDecoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of matching a fixed literal against a prefix of the input.
enum LiteralMatch<'b> {
    /// The literal matched in full; the remaining input follows it.
    Matched(&'b [u8]),
    /// The input is a proper, non-empty prefix of the literal.
    Partial,
    /// The input diverges from the literal before either ends.
    Mismatch,
}

/// Match `literal` as a prefix of `input`, without consuming on partial match.
fn match_literal<'b>(input: &'b [u8], literal: &[u8]) -> LiteralMatch<'b> {
    let n = input.len().min(literal.len());
    if input[..n] != literal[..n] {
        return LiteralMatch::Mismatch;
    }
    if input.len() >= literal.len() {
        LiteralMatch::Matched(&input[literal.len()..])
    } else {
        LiteralMatch::Partial
    }
}
