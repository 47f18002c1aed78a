//! A `tokio_util::codec::Decoder` that drives an
//! [`embernet_http1::RequestDecoder`] from a byte stream.
//!
//! The decoder itself has no I/O and no buffer of its own — by design, so it
//! can run on hardware with only a couple hundred bytes free. A `Framed`
//! stream, on the other hand, already owns a growable `BytesMut` and drains
//! it incrementally, which is exactly the "caller keeps the unconsumed
//! prefix and appends new bytes" contract `feed` expects. [`RequestCodec`]
//! is the glue between the two: each call to `decode` restores the
//! decoder's saved step, attaches a listener that accumulates the pieces of
//! one request, feeds it whatever `Framed` has buffered, and saves the step
//! back before returning.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::{trace, warn};

use embernet_core::Error;
use embernet_http1::{
    DecodeStatus, EventKind, PartialTokenKind, Position, RequestDecoder, RequestListener, Step,
    TokenKind, MAX_VIEW,
};

use crate::config::ServerConfig;

/// Default cap on how many bytes of header data a single request may
/// occupy before [`RequestCodec`] gives up on it.
///
/// Plenty for any real request line and header block; see
/// [`RequestCodec::with_max_header_size`] to change it.
pub const DEFAULT_MAX_HEADER_SIZE: usize = 8 * 1024;

/// One fully decoded request's method, path, query string and headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedRequest {
    pub method: Vec<u8>,
    pub path_segments: Vec<Vec<u8>>,
    pub query: Option<Vec<u8>>,
    pub headers: Vec<(Vec<u8>, Vec<u8>)>,
}

/// Accumulates the events of a single request into a [`DecodedRequest`],
/// reassembling both complete and partially-delivered tokens.
#[derive(Debug, Default)]
struct Accumulator {
    request: DecodedRequest,
    current_path_segment: Vec<u8>,
    current_query: Vec<u8>,
    current_header_name: Vec<u8>,
    current_header_value: Vec<u8>,
    pending_header_name: Option<Vec<u8>>,
    error: Option<&'static str>,
    ended: bool,
}

impl Accumulator {
    fn take_request(&mut self) -> DecodedRequest {
        std::mem::take(&mut self.request)
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

impl RequestListener for Accumulator {
    fn on_event(&mut self, _event: EventKind) {}

    fn on_complete_text(&mut self, token: TokenKind, text: &[u8]) {
        match token {
            TokenKind::HttpMethod => self.request.method = text.to_vec(),
            TokenKind::PathSegment => self.request.path_segments.push(text.to_vec()),
            TokenKind::HeaderName => self.pending_header_name = Some(text.to_vec()),
            TokenKind::HeaderValue => {
                if let Some(name) = self.pending_header_name.take() {
                    self.request.headers.push((name, text.to_vec()));
                }
            }
        }
    }

    fn on_partial_text(&mut self, token: PartialTokenKind, position: Position, text: &[u8]) {
        let buffer = match token {
            PartialTokenKind::PathSegment => &mut self.current_path_segment,
            PartialTokenKind::QueryString => &mut self.current_query,
            PartialTokenKind::HeaderName => &mut self.current_header_name,
            PartialTokenKind::HeaderValue => &mut self.current_header_value,
        };
        buffer.extend_from_slice(text);
        if position != Position::Last {
            return;
        }
        let finished = std::mem::take(buffer);
        match token {
            PartialTokenKind::PathSegment => self.request.path_segments.push(finished),
            PartialTokenKind::QueryString => self.request.query = Some(finished),
            PartialTokenKind::HeaderName => self.pending_header_name = Some(finished),
            PartialTokenKind::HeaderValue => {
                if let Some(name) = self.pending_header_name.take() {
                    self.request.headers.push((name, finished));
                }
            }
        }
    }

    fn on_end(&mut self) {
        self.ended = true;
    }

    fn on_error(&mut self, message: &'static str) {
        self.error = Some(message);
    }
}

/// Decodes a stream of bytes into successive [`DecodedRequest`]s.
///
/// Owns its decoding state as plain fields (`step`, `partial_fallback`)
/// rather than holding a [`RequestDecoder`] with a listener borrowed for
/// the codec's whole lifetime, so that `RequestCodec` itself stays a
/// freestanding, `'static` type usable in a `Framed<TcpStream, _>` the
/// usual way. See [`RequestDecoder::restore`] for how a decoder is rebuilt
/// each call from the saved step.
#[derive(Debug)]
pub struct RequestCodec {
    step: Step,
    partial_fallback: Option<Step>,
    accumulator: Accumulator,
    max_header_size: usize,
    /// Bytes consumed toward the request currently in progress, across
    /// however many `decode` calls it has taken so far. Checked against
    /// `max_header_size` independently of the decoder's own status, since
    /// the oversize-token fallback keeps reporting `DecodingInProgress`
    /// (draining the buffer into `Accumulator`) rather than ever blocking
    /// on `NeedMoreInput` once it engages.
    request_bytes: usize,
}

impl RequestCodec {
    /// Create a codec ready to decode the first request on a fresh
    /// connection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: Step::DecodeMethod,
            partial_fallback: None,
            accumulator: Accumulator::default(),
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            request_bytes: 0,
        }
    }

    /// Create a codec with a custom header-size limit.
    #[must_use]
    pub fn with_max_header_size(max_header_size: usize) -> Self {
        Self {
            max_header_size,
            ..Self::new()
        }
    }

    /// Create a codec honoring [`ServerConfig::max_header_size`].
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::with_max_header_size(config.max_header_size)
    }

    #[must_use]
    pub fn max_header_size(&self) -> usize {
        self.max_header_size
    }

    fn reset_for_next_request(&mut self) {
        self.step = Step::DecodeMethod;
        self.partial_fallback = None;
        self.accumulator.reset();
        self.request_bytes = 0;
    }
}

impl Default for RequestCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RequestCodec {
    type Item = DecodedRequest;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> std::result::Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        // `feed` refuses slices longer than `MAX_VIEW`, so a `Framed` buffer
        // that has grown past that (the common case once a few requests have
        // queued up) must be walked window by window. A window only tells
        // `feed` it's buffer-full when it's pinned at `MAX_VIEW` (we will
        // never hand over a bigger slice in a single call regardless of what
        // else is queued) or when it is both the last bytes currently
        // buffered and taking it would cross `max_header_size` for the
        // request in progress — at which point we want the oversize-token
        // fallback to engage rather than block forever on `NeedMoreInput`.
        let mut consumed = 0usize;
        let mut status = DecodeStatus::NeedMoreInput;

        loop {
            let remaining_total = src.len() - consumed;
            if remaining_total == 0 {
                break;
            }
            let window_len = remaining_total.min(MAX_VIEW);
            let at_cap = window_len == MAX_VIEW;
            let is_last_of_buffer = window_len == remaining_total;
            let would_exceed_limit =
                self.request_bytes + consumed + window_len >= self.max_header_size;
            let window_buffer_is_full = at_cap || (is_last_of_buffer && would_exceed_limit);

            let mut decoder: RequestDecoder<'_> =
                RequestDecoder::restore(self.step, self.partial_fallback);
            decoder.attach_listener(&mut self.accumulator);
            let window = &src[consumed..consumed + window_len];
            let (s, rem) = decoder.feed(window, window_buffer_is_full);
            self.step = decoder.step();
            self.partial_fallback = decoder.partial_fallback();

            consumed += window_len - rem.len();
            status = s;

            match s {
                DecodeStatus::Complete | DecodeStatus::IllFormed | DecodeStatus::InternalError => {
                    break
                }
                DecodeStatus::DecodingInProgress => continue,
                DecodeStatus::NeedMoreInput => {
                    if window_buffer_is_full {
                        continue;
                    }
                    break;
                }
            }
        }

        src.advance(consumed);
        self.request_bytes += consumed;

        match status {
            DecodeStatus::Complete => {
                let request = self.accumulator.take_request();
                trace!(method = ?String::from_utf8_lossy(&request.method), "request decoded");
                self.reset_for_next_request();
                Ok(Some(request))
            }
            DecodeStatus::DecodingInProgress | DecodeStatus::NeedMoreInput => {
                // Checked on the running total, not on this call's status: once
                // the oversize-token fallback engages it keeps reporting
                // `DecodingInProgress` while draining everything fed to it, so
                // a request can only ever be caught here, not by waiting for a
                // terminal `NeedMoreInput` that will never come.
                if self.request_bytes >= self.max_header_size {
                    let limit = self.max_header_size;
                    warn!("request headers exceeded {limit} bytes, dropping connection's request");
                    self.reset_for_next_request();
                    return Err(Error::HeaderTooLarge { limit });
                }
                Ok(None)
            }
            DecodeStatus::IllFormed => {
                let reason = self.accumulator.error.unwrap_or("malformed request");
                warn!("rejecting malformed request: {reason}");
                self.reset_for_next_request();
                Err(Error::RequestRejected { reason })
            }
            DecodeStatus::InternalError => {
                self.reset_for_next_request();
                Err(Error::RequestRejected {
                    reason: "decoder used after a terminal result without reset",
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut RequestCodec, src: &mut BytesMut) -> Vec<DecodedRequest> {
        let mut out = Vec::new();
        while let Some(request) = codec.decode(src).unwrap() {
            out.push(request);
        }
        out
    }

    #[test]
    fn decodes_a_minimal_request_in_one_chunk() {
        let mut codec = RequestCodec::new();
        let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\n\r\n"[..]);

        let requests = decode_all(&mut codec, &mut buffer);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, b"GET");
        assert!(requests[0].path_segments.is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn decodes_path_segments_and_headers() {
        let mut codec = RequestCodec::new();
        let mut buffer =
            BytesMut::from(&b"POST /api/widgets HTTP/1.1\r\nHost: example\r\n\r\n"[..]);

        let requests = decode_all(&mut codec, &mut buffer);
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, b"POST");
        assert_eq!(request.path_segments, vec![b"api".to_vec(), b"widgets".to_vec()]);
        assert_eq!(request.headers, vec![(b"Host".to_vec(), b"example".to_vec())]);
    }

    #[test]
    fn decodes_a_request_split_across_many_small_chunks() {
        let mut codec = RequestCodec::new();
        let full = b"GET /a?x=1&y=2 HTTP/1.1\r\nHost: h\r\n\r\n";
        let mut buffer = BytesMut::new();

        let mut requests = Vec::new();
        for byte in full {
            buffer.extend_from_slice(&[*byte]);
            requests.extend(decode_all(&mut codec, &mut buffer));
        }

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, b"GET");
        assert_eq!(requests[0].query.as_deref(), Some(b"x=1&y=2".as_slice()));
    }

    #[test]
    fn decodes_two_requests_back_to_back_on_a_keep_alive_connection() {
        let mut codec = RequestCodec::new();
        let mut buffer =
            BytesMut::from(&b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n"[..]);

        let requests = decode_all(&mut codec, &mut buffer);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path_segments, vec![b"a".to_vec()]);
        assert_eq!(requests[1].path_segments, vec![b"b".to_vec()]);
    }

    #[test]
    fn malformed_method_is_reported_as_request_rejected() {
        let mut codec = RequestCodec::new();
        let mut buffer = BytesMut::from(&b"get / HTTP/1.1\r\n\r\n"[..]);

        let err = codec.decode(&mut buffer).unwrap_err();
        assert!(matches!(err, Error::RequestRejected { .. }));
    }

    #[test]
    fn oversize_header_block_is_rejected() {
        let mut codec = RequestCodec::with_max_header_size(32);
        let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\nX-Long: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"[..]);

        let err = codec.decode(&mut buffer).unwrap_err();
        assert!(matches!(err, Error::HeaderTooLarge { limit: 32 }));
    }

    #[test]
    fn from_config_applies_the_configured_header_limit() {
        let config = ServerConfig {
            max_header_size: 32,
            ..ServerConfig::default()
        };
        let mut codec = RequestCodec::from_config(&config);
        let mut buffer = BytesMut::from(
            &b"GET / HTTP/1.1\r\nX-Long: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"[..],
        );

        let err = codec.decode(&mut buffer).unwrap_err();
        assert!(matches!(err, Error::HeaderTooLarge { limit: 32 }));
    }

    #[test]
    fn codec_can_be_reused_for_a_second_request_after_a_rejection() {
        let mut codec = RequestCodec::new();
        let mut buffer = BytesMut::from(&b"get / HTTP/1.1\r\n\r\n"[..]);
        assert!(codec.decode(&mut buffer).is_err());

        let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\n\r\n"[..]);
        let requests = decode_all(&mut codec, &mut buffer);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, b"GET");
    }
}
