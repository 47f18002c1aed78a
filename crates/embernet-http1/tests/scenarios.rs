//! End-to-end request scenarios, parameterized with `rstest`.

use embernet_http1::{
    DecodeStatus, EventKind, PartialTokenKind, Position, RequestDecoder, RequestListener,
    TokenKind,
};
use rstest::rstest;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Recorded {
    Event(EventKind),
    Complete(TokenKind, Vec<u8>),
    Partial(PartialTokenKind, Position, Vec<u8>),
    End,
    Error(&'static str),
}

#[derive(Default)]
struct Recorder(Vec<Recorded>);

impl RequestListener for Recorder {
    fn on_event(&mut self, event: EventKind) {
        self.0.push(Recorded::Event(event));
    }

    fn on_complete_text(&mut self, token: TokenKind, text: &[u8]) {
        self.0.push(Recorded::Complete(token, text.to_vec()));
    }

    fn on_partial_text(&mut self, token: PartialTokenKind, position: Position, text: &[u8]) {
        self.0.push(Recorded::Partial(token, position, text.to_vec()));
    }

    fn on_end(&mut self) {
        self.0.push(Recorded::End);
    }

    fn on_error(&mut self, message: &'static str) {
        self.0.push(Recorded::Error(message));
    }
}

#[rstest]
#[case::minimal_request(
    b"GET / HTTP/1.1\r\n\r\n".as_slice(),
    DecodeStatus::Complete,
    vec![
        Recorded::Complete(TokenKind::HttpMethod, b"GET".to_vec()),
        Recorded::Event(EventKind::PathStart),
        Recorded::Event(EventKind::PathAndUrlEnd),
        Recorded::Event(EventKind::HttpVersion1_1),
        Recorded::End,
    ],
)]
#[case::one_segment_and_header(
    b"POST /api HTTP/1.1\r\nHost: x\r\n\r\n".as_slice(),
    DecodeStatus::Complete,
    vec![
        Recorded::Complete(TokenKind::HttpMethod, b"POST".to_vec()),
        Recorded::Event(EventKind::PathStart),
        Recorded::Complete(TokenKind::PathSegment, b"api".to_vec()),
        Recorded::Event(EventKind::PathAndUrlEnd),
        Recorded::Event(EventKind::HttpVersion1_1),
        Recorded::Complete(TokenKind::HeaderName, b"Host".to_vec()),
        Recorded::Complete(TokenKind::HeaderValue, b"x".to_vec()),
        Recorded::End,
    ],
)]
#[case::ill_formed_lowercase_method(
    b"get / HTTP/1.1\r\n\r\n".as_slice(),
    DecodeStatus::IllFormed,
    vec![Recorded::Error("Invalid or malformed HTTP Method")],
)]
#[case::ill_formed_empty_segment(
    b"GET //a HTTP/1.1\r\n\r\n".as_slice(),
    DecodeStatus::IllFormed,
    vec![
        Recorded::Complete(TokenKind::HttpMethod, b"GET".to_vec()),
        Recorded::Event(EventKind::PathStart),
        Recorded::Error("Empty segment in path"),
    ],
)]
fn one_shot_feed_scenarios(
    #[case] request: &[u8],
    #[case] expected_status: DecodeStatus,
    #[case] expected_events: Vec<Recorded>,
) {
    let mut recorder = Recorder::default();
    let mut decoder = RequestDecoder::new();
    decoder.reset();
    decoder.attach_listener(&mut recorder);

    let (status, _remaining) = decoder.feed(request, false);

    assert_eq!(status, expected_status);
    assert_eq!(recorder.0, expected_events);
}

#[test]
fn query_string_split_across_two_feeds() {
    let mut recorder = Recorder::default();
    let mut decoder = RequestDecoder::new();
    decoder.reset();
    decoder.attach_listener(&mut recorder);

    let (status, remaining) = decoder.feed(b"GET /a?x=1", false);
    assert_eq!(status, DecodeStatus::DecodingInProgress);
    assert!(remaining.is_empty());

    let (status, remaining) = decoder.feed(b"&y=2 HTTP/1.1\r\n\r\n", false);
    assert_eq!(status, DecodeStatus::Complete);
    assert!(remaining.is_empty());

    assert_eq!(
        recorder.0,
        vec![
            Recorded::Complete(TokenKind::HttpMethod, b"GET".to_vec()),
            Recorded::Event(EventKind::PathStart),
            Recorded::Complete(TokenKind::PathSegment, b"a".to_vec()),
            Recorded::Event(EventKind::PathEndQueryStart),
            Recorded::Partial(PartialTokenKind::QueryString, Position::First, b"x=1".to_vec()),
            Recorded::Partial(PartialTokenKind::QueryString, Position::Middle, b"&y=2".to_vec()),
            Recorded::Partial(PartialTokenKind::QueryString, Position::Last, b"".to_vec()),
            Recorded::Event(EventKind::PathAndUrlEnd),
            Recorded::Event(EventKind::HttpVersion1_1),
            Recorded::End,
        ]
    );
}

#[test]
fn oversize_header_name_with_buffer_full_uses_partial_fallback() {
    let mut recorder = Recorder::default();
    let mut decoder = RequestDecoder::new();
    decoder.reset();
    decoder.attach_listener(&mut recorder);

    let (status, remaining) = decoder.feed(b"GET / HTTP/1.1\r\n", false);
    assert_eq!(status, DecodeStatus::DecodingInProgress);
    assert!(remaining.is_empty());

    let (status, remaining) = decoder.feed(b"XXXXXXXX", true);
    assert_eq!(status, DecodeStatus::DecodingInProgress);
    assert!(remaining.is_empty());

    let (status, remaining) = decoder.feed(b"YYYY: v\r\n\r\n", false);
    assert_eq!(status, DecodeStatus::Complete);
    assert!(remaining.is_empty());

    assert!(recorder.0.contains(&Recorded::Partial(
        PartialTokenKind::HeaderName,
        Position::First,
        b"XXXXXXXX".to_vec()
    )));
    assert!(recorder.0.contains(&Recorded::Partial(
        PartialTokenKind::HeaderName,
        Position::Last,
        b"YYYY".to_vec()
    )));
    assert!(recorder.0.contains(&Recorded::Complete(
        TokenKind::HeaderValue,
        b"v".to_vec()
    )));
    assert_eq!(recorder.0.last(), Some(&Recorded::End));
}
