//! End-to-end: a real TCP client writes a request to a [`ServerSocket`]
//! connection, decoded on the server side through a `Framed`-driven
//! [`RequestCodec`].

use embernet_net::{RequestCodec, ServerSocket};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

#[tokio::test]
async fn server_socket_accepts_and_decodes_a_request() {
    let mut server = ServerSocket::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();

    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /widgets?id=7 HTTP/1.1\r\nHost: example.com\r\n\r\n")
            .await
            .unwrap();
        stream
    });

    let (stream, _peer) = server.accept().await.unwrap();
    let _client_stream = client.await.unwrap();

    let mut framed = Framed::new(stream, RequestCodec::new());
    let request = framed.next().await.unwrap().unwrap();

    assert_eq!(request.method, b"GET");
    assert_eq!(request.path_segments, vec![b"widgets".to_vec()]);
    assert_eq!(request.query.as_deref(), Some(b"id=7".as_slice()));
    assert_eq!(
        request.headers,
        vec![(b"Host".to_vec(), b"example.com".to_vec())]
    );
}

#[tokio::test]
async fn server_socket_rejects_a_second_accept_while_connected() {
    let mut server = ServerSocket::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();

    let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
    server.accept().await.unwrap();
    let _client_stream = client.await.unwrap();

    assert!(server.accept().await.is_err());
}

#[tokio::test]
async fn framed_decodes_two_keep_alive_requests_from_one_stream() {
    let mut server = ServerSocket::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();

    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        stream
    });

    let (stream, _peer) = server.accept().await.unwrap();
    let _client_stream = client.await.unwrap();

    let mut framed = Framed::new(stream, RequestCodec::new());
    let first = framed.next().await.unwrap().unwrap();
    let second = framed.next().await.unwrap().unwrap();

    assert_eq!(first.path_segments, vec![b"a".to_vec()]);
    assert_eq!(second.path_segments, vec![b"b".to_vec()]);
}
