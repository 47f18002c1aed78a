//! Networking, address persistence and connection plumbing around
//! [`embernet_http1`].
//!
//! This crate is the ambient layer the decoder was never meant to own
//! itself: a TCP server-socket lifecycle, a write-buffered connection
//! wrapper, durable Ethernet/IP address generation, server configuration,
//! and a `tokio_util::codec::Decoder` adapter that drives a
//! [`embernet_http1::RequestDecoder`] from a `BytesMut`-backed stream.

pub mod address;
pub mod codec;
pub mod config;
pub mod connection;
pub mod server_socket;

pub use address::{Addresses, EthernetAddress, IpAddress, OuiPrefix};
pub use codec::{DecodedRequest, RequestCodec};
pub use config::ServerConfig;
pub use connection::WriteBufferedConnection;
pub use embernet_core::{Error, Result};
pub use server_socket::{ServerSocket, SocketState};
