//! A TCP listener driven through an explicit connection-lifecycle state
//! machine, rather than a bare `accept()` loop.
//!
//! The hardware this is modeled on has exactly one socket per listener and
//! walks it through `LISTEN -> ESTABLISHED/CLOSE_WAIT -> CLOSING -> CLOSED`
//! so that a half-closed peer gets a bounded amount of time to be cleaned up
//! before the socket is forced back to listening. `ServerSocket` keeps that
//! same state machine, backed by a real `tokio::net::TcpListener` instead of
//! a polled hardware register.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use embernet_core::{Error, Result};

use crate::config::ServerConfig;

/// How long a half-closed connection may sit in [`SocketState::CloseWait`]
/// or [`SocketState::Closing`] before [`ServerSocket::check_close_timeout`]
/// forces it closed.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a [`ServerSocket`] is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    /// No peer; waiting for a new TCP connection.
    Listening,
    /// A peer is connected and the connection is fully open.
    Established,
    /// The peer has half-closed its side; our side may still write.
    CloseWait,
    /// We have started closing the connection and are waiting for cleanup.
    Closing,
}

/// A TCP listener paired with the lifecycle state of (at most) one active
/// connection.
///
/// Unlike a plain `TcpListener::accept()` loop, `ServerSocket` refuses to
/// accept a second connection while one is still being cleaned up, and
/// tracks how long a connection has been closing so a caller can decide to
/// give up on a slow peer.
#[derive(Debug)]
pub struct ServerSocket {
    listener: TcpListener,
    state: SocketState,
    peer: Option<SocketAddr>,
    closing_since: Option<tokio::time::Instant>,
}

impl ServerSocket {
    /// Bind a listener to `addr` and start in [`SocketState::Listening`].
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("listening on {addr}");
        Ok(Self {
            listener,
            state: SocketState::Listening,
            peer: None,
            closing_since: None,
        })
    }

    /// Bind a listener using [`ServerConfig::bind_addr`].
    ///
    /// `max_connections` and `max_header_size` are left for the caller to
    /// apply (e.g. to a connection pool and to each
    /// [`crate::RequestCodec`] in turn) since a single `ServerSocket` tracks
    /// exactly one connection slot.
    pub async fn bind_with_config(config: &ServerConfig) -> Result<Self> {
        Self::bind(config.bind_addr).await
    }

    /// The address this socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(Into::into)
    }

    #[must_use]
    pub fn state(&self) -> SocketState {
        self.state
    }

    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(
            self.state,
            SocketState::Established | SocketState::CloseWait | SocketState::Closing
        )
    }

    /// Accept the next connection. Only valid while [`SocketState::Listening`];
    /// a caller that tries to accept while a connection is already active (or
    /// being cleaned up) gets [`Error::InvalidSocketTransition`], matching the
    /// one-socket-at-a-time lifecycle this type enforces.
    pub async fn accept(&mut self) -> Result<(TcpStream, SocketAddr)> {
        if self.state != SocketState::Listening {
            return Err(Error::invalid_socket_transition(format!(
                "accept called while in {:?}",
                self.state
            )));
        }
        let (stream, addr) = self.listener.accept().await?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("failed to set TCP_NODELAY for {addr}: {e}");
        }
        debug!("accepted connection from {addr}");
        self.state = SocketState::Established;
        self.peer = Some(addr);
        Ok((stream, addr))
    }

    /// Record that the peer has half-closed (read side returned EOF) while
    /// we may still have data to write.
    pub fn note_half_close(&mut self) -> Result<()> {
        if self.state != SocketState::Established {
            return Err(Error::invalid_socket_transition(format!(
                "note_half_close called while in {:?}",
                self.state
            )));
        }
        self.state = SocketState::CloseWait;
        Ok(())
    }

    /// Begin closing the active connection, starting the close-timeout
    /// clock. Valid from [`SocketState::Established`] or
    /// [`SocketState::CloseWait`].
    pub fn begin_closing(&mut self) -> Result<()> {
        match self.state {
            SocketState::Established | SocketState::CloseWait => {
                self.state = SocketState::Closing;
                self.closing_since = Some(tokio::time::Instant::now());
                Ok(())
            }
            SocketState::Listening | SocketState::Closing => Err(
                Error::invalid_socket_transition(format!(
                    "begin_closing called while in {:?}",
                    self.state
                )),
            ),
        }
    }

    /// Finish cleanup and return to [`SocketState::Listening`], ready to
    /// accept the next connection.
    pub fn finish_closing(&mut self) {
        if let Some(peer) = self.peer {
            debug!("connection to {peer} closed, socket ready to accept again");
        }
        self.state = SocketState::Listening;
        self.peer = None;
        self.closing_since = None;
    }

    /// If closing has taken longer than `timeout`, force the socket back to
    /// [`SocketState::Listening`] and report that a timeout occurred.
    ///
    /// Mirrors giving up on a slow TCP teardown rather than waiting out the
    /// full 2*MSL `TIME_WAIT` period, which a memory-constrained listener
    /// with a single socket cannot afford to do.
    pub fn check_close_timeout(&mut self, timeout: Duration) -> bool {
        let Some(since) = self.closing_since else {
            return false;
        };
        if since.elapsed() > timeout {
            warn!("close timeout elapsed for {:?}, forcing socket back to listening", self.peer);
            self.finish_closing();
            true
        } else {
            false
        }
    }
}
