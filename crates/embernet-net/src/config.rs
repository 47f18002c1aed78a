//! Server configuration.
//!
//! # Example
//!
//! ```
//! use embernet_net::ServerConfig;
//!
//! let config = ServerConfig {
//!     bind_addr: "0.0.0.0:8080".parse().unwrap(),
//!     max_connections: 16,
//!     max_header_size: 8 * 1024,
//! };
//! ```

use std::net::SocketAddr;

use crate::codec::DEFAULT_MAX_HEADER_SIZE;

/// Configuration for a [`crate::ServerSocket`]-based listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind the listener to.
    pub bind_addr: SocketAddr,

    /// Maximum number of simultaneous connections the caller should admit.
    ///
    /// `ServerSocket` itself tracks at most one connection at a time (see its
    /// module docs); this bound is for a caller that pools many
    /// `ServerSocket`s or otherwise fans out accepted streams.
    pub max_connections: usize,

    /// Maximum bytes of request-line/header data a [`crate::RequestCodec`]
    /// built from this config will buffer before giving up on a request;
    /// passed to [`crate::RequestCodec::with_max_header_size`].
    pub max_header_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            max_connections: 64,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_binds_to_all_interfaces_on_8080() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.max_header_size, DEFAULT_MAX_HEADER_SIZE);
    }

    #[test]
    fn custom_config_round_trips_fields() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            max_connections: 4,
            max_header_size: 2048,
        };
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.max_header_size, 2048);
    }
}
