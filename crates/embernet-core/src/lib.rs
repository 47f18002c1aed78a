//! Shared error vocabulary for the `embernet` workspace's ambient crates.

mod error;

pub use error::{Error, Result};
