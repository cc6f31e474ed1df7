//! TCP server for the numstore decimal store
//!
//! Speaks line-delimited JSON-RPC frames; see `numstore::protocol`.

mod server;

pub use server::{BoundServer, NumberServer, ServerError};
