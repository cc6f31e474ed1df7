//! TCP client for the numstore server
//!
//! Async client supporting both blocking-style calls and pipelined
//! submission with out-of-order reply collection.

mod client;

pub use client::{ClientError, NumberClient, PendingCall};
pub use numstore::{ArithOp, Reply, Request};
