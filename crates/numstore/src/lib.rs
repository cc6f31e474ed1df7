//! Network-accessible store of named arbitrary-precision decimals
//!
//! # Features
//! - Sharded storage engine with per-name serialization
//! - Sliding TTL with lazy expiration on read and a background sweep
//! - Operands resolved as stored names or inline literals
//! - Envelope dispatcher that turns every failure into a correlated reply

pub mod arith;
pub mod config;
pub mod decimal;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod resolver;
pub mod sweeper;
pub mod types;

pub use arith::ArithOp;
pub use config::StoreConfig;
pub use decimal::{Decimal, DecimalError};
pub use dispatch::{Dispatcher, Method};
pub use engine::NumberStore;
pub use error::{ArithmeticError, DispatchError, OperandError, StoreError};
pub use sweeper::ExpirationSweeper;
pub use types::{Reply, Request, PROTOCOL_VERSION};
