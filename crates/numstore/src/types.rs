//! Request and reply envelopes
//!
//! Field names follow the wire format used by existing clients:
//! `{"jsonrpc": 1.0, "method": "create", "params": [...], "id": 1}` in,
//! `{"id": 1, "ok": true, "msg": "...", "result": "..."}` out.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only protocol version served
pub const PROTOCOL_VERSION: f64 = 1.0;

/// Request envelope
///
/// Every field defaults when absent so that an incomplete request still gets
/// a correlated failure reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    /// Loosely typed protocol version; compared by numeric value
    #[serde(rename = "jsonrpc")]
    pub protocol_version: Value,
    pub method: String,
    pub params: Vec<String>,
    pub id: i64,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            protocol_version: Value::Null,
            method: String::new(),
            params: Vec::new(),
            id: 0,
        }
    }
}

impl Request {
    /// Build a request for the supported protocol version
    pub fn new<I, S>(method: impl Into<String>, params: I, id: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            protocol_version: Value::from(PROTOCOL_VERSION),
            method: method.into(),
            params: params.into_iter().map(Into::into).collect(),
            id,
        }
    }

    /// Override the protocol version (for clients speaking other versions)
    pub fn with_protocol_version(mut self, version: impl Into<Value>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Check the version is numerically equal to 1
    pub fn has_supported_version(&self) -> bool {
        self.protocol_version.as_f64() == Some(PROTOCOL_VERSION)
    }
}

/// Reply envelope
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Reply {
    pub id: i64,
    pub ok: bool,
    pub msg: String,
    pub result: String,
}

impl Reply {
    pub fn success(id: i64, msg: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            id,
            ok: true,
            msg: msg.into(),
            result: result.into(),
        }
    }

    pub fn failure(id: i64, msg: impl Into<String>) -> Self {
        Self {
            id,
            ok: false,
            msg: msg.into(),
            result: String::new(),
        }
    }
}
