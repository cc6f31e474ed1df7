//! Wire frames
//!
//! Envelopes travel inside JSON-RPC 1.0 style frames, one JSON object per
//! line:
//!
//! ```text
//! -> {"method":"NumberStore.Serve","params":[<Request>],"id":7}
//! <- {"id":7,"result":<Reply>,"error":null}
//! ```
//!
//! The frame id is the transport sequence number; the envelope id inside is
//! the caller's own correlation id.

use crate::types::{Reply, Request};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The single service method exposed
pub const SERVICE_METHOD: &str = "NumberStore.Serve";

/// Longest accepted frame line (1MB)
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Frame error types
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("invalid frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rpc: can't find method {0}")]
    UnknownMethod(String),

    #[error("rpc: expected exactly one param, got {0}")]
    ParamCount(usize),
}

/// Request frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

impl RequestFrame {
    /// Wrap an envelope for the service method
    pub fn new(id: u64, request: &Request) -> Result<Self, FrameError> {
        Ok(Self {
            method: SERVICE_METHOD.to_string(),
            params: vec![serde_json::to_value(request)?],
            id,
        })
    }

    /// Unwrap the envelope, checking method and params
    pub fn into_request(self) -> Result<Request, FrameError> {
        if self.method != SERVICE_METHOD {
            return Err(FrameError::UnknownMethod(self.method));
        }
        let count = self.params.len();
        let mut params = self.params.into_iter();
        match (params.next(), count) {
            (Some(envelope), 1) => Ok(serde_json::from_value(envelope)?),
            _ => Err(FrameError::ParamCount(count)),
        }
    }
}

/// Response frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFrame {
    /// `None` when the request line could not be decoded at all
    pub id: Option<u64>,
    pub result: Option<Reply>,
    pub error: Option<String>,
}

impl ResponseFrame {
    pub fn reply(id: u64, reply: Reply) -> Self {
        Self {
            id: Some(id),
            result: Some(reply),
            error: None,
        }
    }

    pub fn error(id: Option<u64>, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(message.into()),
        }
    }

    /// Reply carried by the frame, or the transport error message
    pub fn into_result(self) -> Result<Reply, String> {
        match (self.error, self.result) {
            (Some(error), _) => Err(error),
            (None, Some(reply)) => Ok(reply),
            (None, None) => Err("empty response frame".to_string()),
        }
    }
}

/// Decode one request line into a frame
pub fn decode_request(line: &str) -> Result<RequestFrame, FrameError> {
    Ok(serde_json::from_str(line)?)
}

/// Encode a frame as a single line (without the trailing newline)
pub fn encode<T: Serialize>(frame: &T) -> Result<String, FrameError> {
    Ok(serde_json::to_string(frame)?)
}
