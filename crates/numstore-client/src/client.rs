//! Number store client implementation
//!
//! One TCP connection carries any number of in-flight calls. A background
//! reader routes each response frame to its caller by frame sequence number,
//! so replies may arrive in any order.

use futures::{SinkExt, StreamExt};
use numstore::protocol::{self, RequestFrame, ResponseFrame, MAX_FRAME_LEN};
use numstore::{ArithOp, Reply, Request};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, warn};

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] LinesCodecError),

    #[error("Frame error: {0}")]
    Frame(#[from] protocol::FrameError),

    #[error("Server error: {0}")]
    Rpc(String),

    #[error("Connection closed")]
    Closed,
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Reply, ClientError>>>>>;

/// A call submitted with [`NumberClient::go`] whose reply is collected later
pub struct PendingCall {
    seq: u64,
    receiver: oneshot::Receiver<Result<Reply, ClientError>>,
}

impl PendingCall {
    /// Transport sequence number of the call
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Wait for the reply
    pub async fn wait(self) -> Result<Reply, ClientError> {
        self.receiver.await.map_err(|_| ClientError::Closed)?
    }
}

/// Number store client
pub struct NumberClient {
    writer: AsyncMutex<FramedWrite<OwnedWriteHalf, LinesCodec>>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    next_seq: AtomicU64,
    next_id: AtomicI64,
    reader: JoinHandle<()>,
}

impl NumberClient {
    /// Connect to a number store server
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        let (read_half, write_half) = stream.into_split();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let lines = FramedRead::new(read_half, LinesCodec::new_with_max_length(MAX_FRAME_LEN));
        let reader = tokio::spawn(read_responses(lines, pending.clone(), closed.clone()));

        Ok(Self {
            writer: AsyncMutex::new(FramedWrite::new(write_half, LinesCodec::new())),
            pending,
            closed,
            next_seq: AtomicU64::new(1),
            next_id: AtomicI64::new(1),
            reader,
        })
    }

    /// Build a protocol-1 request with the next envelope id
    pub fn request<I, S>(&self, method: &str, params: I) -> Request
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Request::new(method, params, id)
    }

    /// Submit a request without waiting for its reply
    pub async fn go(&self, request: &Request) -> Result<PendingCall, ClientError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let line = protocol::encode(&RequestFrame::new(seq, request)?)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(seq, tx);

        // The reader drains the table once it stops; a call registered after
        // that would never be answered
        if self.closed.load(Ordering::SeqCst) {
            self.pending.lock().remove(&seq);
            return Err(ClientError::Closed);
        }

        let sent = self.writer.lock().await.send(line).await;
        if let Err(e) = sent {
            self.pending.lock().remove(&seq);
            return Err(e.into());
        }

        Ok(PendingCall { seq, receiver: rx })
    }

    /// Submit a request and wait for its reply
    pub async fn call(&self, request: &Request) -> Result<Reply, ClientError> {
        self.go(request).await?.wait().await
    }

    /// Create a named number
    pub async fn create(&self, name: &str, literal: &str) -> Result<Reply, ClientError> {
        self.call(&self.request("create", [name, literal])).await
    }

    /// Update an existing named number
    pub async fn set(&self, name: &str, literal: &str) -> Result<Reply, ClientError> {
        self.call(&self.request("set", [name, literal])).await
    }

    /// Delete a named number
    pub async fn delete(&self, name: &str) -> Result<Reply, ClientError> {
        self.call(&self.request("delete", [name])).await
    }

    /// Combine two operands, each a stored name or a literal
    pub async fn calc(&self, op: ArithOp, a: &str, b: &str) -> Result<Reply, ClientError> {
        self.call(&self.request(op.as_str(), [a, b])).await
    }
}

impl Drop for NumberClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_responses(
    mut lines: FramedRead<OwnedReadHalf, LinesCodec>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
) {
    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read response: {}", e);
                break;
            }
        };

        let frame: ResponseFrame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Malformed response frame: {}", e);
                continue;
            }
        };

        let Some(seq) = frame.id else {
            warn!("Uncorrelated server error: {:?}", frame.error);
            continue;
        };

        match pending.lock().remove(&seq) {
            Some(tx) => {
                let _ = tx.send(frame.into_result().map_err(ClientError::Rpc));
            }
            None => debug!(seq, "Response for unknown call"),
        }
    }

    closed.store(true, Ordering::SeqCst);
    for (_, tx) in pending.lock().drain() {
        let _ = tx.send(Err(ClientError::Closed));
    }
}
