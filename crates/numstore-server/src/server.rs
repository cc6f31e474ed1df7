//! TCP server implementation

use futures::{SinkExt, StreamExt};
use numstore::protocol::{self, ResponseFrame, MAX_FRAME_LEN};
use numstore::{Dispatcher, NumberStore, Reply};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};

/// Replies buffered per connection before request tasks wait on the writer
const RESPONSE_QUEUE_DEPTH: usize = 256;

/// Requests a connection may have in flight before reading pauses
const MAX_IN_FLIGHT: usize = 256;

/// Pause after a failed accept (e.g. file descriptor exhaustion)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] LinesCodecError),

    #[error("Frame error: {0}")]
    Frame(#[from] protocol::FrameError),

    #[error("Task error: {0}")]
    Task(String),
}

/// Number store server
pub struct NumberServer {
    dispatcher: Arc<Dispatcher>,
}

impl NumberServer {
    /// Create a server around a configured dispatcher
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Create a server with default dispatch settings
    pub fn with_store(store: Arc<NumberStore>) -> Self {
        Self::new(Dispatcher::new(store))
    }

    /// Bind the listener
    pub async fn bind(self, addr: SocketAddr) -> Result<BoundServer, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(BoundServer {
            listener,
            dispatcher: self.dispatcher,
        })
    }
}

/// A server with a bound listener, ready to accept
pub struct BoundServer {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
}

impl BoundServer {
    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, one task per connection
    pub async fn run(self) -> Result<(), ServerError> {
        info!("Server listening on {}", self.local_addr()?);

        loop {
            let (socket, peer_addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            let dispatcher = self.dispatcher.clone();

            tokio::spawn(async move {
                debug!("New connection from {}", peer_addr);
                if let Err(e) = handle_connection(socket, dispatcher).await {
                    warn!("Connection error from {}: {}", peer_addr, e);
                }
                debug!("Connection closed: {}", peer_addr);
            });
        }
    }
}

async fn handle_connection(socket: TcpStream, dispatcher: Arc<Dispatcher>) -> Result<(), ServerError> {
    // Disable Nagle's algorithm for lower latency
    socket.set_nodelay(true)?;

    let (reader, writer) = socket.into_split();
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_FRAME_LEN));
    let mut sink = FramedWrite::new(writer, LinesCodec::new());

    // Replies may complete out of order; a single writer serializes them
    let (tx, mut rx) = mpsc::channel::<ResponseFrame>(RESPONSE_QUEUE_DEPTH);
    let writer_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let mut line = protocol::encode(&frame)?;
            // Peers drop the connection on lines they cannot buffer
            if line.len() > MAX_FRAME_LEN {
                warn!(seq = ?frame.id, len = line.len(), "Response exceeds frame limit");
                line = protocol::encode(&ResponseFrame::error(frame.id, "response exceeds frame limit"))?;
            }
            sink.send(line).await?;
        }
        Ok::<(), ServerError>(())
    });

    let in_flight = Arc::new(Semaphore::new(MAX_IN_FLIGHT));

    while let Some(line) = lines.next().await {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let frame = match protocol::decode_request(&line) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Undecodable frame: {}", e);
                send(&tx, ResponseFrame::error(None, e.to_string())).await;
                continue;
            }
        };

        let seq = frame.id;
        let request = match frame.into_request() {
            Ok(request) => request,
            Err(e) => {
                debug!(seq, "Rejected frame: {}", e);
                send(&tx, ResponseFrame::error(Some(seq), e.to_string())).await;
                continue;
            }
        };

        // Held until the reply is queued, so a peer that stops reading
        // stalls its own connection only
        let Ok(permit) = in_flight.clone().acquire_owned().await else {
            break;
        };

        let dispatcher = dispatcher.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let id = request.id;
            // Arithmetic on large operands is CPU-bound
            let reply = match tokio::task::spawn_blocking(move || dispatcher.serve(&request)).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!(seq, "Request task failed: {}", e);
                    Reply::failure(id, "internal server error")
                }
            };
            send(&tx, ResponseFrame::reply(seq, reply)).await;
            drop(permit);
        });
    }

    // Writer drains once every in-flight request task has replied
    drop(tx);
    match writer_task.await {
        Ok(result) => result,
        Err(e) => Err(ServerError::Task(e.to_string())),
    }
}

async fn send(tx: &mpsc::Sender<ResponseFrame>, frame: ResponseFrame) {
    if tx.send(frame).await.is_err() {
        debug!("Response dropped, connection writer gone");
    }
}
