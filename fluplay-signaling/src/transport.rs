//! Transport seam and the WebSocket implementation
//!
//! The player's handlers run to completion and must never wait on the
//! network, so a [`Transport`] only queues outgoing frames. Everything the
//! socket observes comes back as [`ConnectionEvent`]s through the dispatch
//! queue.
//!
//! [`ConnectionEvent`]: fluplay_core::ConnectionEvent

use bytes::Bytes;
use fluplay_core::{ConnectionEventKind, ConnectionId, Dispatcher, FluError, WireMessage};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Sending half of one socket
pub trait Transport: Send {
    /// Queue a text frame
    fn send_text(&mut self, text: &str) -> Result<(), FluError>;

    /// Start closing; a `Close` event follows
    fn close(&mut self);
}

/// Factory for transports
pub trait Connector: Send {
    /// Open socket `id` to `url` after waiting `delay`
    ///
    /// Must return without blocking. Open, message, error and close
    /// notifications are reported through `dispatcher` tagged with `id`.
    fn connect(
        &mut self,
        id: ConnectionId,
        url: &str,
        delay: Duration,
        dispatcher: Dispatcher,
    ) -> Result<Box<dyn Transport>, FluError>;
}

/// Default timeout for the WebSocket handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connector opening WebSockets on a tokio runtime
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    runtime: tokio::runtime::Handle,
    connect_timeout: Duration,
}

impl WebSocketConnector {
    /// Create a connector bound to the current tokio runtime
    pub fn new() -> Result<Self, FluError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| FluError::Initialization {
                reason: format!("WebSocket connector needs a tokio runtime: {}", e),
            })?;
        Ok(Self::with_handle(runtime))
    }

    /// Create a connector spawning onto `runtime`
    pub fn with_handle(runtime: tokio::runtime::Handle) -> Self {
        Self {
            runtime,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set the handshake timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Connector for WebSocketConnector {
    fn connect(
        &mut self,
        id: ConnectionId,
        url: &str,
        delay: Duration,
        dispatcher: Dispatcher,
    ) -> Result<Box<dyn Transport>, FluError> {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let task = self.runtime.spawn(run_socket(
            id,
            url.to_string(),
            delay,
            self.connect_timeout,
            outgoing_rx,
            dispatcher,
        ));
        Ok(Box::new(WebSocketTransport {
            id,
            outgoing: outgoing_tx,
            task,
        }))
    }
}

#[derive(Debug)]
enum Outgoing {
    Text(String),
    Close,
}

#[derive(Debug)]
struct WebSocketTransport {
    id: ConnectionId,
    outgoing: mpsc::UnboundedSender<Outgoing>,
    task: JoinHandle<()>,
}

impl Transport for WebSocketTransport {
    fn send_text(&mut self, text: &str) -> Result<(), FluError> {
        self.outgoing
            .send(Outgoing::Text(text.to_string()))
            .map_err(|_| FluError::Transport {
                reason: format!("socket {} task has exited", self.id),
            })
    }

    fn close(&mut self) {
        let _ = self.outgoing.send(Outgoing::Close);
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if !self.task.is_finished() {
            let _ = self.outgoing.send(Outgoing::Close);
        }
    }
}

/// Socket task: connect, then pump frames both ways until either side closes
///
/// Always finishes by dispatching exactly one `Close` for `id`.
async fn run_socket(
    id: ConnectionId,
    url: String,
    delay: Duration,
    connect_timeout: Duration,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    dispatcher: Dispatcher,
) {
    if !delay.is_zero() {
        debug!("socket {} waiting {:?} before connecting", id, delay);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = wait_for_close(&mut outgoing) => {
                dispatcher.connection(id, ConnectionEventKind::Close);
                return;
            }
        }
    }

    let handshake = tokio::time::timeout(connect_timeout, connect_async(url.as_str()));
    let ws_stream = tokio::select! {
        result = handshake => match result {
            Ok(Ok((ws_stream, _))) => ws_stream,
            Ok(Err(e)) => {
                dispatcher.connection(id, ConnectionEventKind::Error(format!("WebSocket connection failed: {}", e)));
                dispatcher.connection(id, ConnectionEventKind::Close);
                return;
            }
            Err(_) => {
                dispatcher.connection(id, ConnectionEventKind::Error("WebSocket connection timeout".to_string()));
                dispatcher.connection(id, ConnectionEventKind::Close);
                return;
            }
        },
        _ = wait_for_close(&mut outgoing) => {
            dispatcher.connection(id, ConnectionEventKind::Close);
            return;
        }
    };

    info!("socket {} connected to {}", id, url);
    dispatcher.connection(id, ConnectionEventKind::Open);

    let (mut write, mut read) = ws_stream.split();
    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Binary(data))) => {
                    dispatcher.connection(id, ConnectionEventKind::Message(WireMessage::Binary(Bytes::from(data))));
                }
                Some(Ok(Message::Text(text))) => {
                    dispatcher.connection(id, ConnectionEventKind::Message(WireMessage::Text(text)));
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!("socket {} closed by peer", id);
                    break;
                }
                Some(Ok(_)) => {
                    // Ping, Pong and raw frames carry nothing for the player
                }
                Some(Err(e)) => {
                    dispatcher.connection(id, ConnectionEventKind::Error(e.to_string()));
                    break;
                }
            },
            command = outgoing.recv() => match command {
                Some(Outgoing::Text(text)) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        dispatcher.connection(id, ConnectionEventKind::Error(e.to_string()));
                        break;
                    }
                }
                Some(Outgoing::Close) | None => {
                    if let Err(e) = write.close().await {
                        warn!("socket {} close handshake failed: {}", id, e);
                    }
                    break;
                }
            },
        }
    }

    dispatcher.connection(id, ConnectionEventKind::Close);
}

/// Resolves once a close is requested; text queued before the socket is open
/// is discarded, matching a send on a socket that is not open yet
async fn wait_for_close(outgoing: &mut mpsc::UnboundedReceiver<Outgoing>) {
    loop {
        match outgoing.recv().await {
            Some(Outgoing::Text(text)) => {
                warn!("dropping {:?}: socket not open", text);
            }
            Some(Outgoing::Close) | None => return,
        }
    }
}
