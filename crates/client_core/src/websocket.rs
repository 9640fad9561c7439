use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use shared::{
    domain::RequestId,
    protocol::{ClientEnvelope, ClientMessage, ServerEnvelope},
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::TransportError,
    transport::{lock, Listener, ListenerRegistry, Subscription, Transport},
};

type Waiter = oneshot::Sender<Result<(), TransportError>>;

#[derive(Default)]
struct PendingRequests {
    closed: bool,
    waiters: HashMap<RequestId, Waiter>,
}

impl PendingRequests {
    fn resolve(&mut self, request_id: RequestId, result: Result<(), TransportError>) {
        match self.waiters.remove(&request_id) {
            Some(waiter) => {
                let _ = waiter.send(result);
            }
            None => debug!(
                request_id = request_id.0,
                "transport: reply for unknown request"
            ),
        }
    }

    fn close(&mut self) {
        self.closed = true;
        for (_, waiter) in self.waiters.drain() {
            let _ = waiter.send(Err(TransportError::ConnectionLost));
        }
    }
}

// A single writer task keeps outbound frames in `send` order.
pub struct WebSocketTransport {
    outbound: mpsc::UnboundedSender<Message>,
    pending: Arc<Mutex<PendingRequests>>,
    listeners: Arc<ListenerRegistry>,
    next_request_id: AtomicU64,
    tasks: Vec<JoinHandle<()>>,
}

pub fn engine_ws_url(raw: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(raw.trim()).map_err(|err| TransportError::InvalidUrl(err.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme '{other}', expected http(s) or ws(s)"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| TransportError::InvalidUrl(format!("cannot use scheme {scheme}")))?;
    if url.path().is_empty() || url.path() == "/" {
        url.set_path("/ws");
    }
    Ok(url)
}

impl WebSocketTransport {
    pub async fn connect(server_url: &str) -> Result<Arc<Self>, TransportError> {
        let url = engine_ws_url(server_url)?;
        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|err| TransportError::Connect(format!("{url}: {err}")))?;
        info!(url = %url, "transport: websocket connected");

        let (mut writer, mut reader) = stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let pending = Arc::new(Mutex::new(PendingRequests::default()));
        let listeners = ListenerRegistry::new();

        let writer_pending = Arc::clone(&pending);
        let writer_task = tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let closing = matches!(frame, Message::Close(_));
                if let Err(err) = writer.send(frame).await {
                    warn!("transport: websocket send failed: {err}");
                    break;
                }
                if closing {
                    break;
                }
            }
            lock(&writer_pending).close();
        });

        let reader_pending = Arc::clone(&pending);
        let reader_listeners = Arc::clone(&listeners);
        let reader_task = tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        handle_frame(&text, &reader_pending, &reader_listeners)
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!("transport: websocket receive failed: {err}");
                        break;
                    }
                }
            }
            lock(&reader_pending).close();
            info!("transport: websocket closed");
        });

        Ok(Arc::new(Self {
            outbound,
            pending,
            listeners,
            next_request_id: AtomicU64::new(1),
            tasks: vec![writer_task, reader_task],
        }))
    }

    /// Sends a close frame and fails every outstanding call.
    pub fn disconnect(&self) {
        let _ = self.outbound.send(Message::Close(None));
        lock(&self.pending).close();
    }
}

fn handle_frame(text: &str, pending: &Mutex<PendingRequests>, listeners: &ListenerRegistry) {
    match serde_json::from_str::<ServerEnvelope>(text) {
        Ok(ServerEnvelope::Ack { request_id }) => lock(pending).resolve(request_id, Ok(())),
        Ok(ServerEnvelope::Rejected { request_id, error }) => {
            warn!(
                request_id = request_id.0,
                code = ?error.code,
                "transport: engine rejected request: {}",
                error.message
            );
            lock(pending).resolve(request_id, Err(TransportError::Rejected(error)));
        }
        Ok(ServerEnvelope::Push(message)) => {
            listeners.dispatch(&message);
        }
        Err(err) => warn!("transport: invalid server frame: {err}"),
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, message: ClientMessage) -> Result<(), TransportError> {
        let kind = message.kind();
        let request_id = RequestId(self.next_request_id.fetch_add(1, Ordering::SeqCst));
        let frame = serde_json::to_string(&ClientEnvelope {
            request_id,
            message,
        })
        .map_err(|err| TransportError::Encode(err.to_string()))?;

        let (waiter, reply) = oneshot::channel();
        {
            let mut pending = lock(&self.pending);
            if pending.closed {
                return Err(TransportError::NotConnected);
            }
            pending.waiters.insert(request_id, waiter);
        }

        if self.outbound.send(Message::Text(frame)).is_err() {
            lock(&self.pending).waiters.remove(&request_id);
            return Err(TransportError::NotConnected);
        }
        debug!(request_id = request_id.0, kind, "transport: command sent");

        reply.await.unwrap_or(Err(TransportError::ConnectionLost))
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.listeners.subscribe(listener)
    }

    fn is_connected(&self) -> bool {
        !lock(&self.pending).closed
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        lock(&self.pending).close();
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/websocket_tests.rs"]
mod tests;
