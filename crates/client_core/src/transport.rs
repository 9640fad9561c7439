use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
};

use async_trait::async_trait;
use shared::{
    error::ApiError,
    protocol::{ClientMessage, ServerMessage},
};
use tracing::debug;

use crate::error::TransportError;

pub type Listener = Arc<dyn Fn(&ServerMessage) + Send + Sync>;

/// `send` resolves once the engine accepted the command, not when it applied it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: ClientMessage) -> Result<(), TransportError>;
    fn subscribe(&self, listener: Listener) -> Subscription;
    fn is_connected(&self) -> bool;
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

#[derive(Default)]
pub struct ListenerRegistry {
    state: Mutex<RegistryState>,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribe(self: &Arc<Self>, listener: Listener) -> Subscription {
        let mut state = lock(&self.state);
        let id = state.next_id;
        state.next_id += 1;
        state.listeners.push((id, listener));
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    // Iterate a copy so callbacks may unsubscribe, themselves included.
    pub fn dispatch(&self, message: &ServerMessage) -> usize {
        let snapshot: Vec<Listener> = lock(&self.state)
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in &snapshot {
            listener(message);
        }
        snapshot.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) -> bool {
        let mut state = lock(&self.state);
        let before = state.listeners.len();
        state.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != state.listeners.len()
    }
}

/// Dropping the handle keeps the listener attached.
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.id),
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

pub struct MemoryTransport {
    sent: Mutex<Vec<ClientMessage>>,
    rejections: Mutex<HashMap<&'static str, ApiError>>,
    listeners: Arc<ListenerRegistry>,
    connected: AtomicBool,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            rejections: Mutex::new(HashMap::new()),
            listeners: ListenerRegistry::new(),
            connected: AtomicBool::new(true),
        }
    }
}

impl MemoryTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<ClientMessage> {
        lock(&self.sent).clone()
    }

    pub fn take_sent(&self) -> Vec<ClientMessage> {
        std::mem::take(&mut *lock(&self.sent))
    }

    /// Rejects every later command whose `ClientMessage::kind` matches.
    pub fn reject(&self, kind: &'static str, error: ApiError) {
        lock(&self.rejections).insert(kind, error);
    }

    pub fn push(&self, message: &ServerMessage) -> usize {
        self.listeners.dispatch(message)
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, message: ClientMessage) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        if let Some(error) = lock(&self.rejections).get(message.kind()) {
            return Err(TransportError::Rejected(error.clone()));
        }
        debug!(kind = message.kind(), "transport: memory accepted command");
        lock(&self.sent).push(message);
        Ok(())
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.listeners.subscribe(listener)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
