use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context, Result};
use shared::{
    protocol::ServerMessage,
    scene::Snapshot,
    timing::ActionTiming,
};
use tokio::sync::oneshot;
use tracing::info;

pub mod compilation;
pub mod dispatcher;
pub mod drag;
pub mod error;
pub mod persistence;
pub mod transport;
pub mod websocket;

pub use compilation::{CompilationStatus, CompilationStatusTracker, RECENT_SUCCESS_WINDOW};
pub use dispatcher::{CommandDispatcher, DispatchResult};
pub use drag::{
    CancelReason, DragOutcome, DragPhase, DragPlanner, DragState, DropTarget, FrameMove,
    PointerPosition, DEFAULT_DRAG_THRESHOLD,
};
pub use error::{DispatchError, TransportError};
pub use persistence::{validate_project_name, MemoryProjectStore, ProjectStore};
pub use transport::{Listener, ListenerRegistry, MemoryTransport, Subscription, Transport};
pub use websocket::{engine_ws_url, WebSocketTransport};

use transport::lock;

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub drag_threshold: f32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            drag_threshold: DEFAULT_DRAG_THRESHOLD,
        }
    }
}

pub struct EngineSession {
    transport: Arc<dyn Transport>,
    dispatcher: CommandDispatcher,
    compilation: Arc<Mutex<CompilationStatusTracker>>,
    compilation_subscription: Subscription,
    drag: DragPlanner,
}

impl EngineSession {
    pub async fn connect(server_url: &str, options: SessionOptions) -> Result<Self, TransportError> {
        let transport = WebSocketTransport::connect(server_url).await?;
        Ok(Self::new(transport, options))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self::new(transport, SessionOptions::default())
    }

    pub fn new(transport: Arc<dyn Transport>, options: SessionOptions) -> Self {
        let compilation = Arc::new(Mutex::new(CompilationStatusTracker::new()));
        let tracker = Arc::clone(&compilation);
        let compilation_subscription =
            transport.subscribe(Arc::new(move |message: &ServerMessage| {
                if matches!(
                    message,
                    ServerMessage::ScriptCompiled { .. } | ServerMessage::CompilationErrorOccurred(_)
                ) {
                    lock(&tracker).observe(message, Instant::now());
                }
            }));

        Self {
            dispatcher: CommandDispatcher::new(Arc::clone(&transport)),
            transport,
            compilation,
            compilation_subscription,
            drag: DragPlanner::new(options.drag_threshold),
        }
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn subscribe(&self, listener: Listener) -> Subscription {
        self.transport.subscribe(listener)
    }

    pub fn compilation_status(&self, now: Instant) -> CompilationStatus {
        lock(&self.compilation).status(now)
    }

    pub fn compilation_tracker(&self) -> CompilationStatusTracker {
        lock(&self.compilation).clone()
    }

    pub fn drag(&self) -> &DragPlanner {
        &self.drag
    }

    pub fn drag_mut(&mut self) -> &mut DragPlanner {
        &mut self.drag
    }

    /// Stops at the first failed send.
    pub async fn commit_drag(&mut self) -> Result<DragOutcome, DispatchError> {
        let outcome = self.drag.release();
        if let DragOutcome::Committed(planned) = &outcome {
            self.dispatcher
                .remove_frame(
                    planned.source_line,
                    planned.source_frame,
                    Some(FrameMove::TIMING),
                )
                .await?;
            self.dispatcher
                .add_frame(
                    planned.target_line,
                    planned.insert_index,
                    planned.frame.clone(),
                    Some(FrameMove::TIMING),
                )
                .await?;
        }
        Ok(outcome)
    }

    pub fn cancel_drag(&mut self) -> DragOutcome {
        self.drag.cancel()
    }

    pub async fn restore_snapshot(&self, snapshot: &Snapshot) -> Result<(), DispatchError> {
        self.dispatcher
            .set_tempo(snapshot.tempo, Some(ActionTiming::Immediate))
            .await?;
        self.dispatcher
            .set_scene(snapshot.scene.clone(), Some(ActionTiming::Immediate))
            .await
    }

    /// Requests a snapshot and waits up to `wait` for the engine to push it.
    pub async fn capture_snapshot(&self, wait: Duration) -> Result<Snapshot> {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let subscription = self.transport.subscribe(Arc::new(move |message: &ServerMessage| {
            if let ServerMessage::Snapshot(snapshot) = message {
                if let Some(tx) = lock(&tx).take() {
                    let _ = tx.send(snapshot.clone());
                }
            }
        }));

        let result = self.await_snapshot(rx, wait).await;
        subscription.unsubscribe();
        result
    }

    async fn await_snapshot(
        &self,
        rx: oneshot::Receiver<Snapshot>,
        wait: Duration,
    ) -> Result<Snapshot> {
        self.dispatcher.get_snapshot().await?;
        tokio::time::timeout(wait, rx)
            .await
            .map_err(|_| anyhow!("engine did not push a snapshot within {wait:?}"))?
            .context("snapshot listener dropped")
    }

    pub async fn save_project(
        &self,
        store: &dyn ProjectStore,
        name: &str,
        wait: Duration,
    ) -> Result<()> {
        let snapshot = self.capture_snapshot(wait).await?;
        store.save_project(name, &snapshot).await?;
        info!(project = name, "session: project saved");
        Ok(())
    }

    pub async fn load_project(&self, store: &dyn ProjectStore, name: &str) -> Result<()> {
        let snapshot = store
            .load_project(name)
            .await
            .with_context(|| format!("failed to load project '{name}'"))?;
        self.restore_snapshot(&snapshot).await?;
        info!(project = name, "session: project restored");
        Ok(())
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.compilation_subscription.unsubscribe();
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
