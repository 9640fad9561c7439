use std::time::{Duration, Instant};

use shared::protocol::{CompilationErrorDetails, ServerMessage};
use tracing::{debug, info};

/// How long a success keeps reading as `RecentSuccess`.
pub const RECENT_SUCCESS_WINDOW: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilationStatus {
    Ready,
    CompilationError(CompilationErrorDetails),
    RecentSuccess { since: Instant },
}

#[derive(Debug, Clone, Default)]
pub struct CompilationStatusTracker {
    last_success: Option<Instant>,
    current_error: Option<CompilationErrorDetails>,
}

impl CompilationStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, at: Instant) {
        self.last_success = Some(at);
        self.current_error = None;
    }

    pub fn record_error(&mut self, details: CompilationErrorDetails) {
        self.current_error = Some(details);
    }

    pub fn observe(&mut self, message: &ServerMessage, now: Instant) -> bool {
        match message {
            ServerMessage::ScriptCompiled { line_id, frame_id } => {
                debug!(
                    line_id = line_id.0,
                    frame_id = frame_id.0,
                    "compilation: script compiled"
                );
                self.record_success(now);
                true
            }
            ServerMessage::CompilationErrorOccurred(details) => {
                info!(
                    lang = %details.lang,
                    from = details.from,
                    to = details.to,
                    "compilation: {}",
                    details.info
                );
                self.record_error(details.clone());
                true
            }
            _ => false,
        }
    }

    pub fn current_error(&self) -> Option<&CompilationErrorDetails> {
        self.current_error.as_ref()
    }

    pub fn last_success(&self) -> Option<Instant> {
        self.last_success
    }

    pub fn status(&self, now: Instant) -> CompilationStatus {
        if let Some(details) = &self.current_error {
            return CompilationStatus::CompilationError(details.clone());
        }
        match self.last_success {
            Some(since) if now.saturating_duration_since(since) <= RECENT_SUCCESS_WINDOW => {
                CompilationStatus::RecentSuccess { since }
            }
            _ => CompilationStatus::Ready,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::{FrameId, LineId};

    fn details(info: &str) -> CompilationErrorDetails {
        CompilationErrorDetails {
            lang: "bali".into(),
            from: 4,
            to: 11,
            info: info.into(),
            line_id: Some(LineId(0)),
            frame_id: Some(FrameId(1)),
        }
    }

    #[test]
    fn fresh_tracker_is_ready() {
        let tracker = CompilationStatusTracker::new();
        assert_eq!(tracker.status(Instant::now()), CompilationStatus::Ready);
    }

    #[test]
    fn success_decays_to_ready_after_window() {
        let start = Instant::now();
        let mut tracker = CompilationStatusTracker::new();
        tracker.record_success(start);

        assert_eq!(
            tracker.status(start + Duration::from_millis(4000)),
            CompilationStatus::RecentSuccess { since: start }
        );
        assert_eq!(
            tracker.status(start + Duration::from_millis(6000)),
            CompilationStatus::Ready
        );
        // Reading is side-effect free: an earlier clock still sees the success.
        assert_eq!(
            tracker.status(start + Duration::from_millis(1000)),
            CompilationStatus::RecentSuccess { since: start }
        );
    }

    #[test]
    fn error_is_retained_until_a_newer_success() {
        let start = Instant::now();
        let mut tracker = CompilationStatusTracker::new();
        let message = ServerMessage::CompilationErrorOccurred(details("unexpected ')'"));
        assert!(tracker.observe(&message, start));

        let later = start + Duration::from_secs(60);
        assert_eq!(
            tracker.status(later),
            CompilationStatus::CompilationError(details("unexpected ')'"))
        );

        tracker.record_error(details("unknown word"));
        assert_eq!(
            tracker.current_error().map(|d| d.info.as_str()),
            Some("unknown word")
        );

        let compiled = ServerMessage::ScriptCompiled {
            line_id: LineId(0),
            frame_id: FrameId(1),
        };
        assert!(tracker.observe(&compiled, later));
        assert_eq!(
            tracker.status(later + Duration::from_millis(10)),
            CompilationStatus::RecentSuccess { since: later }
        );
        assert!(tracker.current_error().is_none());
    }

    #[test]
    fn unrelated_messages_leave_status_alone() {
        let mut tracker = CompilationStatusTracker::new();
        assert!(!tracker.observe(&ServerMessage::TransportStarted, Instant::now()));
        assert_eq!(tracker.last_success(), None);
    }
}
