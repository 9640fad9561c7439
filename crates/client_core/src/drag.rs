use shared::{
    domain::{FrameId, LineId},
    protocol::ClientMessage,
    scene::Frame,
    timing::ActionTiming,
};
use tracing::debug;

pub const DEFAULT_DRAG_THRESHOLD: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerPosition {
    pub x: f32,
    pub y: f32,
}

impl PointerPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &PointerPosition) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraggedFrame {
    pub line_index: LineId,
    pub frame_index: FrameId,
    pub frame_data: Frame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropTarget {
    pub line_index: LineId,
    pub insert_index: FrameId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragPreview {
    pub position: PointerPosition,
    pub label: Option<String>,
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub is_dragging: bool,
    pub dragged_frame: Option<DraggedFrame>,
    pub drop_target: Option<DropTarget>,
    pub drag_preview: Option<DragPreview>,
    pub drag_threshold: f32,
    pub drag_start_position: Option<PointerPosition>,
}

impl DragState {
    pub fn idle(drag_threshold: f32) -> Self {
        Self {
            is_dragging: false,
            dragged_frame: None,
            drop_target: None,
            drag_preview: None,
            drag_threshold,
            drag_start_position: None,
        }
    }
}

impl Default for DragState {
    fn default() -> Self {
        Self::idle(DEFAULT_DRAG_THRESHOLD)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Pending,
    Dragging,
}

/// A committed move, expressed as remove-then-insert on the same beat.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMove {
    pub source_line: LineId,
    pub source_frame: FrameId,
    pub target_line: LineId,
    /// Insert position once the source slot has been removed.
    pub insert_index: FrameId,
    pub frame: Frame,
}

impl FrameMove {
    pub const TIMING: ActionTiming = ActionTiming::AtNextBeat;

    pub fn commands(&self) -> [ClientMessage; 2] {
        [
            ClientMessage::RemoveFrame {
                line_id: self.source_line,
                frame_id: self.source_frame,
                timing: Self::TIMING,
            },
            ClientMessage::AddFrame {
                line_id: self.target_line,
                frame_id: self.insert_index,
                frame: self.frame.clone(),
                timing: Self::TIMING,
            },
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    NothingPressed,
    BelowThreshold,
    NoDropTarget,
    SourcePosition,
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    Committed(FrameMove),
    Cancelled(CancelReason),
}

#[derive(Debug, Clone, Default)]
pub struct DragPlanner {
    state: DragState,
}

impl DragPlanner {
    pub fn new(drag_threshold: f32) -> Self {
        Self {
            state: DragState::idle(drag_threshold),
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn phase(&self) -> DragPhase {
        match (&self.state.dragged_frame, self.state.is_dragging) {
            (None, _) => DragPhase::Idle,
            (Some(_), false) => DragPhase::Pending,
            (Some(_), true) => DragPhase::Dragging,
        }
    }

    pub fn press(
        &mut self,
        line_index: LineId,
        frame_index: FrameId,
        frame_data: Frame,
        position: PointerPosition,
    ) {
        self.reset();
        self.state.dragged_frame = Some(DraggedFrame {
            line_index,
            frame_index,
            frame_data,
        });
        self.state.drag_start_position = Some(position);
    }

    pub fn pointer_moved(&mut self, position: PointerPosition) -> bool {
        let (Some(start), Some(dragged)) =
            (self.state.drag_start_position, &self.state.dragged_frame)
        else {
            return false;
        };

        if !self.state.is_dragging && start.distance_to(&position) > self.state.drag_threshold {
            self.state.is_dragging = true;
            debug!(
                line_id = dragged.line_index.0,
                frame_id = dragged.frame_index.0,
                "drag: started"
            );
        }
        if self.state.is_dragging {
            self.state.drag_preview = Some(DragPreview {
                position,
                label: dragged.frame_data.name.clone(),
                duration: dragged.frame_data.duration,
            });
        }
        self.state.is_dragging
    }

    pub fn enter_drop_zone(&mut self, target: DropTarget) {
        if self.state.dragged_frame.is_some() {
            self.state.drop_target = Some(target);
        }
    }

    pub fn leave_drop_zone(&mut self, target: DropTarget) {
        if self.state.drop_target == Some(target) {
            self.state.drop_target = None;
        }
    }

    pub fn release(&mut self) -> DragOutcome {
        let threshold = self.state.drag_threshold;
        let state = std::mem::replace(&mut self.state, DragState::idle(threshold));
        let outcome = plan(state);
        match &outcome {
            DragOutcome::Committed(planned) => debug!(
                source_line = planned.source_line.0,
                source_frame = planned.source_frame.0,
                target_line = planned.target_line.0,
                insert_index = planned.insert_index.0,
                "drag: committed"
            ),
            DragOutcome::Cancelled(reason) => debug!(?reason, "drag: cancelled"),
        }
        outcome
    }

    pub fn cancel(&mut self) -> DragOutcome {
        self.reset();
        DragOutcome::Cancelled(CancelReason::Aborted)
    }

    fn reset(&mut self) {
        self.state = DragState::idle(self.state.drag_threshold);
    }
}

fn plan(state: DragState) -> DragOutcome {
    let Some(dragged) = state.dragged_frame else {
        return DragOutcome::Cancelled(CancelReason::NothingPressed);
    };
    if !state.is_dragging {
        return DragOutcome::Cancelled(CancelReason::BelowThreshold);
    }
    let Some(target) = state.drop_target else {
        return DragOutcome::Cancelled(CancelReason::NoDropTarget);
    };

    let source = dragged.frame_index.0;
    let mut insert = target.insert_index.0;
    if target.line_index == dragged.line_index {
        // Inserting right before or right after itself leaves the line unchanged.
        if insert == source || insert == source + 1 {
            return DragOutcome::Cancelled(CancelReason::SourcePosition);
        }
        if insert > source {
            insert -= 1;
        }
    }

    DragOutcome::Committed(FrameMove {
        source_line: dragged.line_index,
        source_frame: dragged.frame_index,
        target_line: target.line_index,
        insert_index: FrameId(insert),
        frame: dragged.frame_data,
    })
}

#[cfg(test)]
#[path = "tests/drag_tests.rs"]
mod tests;
