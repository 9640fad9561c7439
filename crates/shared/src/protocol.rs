use serde::{Deserialize, Serialize};

use crate::{
    domain::{ClockState, DeviceInfo, DeviceSlot, FrameId, LineId, RequestId},
    error::{ApiError, ProtocolError},
    scene::{Frame, Line, Sanitize, Scene, Snapshot},
    timing::ActionTiming,
};

/// Commands sent to the engine. Scene and clock mutations carry a timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    TransportStart {
        timing: ActionTiming,
    },
    TransportStop {
        timing: ActionTiming,
    },
    SetTempo {
        tempo: f64,
        timing: ActionTiming,
    },
    GetScene,
    SetScene {
        scene: Scene,
        timing: ActionTiming,
    },
    SetSceneLength {
        length: u64,
        timing: ActionTiming,
    },
    GetLine {
        line_id: LineId,
    },
    SetLines {
        lines: Vec<(LineId, Line)>,
        timing: ActionTiming,
    },
    ConfigureLines {
        lines: Vec<(LineId, Line)>,
        timing: ActionTiming,
    },
    AddLine {
        line_id: LineId,
        line: Line,
        timing: ActionTiming,
    },
    RemoveLine {
        line_id: LineId,
        timing: ActionTiming,
    },
    GetFrame {
        line_id: LineId,
        frame_id: FrameId,
    },
    GetScript {
        line_id: LineId,
        frame_id: FrameId,
    },
    SetFrame {
        line_id: LineId,
        frame_id: FrameId,
        frame: Frame,
        timing: ActionTiming,
    },
    SetFrames {
        frames: Vec<(LineId, FrameId, Frame)>,
        timing: ActionTiming,
    },
    AddFrame {
        line_id: LineId,
        frame_id: FrameId,
        frame: Frame,
        timing: ActionTiming,
    },
    AddFrames {
        frames: Vec<(LineId, FrameId, Frame)>,
        timing: ActionTiming,
    },
    RemoveFrame {
        line_id: LineId,
        frame_id: FrameId,
        timing: ActionTiming,
    },
    RemoveFrames {
        frames: Vec<(LineId, FrameId)>,
        timing: ActionTiming,
    },
    SetName {
        name: String,
    },
    Chat {
        message: String,
    },
    GetPeers,
    StartedEditingFrame {
        line_id: LineId,
        frame_id: FrameId,
    },
    StoppedEditingFrame {
        line_id: LineId,
        frame_id: FrameId,
    },
    RequestDeviceList,
    ConnectMidiDevice {
        name: String,
    },
    DisconnectMidiDevice {
        name: String,
    },
    CreateVirtualMidiOutput {
        name: String,
    },
    AssignDeviceToSlot {
        slot: DeviceSlot,
        name: String,
    },
    UnassignDeviceFromSlot {
        slot: DeviceSlot,
    },
    CreateOscDevice {
        name: String,
        host: String,
        port: u16,
    },
    RemoveOscDevice {
        name: String,
    },
    GetClock,
    GetSnapshot,
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransportStart { .. } => "transport_start",
            Self::TransportStop { .. } => "transport_stop",
            Self::SetTempo { .. } => "set_tempo",
            Self::GetScene => "get_scene",
            Self::SetScene { .. } => "set_scene",
            Self::SetSceneLength { .. } => "set_scene_length",
            Self::GetLine { .. } => "get_line",
            Self::SetLines { .. } => "set_lines",
            Self::ConfigureLines { .. } => "configure_lines",
            Self::AddLine { .. } => "add_line",
            Self::RemoveLine { .. } => "remove_line",
            Self::GetFrame { .. } => "get_frame",
            Self::GetScript { .. } => "get_script",
            Self::SetFrame { .. } => "set_frame",
            Self::SetFrames { .. } => "set_frames",
            Self::AddFrame { .. } => "add_frame",
            Self::AddFrames { .. } => "add_frames",
            Self::RemoveFrame { .. } => "remove_frame",
            Self::RemoveFrames { .. } => "remove_frames",
            Self::SetName { .. } => "set_name",
            Self::Chat { .. } => "chat",
            Self::GetPeers => "get_peers",
            Self::StartedEditingFrame { .. } => "started_editing_frame",
            Self::StoppedEditingFrame { .. } => "stopped_editing_frame",
            Self::RequestDeviceList => "request_device_list",
            Self::ConnectMidiDevice { .. } => "connect_midi_device",
            Self::DisconnectMidiDevice { .. } => "disconnect_midi_device",
            Self::CreateVirtualMidiOutput { .. } => "create_virtual_midi_output",
            Self::AssignDeviceToSlot { .. } => "assign_device_to_slot",
            Self::UnassignDeviceFromSlot { .. } => "unassign_device_from_slot",
            Self::CreateOscDevice { .. } => "create_osc_device",
            Self::RemoveOscDevice { .. } => "remove_osc_device",
            Self::GetClock => "get_clock",
            Self::GetSnapshot => "get_snapshot",
        }
    }

    pub fn timing(&self) -> Option<ActionTiming> {
        match self {
            Self::TransportStart { timing }
            | Self::TransportStop { timing }
            | Self::SetTempo { timing, .. }
            | Self::SetScene { timing, .. }
            | Self::SetSceneLength { timing, .. }
            | Self::SetLines { timing, .. }
            | Self::ConfigureLines { timing, .. }
            | Self::AddLine { timing, .. }
            | Self::RemoveLine { timing, .. }
            | Self::SetFrame { timing, .. }
            | Self::SetFrames { timing, .. }
            | Self::AddFrame { timing, .. }
            | Self::AddFrames { timing, .. }
            | Self::RemoveFrame { timing, .. }
            | Self::RemoveFrames { timing, .. } => Some(*timing),
            Self::GetScene
            | Self::GetLine { .. }
            | Self::GetFrame { .. }
            | Self::GetScript { .. }
            | Self::SetName { .. }
            | Self::Chat { .. }
            | Self::GetPeers
            | Self::StartedEditingFrame { .. }
            | Self::StoppedEditingFrame { .. }
            | Self::RequestDeviceList
            | Self::ConnectMidiDevice { .. }
            | Self::DisconnectMidiDevice { .. }
            | Self::CreateVirtualMidiOutput { .. }
            | Self::AssignDeviceToSlot { .. }
            | Self::UnassignDeviceFromSlot { .. }
            | Self::CreateOscDevice { .. }
            | Self::RemoveOscDevice { .. }
            | Self::GetClock
            | Self::GetSnapshot => None,
        }
    }

    /// Strips compiled artifacts from every scene-bearing payload.
    pub fn sanitized(self) -> Self {
        match self {
            Self::SetScene { scene, timing } => Self::SetScene {
                scene: scene.sanitized(),
                timing,
            },
            Self::SetLines { lines, timing } => Self::SetLines {
                lines: sanitize_lines(lines),
                timing,
            },
            Self::ConfigureLines { lines, timing } => Self::ConfigureLines {
                lines: sanitize_lines(lines),
                timing,
            },
            Self::AddLine {
                line_id,
                line,
                timing,
            } => Self::AddLine {
                line_id,
                line: line.sanitized(),
                timing,
            },
            Self::SetFrame {
                line_id,
                frame_id,
                frame,
                timing,
            } => Self::SetFrame {
                line_id,
                frame_id,
                frame: frame.sanitized(),
                timing,
            },
            Self::SetFrames { frames, timing } => Self::SetFrames {
                frames: sanitize_frames(frames),
                timing,
            },
            Self::AddFrame {
                line_id,
                frame_id,
                frame,
                timing,
            } => Self::AddFrame {
                line_id,
                frame_id,
                frame: frame.sanitized(),
                timing,
            },
            Self::AddFrames { frames, timing } => Self::AddFrames {
                frames: sanitize_frames(frames),
                timing,
            },
            other => other,
        }
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        if let Some(ActionTiming::AtBeat(beat)) = self.timing() {
            if !beat.is_finite() || beat < 0.0 {
                return Err(ProtocolError::InvalidValue {
                    field: "beat",
                    value: beat.to_string(),
                });
            }
        }
        match self {
            Self::SetTempo { tempo, .. } if !tempo.is_finite() || *tempo <= 0.0 => {
                Err(ProtocolError::InvalidValue {
                    field: "tempo",
                    value: tempo.to_string(),
                })
            }
            Self::SetScene { scene, .. } => scene
                .lines()
                .iter()
                .try_for_each(|line| check_line(line.index(), line)),
            Self::SetLines { lines, .. } | Self::ConfigureLines { lines, .. } => lines
                .iter()
                .try_for_each(|(line_id, line)| check_line(*line_id, line)),
            Self::AddLine { line_id, line, .. } => check_line(*line_id, line),
            Self::SetFrame {
                line_id,
                frame_id,
                frame,
                ..
            }
            | Self::AddFrame {
                line_id,
                frame_id,
                frame,
                ..
            } => check_frame(*line_id, *frame_id, frame),
            Self::SetFrames { frames, .. } | Self::AddFrames { frames, .. } => frames
                .iter()
                .try_for_each(|(line_id, frame_id, frame)| {
                    check_frame(*line_id, *frame_id, frame)
                }),
            _ => Ok(()),
        }
    }
}

fn sanitize_lines(lines: Vec<(LineId, Line)>) -> Vec<(LineId, Line)> {
    lines
        .into_iter()
        .map(|(line_id, line)| (line_id, line.sanitized()))
        .collect()
}

fn sanitize_frames(frames: Vec<(LineId, FrameId, Frame)>) -> Vec<(LineId, FrameId, Frame)> {
    frames
        .into_iter()
        .map(|(line_id, frame_id, frame)| (line_id, frame_id, frame.sanitized()))
        .collect()
}

fn check_line(line_id: LineId, line: &Line) -> Result<(), ProtocolError> {
    match line.scripts().iter().find(|script| script.has_compiled_artifact()) {
        Some(script) => Err(ProtocolError::CompiledArtifactPresent {
            line_id,
            frame_id: Some(FrameId(script.index)),
        }),
        None => Ok(()),
    }
}

fn check_frame(line_id: LineId, frame_id: FrameId, frame: &Frame) -> Result<(), ProtocolError> {
    if frame.has_compiled_artifact() {
        return Err(ProtocolError::CompiledArtifactPresent {
            line_id,
            frame_id: Some(frame_id),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    pub request_id: RequestId,
    pub message: ClientMessage,
}

/// Source span and message of a failed compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationErrorDetails {
    pub lang: String,
    pub from: usize,
    pub to: usize,
    pub info: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_id: Option<LineId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<FrameId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    Hello {
        username: String,
        scene: Scene,
        #[serde(default)]
        devices: Vec<DeviceInfo>,
        #[serde(default)]
        peers: Vec<String>,
        clock: ClockState,
    },
    SceneValue(Scene),
    SceneLength(u64),
    LineValues(Vec<(LineId, Line)>),
    FrameValues(Vec<(LineId, FrameId, Frame)>),
    ScriptContent {
        line_id: LineId,
        frame_id: FrameId,
        content: String,
    },
    ScriptCompiled {
        line_id: LineId,
        frame_id: FrameId,
    },
    CompilationErrorOccurred(CompilationErrorDetails),
    PeersUpdated(Vec<String>),
    PeerStartedEditing {
        username: String,
        line_id: LineId,
        frame_id: FrameId,
    },
    PeerStoppedEditing {
        username: String,
        line_id: LineId,
        frame_id: FrameId,
    },
    Chat {
        username: String,
        message: String,
    },
    ClockState(ClockState),
    FramePosition(Vec<(LineId, FrameId)>),
    DeviceList(Vec<DeviceInfo>),
    Snapshot(Snapshot),
    TransportStarted,
    TransportStopped,
    Log(String),
    InternalError(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEnvelope {
    Ack {
        request_id: RequestId,
    },
    Rejected {
        request_id: RequestId,
        error: ApiError,
    },
    Push(ServerMessage),
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
