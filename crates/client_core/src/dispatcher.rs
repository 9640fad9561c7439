use std::sync::Arc;

use shared::{
    domain::{DeviceSlot, FrameId, LineId},
    protocol::ClientMessage,
    scene::{Frame, Line, Scene},
    timing::{ActionTiming, OperationClass},
};
use tracing::{debug, warn};

use crate::{error::DispatchError, transport::Transport};

pub type DispatchResult = Result<(), DispatchError>;

#[derive(Clone)]
pub struct CommandDispatcher {
    transport: Arc<dyn Transport>,
}

impl CommandDispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub async fn dispatch(&self, message: ClientMessage) -> DispatchResult {
        let message = message.sanitized();
        message.validate()?;
        let kind = message.kind();
        debug!(kind, timing = ?message.timing(), "dispatch: sending command");
        self.transport.send(message).await.map_err(|err| {
            warn!(kind, "dispatch: command failed: {err}");
            DispatchError::from(err)
        })
    }

    pub async fn transport_start(&self, timing: Option<ActionTiming>) -> DispatchResult {
        self.dispatch(ClientMessage::TransportStart {
            timing: OperationClass::Value.resolve(timing),
        })
        .await
    }

    pub async fn transport_stop(&self, timing: Option<ActionTiming>) -> DispatchResult {
        self.dispatch(ClientMessage::TransportStop {
            timing: OperationClass::Value.resolve(timing),
        })
        .await
    }

    pub async fn set_tempo(&self, tempo: f64, timing: Option<ActionTiming>) -> DispatchResult {
        self.dispatch(ClientMessage::SetTempo {
            tempo,
            timing: OperationClass::Value.resolve(timing),
        })
        .await
    }

    pub async fn get_scene(&self) -> DispatchResult {
        self.dispatch(ClientMessage::GetScene).await
    }

    pub async fn set_scene(&self, scene: Scene, timing: Option<ActionTiming>) -> DispatchResult {
        self.dispatch(ClientMessage::SetScene {
            scene,
            timing: OperationClass::Value.resolve(timing),
        })
        .await
    }

    pub async fn set_scene_length(
        &self,
        length: u64,
        timing: Option<ActionTiming>,
    ) -> DispatchResult {
        self.dispatch(ClientMessage::SetSceneLength {
            length,
            timing: OperationClass::Value.resolve(timing),
        })
        .await
    }

    pub async fn get_line(&self, line_id: LineId) -> DispatchResult {
        self.dispatch(ClientMessage::GetLine { line_id }).await
    }

    pub async fn set_lines(
        &self,
        lines: Vec<(LineId, Line)>,
        timing: Option<ActionTiming>,
    ) -> DispatchResult {
        self.dispatch(ClientMessage::SetLines {
            lines,
            timing: OperationClass::Value.resolve(timing),
        })
        .await
    }

    pub async fn configure_lines(
        &self,
        lines: Vec<(LineId, Line)>,
        timing: Option<ActionTiming>,
    ) -> DispatchResult {
        self.dispatch(ClientMessage::ConfigureLines {
            lines,
            timing: OperationClass::Value.resolve(timing),
        })
        .await
    }

    pub async fn add_line(
        &self,
        line_id: LineId,
        line: Line,
        timing: Option<ActionTiming>,
    ) -> DispatchResult {
        self.dispatch(ClientMessage::AddLine {
            line_id,
            line,
            timing: OperationClass::Topology.resolve(timing),
        })
        .await
    }

    pub async fn remove_line(&self, line_id: LineId, timing: Option<ActionTiming>) -> DispatchResult {
        self.dispatch(ClientMessage::RemoveLine {
            line_id,
            timing: OperationClass::Topology.resolve(timing),
        })
        .await
    }

    pub async fn get_frame(&self, line_id: LineId, frame_id: FrameId) -> DispatchResult {
        self.dispatch(ClientMessage::GetFrame { line_id, frame_id })
            .await
    }

    pub async fn get_script(&self, line_id: LineId, frame_id: FrameId) -> DispatchResult {
        self.dispatch(ClientMessage::GetScript { line_id, frame_id })
            .await
    }

    pub async fn set_frame(
        &self,
        line_id: LineId,
        frame_id: FrameId,
        frame: Frame,
        timing: Option<ActionTiming>,
    ) -> DispatchResult {
        self.dispatch(ClientMessage::SetFrame {
            line_id,
            frame_id,
            frame,
            timing: OperationClass::Value.resolve(timing),
        })
        .await
    }

    pub async fn set_frames(
        &self,
        frames: Vec<(LineId, FrameId, Frame)>,
        timing: Option<ActionTiming>,
    ) -> DispatchResult {
        self.dispatch(ClientMessage::SetFrames {
            frames,
            timing: OperationClass::Value.resolve(timing),
        })
        .await
    }

    pub async fn add_frame(
        &self,
        line_id: LineId,
        frame_id: FrameId,
        frame: Frame,
        timing: Option<ActionTiming>,
    ) -> DispatchResult {
        self.dispatch(ClientMessage::AddFrame {
            line_id,
            frame_id,
            frame,
            timing: OperationClass::Topology.resolve(timing),
        })
        .await
    }

    pub async fn add_frames(
        &self,
        frames: Vec<(LineId, FrameId, Frame)>,
        timing: Option<ActionTiming>,
    ) -> DispatchResult {
        self.dispatch(ClientMessage::AddFrames {
            frames,
            timing: OperationClass::Topology.resolve(timing),
        })
        .await
    }

    pub async fn remove_frame(
        &self,
        line_id: LineId,
        frame_id: FrameId,
        timing: Option<ActionTiming>,
    ) -> DispatchResult {
        self.dispatch(ClientMessage::RemoveFrame {
            line_id,
            frame_id,
            timing: OperationClass::Topology.resolve(timing),
        })
        .await
    }

    pub async fn remove_frames(
        &self,
        frames: Vec<(LineId, FrameId)>,
        timing: Option<ActionTiming>,
    ) -> DispatchResult {
        self.dispatch(ClientMessage::RemoveFrames {
            frames,
            timing: OperationClass::Topology.resolve(timing),
        })
        .await
    }

    pub async fn set_name(&self, name: impl Into<String>) -> DispatchResult {
        self.dispatch(ClientMessage::SetName { name: name.into() })
            .await
    }

    pub async fn send_chat(&self, message: impl Into<String>) -> DispatchResult {
        self.dispatch(ClientMessage::Chat {
            message: message.into(),
        })
        .await
    }

    pub async fn get_peers(&self) -> DispatchResult {
        self.dispatch(ClientMessage::GetPeers).await
    }

    pub async fn start_editing_frame(&self, line_id: LineId, frame_id: FrameId) -> DispatchResult {
        self.dispatch(ClientMessage::StartedEditingFrame { line_id, frame_id })
            .await
    }

    pub async fn stop_editing_frame(&self, line_id: LineId, frame_id: FrameId) -> DispatchResult {
        self.dispatch(ClientMessage::StoppedEditingFrame { line_id, frame_id })
            .await
    }

    pub async fn request_device_list(&self) -> DispatchResult {
        self.dispatch(ClientMessage::RequestDeviceList).await
    }

    pub async fn connect_midi_device(&self, name: impl Into<String>) -> DispatchResult {
        self.dispatch(ClientMessage::ConnectMidiDevice { name: name.into() })
            .await
    }

    pub async fn disconnect_midi_device(&self, name: impl Into<String>) -> DispatchResult {
        self.dispatch(ClientMessage::DisconnectMidiDevice { name: name.into() })
            .await
    }

    pub async fn create_virtual_midi_output(&self, name: impl Into<String>) -> DispatchResult {
        self.dispatch(ClientMessage::CreateVirtualMidiOutput { name: name.into() })
            .await
    }

    pub async fn assign_device_to_slot(
        &self,
        slot: DeviceSlot,
        name: impl Into<String>,
    ) -> DispatchResult {
        self.dispatch(ClientMessage::AssignDeviceToSlot {
            slot,
            name: name.into(),
        })
        .await
    }

    pub async fn unassign_device_from_slot(&self, slot: DeviceSlot) -> DispatchResult {
        self.dispatch(ClientMessage::UnassignDeviceFromSlot { slot })
            .await
    }

    pub async fn create_osc_device(
        &self,
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> DispatchResult {
        self.dispatch(ClientMessage::CreateOscDevice {
            name: name.into(),
            host: host.into(),
            port,
        })
        .await
    }

    pub async fn remove_osc_device(&self, name: impl Into<String>) -> DispatchResult {
        self.dispatch(ClientMessage::RemoveOscDevice { name: name.into() })
            .await
    }

    pub async fn get_clock(&self) -> DispatchResult {
        self.dispatch(ClientMessage::GetClock).await
    }

    pub async fn get_snapshot(&self) -> DispatchResult {
        self.dispatch(ClientMessage::GetSnapshot).await
    }
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
