use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{FrameId, LineId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    NotFound,
    Validation,
    InvalidTiming,
    Busy,
    Internal,
}

/// Rejection returned by the engine for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Payload shapes that must never reach the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("outbound payload still embeds a compiled artifact (line {line_id}, frame {frame_id:?})")]
    CompiledArtifactPresent {
        line_id: LineId,
        frame_id: Option<FrameId>,
    },
    #[error("scene already contains a line with index {0}")]
    DuplicateLineIndex(LineId),
    #[error("invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}
