use serde::{Deserialize, Serialize};

use crate::domain::LineId;

/// When the engine applies a submitted mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ActionTiming {
    Immediate,
    EndOfLine(LineId),
    AtBeat(f64),
    AtNextBeat,
}

impl ActionTiming {
    pub fn immediate() -> Self {
        Self::Immediate
    }

    pub fn end_of_line(line_id: impl Into<LineId>) -> Self {
        Self::EndOfLine(line_id.into())
    }

    pub fn at_beat(beat: f64) -> Self {
        Self::AtBeat(beat)
    }

    pub fn at_next_beat() -> Self {
        Self::AtNextBeat
    }

    pub fn is_deferred(&self) -> bool {
        !matches!(self, Self::Immediate)
    }
}

/// Call-site default used when a caller omits the timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationClass {
    Topology,
    Value,
}

impl OperationClass {
    pub fn default_timing(self) -> ActionTiming {
        match self {
            Self::Topology => ActionTiming::AtNextBeat,
            Self::Value => ActionTiming::Immediate,
        }
    }

    pub fn resolve(self, timing: Option<ActionTiming>) -> ActionTiming {
        timing.unwrap_or_else(|| self.default_timing())
    }
}
