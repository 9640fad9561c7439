use serde::{Deserialize, Serialize};

use crate::{
    domain::{FrameId, LineId},
    error::ProtocolError,
};

/// Engine-produced compilation output for a script. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompiledArtifact(pub serde_json::Value);

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Script {
    pub content: String,
    pub lang: String,
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiled: Option<CompiledArtifact>,
}

impl Script {
    pub fn new(content: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            lang: lang.into(),
            index: 0,
            compiled: None,
        }
    }

    fn placeholder(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub duration: u64,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub script: Script,
    pub repetitions: u32,
}

impl Frame {
    pub fn new(duration: u64) -> Self {
        Self {
            duration,
            enabled: true,
            name: None,
            script: Script::default(),
            repetitions: 1,
        }
    }

    pub fn with_script(mut self, script: Script) -> Self {
        self.script = script;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

// Slot vectors stay private so they always have the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LineRepr")]
pub struct Line {
    frames: Vec<u64>,
    enabled_frames: Vec<bool>,
    scripts: Vec<Script>,
    frame_names: Vec<Option<String>>,
    frame_repetitions: Vec<u32>,
    pub speed_factor: f64,
    index: LineId,
    pub start_frame: Option<FrameId>,
    pub end_frame: Option<FrameId>,
    pub custom_length: Option<u64>,
}

#[derive(Deserialize)]
struct LineRepr {
    #[serde(default)]
    frames: Vec<u64>,
    #[serde(default)]
    enabled_frames: Vec<bool>,
    #[serde(default)]
    scripts: Vec<Script>,
    #[serde(default)]
    frame_names: Vec<Option<String>>,
    #[serde(default)]
    frame_repetitions: Vec<u32>,
    #[serde(default = "default_speed_factor")]
    speed_factor: f64,
    index: LineId,
    #[serde(default)]
    start_frame: Option<FrameId>,
    #[serde(default)]
    end_frame: Option<FrameId>,
    #[serde(default)]
    custom_length: Option<u64>,
}

fn default_speed_factor() -> f64 {
    1.0
}

impl From<LineRepr> for Line {
    fn from(raw: LineRepr) -> Self {
        let slots = raw.frames.len();
        let mut enabled_frames = raw.enabled_frames;
        let mut frame_names = raw.frame_names;
        let mut frame_repetitions = raw.frame_repetitions;
        enabled_frames.resize(slots, true);
        frame_names.resize(slots, None);
        frame_repetitions.resize(slots, 1);

        let mut scripts = raw.scripts;
        scripts.retain(|script| script.index < slots);
        scripts.sort_by_key(|script| script.index);
        scripts.dedup_by_key(|script| script.index);

        Self {
            frames: raw.frames,
            enabled_frames,
            scripts,
            frame_names,
            frame_repetitions,
            speed_factor: raw.speed_factor,
            index: raw.index,
            start_frame: raw.start_frame,
            end_frame: raw.end_frame,
            custom_length: raw.custom_length,
        }
    }
}

impl Line {
    pub fn new(index: impl Into<LineId>) -> Self {
        Self {
            frames: Vec::new(),
            enabled_frames: Vec::new(),
            scripts: Vec::new(),
            frame_names: Vec::new(),
            frame_repetitions: Vec::new(),
            speed_factor: default_speed_factor(),
            index: index.into(),
            start_frame: None,
            end_frame: None,
            custom_length: None,
        }
    }

    pub fn with_frames(index: impl Into<LineId>, durations: impl IntoIterator<Item = u64>) -> Self {
        let mut line = Self::new(index);
        for duration in durations {
            line.push_frame(Frame::new(duration));
        }
        line
    }

    pub fn index(&self) -> LineId {
        self.index
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[u64] {
        &self.frames
    }

    pub fn enabled_frames(&self) -> &[bool] {
        &self.enabled_frames
    }

    pub fn frame_names(&self) -> &[Option<String>] {
        &self.frame_names
    }

    pub fn frame_repetitions(&self) -> &[u32] {
        &self.frame_repetitions
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }

    pub fn script(&self, frame_id: FrameId) -> Option<&Script> {
        self.script_position(frame_id.0)
            .ok()
            .map(|pos| &self.scripts[pos])
    }

    /// Beats covered by one pass over the line, honoring `custom_length`.
    pub fn length(&self) -> u64 {
        self.custom_length.unwrap_or_else(|| {
            self.frames
                .iter()
                .zip(&self.frame_repetitions)
                .fold(0u64, |total, (duration, reps)| {
                    total.saturating_add(duration.saturating_mul(u64::from(*reps)))
                })
        })
    }

    pub fn frame(&self, frame_id: FrameId) -> Option<Frame> {
        let i = frame_id.0;
        let duration = *self.frames.get(i)?;
        Some(Frame {
            duration,
            enabled: self.enabled_frames[i],
            name: self.frame_names[i].clone(),
            script: self
                .script(frame_id)
                .cloned()
                .unwrap_or_else(|| Script::placeholder(i)),
            repetitions: self.frame_repetitions[i],
        })
    }

    pub fn push_frame(&mut self, frame: Frame) {
        let at = FrameId(self.frames.len());
        self.insert_frame(at, frame);
    }

    /// Inserts a slot at `frame_id`, clamped to the end of the line.
    pub fn insert_frame(&mut self, frame_id: FrameId, frame: Frame) -> FrameId {
        let i = frame_id.0.min(self.frames.len());
        self.frames.insert(i, frame.duration);
        self.enabled_frames.insert(i, frame.enabled);
        self.frame_names.insert(i, frame.name);
        self.frame_repetitions.insert(i, frame.repetitions);

        for script in self.scripts.iter_mut().filter(|s| s.index >= i) {
            script.index += 1;
        }
        let mut script = frame.script;
        script.index = i;
        let pos = self.scripts.partition_point(|s| s.index < i);
        self.scripts.insert(pos, script);
        FrameId(i)
    }

    pub fn remove_frame(&mut self, frame_id: FrameId) -> Option<Frame> {
        let removed = self.frame(frame_id)?;
        let i = frame_id.0;
        self.frames.remove(i);
        self.enabled_frames.remove(i);
        self.frame_names.remove(i);
        self.frame_repetitions.remove(i);

        if let Ok(pos) = self.script_position(i) {
            self.scripts.remove(pos);
        }
        for script in self.scripts.iter_mut().filter(|s| s.index > i) {
            script.index -= 1;
        }
        Some(removed)
    }

    pub fn set_frame(&mut self, frame_id: FrameId, frame: Frame) -> bool {
        let i = frame_id.0;
        if i >= self.frames.len() {
            return false;
        }
        self.frames[i] = frame.duration;
        self.enabled_frames[i] = frame.enabled;
        self.frame_names[i] = frame.name;
        self.frame_repetitions[i] = frame.repetitions;

        let mut script = frame.script;
        script.index = i;
        match self.script_position(i) {
            Ok(pos) => self.scripts[pos] = script,
            Err(pos) => self.scripts.insert(pos, script),
        }
        true
    }

    pub fn set_frame_enabled(&mut self, frame_id: FrameId, enabled: bool) -> bool {
        match self.enabled_frames.get_mut(frame_id.0) {
            Some(slot) => {
                *slot = enabled;
                true
            }
            None => false,
        }
    }

    fn script_position(&self, index: usize) -> Result<usize, usize> {
        self.scripts.binary_search_by_key(&index, |s| s.index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SceneRepr")]
pub struct Scene {
    pub length: u64,
    lines: Vec<Line>,
}

#[derive(Deserialize)]
struct SceneRepr {
    length: u64,
    #[serde(default)]
    lines: Vec<Line>,
}

impl TryFrom<SceneRepr> for Scene {
    type Error = ProtocolError;

    fn try_from(raw: SceneRepr) -> Result<Self, Self::Error> {
        let mut scene = Scene::new(raw.length);
        for line in raw.lines {
            scene.push_line(line)?;
        }
        Ok(scene)
    }
}

impl Scene {
    pub fn new(length: u64) -> Self {
        Self {
            length,
            lines: Vec::new(),
        }
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, line_id: LineId) -> Option<&Line> {
        self.lines.iter().find(|line| line.index == line_id)
    }

    pub fn line_mut(&mut self, line_id: LineId) -> Option<&mut Line> {
        self.lines.iter_mut().find(|line| line.index == line_id)
    }

    /// Appends an empty line under an index no other line uses.
    pub fn add_line(&mut self) -> &mut Line {
        let next = match self.lines.iter().map(|line| line.index.0).max() {
            None => Some(0),
            Some(max) => max.checked_add(1),
        };
        // Past the top of the range, reuse the lowest free index.
        let index = next.unwrap_or_else(|| {
            (0..)
                .find(|i| self.line(LineId(*i)).is_none())
                .unwrap_or_default()
        });
        self.lines.push(Line::new(index));
        let last = self.lines.len() - 1;
        &mut self.lines[last]
    }

    pub fn push_line(&mut self, line: Line) -> Result<(), ProtocolError> {
        if self.line(line.index).is_some() {
            return Err(ProtocolError::DuplicateLineIndex(line.index));
        }
        self.lines.push(line);
        Ok(())
    }

    pub fn remove_line(&mut self, line_id: LineId) -> Option<Line> {
        let pos = self.lines.iter().position(|line| line.index == line_id)?;
        Some(self.lines.remove(pos))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub scene: Scene,
    pub tempo: f64,
    pub beat: f64,
    pub micros: u64,
    pub quantum: u32,
}

pub trait Sanitize: Sized {
    fn sanitized(self) -> Self;
    fn has_compiled_artifact(&self) -> bool;
}

impl Sanitize for Script {
    fn sanitized(mut self) -> Self {
        self.compiled = None;
        self
    }

    fn has_compiled_artifact(&self) -> bool {
        self.compiled.is_some()
    }
}

impl Sanitize for Frame {
    fn sanitized(mut self) -> Self {
        self.script = self.script.sanitized();
        self
    }

    fn has_compiled_artifact(&self) -> bool {
        self.script.has_compiled_artifact()
    }
}

impl Sanitize for Line {
    fn sanitized(mut self) -> Self {
        self.scripts = self.scripts.into_iter().map(Sanitize::sanitized).collect();
        self
    }

    fn has_compiled_artifact(&self) -> bool {
        self.scripts.iter().any(Sanitize::has_compiled_artifact)
    }
}

impl Sanitize for Scene {
    fn sanitized(mut self) -> Self {
        self.lines = self.lines.into_iter().map(Sanitize::sanitized).collect();
        self
    }

    fn has_compiled_artifact(&self) -> bool {
        self.lines.iter().any(Sanitize::has_compiled_artifact)
    }
}

#[cfg(test)]
#[path = "tests/scene_tests.rs"]
mod tests;
