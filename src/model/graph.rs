// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The render graph: the compiled artifact handed from projection to playback.

use std::fmt;
use std::time::SystemTime;

use serde::Serialize;

use super::song::TimeSignature;

/// The id of the bus (and graph node) every other bus feeds.
pub const MASTER_BUS_ID: &str = "master";

/// Assigns one role to an instrument and a bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceAssignment {
    pub id: String,
    pub role_id: String,
    /// Instrument type reference for the external renderer.
    pub instrument: String,
    pub bus_id: String,
    /// Maximum simultaneous notes, always within [4, 64].
    pub polyphony: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    Voice,
    Master,
}

/// Mixing parameters for one bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusConfig {
    pub id: String,
    pub name: String,
    pub kind: BusKind,
    pub gain: f32,
    /// Pan in [-1, 1].
    pub pan: f32,
    pub muted: bool,
    pub solo: bool,
    /// Effect references resolved by the external mixer.
    pub effects: Vec<String>,
}

/// A note bound to a voice, with sample-accurate timing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignedNote {
    pub id: String,
    pub voice_id: String,
    pub role_id: String,
    /// Start time in samples from the top of the song.
    pub start: u64,
    /// Duration in samples.
    pub duration: u64,
    pub pitch: u8,
    /// Velocity in [0, 1].
    pub velocity: f32,
    /// Transposition in semitones applied on output.
    pub transposition: i8,
}

impl AssignedNote {
    /// The sample at which the note stops sounding.
    pub fn end(&self) -> u64 {
        self.start + self.duration
    }

    /// The pitch with transposition applied, clamped to the MIDI range.
    pub fn sounding_pitch(&self) -> u8 {
        (self.pitch as i16 + self.transposition as i16).clamp(0, 127) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Statement,
    Contrast,
}

/// One section of the song form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub id: String,
    pub name: String,
    pub kind: SectionKind,
    pub bars: u32,
    pub tempo_multiplier: f64,
    /// Start time in samples.
    pub start: u64,
    /// Duration in samples.
    pub duration: u64,
}

impl Section {
    pub fn end(&self) -> u64 {
        self.start + self.duration
    }
}

/// Tempo, meter and the ordered sections of the song.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub tempo: f64,
    pub time_signature: TimeSignature,
    pub sections: Vec<Section>,
}

impl Timeline {
    /// Total duration in samples: the sum of all section durations.
    pub fn total_duration(&self) -> u64 {
        self.sections.iter().map(|section| section.duration).sum()
    }

    /// Returns the section sounding at the given sample, if any.
    pub fn section_at(&self, sample: u64) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| sample >= section.start && sample < section.end())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Voice,
    Bus,
    Master,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
}

impl GraphNode {
    pub fn new(id: &str, kind: NodeKind) -> Self {
        GraphNode {
            id: id.to_string(),
            kind,
        }
    }
}

/// A directed edge between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
}

impl Connection {
    pub fn new(from: &str, to: &str) -> Self {
        Connection {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// A bus gain value that takes effect at a sample time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutomationPoint {
    pub bus_id: String,
    pub sample_time: u64,
    pub gain: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResourceEstimate {
    /// Estimated CPU load in percent.
    pub cpu_percent: f32,
    pub memory_bytes: u64,
}

/// Everything a render graph is made of. Only projection builds these.
pub(crate) struct GraphParts {
    pub id: String,
    pub song_id: String,
    pub performance_id: String,
    pub voices: Vec<VoiceAssignment>,
    pub buses: Vec<BusConfig>,
    pub notes: Vec<AssignedNote>,
    pub timeline: Timeline,
    pub nodes: Vec<GraphNode>,
    pub connections: Vec<Connection>,
    pub automation: Vec<AutomationPoint>,
    pub resources: ResourceEstimate,
    pub playable: bool,
}

/// The immutable output of a projection. Replaced wholesale, never edited.
#[derive(Debug, Clone, Serialize)]
pub struct RenderGraph {
    id: String,
    song_id: String,
    performance_id: String,
    voices: Vec<VoiceAssignment>,
    buses: Vec<BusConfig>,
    notes: Vec<AssignedNote>,
    timeline: Timeline,
    nodes: Vec<GraphNode>,
    connections: Vec<Connection>,
    automation: Vec<AutomationPoint>,
    resources: ResourceEstimate,
    playable: bool,
    created_at: SystemTime,
}

impl RenderGraph {
    pub(crate) fn from_parts(parts: GraphParts) -> RenderGraph {
        RenderGraph {
            id: parts.id,
            song_id: parts.song_id,
            performance_id: parts.performance_id,
            voices: parts.voices,
            buses: parts.buses,
            notes: parts.notes,
            timeline: parts.timeline,
            nodes: parts.nodes,
            connections: parts.connections,
            automation: parts.automation,
            resources: parts.resources,
            playable: parts.playable,
            created_at: SystemTime::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn song_id(&self) -> &str {
        &self.song_id
    }

    pub fn performance_id(&self) -> &str {
        &self.performance_id
    }

    pub fn voices(&self) -> &[VoiceAssignment] {
        &self.voices
    }

    pub fn buses(&self) -> &[BusConfig] {
        &self.buses
    }

    /// Assigned notes, ordered by start time.
    pub fn notes(&self) -> &[AssignedNote] {
        &self.notes
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Gain automation, empty unless requested at projection time.
    pub fn automation(&self) -> &[AutomationPoint] {
        &self.automation
    }

    pub fn resources(&self) -> ResourceEstimate {
        self.resources
    }

    pub fn is_playable(&self) -> bool {
        self.playable
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Looks up a bus by id.
    pub fn bus(&self, id: &str) -> Option<&BusConfig> {
        self.buses.iter().find(|bus| bus.id == id)
    }

    /// The index of the role's voice assignment. Used as the voice/role index at runtime.
    pub fn role_index(&self, role_id: &str) -> Option<usize> {
        self.voices.iter().position(|voice| voice.role_id == role_id)
    }
}

impl fmt::Display for RenderGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (song {}, performance {}): {} voices, {} buses, {} notes, {} samples, cpu {:.1}%, {} bytes{}",
            self.id,
            self.song_id,
            self.performance_id,
            self.voices.len(),
            self.buses.len(),
            self.notes.len(),
            self.timeline.total_duration(),
            self.resources.cpu_percent,
            self.resources.memory_bytes,
            if self.playable { "" } else { " (not playable)" }
        )
    }
}
