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

//! Value types shared by projection and playback.

mod graph;
mod performance;
mod song;

pub use graph::{
    AssignedNote, AutomationPoint, BusConfig, BusKind, Connection, GraphNode, NodeKind,
    RenderGraph, ResourceEstimate, Section, SectionKind, Timeline, VoiceAssignment, MASTER_BUS_ID,
};
pub(crate) use graph::GraphParts;
pub use performance::{
    ArrangementStyle, Performance, DEFAULT_GROOVE_PROFILE, DEFAULT_MIX_PROFILE,
};
pub use song::{
    bar_samples, InstrumentRole, RhythmGenerator, Song, TimeSignature, DEFAULT_SONG_DENSITY,
};
