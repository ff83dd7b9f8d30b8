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
use crate::model::{Performance, RenderGraph, Song};
use crate::projection::{project_song, ProjectionConfig};

/// A 120 bpm song in 4/4 at 44.1kHz with the default band.
pub fn test_song() -> Song {
    Song::new("test-song", 120.0)
}

/// A mid-density performance with the default profiles.
pub fn test_performance() -> Performance {
    Performance::new("test-performance", 0.5)
}

/// The graph projected from the test song and performance.
pub fn test_graph() -> RenderGraph {
    project_song(&test_song(), &test_performance(), &ProjectionConfig::default())
        .expect("test graph projects")
        .graph
}
