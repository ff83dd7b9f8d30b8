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
use crate::model::{bar_samples, Section, SectionKind, Song, Timeline};

use super::error::ProjectionError;

/// Bars in each section of the form unless configured otherwise.
pub const DEFAULT_BARS_PER_SECTION: u32 = 8;

/// Longest timeline, in samples. Sample times up to here are exact as `f64`.
pub const MAX_TIMELINE_SAMPLES: u64 = 1 << 52;

/// The fixed four-section form: two statements, a contrast, a final statement.
const FORM: [(&str, &str, SectionKind); 4] = [
    ("a1", "Statement", SectionKind::Statement),
    ("a2", "Restatement", SectionKind::Statement),
    ("b", "Contrast", SectionKind::Contrast),
    ("a3", "Final statement", SectionKind::Statement),
];

/// The tempo multiplier authored for the section at `index`, 1.0 when absent.
pub fn section_tempo_multiplier(song: &Song, index: usize) -> f64 {
    song.section_tempo.get(index).copied().unwrap_or(1.0)
}

/// Partitions the song into the four-section form. Each section's duration
/// comes from its own tempo multiplier and bar count. Fails when the form
/// would run past [`MAX_TIMELINE_SAMPLES`].
pub fn build_timeline(song: &Song, bars_per_section: u32) -> Result<Timeline, ProjectionError> {
    let mut start = 0u64;
    let mut sections = Vec::with_capacity(FORM.len());
    for (index, (id, name, kind)) in FORM.iter().enumerate() {
        let tempo_multiplier = section_tempo_multiplier(song, index);
        let bar = bar_samples(
            song.sample_rate,
            song.tempo * tempo_multiplier,
            song.time_signature,
        );
        let duration = (bar * bars_per_section as f64).round();
        let end = start as f64 + duration;
        if !end.is_finite() || end > MAX_TIMELINE_SAMPLES as f64 {
            return Err(ProjectionError::graph_generation_failed(
                format!("song {} is too long to play", song.id),
                format!(
                    "section {} ends past sample {} (tempo = {}, multiplier = {})",
                    id, MAX_TIMELINE_SAMPLES, song.tempo, tempo_multiplier
                ),
            ));
        }

        let duration = duration as u64;
        sections.push(Section {
            id: id.to_string(),
            name: name.to_string(),
            kind: *kind,
            bars: bars_per_section,
            tempo_multiplier,
            start,
            duration,
        });
        start += duration;
    }

    Ok(Timeline {
        tempo: song.tempo,
        time_signature: song.time_signature,
        sections,
    })
}
