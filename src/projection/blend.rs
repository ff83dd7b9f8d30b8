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

//! Build-time blend of two performances of the same song.

use tracing::info;

use crate::model::{
    AssignedNote, BusConfig, GraphParts, Performance, RenderGraph, ResourceEstimate, Song,
    VoiceAssignment,
};

use super::assemble::{self, MAX_PLAYABLE_VOICES};
use super::error::ProjectionError;
use super::validator::validate_graph;
use super::{fingerprint, flag, project_song, ProjectionConfig, ProjectionResult};

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Interpolates buses present on both sides; a bus present on one side only
/// is weighted by that side. Mute, solo and effects follow the favoured side.
fn blend_buses(a: &[BusConfig], b: &[BusConfig], t: f32, favours_b: bool) -> Vec<BusConfig> {
    let mut buses: Vec<BusConfig> = a
        .iter()
        .map(|bus_a| match b.iter().find(|bus_b| bus_b.id == bus_a.id) {
            Some(bus_b) => {
                let favoured = if favours_b { bus_b } else { bus_a };
                BusConfig {
                    gain: lerp(bus_a.gain, bus_b.gain, t),
                    pan: lerp(bus_a.pan, bus_b.pan, t),
                    ..favoured.clone()
                }
            }
            None => BusConfig {
                gain: bus_a.gain * (1.0 - t),
                ..bus_a.clone()
            },
        })
        .collect();

    for bus_b in b.iter().filter(|bus_b| !a.iter().any(|bus_a| bus_a.id == bus_b.id)) {
        buses.push(BusConfig {
            gain: bus_b.gain * t,
            ..bus_b.clone()
        });
    }

    // Master stays last.
    buses.sort_by_key(|bus| bus.kind == crate::model::BusKind::Master);
    buses
}

fn blend_voices(a: &[VoiceAssignment], b: &[VoiceAssignment]) -> Vec<VoiceAssignment> {
    let mut voices: Vec<VoiceAssignment> = a
        .iter()
        .map(|voice_a| match b.iter().find(|voice_b| voice_b.id == voice_a.id) {
            Some(voice_b) => VoiceAssignment {
                polyphony: voice_a.polyphony.max(voice_b.polyphony),
                ..voice_a.clone()
            },
            None => voice_a.clone(),
        })
        .collect();
    voices.extend(
        b.iter()
            .filter(|voice_b| !a.iter().any(|voice_a| voice_a.id == voice_b.id))
            .cloned(),
    );
    voices
}

fn scaled_notes<'a>(
    notes: &'a [AssignedNote],
    side: &'a str,
    scale: f32,
) -> impl Iterator<Item = AssignedNote> + 'a {
    notes.iter().map(move |note| AssignedNote {
        id: format!("{}/{}", side, note.id),
        velocity: note.velocity * scale,
        ..note.clone()
    })
}

/// Projects both performances and blends them into a third graph at `t`:
/// `t = 0` is performance A, `t = 1` is performance B.
pub fn project_song_blend(
    song: &Song,
    performance_a: &Performance,
    performance_b: &Performance,
    t: f64,
    config: &ProjectionConfig,
) -> Result<ProjectionResult, ProjectionError> {
    if !(0.0..=1.0).contains(&t) {
        return Err(ProjectionError::graph_generation_failed(
            "blend factor must be within [0, 1]",
            format!("t = {}", t),
        ));
    }

    let a = project_song(song, performance_a, config)?;
    let b = project_song(song, performance_b, config)?;
    let t32 = t as f32;
    let favours_b = t > 0.5;
    let favoured = if favours_b { &b } else { &a };

    let buses = blend_buses(a.graph.buses(), b.graph.buses(), t32, favours_b);
    let voices = blend_voices(a.graph.voices(), b.graph.voices());

    let mut notes: Vec<AssignedNote> = scaled_notes(a.graph.notes(), "a", 1.0 - t32)
        .chain(scaled_notes(b.graph.notes(), "b", t32))
        .collect();
    notes.sort_by_key(|note| note.start);

    let (nodes, connections) = assemble::routing(&voices, &buses)?;
    let resources_a = a.graph.resources();
    let resources_b = b.graph.resources();
    let resources = ResourceEstimate {
        cpu_percent: (resources_a.cpu_percent + resources_b.cpu_percent) / 2.0,
        memory_bytes: (resources_a.memory_bytes + resources_b.memory_bytes) / 2,
    };
    let playable =
        a.graph.is_playable() && b.graph.is_playable() && voices.len() <= MAX_PLAYABLE_VOICES;

    let t_key = format!("{}", t);
    let (result_id, seed) = fingerprint(
        "blend",
        &[
            &song.id,
            &performance_a.id,
            &performance_b.id,
            &t_key,
            flag(config.validate_graph),
            flag(config.include_automation),
        ],
    );

    let graph = RenderGraph::from_parts(GraphParts {
        id: format!("graph-{}", result_id),
        song_id: song.id.clone(),
        performance_id: format!("{}+{}", performance_a.id, performance_b.id),
        voices,
        buses,
        notes,
        timeline: favoured.graph.timeline().clone(),
        nodes,
        connections,
        automation: favoured.graph.automation().to_vec(),
        resources,
        playable,
    });

    if config.validate_graph {
        validate_graph(&graph)?;
    }

    info!(
        song = song.id,
        a = performance_a.id,
        b = performance_b.id,
        t,
        notes = graph.notes().len(),
        "Blended performances"
    );

    let mut blended_song = favoured.song.clone();
    blended_song.density = a.song.density * (1.0 - t) + b.song.density * t;

    Ok(ProjectionResult {
        result_id,
        graph,
        song: blended_song,
        seed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArrangementStyle, BusKind};
    use crate::projection::ProjectionErrorKind;

    fn song() -> Song {
        Song::new("song", 120.0)
    }

    fn performances() -> (Performance, Performance) {
        (
            Performance::new("calm", 0.2).with_mix("ambient"),
            Performance::new("drive", 0.9).with_mix("drum-forward"),
        )
    }

    #[test]
    fn test_rejects_out_of_range_factor() {
        let (a, b) = performances();
        for t in [-0.1, 1.1, f64::NAN] {
            let err = project_song_blend(&song(), &a, &b, t, &ProjectionConfig::default())
                .expect_err("out of range");
            assert_eq!(err.kind(), ProjectionErrorKind::GraphGenerationFailed);
        }
    }

    #[test]
    fn test_endpoints_match_their_side() {
        let (a, b) = performances();
        let config = ProjectionConfig::default();
        let graph_a = project_song(&song(), &a, &config).expect("a").graph;
        let graph_b = project_song(&song(), &b, &config).expect("b").graph;

        let at_zero = project_song_blend(&song(), &a, &b, 0.0, &config).expect("t=0");
        for bus in graph_a.buses() {
            assert_eq!(at_zero.graph.bus(&bus.id).map(|b| b.gain), Some(bus.gain));
            assert_eq!(at_zero.graph.bus(&bus.id).map(|b| b.muted), Some(bus.muted));
        }

        let at_one = project_song_blend(&song(), &a, &b, 1.0, &config).expect("t=1");
        for bus in graph_b.buses() {
            assert_eq!(at_one.graph.bus(&bus.id).map(|b| b.gain), Some(bus.gain));
            assert_eq!(at_one.graph.bus(&bus.id).map(|b| b.muted), Some(bus.muted));
        }
    }

    #[test]
    fn test_midpoint_interpolates() {
        let (a, b) = performances();
        let config = ProjectionConfig::default();
        let blended = project_song_blend(&song(), &a, &b, 0.5, &config).expect("blend");

        // ambient 0.9 vs drum-forward 0.6 on the melodic bus.
        let gain = blended.graph.bus("bus-default").map(|bus| bus.gain);
        assert!((gain.unwrap_or_default() - 0.75).abs() < 1e-6);
        // Ties favour A, which mutes drums.
        assert_eq!(blended.graph.bus("bus-drums").map(|bus| bus.muted), Some(true));
        assert_eq!(
            blended.graph.buses().last().map(|bus| bus.kind),
            Some(BusKind::Master)
        );
    }

    #[test]
    fn test_notes_are_concatenated_and_scaled() {
        let (a, b) = performances();
        let config = ProjectionConfig::default();
        let graph_a = project_song(&song(), &a, &config).expect("a").graph;
        let graph_b = project_song(&song(), &b, &config).expect("b").graph;
        let blended = project_song_blend(&song(), &a, &b, 0.25, &config).expect("blend");

        assert_eq!(
            blended.graph.notes().len(),
            graph_a.notes().len() + graph_b.notes().len()
        );
        let first_a = &graph_a.notes()[0];
        let scaled = blended
            .graph
            .notes()
            .iter()
            .find(|note| note.id == format!("a/{}", first_a.id))
            .expect("note from a");
        assert!((scaled.velocity - first_a.velocity * 0.75).abs() < 1e-6);
        assert!(blended
            .graph
            .notes()
            .windows(2)
            .all(|pair| pair[0].start <= pair[1].start));
    }

    #[test]
    fn test_resources_are_averaged() {
        let (a, b) = performances();
        let config = ProjectionConfig::default();
        let graph_a = project_song(&song(), &a, &config).expect("a").graph;
        let graph_b = project_song(&song(), &b, &config).expect("b").graph;
        let blended = project_song_blend(&song(), &a, &b, 0.7, &config).expect("blend");

        let expected =
            (graph_a.resources().memory_bytes + graph_b.resources().memory_bytes) / 2;
        assert_eq!(blended.graph.resources().memory_bytes, expected);
    }

    #[test]
    fn test_differing_arrangements_are_unioned() {
        let a = Performance::new("solo", 0.5).with_arrangement(ArrangementStyle::Minimal);
        let b = Performance::new("band", 0.5);
        let config = ProjectionConfig::default();
        let blended = project_song_blend(&song(), &a, &b, 0.5, &config).expect("blend");

        assert_eq!(blended.graph.voices().len(), 4);
        // Drums only exist on the B side, so they come in at half gain.
        let gain = blended.graph.bus("bus-drums").map(|bus| bus.gain);
        assert!((gain.unwrap_or_default() - 0.4).abs() < 1e-6);
        assert!(validate_graph(&blended.graph).is_ok());
    }
}
