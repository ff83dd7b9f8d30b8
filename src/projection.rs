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

//! The projection engine: compiles a song and a performance into a render graph.
//!
//! Projection is a pure function of its inputs. It runs in stages, each of
//! which short-circuits on failure:
//!
//! 1. validate the song and the performance
//! 2. apply the performance to a copy of the song
//! 3. resolve roles and assign voices
//! 4. build buses
//! 5. assign notes from the song's resultant rhythm
//! 6. lay out the four-section timeline
//! 7. assemble nodes, routing and resource estimates
//! 8. optionally validate the routing

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::model::{GraphParts, Performance, RenderGraph, Song};

mod assemble;
mod blend;
mod buses;
mod error;
mod notes;
mod profiles;
mod rhythm;
mod roles;
mod timeline;
mod validator;

#[cfg(test)]
mod tests;

pub use assemble::{MAX_CPU_PERCENT, MAX_PLAYABLE_VOICES};
pub use blend::project_song_blend;
pub use error::{ProjectionError, ProjectionErrorKind};
pub use profiles::{GrooveProfile, MixProfile};
pub use rhythm::{default_generators, PULSES_PER_BEAT};
pub use roles::{BusFamily, RoleKind, MAX_POLYPHONY, MIN_POLYPHONY};
pub use timeline::DEFAULT_BARS_PER_SECTION;
pub use validator::{detect_circular_routing, detect_orphaned_nodes, validate_graph};

/// Options for a projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionConfig {
    /// Run the routing checks on the assembled graph.
    pub validate_graph: bool,
    /// Emit per-section gain automation.
    pub include_automation: bool,
    /// Seed for note assignment. When absent the seed is derived from the
    /// song and performance ids, so projections are reproducible.
    pub seed: Option<u64>,
    /// Bars in each section of the form.
    pub bars_per_section: u32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        ProjectionConfig {
            validate_graph: true,
            include_automation: false,
            seed: None,
            bars_per_section: DEFAULT_BARS_PER_SECTION,
        }
    }
}

/// A successful projection.
#[derive(Debug, Clone)]
pub struct ProjectionResult {
    /// Stable id derived from the song id, performance id and options.
    pub result_id: String,
    pub graph: RenderGraph,
    /// The song with the performance applied.
    pub song: Song,
    /// The seed note assignment used.
    pub seed: u64,
}

/// Hashes the parts into a result id and a seed.
pub(crate) fn fingerprint(prefix: &str, parts: &[&str]) -> (String, u64) {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();

    let hex: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[8..16]);
    (format!("{}-{}", prefix, hex), u64::from_be_bytes(seed))
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Checks the song before anything is derived from it.
pub fn validate_song(song: &Song) -> Result<(), ProjectionError> {
    if song.id.trim().is_empty() {
        return Err(ProjectionError::invalid_song(
            "the song has no id",
            "song.id is empty",
        ));
    }
    if !song.tempo.is_finite() || song.tempo <= 0.0 {
        return Err(ProjectionError::invalid_song(
            format!("song {} has an invalid tempo", song.id),
            format!("song.tempo = {}", song.tempo),
        ));
    }
    if song.sample_rate == 0 {
        return Err(ProjectionError::invalid_song(
            format!("song {} has no sample rate", song.id),
            "song.sample_rate = 0",
        ));
    }
    if song.time_signature.numerator == 0 || song.time_signature.denominator == 0 {
        return Err(ProjectionError::invalid_song(
            format!("song {} has an invalid time signature", song.id),
            format!("song.time_signature = {}", song.time_signature),
        ));
    }
    for (index, generator) in song.generators.iter().enumerate() {
        if !generator.period.is_finite()
            || generator.period <= 0.0
            || !generator.phase.is_finite()
            || !generator.weight.is_finite()
        {
            return Err(ProjectionError::invalid_song(
                format!("song {} has an invalid rhythm generator", song.id),
                format!("song.generators[{}] = {:?}", index, generator),
            ));
        }
    }
    for (index, multiplier) in song.section_tempo.iter().enumerate() {
        if !multiplier.is_finite() || *multiplier <= 0.0 {
            return Err(ProjectionError::invalid_song(
                format!("song {} has an invalid section tempo", song.id),
                format!("song.section_tempo[{}] = {}", index, multiplier),
            ));
        }
    }
    let mut roles = HashSet::new();
    for instrument in song.instruments.iter() {
        if !roles.insert(instrument.role.as_str()) {
            return Err(ProjectionError::invalid_song(
                format!("song {} lists role {} twice", song.id, instrument.role),
                format!("duplicate role: {}", instrument.role),
            ));
        }
    }
    Ok(())
}

/// Checks the performance before it is applied.
pub fn validate_performance(performance: &Performance) -> Result<(), ProjectionError> {
    if performance.id.trim().is_empty() {
        return Err(ProjectionError::invalid_performance(
            "the performance has no id",
            "performance.id is empty",
        ));
    }
    if !(0.0..=1.0).contains(&performance.density) {
        return Err(ProjectionError::invalid_performance(
            format!(
                "performance {} has a density outside [0, 1]",
                performance.id
            ),
            format!("performance.density = {}", performance.density),
        ));
    }
    Ok(())
}

/// Derives the song a performance plays: density and profile references come
/// from the performance, tempo and instrumentation are unchanged.
pub fn apply_performance(song: &Song, performance: &Performance) -> Song {
    let mut applied = song.clone();
    applied.density = performance.density;
    applied.groove_profile = Some(performance.groove_profile.clone());
    applied.mix_profile = Some(performance.mix_profile.clone());
    applied
}

/// Projects a song and performance into a render graph.
pub fn project_song(
    song: &Song,
    performance: &Performance,
    config: &ProjectionConfig,
) -> Result<ProjectionResult, ProjectionError> {
    validate_song(song)?;
    validate_performance(performance)?;

    let applied = apply_performance(song, performance);
    let (result_id, derived_seed) = fingerprint(
        "proj",
        &[
            &song.id,
            &performance.id,
            flag(config.validate_graph),
            flag(config.include_automation),
        ],
    );
    let seed = config.seed.unwrap_or(derived_seed);

    let roles = roles::resolve_roles(&applied, performance.arrangement);
    let voices = roles::build_voices(&roles, applied.density);
    let buses = buses::build_buses(
        &roles,
        MixProfile::resolve(&performance.mix_profile),
        performance.arrangement,
    );

    let timeline = timeline::build_timeline(&applied, config.bars_per_section)?;
    if timeline.total_duration() == 0 {
        return Err(ProjectionError::graph_generation_failed(
            format!("song {} has no duration", song.id),
            format!("bars_per_section = {}", config.bars_per_section),
        ));
    }

    let generators = if applied.generators.is_empty() {
        rhythm::default_generators()
    } else {
        applied.generators.clone()
    };
    let context = notes::NoteContext {
        song: &applied,
        timeline: &timeline,
        roles: &roles,
        generators: &generators,
        groove: GrooveProfile::resolve(&performance.groove_profile),
        transposition: performance.transposition,
    };
    let notes = notes::assign_notes(&context, &mut StdRng::seed_from_u64(seed));

    let (nodes, connections) = assemble::routing(&voices, &buses)?;
    let (resources, playable) =
        assemble::estimate_resources(voices.len(), notes.len(), applied.density);
    let automation = if config.include_automation {
        assemble::automation(&buses, &timeline)
    } else {
        Vec::new()
    };

    let graph = RenderGraph::from_parts(GraphParts {
        id: format!("graph-{}", result_id.trim_start_matches("proj-")),
        song_id: song.id.clone(),
        performance_id: performance.id.clone(),
        voices,
        buses,
        notes,
        timeline,
        nodes,
        connections,
        automation,
        resources,
        playable,
    });

    if config.validate_graph {
        validate_graph(&graph)?;
    }

    debug!(
        result_id,
        seed,
        nodes = graph.nodes().len(),
        connections = graph.connections().len(),
        "Graph assembled"
    );
    info!(
        song = song.id,
        performance = performance.id,
        voices = graph.voices().len(),
        notes = graph.notes().len(),
        playable = graph.is_playable(),
        "Projected song"
    );

    Ok(ProjectionResult {
        result_id,
        graph,
        song: applied,
        seed,
    })
}
