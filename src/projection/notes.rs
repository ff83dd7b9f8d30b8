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

//! Note assignment: turns the resultant rhythm into notes for every role.

use rand::Rng;

use crate::model::{AssignedNote, RhythmGenerator, Song, Timeline};

use super::profiles::GrooveProfile;
use super::rhythm::{self, PULSES_PER_BEAT};
use super::roles::{voice_id, RoleBinding, RoleKind};

/// Pitches the primary role cycles through.
const MELODY_PATTERN: [u8; 8] = [60, 62, 64, 67, 69, 67, 64, 62];

/// Pitches the secondary role cycles through.
const HARMONY_PATTERN: [u8; 4] = [55, 59, 62, 59];

/// Pitch held by bass roles.
const BASS_ROOT: u8 = 36;

/// Pitch used by percussive roles.
const PERCUSSION_PITCH: u8 = 38;

/// Note length, in pulses, of an attack with no accent.
const BASE_DURATION_PULSES: f64 = 2.0;

/// Probability that an attack with the given accent survives as a note.
pub fn keep_probability(accent: f64, density: f64) -> f64 {
    (0.3 + 0.4 * accent) * (0.3 + 0.7 * density)
}

/// Velocity for an attack with the given accent.
pub fn accent_velocity(accent: f64) -> f32 {
    (0.4 + 0.6 * accent).clamp(0.0, 1.0) as f32
}

/// Duration in samples, inversely scaled by accent strength.
pub fn accent_duration(accent: f64, samples_per_pulse: f64) -> u64 {
    ((samples_per_pulse * BASE_DURATION_PULSES / (0.5 + accent)).round() as u64).max(1)
}

fn pitch_for(kind: RoleKind, index: usize) -> u8 {
    match kind {
        RoleKind::Primary => MELODY_PATTERN[index % MELODY_PATTERN.len()],
        RoleKind::Secondary => HARMONY_PATTERN[index % HARMONY_PATTERN.len()],
        RoleKind::Bass => BASS_ROOT,
        RoleKind::Percussion => PERCUSSION_PITCH,
    }
}

/// Everything note assignment needs besides the random source.
pub struct NoteContext<'a> {
    pub song: &'a Song,
    pub timeline: &'a Timeline,
    pub roles: &'a [RoleBinding],
    pub generators: &'a [RhythmGenerator],
    pub groove: GrooveProfile,
    pub transposition: i8,
}

/// Assigns notes to every role, section by section. Notes are returned ordered by start time.
pub fn assign_notes<R: Rng>(context: &NoteContext<'_>, rng: &mut R) -> Vec<AssignedNote> {
    let song = context.song;
    let mut notes: Vec<AssignedNote> = Vec::new();
    let mut counts = vec![0usize; context.roles.len()];
    let mut first_pulse = 0u64;

    for section in context.timeline.sections.iter() {
        let samples_per_pulse = song.sample_rate as f64 * 60.0
            / (song.tempo * section.tempo_multiplier)
            / PULSES_PER_BEAT as f64;
        let pulses = section.bars as u64
            * song.time_signature.numerator as u64
            * PULSES_PER_BEAT;

        for attack in rhythm::resultant(context.generators, first_pulse, pulses) {
            let local_pulse = (attack.pulse - first_pulse) as f64
                + context.groove.offset(attack.pulse);
            let start = section.start + (local_pulse * samples_per_pulse).round() as u64;
            if start >= section.end() {
                continue;
            }

            for (role_index, binding) in context.roles.iter().enumerate() {
                if rng.gen::<f64>() >= keep_probability(attack.accent, song.density) {
                    continue;
                }

                let count = counts[role_index];
                counts[role_index] += 1;
                notes.push(AssignedNote {
                    id: format!("{}-{}", binding.role, count),
                    voice_id: voice_id(&binding.role),
                    role_id: binding.role.clone(),
                    start,
                    duration: accent_duration(attack.accent, samples_per_pulse),
                    pitch: pitch_for(binding.kind, count),
                    velocity: accent_velocity(attack.accent),
                    transposition: context.transposition,
                });
            }
        }

        first_pulse += pulses;
    }

    notes.sort_by_key(|note| note.start);
    notes
}
