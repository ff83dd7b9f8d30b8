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

//! Resultant rhythms from interfering pulse generators.

use crate::model::RhythmGenerator;

/// Pulses per beat of the rhythm grid (sixteenth notes).
pub const PULSES_PER_BEAT: u64 = 4;

/// How close, in pulses, a generator's beat must be to a pulse to count as aligned.
pub const ALIGN_EPSILON: f64 = 1e-6;

/// The generators used when a song doesn't author any: a beat against a
/// dotted eighth.
pub fn default_generators() -> Vec<RhythmGenerator> {
    vec![
        RhythmGenerator::new(4.0, 0.0, 1.0),
        RhythmGenerator::new(3.0, 0.0, 0.75),
    ]
}

/// An attack of the resultant rhythm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attack {
    /// Pulse index from the top of the song.
    pub pulse: u64,
    /// Normalised strength in (0, 1].
    pub accent: f64,
}

fn aligned(generator: &RhythmGenerator, pulse: f64) -> bool {
    let remainder = (pulse - generator.phase).rem_euclid(generator.period);
    remainder < ALIGN_EPSILON || generator.period - remainder < ALIGN_EPSILON
}

/// Sum of the weights of every generator aligned with the pulse.
pub fn attack_strength(generators: &[RhythmGenerator], pulse: u64) -> f64 {
    generators
        .iter()
        .filter(|generator| aligned(generator, pulse as f64))
        .map(|generator| generator.weight)
        .sum()
}

/// Computes the resultant rhythm over `pulses` pulses starting at `first_pulse`.
/// Pulses with no strength are not attacks.
pub fn resultant(generators: &[RhythmGenerator], first_pulse: u64, pulses: u64) -> Vec<Attack> {
    let total_weight: f64 = generators
        .iter()
        .map(|generator| generator.weight.max(0.0))
        .sum();
    if total_weight <= 0.0 {
        return Vec::new();
    }

    (first_pulse..first_pulse + pulses)
        .filter_map(|pulse| {
            let strength = attack_strength(generators, pulse);
            if strength > 0.0 {
                Some(Attack {
                    pulse,
                    accent: (strength / total_weight).min(1.0),
                })
            } else {
                None
            }
        })
        .collect()
}
