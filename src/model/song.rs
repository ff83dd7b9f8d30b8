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

//! Authored song data, the input side of a projection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The density a song carries before a performance is applied to it.
pub const DEFAULT_SONG_DENSITY: f64 = 0.5;

/// Time signature (numerator/denominator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        TimeSignature {
            numerator,
            denominator,
        }
    }

    /// Get beats per bar.
    pub fn beats_per_bar(&self) -> f64 {
        self.numerator as f64
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature::new(4, 4)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Binds a musical role (e.g. "primary", "bass") to the instrument that plays it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRole {
    /// The role identifier.
    pub role: String,
    /// The instrument type reference, used to pick a bus family.
    pub instrument: String,
}

impl InstrumentRole {
    pub fn new(role: &str, instrument: &str) -> Self {
        InstrumentRole {
            role: role.to_string(),
            instrument: instrument.to_string(),
        }
    }
}

/// A periodic pulse generator. Several generators interfere to form the
/// resultant rhythm of a song.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RhythmGenerator {
    /// Period in pulses.
    pub period: f64,
    /// Phase offset in pulses.
    pub phase: f64,
    /// Contribution of this generator to an attack's strength.
    pub weight: f64,
}

impl RhythmGenerator {
    pub fn new(period: f64, phase: f64, weight: f64) -> Self {
        RhythmGenerator {
            period,
            phase,
            weight,
        }
    }
}

/// A song: tempo, meter, instrumentation and rhythm material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    /// The song identifier.
    pub id: String,
    /// Human readable name.
    pub name: String,
    /// Tempo in beats per minute.
    pub tempo: f64,
    pub time_signature: TimeSignature,
    /// Sample rate the song is projected at.
    pub sample_rate: u32,
    /// Ordered instrument roles. When empty, a default four-role band is used.
    pub instruments: Vec<InstrumentRole>,
    /// Rhythm generators. When empty, a 3:2 interference pair is used.
    pub generators: Vec<RhythmGenerator>,
    /// Tempo multipliers applied positionally to the sections of the form.
    pub section_tempo: Vec<f64>,
    /// Derived from the applied performance, never authored.
    pub density: f64,
    /// Groove profile carried over from the applied performance.
    pub groove_profile: Option<String>,
    /// Mix profile carried over from the applied performance.
    pub mix_profile: Option<String>,
}

impl Song {
    /// Creates a new song in 4/4 at 44.1kHz with default instrumentation.
    pub fn new(id: &str, tempo: f64) -> Song {
        Song {
            id: id.to_string(),
            name: id.to_string(),
            tempo,
            time_signature: TimeSignature::default(),
            sample_rate: 44100,
            instruments: Vec::new(),
            generators: Vec::new(),
            section_tempo: Vec::new(),
            density: DEFAULT_SONG_DENSITY,
            groove_profile: None,
            mix_profile: None,
        }
    }

    pub fn with_time_signature(mut self, time_signature: TimeSignature) -> Song {
        self.time_signature = time_signature;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Song {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_instruments(mut self, instruments: Vec<InstrumentRole>) -> Song {
        self.instruments = instruments;
        self
    }

    pub fn with_generators(mut self, generators: Vec<RhythmGenerator>) -> Song {
        self.generators = generators;
        self
    }

    pub fn with_section_tempo(mut self, section_tempo: Vec<f64>) -> Song {
        self.section_tempo = section_tempo;
        self
    }

    /// The length of one bar in samples at the song's base tempo.
    pub fn bar_samples(&self) -> f64 {
        bar_samples(self.sample_rate, self.tempo, self.time_signature)
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} bpm, {}, {} roles)",
            self.name,
            self.tempo,
            self.time_signature,
            self.instruments.len()
        )
    }
}

/// The length of one bar in samples. Only the numerator counts: a beat is one
/// tempo beat regardless of the denominator.
pub fn bar_samples(sample_rate: u32, tempo: f64, time_signature: TimeSignature) -> f64 {
    sample_rate as f64 * 60.0 / tempo * time_signature.beats_per_bar()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_samples() {
        let song = Song::new("song", 120.0);
        assert_eq!(song.bar_samples(), 88200.0);

        let song = Song::new("song", 90.0)
            .with_time_signature(TimeSignature::new(3, 4))
            .with_sample_rate(48000);
        assert_eq!(song.bar_samples(), 96000.0);
    }

    #[test]
    fn test_display() {
        let song = Song::new("song", 128.0)
            .with_instruments(vec![InstrumentRole::new("primary", "piano")]);
        assert_eq!(format!("{}", song), "song (128 bpm, 4/4, 1 roles)");
    }
}
