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
use std::fs;
use std::path::Path;

use config::{Config, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::ConfigError;
use crate::model::{InstrumentRole, RhythmGenerator, Song, TimeSignature};

const MAX_TEMPO: f64 = 500.0;
const SUPPORTED_SAMPLE_RATES: [u32; 3] = [44100, 48000, 96000];

/// A YAML representation of a song.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SongDocument {
    /// The song identifier.
    id: String,
    /// Display name (default: the id).
    name: Option<String>,
    /// Tempo in beats per minute, in (0, 500].
    tempo: f64,
    /// Time signature such as "4/4" (default: 4/4).
    time_signature: Option<String>,
    /// Sample rate: 44100, 48000 or 96000 (default: 44100).
    sample_rate: Option<u32>,
    /// Role to instrument bindings (default: primary, secondary, bass and drums).
    #[serde(default)]
    instruments: Vec<InstrumentRole>,
    /// Rhythm generators (default: a 4 against 3 pair).
    #[serde(default)]
    generators: Vec<RhythmGenerator>,
    /// Tempo multipliers for the sections of the form.
    #[serde(default)]
    section_tempo: Vec<f64>,
}

impl SongDocument {
    /// Deserializes a file from the path into a song document.
    pub fn deserialize(path: &Path) -> Result<SongDocument, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<SongDocument>()?)
    }

    /// Serializes the document to YAML at the given path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let serialized = serde_yml::to_string(self)?;
        fs::write(path, serialized)?;
        info!(song = self.id, path = %path.display(), "Saved song");
        Ok(())
    }

    /// Converts the document into a song, checking value ranges.
    pub fn to_song(&self) -> Result<Song, ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::invalid("id", "must not be empty"));
        }
        if !self.tempo.is_finite() || self.tempo <= 0.0 || self.tempo > MAX_TEMPO {
            return Err(ConfigError::invalid(
                "tempo",
                format!("{} is outside (0, {}]", self.tempo, MAX_TEMPO),
            ));
        }
        let sample_rate = self.sample_rate.unwrap_or(SUPPORTED_SAMPLE_RATES[0]);
        if !SUPPORTED_SAMPLE_RATES.contains(&sample_rate) {
            return Err(ConfigError::invalid(
                "sample_rate",
                format!("{} is not one of 44100, 48000, 96000", sample_rate),
            ));
        }
        let time_signature = match self.time_signature.as_deref() {
            Some(time_signature) => parse_time_signature(time_signature)?,
            None => TimeSignature::default(),
        };

        let mut song = Song::new(&self.id, self.tempo)
            .with_time_signature(time_signature)
            .with_sample_rate(sample_rate)
            .with_instruments(self.instruments.clone())
            .with_generators(self.generators.clone())
            .with_section_tempo(self.section_tempo.clone());
        if let Some(name) = &self.name {
            song.name = name.clone();
        }
        Ok(song)
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl From<&Song> for SongDocument {
    fn from(song: &Song) -> Self {
        SongDocument {
            id: song.id.clone(),
            name: Some(song.name.clone()),
            tempo: song.tempo,
            time_signature: Some(song.time_signature.to_string()),
            sample_rate: Some(song.sample_rate),
            instruments: song.instruments.clone(),
            generators: song.generators.clone(),
            section_tempo: song.section_tempo.clone(),
        }
    }
}

/// Parses "N/D" into a time signature.
pub fn parse_time_signature(value: &str) -> Result<TimeSignature, ConfigError> {
    let invalid = || ConfigError::invalid("time_signature", format!("{} is not N/D", value));
    let (numerator, denominator) = value.split_once('/').ok_or_else(invalid)?;
    let numerator: u32 = numerator.trim().parse().map_err(|_| invalid())?;
    let denominator: u32 = denominator.trim().parse().map_err(|_| invalid())?;
    if numerator == 0 || denominator == 0 {
        return Err(invalid());
    }
    Ok(TimeSignature::new(numerator, denominator))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    const SONG: &str = r#"
id: night-drive
name: Night Drive
tempo: 96
time_signature: 3/4
sample_rate: 48000
instruments:
  - role: primary
    instrument: lead
  - role: bass
    instrument: bass
generators:
  - period: 3
    phase: 0
    weight: 1.0
section_tempo: [1.0, 1.0, 1.25, 1.0]
"#;

    #[test]
    fn test_to_song() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("song.yaml");
        fs::write(&path, SONG).unwrap();

        let song = SongDocument::deserialize(&path).unwrap().to_song().unwrap();
        assert_eq!(song.id, "night-drive");
        assert_eq!(song.name, "Night Drive");
        assert_eq!(song.tempo, 96.0);
        assert_eq!(song.time_signature, TimeSignature::new(3, 4));
        assert_eq!(song.sample_rate, 48000);
        assert_eq!(song.instruments.len(), 2);
        assert_eq!(song.generators, vec![RhythmGenerator::new(3.0, 0.0, 1.0)]);
        assert_eq!(song.section_tempo[2], 1.25);
    }

    #[test]
    fn test_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("song.yaml");
        fs::write(&path, "id: short\ntempo: 120\n").unwrap();

        let song = SongDocument::deserialize(&path).unwrap().to_song().unwrap();
        assert_eq!(song.time_signature, TimeSignature::default());
        assert_eq!(song.sample_rate, 44100);
        assert!(song.instruments.is_empty());
    }

    #[test]
    fn test_range_checks() {
        let song = Song::new("song", 120.0);
        let mut document = SongDocument::from(&song);

        document.tempo = 501.0;
        assert!(matches!(
            document.to_song(),
            Err(ConfigError::Invalid { field, .. }) if field == "tempo"
        ));

        document.tempo = 500.0;
        assert!(document.to_song().is_ok());

        document.sample_rate = Some(22050);
        assert!(matches!(
            document.to_song(),
            Err(ConfigError::Invalid { field, .. }) if field == "sample_rate"
        ));

        document.sample_rate = Some(96000);
        document.time_signature = Some("4-4".to_string());
        assert!(document.to_song().is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.yaml");
        let song = Song::new("saved", 140.0).with_section_tempo(vec![1.0, 0.5]);

        SongDocument::from(&song).save(&path).unwrap();
        let loaded = SongDocument::deserialize(&path).unwrap().to_song().unwrap();
        assert_eq!(loaded, song);
    }

    #[test]
    fn test_parse_time_signature() {
        assert_eq!(
            parse_time_signature("7/8").unwrap(),
            TimeSignature::new(7, 8)
        );
        assert!(parse_time_signature("0/4").is_err());
        assert!(parse_time_signature("four").is_err());
    }
}
