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
use crate::model::{ArrangementStyle, Performance, DEFAULT_GROOVE_PROFILE, DEFAULT_MIX_PROFILE};

/// A YAML representation of a performance.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PerformanceDocument {
    /// The performance identifier.
    id: String,
    /// Display name (default: the id).
    name: Option<String>,
    /// Note density in [0, 1].
    density: f64,
    /// Groove profile: straight, swing, shuffle or laid-back (default: straight).
    groove_profile: Option<String>,
    /// Mix profile: balanced, drum-forward, bass-heavy or ambient (default: balanced).
    mix_profile: Option<String>,
    /// Arrangement style: minimal, standard or full (default: standard).
    arrangement: Option<String>,
    /// Transposition in semitones (default: 0).
    transposition: Option<i8>,
}

impl PerformanceDocument {
    /// Deserializes a file from the path into a performance document.
    pub fn deserialize(path: &Path) -> Result<PerformanceDocument, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<PerformanceDocument>()?)
    }

    /// Serializes the document to YAML at the given path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let serialized = serde_yml::to_string(self)?;
        fs::write(path, serialized)?;
        info!(performance = self.id, path = %path.display(), "Saved performance");
        Ok(())
    }

    /// Converts the document into a performance, checking value ranges.
    pub fn to_performance(&self) -> Result<Performance, ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::invalid("id", "must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.density) {
            return Err(ConfigError::invalid(
                "density",
                format!("{} is outside [0, 1]", self.density),
            ));
        }
        let arrangement = match self.arrangement.as_deref() {
            Some(arrangement) => arrangement
                .parse::<ArrangementStyle>()
                .map_err(|e| ConfigError::invalid("arrangement", e))?,
            None => ArrangementStyle::default(),
        };

        let mut performance = Performance::new(&self.id, self.density)
            .with_groove(self.groove_profile.as_deref().unwrap_or(DEFAULT_GROOVE_PROFILE))
            .with_mix(self.mix_profile.as_deref().unwrap_or(DEFAULT_MIX_PROFILE))
            .with_arrangement(arrangement)
            .with_transposition(self.transposition.unwrap_or(0));
        if let Some(name) = &self.name {
            performance.name = name.clone();
        }
        Ok(performance)
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl From<&Performance> for PerformanceDocument {
    fn from(performance: &Performance) -> Self {
        PerformanceDocument {
            id: performance.id.clone(),
            name: Some(performance.name.clone()),
            density: performance.density,
            groove_profile: Some(performance.groove_profile.clone()),
            mix_profile: Some(performance.mix_profile.clone()),
            arrangement: Some(performance.arrangement.to_string()),
            transposition: Some(performance.transposition),
        }
    }
}
