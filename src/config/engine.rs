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
use std::path::Path;
use std::time::Duration;

use config::{Config, File};
use duration_string::DurationString;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::projection::{ProjectionConfig, DEFAULT_BARS_PER_SECTION};
use crate::scheduler::ring_capacity;
use crate::voices::StealPolicy;

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_BLOCK_SIZE: usize = 512;
const DEFAULT_LOOKAHEAD: Duration = Duration::from_millis(50);
const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1024;
const DEFAULT_MAX_POLYPHONY: usize = 32;
const DEFAULT_CROSSFADE: Duration = Duration::from_secs(2);

/// A YAML representation of the playback engine settings. Every field is
/// optional and falls back to a default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EngineSettings {
    /// Sample rate of the engine (default: 44100)
    sample_rate: Option<u32>,
    /// Largest block the render engine processes at once (default: 512)
    block_size: Option<usize>,
    /// How far ahead of the playhead events go through the lock-free ring (default: 50ms)
    lookahead: Option<String>,
    /// Requested ring capacity, rounded up to a power of two (default: 1024)
    event_queue_capacity: Option<usize>,
    /// Voices per renderer (default: 32)
    max_polyphony: Option<usize>,
    /// Whether full pools steal voices (default: true)
    voice_stealing: Option<bool>,
    /// Victim selection when stealing (default: oldest)
    steal_policy: Option<StealPolicy>,
    /// Default crossfade length for performance switches (default: 2s)
    crossfade: Option<String>,
    /// Run routing checks on projected graphs (default: true)
    validate_graph: Option<bool>,
    /// Emit gain automation on projected graphs (default: false)
    include_automation: Option<bool>,
    /// Seed for note assignment. Derived from the inputs when unset.
    seed: Option<u64>,
    /// Bars in each section of the form (default: 8)
    bars_per_section: Option<u32>,
}

impl EngineSettings {
    /// Reads engine settings from a file. The format follows the extension.
    pub fn deserialize(path: &Path) -> Result<EngineSettings, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<EngineSettings>()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks every value that can be checked without a song.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate() == 0 {
            return Err(ConfigError::invalid("sample_rate", "must be positive"));
        }
        if self.block_size() == 0 {
            return Err(ConfigError::invalid("block_size", "must be positive"));
        }
        if self.max_polyphony() == 0 {
            return Err(ConfigError::invalid("max_polyphony", "must be positive"));
        }
        self.lookahead()?;
        self.crossfade()?;
        Ok(())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    pub fn block_size(&self) -> usize {
        self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE)
    }

    pub fn lookahead(&self) -> Result<Duration, ConfigError> {
        parse_duration("lookahead", self.lookahead.as_deref(), DEFAULT_LOOKAHEAD)
    }

    /// The ring capacity actually allocated.
    pub fn event_queue_capacity(&self) -> usize {
        ring_capacity(
            self.event_queue_capacity
                .unwrap_or(DEFAULT_EVENT_QUEUE_CAPACITY),
        )
    }

    pub fn max_polyphony(&self) -> usize {
        self.max_polyphony.unwrap_or(DEFAULT_MAX_POLYPHONY)
    }

    pub fn voice_stealing(&self) -> bool {
        self.voice_stealing.unwrap_or(true)
    }

    pub fn steal_policy(&self) -> StealPolicy {
        self.steal_policy.unwrap_or_default()
    }

    pub fn crossfade(&self) -> Result<Duration, ConfigError> {
        parse_duration("crossfade", self.crossfade.as_deref(), DEFAULT_CROSSFADE)
    }

    /// Projection options derived from these settings.
    pub fn projection(&self) -> ProjectionConfig {
        ProjectionConfig {
            validate_graph: self.validate_graph.unwrap_or(true),
            include_automation: self.include_automation.unwrap_or(false),
            seed: self.seed,
            bars_per_section: self.bars_per_section.unwrap_or(DEFAULT_BARS_PER_SECTION),
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> EngineSettings {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> EngineSettings {
        self.block_size = Some(block_size);
        self
    }

    pub fn with_lookahead(mut self, lookahead: &str) -> EngineSettings {
        self.lookahead = Some(lookahead.to_string());
        self
    }

    pub fn with_event_queue_capacity(mut self, capacity: usize) -> EngineSettings {
        self.event_queue_capacity = Some(capacity);
        self
    }

    pub fn with_max_polyphony(mut self, max_polyphony: usize) -> EngineSettings {
        self.max_polyphony = Some(max_polyphony);
        self
    }

    pub fn with_steal_policy(mut self, policy: StealPolicy) -> EngineSettings {
        self.steal_policy = Some(policy);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> EngineSettings {
        self.seed = Some(seed);
        self
    }
}

fn parse_duration(
    field: &str,
    value: Option<&str>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => DurationString::from_string(value.to_string())
            .map(Duration::from)
            .map_err(|_| ConfigError::Duration {
                field: field.to_string(),
                value: value.to_string(),
            }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use config::FileFormat;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.sample_rate(), 44100);
        assert_eq!(settings.block_size(), 512);
        assert_eq!(settings.lookahead().unwrap(), Duration::from_millis(50));
        assert_eq!(settings.event_queue_capacity(), 1024);
        assert_eq!(settings.max_polyphony(), 32);
        assert!(settings.voice_stealing());
        assert_eq!(settings.steal_policy(), StealPolicy::Oldest);
        assert_eq!(settings.crossfade().unwrap(), Duration::from_secs(2));
        assert_eq!(settings.projection(), ProjectionConfig::default());
    }

    #[test]
    fn test_deserialize_str() {
        let yaml = r#"
            sample_rate: 48000
            lookahead: 20ms
            event_queue_capacity: 1000
            steal_policy: lowest-priority
            crossfade: 500ms
            include_automation: true
            seed: 7
        "#;

        let settings: EngineSettings = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.sample_rate(), 48000);
        assert_eq!(settings.lookahead().unwrap(), Duration::from_millis(20));
        assert_eq!(settings.event_queue_capacity(), 1024);
        assert_eq!(settings.steal_policy(), StealPolicy::LowestPriority);
        assert_eq!(settings.crossfade().unwrap(), Duration::from_millis(500));
        assert!(settings.projection().include_automation);
        assert_eq!(settings.projection().seed, Some(7));
    }

    #[test]
    fn test_deserialize_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        fs::write(&path, "block_size: 256\nmax_polyphony: 8\n").unwrap();

        let settings = EngineSettings::deserialize(&path).unwrap();
        assert_eq!(settings.block_size(), 256);
        assert_eq!(settings.max_polyphony(), 8);
    }

    #[test]
    fn test_invalid_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.yaml");

        fs::write(&path, "crossfade: soon\n").unwrap();
        assert!(matches!(
            EngineSettings::deserialize(&path),
            Err(ConfigError::Duration { .. })
        ));

        fs::write(&path, "block_size: 0\n").unwrap();
        assert!(matches!(
            EngineSettings::deserialize(&path),
            Err(ConfigError::Invalid { .. })
        ));

        assert!(matches!(
            EngineSettings::deserialize(&dir.path().join("missing.yaml")),
            Err(ConfigError::Load(_))
        ));
    }
}
