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
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Groove profile used when a performance doesn't name one.
pub const DEFAULT_GROOVE_PROFILE: &str = "straight";

/// Mix profile used when a performance doesn't name one.
pub const DEFAULT_MIX_PROFILE: &str = "balanced";

/// How much of the song's instrumentation a performance asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrangementStyle {
    /// Only the primary and bass roles play.
    Minimal,
    /// Every role plays.
    #[default]
    Standard,
    /// Every role plays and every voice bus gets effect sends.
    Full,
}

impl FromStr for ArrangementStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minimal" => Ok(ArrangementStyle::Minimal),
            "standard" => Ok(ArrangementStyle::Standard),
            "full" => Ok(ArrangementStyle::Full),
            _ => Err(format!("unknown arrangement style: {}", s)),
        }
    }
}

impl fmt::Display for ArrangementStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArrangementStyle::Minimal => "minimal",
            ArrangementStyle::Standard => "standard",
            ArrangementStyle::Full => "full",
        };
        f.write_str(name)
    }
}

/// A named interpretation of a song.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    /// The performance identifier. Must not be empty.
    pub id: String,
    /// Human readable name.
    pub name: String,
    /// Note density in [0, 1].
    pub density: f64,
    /// Groove profile reference.
    pub groove_profile: String,
    /// Mix profile reference.
    pub mix_profile: String,
    /// Target arrangement style.
    pub arrangement: ArrangementStyle,
    /// Transposition in semitones, stamped on every assigned note.
    pub transposition: i8,
}

impl Performance {
    /// Creates a new performance with default profiles.
    pub fn new(id: &str, density: f64) -> Performance {
        Performance {
            id: id.to_string(),
            name: id.to_string(),
            density,
            groove_profile: DEFAULT_GROOVE_PROFILE.to_string(),
            mix_profile: DEFAULT_MIX_PROFILE.to_string(),
            arrangement: ArrangementStyle::default(),
            transposition: 0,
        }
    }

    pub fn with_groove(mut self, groove_profile: &str) -> Performance {
        self.groove_profile = groove_profile.to_string();
        self
    }

    pub fn with_mix(mut self, mix_profile: &str) -> Performance {
        self.mix_profile = mix_profile.to_string();
        self
    }

    pub fn with_arrangement(mut self, arrangement: ArrangementStyle) -> Performance {
        self.arrangement = arrangement;
        self
    }

    pub fn with_transposition(mut self, transposition: i8) -> Performance {
        self.transposition = transposition;
        self
    }
}

impl fmt::Display for Performance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (density {:.2}, groove {}, mix {}, {})",
            self.name, self.density, self.groove_profile, self.mix_profile, self.arrangement
        )
    }
}
