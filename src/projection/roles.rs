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

//! Role resolution and voice assignment.

use crate::model::{ArrangementStyle, InstrumentRole, Song, VoiceAssignment};

/// Lowest polyphony a voice assignment may have.
pub const MIN_POLYPHONY: u32 = 4;

/// Highest polyphony a voice assignment may have.
pub const MAX_POLYPHONY: u32 = 64;

/// The family of bus a role is routed to, chosen from its instrument type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusFamily {
    /// High polyphony bus for kits and percussion.
    Drums,
    /// Low polyphony bus for bass instruments.
    Bass,
    Default,
}

impl BusFamily {
    /// Picks the family from an instrument type reference.
    pub fn for_instrument(instrument: &str) -> BusFamily {
        let instrument = instrument.to_lowercase();
        if ["drum", "perc", "kit"]
            .iter()
            .any(|needle| instrument.contains(needle))
        {
            BusFamily::Drums
        } else if instrument.contains("bass") {
            BusFamily::Bass
        } else {
            BusFamily::Default
        }
    }

    pub fn bus_id(&self) -> &'static str {
        match self {
            BusFamily::Drums => "bus-drums",
            BusFamily::Bass => "bus-bass",
            BusFamily::Default => "bus-default",
        }
    }

    pub fn bus_name(&self) -> &'static str {
        match self {
            BusFamily::Drums => "Drums",
            BusFamily::Bass => "Bass",
            BusFamily::Default => "Instruments",
        }
    }

    /// Polyphony before density scaling.
    fn base_polyphony(&self) -> f64 {
        match self {
            BusFamily::Drums => 32.0,
            BusFamily::Bass => 4.0,
            BusFamily::Default => 16.0,
        }
    }
}

/// What a role plays, which decides its pitch policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    /// Follows the melody pattern.
    Primary,
    /// Follows the harmony pattern.
    Secondary,
    /// Holds the root.
    Bass,
    /// Fixed percussive pitch.
    Percussion,
}

impl RoleKind {
    /// Classifies a role by its id, then by the family of its instrument.
    pub fn classify(role: &str, family: BusFamily) -> RoleKind {
        match role.to_lowercase().as_str() {
            "primary" | "melody" | "lead" => RoleKind::Primary,
            "secondary" | "harmony" | "pad" | "chords" => RoleKind::Secondary,
            "bass" => RoleKind::Bass,
            "drums" | "percussion" => RoleKind::Percussion,
            _ => match family {
                BusFamily::Drums => RoleKind::Percussion,
                BusFamily::Bass => RoleKind::Bass,
                BusFamily::Default => RoleKind::Secondary,
            },
        }
    }

    /// Voice stealing priority tier. Larger values are stolen first.
    pub fn priority(&self) -> u8 {
        match self {
            RoleKind::Primary => 0,
            RoleKind::Bass => 1,
            RoleKind::Secondary => 2,
            RoleKind::Percussion => 3,
        }
    }
}

/// A resolved role of the song.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleBinding {
    pub role: String,
    pub instrument: String,
    pub kind: RoleKind,
    pub family: BusFamily,
}

/// The roles used when a song doesn't list any.
pub fn default_instruments() -> Vec<InstrumentRole> {
    vec![
        InstrumentRole::new("primary", "lead"),
        InstrumentRole::new("secondary", "pad"),
        InstrumentRole::new("bass", "bass"),
        InstrumentRole::new("drums", "drums"),
    ]
}

/// Derives the role to instrument map for a song, filtered by arrangement style.
pub fn resolve_roles(song: &Song, arrangement: ArrangementStyle) -> Vec<RoleBinding> {
    let instruments = if song.instruments.is_empty() {
        default_instruments()
    } else {
        song.instruments.clone()
    };

    let roles: Vec<RoleBinding> = instruments
        .into_iter()
        .map(|instrument| {
            let family = BusFamily::for_instrument(&instrument.instrument);
            RoleBinding {
                kind: RoleKind::classify(&instrument.role, family),
                role: instrument.role,
                instrument: instrument.instrument,
                family,
            }
        })
        .collect();

    if arrangement != ArrangementStyle::Minimal {
        return roles;
    }

    let minimal: Vec<RoleBinding> = roles
        .iter()
        .filter(|binding| matches!(binding.kind, RoleKind::Primary | RoleKind::Bass))
        .cloned()
        .collect();

    // A song without a primary or bass role keeps its full band.
    if minimal.is_empty() {
        roles
    } else {
        minimal
    }
}

/// Polyphony for a family at the given density.
pub fn scaled_polyphony(family: BusFamily, density: f64) -> u32 {
    let scaled = (family.base_polyphony() * (0.5 + density)).round() as u32;
    scaled.clamp(MIN_POLYPHONY, MAX_POLYPHONY)
}

/// Builds one voice assignment per role.
pub fn build_voices(roles: &[RoleBinding], density: f64) -> Vec<VoiceAssignment> {
    roles
        .iter()
        .map(|binding| VoiceAssignment {
            id: voice_id(&binding.role),
            role_id: binding.role.clone(),
            instrument: binding.instrument.clone(),
            bus_id: binding.family.bus_id().to_string(),
            polyphony: scaled_polyphony(binding.family, density),
        })
        .collect()
}

/// The voice id for a role.
pub fn voice_id(role: &str) -> String {
    format!("voice-{}", role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_heuristic() {
        assert_eq!(BusFamily::for_instrument("Drum Kit"), BusFamily::Drums);
        assert_eq!(BusFamily::for_instrument("percussion"), BusFamily::Drums);
        assert_eq!(BusFamily::for_instrument("fretless-bass"), BusFamily::Bass);
        assert_eq!(BusFamily::for_instrument("rhodes"), BusFamily::Default);
    }

    #[test]
    fn test_default_roles() {
        let song = Song::new("song", 120.0);
        let roles = resolve_roles(&song, ArrangementStyle::Standard);
        let kinds: Vec<RoleKind> = roles.iter().map(|binding| binding.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RoleKind::Primary,
                RoleKind::Secondary,
                RoleKind::Bass,
                RoleKind::Percussion
            ]
        );
    }

    #[test]
    fn test_minimal_arrangement() {
        let song = Song::new("song", 120.0);
        let roles = resolve_roles(&song, ArrangementStyle::Minimal);
        let names: Vec<&str> = roles.iter().map(|binding| binding.role.as_str()).collect();
        assert_eq!(names, vec!["primary", "bass"]);

        // Nothing would survive, so everything stays.
        let song = Song::new("song", 120.0)
            .with_instruments(vec![InstrumentRole::new("kit", "drums")]);
        let roles = resolve_roles(&song, ArrangementStyle::Minimal);
        assert_eq!(roles.len(), 1);
    }

    #[test]
    fn test_polyphony_bounds() {
        assert_eq!(scaled_polyphony(BusFamily::Bass, 0.0), MIN_POLYPHONY);
        assert_eq!(scaled_polyphony(BusFamily::Default, 0.5), 16);
        assert_eq!(scaled_polyphony(BusFamily::Drums, 1.0), 48);
        for density in [0.0, 0.25, 0.5, 0.75, 1.0] {
            for family in [BusFamily::Drums, BusFamily::Bass, BusFamily::Default] {
                let polyphony = scaled_polyphony(family, density);
                assert!((MIN_POLYPHONY..=MAX_POLYPHONY).contains(&polyphony));
            }
        }
    }

    #[test]
    fn test_voices_route_by_family() {
        let song = Song::new("song", 120.0);
        let roles = resolve_roles(&song, ArrangementStyle::Standard);
        let voices = build_voices(&roles, 0.5);
        assert_eq!(voices.len(), 4);
        assert_eq!(voices[0].id, "voice-primary");
        assert_eq!(voices[0].bus_id, "bus-default");
        assert_eq!(voices[2].bus_id, "bus-bass");
        assert_eq!(voices[3].bus_id, "bus-drums");
    }
}
