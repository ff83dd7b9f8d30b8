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

//! Built-in groove and mix profiles referenced by performances.

use tracing::warn;

use super::roles::BusFamily;

/// Timing feel applied to attack times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrooveProfile {
    Straight,
    /// Odd pulses are pushed a third of a pulse late.
    Swing,
    /// Odd pulses are pushed half a pulse late.
    Shuffle,
    /// Every pulse sits slightly behind the grid.
    LaidBack,
}

impl GrooveProfile {
    /// Resolves a profile reference. Unknown references fall back to straight time.
    pub fn resolve(id: &str) -> GrooveProfile {
        match id.to_lowercase().as_str() {
            "straight" | "" => GrooveProfile::Straight,
            "swing" => GrooveProfile::Swing,
            "shuffle" => GrooveProfile::Shuffle,
            "laid-back" | "laidback" => GrooveProfile::LaidBack,
            _ => {
                warn!(groove = id, "Unknown groove profile, using straight");
                GrooveProfile::Straight
            }
        }
    }

    /// Offset of the given pulse from the grid, in pulses. Always below one pulse.
    pub fn offset(&self, pulse: u64) -> f64 {
        let odd = pulse % 2 == 1;
        match self {
            GrooveProfile::Straight => 0.0,
            GrooveProfile::Swing if odd => 1.0 / 3.0,
            GrooveProfile::Shuffle if odd => 0.5,
            GrooveProfile::Swing | GrooveProfile::Shuffle => 0.0,
            GrooveProfile::LaidBack => 0.1,
        }
    }
}

/// Mixing parameters for one bus family.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMix {
    pub gain: f32,
    pub pan: f32,
    pub muted: bool,
    pub solo: bool,
    pub effects: Vec<String>,
}

impl BusMix {
    fn new(gain: f32, pan: f32) -> Self {
        BusMix {
            gain,
            pan,
            muted: false,
            solo: false,
            effects: Vec::new(),
        }
    }
}

/// Bus balance applied when building buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixProfile {
    Balanced,
    DrumForward,
    BassHeavy,
    /// Drums muted, melodic bus washed in reverb and delay.
    Ambient,
}

impl MixProfile {
    /// Resolves a profile reference. Unknown references fall back to balanced.
    pub fn resolve(id: &str) -> MixProfile {
        match id.to_lowercase().as_str() {
            "balanced" | "" => MixProfile::Balanced,
            "drum-forward" => MixProfile::DrumForward,
            "bass-heavy" => MixProfile::BassHeavy,
            "ambient" => MixProfile::Ambient,
            _ => {
                warn!(mix = id, "Unknown mix profile, using balanced");
                MixProfile::Balanced
            }
        }
    }

    pub fn bus_mix(&self, family: BusFamily) -> BusMix {
        match (self, family) {
            (MixProfile::Balanced, BusFamily::Default) => BusMix::new(0.8, -0.1),
            (MixProfile::Balanced, _) => BusMix::new(0.8, 0.0),
            (MixProfile::DrumForward, BusFamily::Drums) => BusMix::new(1.0, 0.0),
            (MixProfile::DrumForward, BusFamily::Bass) => BusMix::new(0.8, 0.0),
            (MixProfile::DrumForward, BusFamily::Default) => BusMix::new(0.6, -0.1),
            (MixProfile::BassHeavy, BusFamily::Drums) => BusMix::new(0.8, 0.0),
            (MixProfile::BassHeavy, BusFamily::Bass) => BusMix::new(1.0, 0.0),
            (MixProfile::BassHeavy, BusFamily::Default) => BusMix::new(0.7, -0.1),
            (MixProfile::Ambient, BusFamily::Drums) => BusMix {
                muted: true,
                ..BusMix::new(0.5, 0.0)
            },
            (MixProfile::Ambient, BusFamily::Bass) => BusMix::new(0.7, 0.0),
            (MixProfile::Ambient, BusFamily::Default) => BusMix {
                effects: vec!["reverb".to_string(), "delay".to_string()],
                ..BusMix::new(0.9, 0.0)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groove_offsets_stay_within_a_pulse() {
        for groove in [
            GrooveProfile::Straight,
            GrooveProfile::Swing,
            GrooveProfile::Shuffle,
            GrooveProfile::LaidBack,
        ] {
            for pulse in 0..8 {
                let offset = groove.offset(pulse);
                assert!((0.0..1.0).contains(&offset));
            }
        }
        assert_eq!(GrooveProfile::Swing.offset(0), 0.0);
        assert_eq!(GrooveProfile::Shuffle.offset(3), 0.5);
    }

    #[test]
    fn test_unknown_profiles_fall_back() {
        assert_eq!(GrooveProfile::resolve("polka"), GrooveProfile::Straight);
        assert_eq!(MixProfile::resolve("loud"), MixProfile::Balanced);
        assert_eq!(MixProfile::resolve("Drum-Forward"), MixProfile::DrumForward);
    }

    #[test]
    fn test_ambient_mutes_drums() {
        let mix = MixProfile::Ambient.bus_mix(BusFamily::Drums);
        assert!(mix.muted);
        let mix = MixProfile::Ambient.bus_mix(BusFamily::Default);
        assert_eq!(mix.effects, vec!["reverb", "delay"]);
    }
}
