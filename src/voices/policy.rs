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
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Voice, VoiceState};

/// How a victim is chosen when the pool is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StealPolicy {
    /// The voice that started first.
    #[default]
    Oldest,
    /// The voice with the largest priority tier value.
    LowestPriority,
    /// The voice with the lowest velocity.
    Quietest,
    /// The voice that has been sounding the longest at the time of the steal.
    Furthest,
}

impl FromStr for StealPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oldest" => Ok(StealPolicy::Oldest),
            "lowest-priority" => Ok(StealPolicy::LowestPriority),
            "quietest" => Ok(StealPolicy::Quietest),
            "furthest" => Ok(StealPolicy::Furthest),
            _ => Err(format!("unknown steal policy: {}", s)),
        }
    }
}

impl fmt::Display for StealPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StealPolicy::Oldest => "oldest",
            StealPolicy::LowestPriority => "lowest-priority",
            StealPolicy::Quietest => "quietest",
            StealPolicy::Furthest => "furthest",
        };
        write!(f, "{}", name)
    }
}

/// Picks the voice to steal for a note of `role` arriving at `now`. Idle
/// voices and voices playing the same role are never chosen. Ties go to the
/// lowest index.
pub fn select_victim(
    policy: StealPolicy,
    voices: &[Voice],
    role: usize,
    now: u64,
) -> Option<usize> {
    let mut candidates = voices
        .iter()
        .filter(|voice| voice.state != VoiceState::Idle && voice.role != role);

    let victim = match policy {
        StealPolicy::Oldest => candidates.min_by_key(|voice| voice.start_time),
        StealPolicy::LowestPriority => candidates.min_by_key(|voice| Reverse(voice.priority)),
        StealPolicy::Quietest => {
            candidates.min_by(|a, b| a.velocity.total_cmp(&b.velocity))
        }
        StealPolicy::Furthest => {
            candidates.min_by_key(|voice| Reverse(now.saturating_sub(voice.start_time)))
        }
    };
    victim.map(|voice| voice.index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(index: usize, role: usize, priority: u8, velocity: f32, start_time: u64) -> Voice {
        Voice {
            index,
            state: VoiceState::Active,
            priority,
            pitch: 60,
            velocity,
            role,
            start_time,
            stop_time: start_time + 10_000,
        }
    }

    fn pool() -> Vec<Voice> {
        vec![
            voice(0, 0, 0, 0.9, 300),
            voice(1, 1, 3, 0.2, 100),
            voice(2, 2, 1, 0.5, 200),
            voice(3, 3, 3, 0.2, 50),
        ]
    }

    #[test]
    fn test_policies() {
        let voices = pool();
        assert_eq!(select_victim(StealPolicy::Oldest, &voices, 9, 400), Some(3));
        assert_eq!(
            select_victim(StealPolicy::LowestPriority, &voices, 9, 400),
            Some(1)
        );
        assert_eq!(select_victim(StealPolicy::Quietest, &voices, 9, 400), Some(1));
        assert_eq!(select_victim(StealPolicy::Furthest, &voices, 9, 400), Some(3));
    }

    #[test]
    fn test_same_role_is_never_chosen() {
        let voices = pool();
        for policy in [
            StealPolicy::Oldest,
            StealPolicy::LowestPriority,
            StealPolicy::Quietest,
            StealPolicy::Furthest,
        ] {
            let victim = select_victim(policy, &voices, 3, 400).expect("victim");
            assert_ne!(voices[victim].role, 3);
        }

        let same_role: Vec<Voice> = (0..4).map(|index| voice(index, 7, 0, 1.0, 0)).collect();
        assert_eq!(select_victim(StealPolicy::Oldest, &same_role, 7, 10), None);
    }

    #[test]
    fn test_idle_voices_are_not_victims() {
        let mut voices = pool();
        voices[3].state = VoiceState::Idle;
        assert_eq!(select_victim(StealPolicy::Oldest, &voices, 9, 400), Some(1));
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            "lowest-priority".parse::<StealPolicy>(),
            Ok(StealPolicy::LowestPriority)
        );
        assert!("newest".parse::<StealPolicy>().is_err());
        assert_eq!(StealPolicy::Quietest.to_string(), "quietest");
    }
}
