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
//! A fixed pool of voices with stealing.
//!
//! The pool is sized once and recycled forever, so allocation on the audio
//! thread never touches the heap.

use serde::Serialize;
use tracing::debug;

mod policy;

pub use policy::{select_victim, StealPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceState {
    Idle,
    Active,
    Releasing,
}

/// A slot in the voice pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Voice {
    pub index: usize,
    pub state: VoiceState,
    /// Priority tier. Larger values are less important.
    pub priority: u8,
    pub pitch: u8,
    pub velocity: f32,
    pub role: usize,
    pub start_time: u64,
    /// Sample time at which the voice returns to idle.
    pub stop_time: u64,
}

impl Voice {
    fn idle(index: usize) -> Voice {
        Voice {
            index,
            state: VoiceState::Idle,
            priority: 0,
            pitch: 0,
            velocity: 0.0,
            role: 0,
            start_time: 0,
            stop_time: 0,
        }
    }

    fn silence(&mut self) {
        self.state = VoiceState::Idle;
    }
}

pub struct VoiceManager {
    voices: Vec<Voice>,
    stealing: bool,
    policy: StealPolicy,
    /// The voice as it was before the most recent allocation stole it.
    last_stolen: Option<Voice>,
    steals: u64,
}

impl VoiceManager {
    pub fn new(max_polyphony: usize, stealing: bool, policy: StealPolicy) -> VoiceManager {
        VoiceManager {
            voices: (0..max_polyphony).map(Voice::idle).collect(),
            stealing,
            policy,
            last_stolen: None,
            steals: 0,
        }
    }

    pub fn max_polyphony(&self) -> usize {
        self.voices.len()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    pub fn set_stealing(&mut self, stealing: bool) {
        self.stealing = stealing;
    }

    pub fn set_policy(&mut self, policy: StealPolicy) {
        self.policy = policy;
    }

    pub fn policy(&self) -> StealPolicy {
        self.policy
    }

    /// Claims a voice for a note. An idle voice is used when one exists;
    /// otherwise, with stealing enabled, a victim of another role is chosen
    /// by the steal policy. Returns `None` when no voice can be had.
    pub fn allocate_voice(
        &mut self,
        pitch: u8,
        velocity: f32,
        priority: u8,
        role: usize,
        start_time: u64,
        duration: u64,
    ) -> Option<usize> {
        self.last_stolen = None;

        let index = match self
            .voices
            .iter()
            .position(|voice| voice.state == VoiceState::Idle)
        {
            Some(index) => index,
            None if self.stealing => {
                let index = select_victim(self.policy, &self.voices, role, start_time)?;
                let victim = self.voices[index];
                debug!(
                    voice = index,
                    policy = %self.policy,
                    victim_role = victim.role,
                    role,
                    "Stealing voice"
                );
                self.last_stolen = Some(victim);
                self.steals += 1;
                index
            }
            None => return None,
        };

        self.voices[index] = Voice {
            index,
            state: VoiceState::Active,
            priority,
            pitch,
            velocity,
            role,
            start_time,
            stop_time: start_time.saturating_add(duration),
        };
        Some(index)
    }

    /// The voice displaced by the last call to [`VoiceManager::allocate_voice`], if any.
    pub fn last_stolen(&self) -> Option<&Voice> {
        self.last_stolen.as_ref()
    }

    /// Total steals since creation.
    pub fn steals(&self) -> u64 {
        self.steals
    }

    /// Moves an active voice into its release phase, ending at `release_time`.
    pub fn release_voice(&mut self, index: usize, release_time: u64) -> bool {
        match self.voices.get_mut(index) {
            Some(voice) if voice.state == VoiceState::Active => {
                voice.state = VoiceState::Releasing;
                voice.stop_time = release_time;
                true
            }
            _ => false,
        }
    }

    /// Returns every voice whose stop time has been reached to idle.
    pub fn update(&mut self, now: u64) {
        for voice in self.voices.iter_mut() {
            if voice.state != VoiceState::Idle && voice.stop_time <= now {
                voice.silence();
            }
        }
    }

    pub fn stop_all_voices(&mut self) {
        self.voices.iter_mut().for_each(Voice::silence);
    }

    pub fn stop_role_voices(&mut self, role: usize) {
        self.voices
            .iter_mut()
            .filter(|voice| voice.role == role)
            .for_each(Voice::silence);
    }

    pub fn active_count(&self) -> usize {
        self.voices
            .iter()
            .filter(|voice| voice.state != VoiceState::Idle)
            .count()
    }

    /// Sounding voices as a fraction of the pool.
    pub fn utilization(&self) -> f32 {
        if self.voices.is_empty() {
            return 0.0;
        }
        self.active_count() as f32 / self.voices.len() as f32
    }
}

impl std::fmt::Debug for VoiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceManager")
            .field("active_voices", &self.active_count())
            .field("max_polyphony", &self.voices.len())
            .field("stealing", &self.stealing)
            .field("policy", &self.policy)
            .finish()
    }
}
