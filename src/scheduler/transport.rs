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

use serde::Serialize;

use crate::model::TimeSignature;

/// Tick resolution of a beat.
pub const TICKS_PER_BEAT: u32 = 960;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    Stopped,
    Playing,
    Paused,
}

/// Musical position derived from the sample time. Bars and beats count from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub bar: u64,
    pub beat: u32,
    pub tick: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{:03}", self.bar + 1, self.beat + 1, self.tick)
    }
}

/// Loop region in samples, `start` inclusive and `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoopRegion {
    pub start: u64,
    pub end: u64,
}

impl LoopRegion {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Playback position and state.
#[derive(Debug, Clone, PartialEq)]
pub struct Transport {
    sample_time: u64,
    sample_rate: u32,
    tempo: f64,
    time_signature: TimeSignature,
    state: TransportState,
    loop_region: Option<LoopRegion>,
    looping: bool,
}

impl Transport {
    pub fn new(sample_rate: u32, tempo: f64, time_signature: TimeSignature) -> Transport {
        Transport {
            sample_time: 0,
            sample_rate,
            tempo,
            time_signature,
            state: TransportState::Stopped,
            loop_region: None,
            looping: false,
        }
    }

    pub fn sample_time(&self) -> u64 {
        self.sample_time
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn play(&mut self) {
        self.state = TransportState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == TransportState::Playing {
            self.state = TransportState::Paused;
        }
    }

    /// Stops playback and rewinds to the start.
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.sample_time = 0;
    }

    pub fn seek(&mut self, sample_time: u64) {
        self.sample_time = sample_time;
    }

    /// Changes the tempo. Non-positive or non-finite tempos are ignored.
    pub fn set_tempo(&mut self, tempo: f64) -> bool {
        if !tempo.is_finite() || tempo <= 0.0 {
            return false;
        }
        self.tempo = tempo;
        true
    }

    pub fn set_time_signature(&mut self, time_signature: TimeSignature) -> bool {
        if time_signature.numerator == 0 || time_signature.denominator == 0 {
            return false;
        }
        self.time_signature = time_signature;
        true
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) -> bool {
        if sample_rate == 0 {
            return false;
        }
        self.sample_rate = sample_rate;
        true
    }

    /// Sets the loop region and enables looping. Empty regions are rejected.
    pub fn set_loop(&mut self, start: u64, end: u64) -> bool {
        if end <= start {
            return false;
        }
        self.loop_region = Some(LoopRegion { start, end });
        self.looping = true;
        true
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping && self.loop_region.is_some();
    }

    pub fn loop_region(&self) -> Option<LoopRegion> {
        self.loop_region.filter(|_| self.looping)
    }

    pub fn samples_per_beat(&self) -> f64 {
        self.sample_rate as f64 * 60.0 / self.tempo
    }

    pub fn samples_per_bar(&self) -> f64 {
        self.samples_per_beat() * self.time_signature.numerator as f64
    }

    /// Moves forward by `samples` and wraps into the loop region.
    pub fn advance(&mut self, samples: u64) {
        self.sample_time = self.sample_time.saturating_add(samples);
        if let Some(region) = self.loop_region() {
            if self.sample_time >= region.end {
                self.sample_time = region.start + (self.sample_time - region.end) % region.len();
            }
        }
    }

    pub fn bar(&self) -> u64 {
        self.position().bar
    }

    /// The first sample time at which [`Transport::bar`] reports `bar`.
    pub fn bar_start(&self, bar: u64) -> u64 {
        let mut start = (bar as f64 * self.samples_per_bar()).ceil() as u64;
        // Float division can land either side of the boundary.
        while start > 0 && self.position_at(start - 1).bar >= bar {
            start -= 1;
        }
        while start < u64::MAX && self.position_at(start).bar < bar {
            start += 1;
        }
        start
    }

    pub fn position(&self) -> Position {
        self.position_at(self.sample_time)
    }

    fn position_at(&self, sample_time: u64) -> Position {
        let beats = sample_time as f64 / self.samples_per_beat();
        let whole_beats = beats.floor();
        let beats_per_bar = self.time_signature.numerator.max(1) as u64;
        let whole = whole_beats as u64;
        Position {
            bar: whole / beats_per_bar,
            beat: (whole % beats_per_bar) as u32,
            tick: ((beats - whole_beats) * TICKS_PER_BEAT as f64) as u32,
        }
    }
}
