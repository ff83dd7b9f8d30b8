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
use serde::Serialize;

use crate::midi::MidiEvent;

/// What a timeline event does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventKind {
    NoteOn { pitch: u8, velocity: f32 },
    NoteOff { pitch: u8 },
    ParameterChange { param: u32, value: f32 },
}

/// An event on the sample timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineEvent {
    /// Absolute sample time the event is due at.
    pub sample_time: u64,
    /// The voice or role index the event targets.
    pub voice: usize,
    pub kind: EventKind,
    /// Set once the event has been returned by the scheduler.
    pub processed: bool,
}

impl TimelineEvent {
    pub fn new(sample_time: u64, voice: usize, kind: EventKind) -> TimelineEvent {
        TimelineEvent {
            sample_time,
            voice,
            kind,
            processed: false,
        }
    }

    pub fn note_on(voice: usize, pitch: u8, velocity: f32, sample_time: u64) -> TimelineEvent {
        TimelineEvent::new(sample_time, voice, EventKind::NoteOn { pitch, velocity })
    }

    pub fn note_off(voice: usize, pitch: u8, sample_time: u64) -> TimelineEvent {
        TimelineEvent::new(sample_time, voice, EventKind::NoteOff { pitch })
    }

    pub fn parameter_change(
        voice: usize,
        param: u32,
        value: f32,
        sample_time: u64,
    ) -> TimelineEvent {
        TimelineEvent::new(
            sample_time,
            voice,
            EventKind::ParameterChange { param, value },
        )
    }

    /// Converts the event to MIDI placed within a block starting at
    /// `block_start`. Parameters map to controllers when they fit in 7 bits.
    pub fn to_midi(&self, block_start: u64) -> Option<MidiEvent> {
        let offset = self.sample_time.saturating_sub(block_start) as usize;
        match self.kind {
            EventKind::NoteOn { pitch, velocity } => {
                Some(MidiEvent::note_on(offset, self.voice, pitch, velocity))
            }
            EventKind::NoteOff { pitch } => Some(MidiEvent::note_off(offset, self.voice, pitch)),
            EventKind::ParameterChange { param, value } => u8::try_from(param)
                .ok()
                .filter(|controller| *controller < 128)
                .map(|controller| MidiEvent::control(offset, self.voice, controller, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MidiMessageKind;

    #[test]
    fn test_to_midi() {
        let event = TimelineEvent::note_on(2, 64, 1.0, 1100);
        let midi = event.to_midi(1024).expect("note on");
        assert_eq!(midi.offset, 76);
        assert_eq!(midi.role, 2);
        assert_eq!(
            midi.message,
            MidiMessageKind::NoteOn {
                pitch: 64,
                velocity: 127
            }
        );

        let event = TimelineEvent::parameter_change(0, 7, 0.0, 10);
        assert_eq!(
            event.to_midi(0).map(|midi| midi.message),
            Some(MidiMessageKind::Control {
                controller: 7,
                value: 0
            })
        );

        let event = TimelineEvent::parameter_change(0, 300, 0.5, 10);
        assert_eq!(event.to_midi(0), None);
    }
}
