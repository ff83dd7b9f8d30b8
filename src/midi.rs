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
//! MIDI produced by the render engine.
//!
//! Events carry a frame offset into the block they were produced in, so an
//! external consumer can place them sample-accurately.

use midly::{
    live::LiveEvent,
    num::{u4, u7},
    MidiMessage,
};
use serde::Serialize;

/// Default capacity of a block's MIDI buffer.
pub const DEFAULT_MIDI_CAPACITY: usize = 1024;

/// A channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MidiMessageKind {
    NoteOn { pitch: u8, velocity: u8 },
    NoteOff { pitch: u8 },
    Control { controller: u8, value: u8 },
}

/// A MIDI message placed within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MidiEvent {
    /// Frames from the start of the block.
    pub offset: usize,
    /// The role index the event belongs to. Used as the channel.
    pub role: usize,
    pub message: MidiMessageKind,
}

impl MidiEvent {
    pub fn note_on(offset: usize, role: usize, pitch: u8, velocity: f32) -> MidiEvent {
        MidiEvent {
            offset,
            role,
            message: MidiMessageKind::NoteOn {
                pitch,
                velocity: velocity_to_midi(velocity),
            },
        }
    }

    pub fn note_off(offset: usize, role: usize, pitch: u8) -> MidiEvent {
        MidiEvent {
            offset,
            role,
            message: MidiMessageKind::NoteOff { pitch },
        }
    }

    pub fn control(offset: usize, role: usize, controller: u8, value: f32) -> MidiEvent {
        MidiEvent {
            offset,
            role,
            message: MidiMessageKind::Control {
                controller,
                value: velocity_to_midi(value),
            },
        }
    }

    /// The MIDI channel, 0 based. Roles beyond 16 share channels.
    pub fn channel(&self) -> u8 {
        (self.role % 16) as u8
    }

    /// Converts the event into a live MIDI event.
    pub fn to_live_event(&self) -> LiveEvent<'static> {
        let message = match self.message {
            MidiMessageKind::NoteOn { pitch, velocity } => MidiMessage::NoteOn {
                key: u7::from(pitch.min(127)),
                vel: u7::from(velocity.min(127)),
            },
            MidiMessageKind::NoteOff { pitch } => MidiMessage::NoteOff {
                key: u7::from(pitch.min(127)),
                vel: u7::from(0),
            },
            MidiMessageKind::Control { controller, value } => MidiMessage::Controller {
                controller: u7::from(controller.min(127)),
                value: u7::from(value.min(127)),
            },
        };
        LiveEvent::Midi {
            channel: u4::from(self.channel()),
            message,
        }
    }
}

/// Scales a [0, 1] value to a MIDI data byte.
pub fn velocity_to_midi(value: f32) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 127.0).round() as u8
}

/// A fixed capacity buffer of MIDI events for one block, ordered by offset.
/// Pushing into a full buffer drops the event, so the buffer never grows on
/// the audio thread.
#[derive(Debug)]
pub struct MidiBuffer {
    events: Vec<MidiEvent>,
    capacity: usize,
    dropped: u64,
}

impl MidiBuffer {
    pub fn new(capacity: usize) -> MidiBuffer {
        MidiBuffer {
            events: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Adds an event after any events at the same offset. Returns false if
    /// the buffer was full.
    pub fn push(&mut self, event: MidiEvent) -> bool {
        if self.events.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        let index = self
            .events
            .partition_point(|queued| queued.offset <= event.offset);
        self.events.insert(index, event);
        true
    }

    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total events dropped since the buffer was created.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Empties the buffer, keeping its allocation.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for MidiBuffer {
    fn default() -> Self {
        MidiBuffer::new(DEFAULT_MIDI_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_event_conversion() {
        let event = MidiEvent::note_on(12, 17, 60, 1.0);
        assert_eq!(event.channel(), 1);
        assert_eq!(
            event.to_live_event(),
            LiveEvent::Midi {
                channel: u4::from(1),
                message: MidiMessage::NoteOn {
                    key: u7::from(60),
                    vel: u7::from(127),
                },
            }
        );

        let event = MidiEvent::note_off(0, 3, 200);
        assert_eq!(
            event.to_live_event(),
            LiveEvent::Midi {
                channel: u4::from(3),
                message: MidiMessage::NoteOff {
                    key: u7::from(127),
                    vel: u7::from(0),
                },
            }
        );
    }

    #[test]
    fn test_velocity_to_midi() {
        assert_eq!(velocity_to_midi(0.0), 0);
        assert_eq!(velocity_to_midi(0.5), 64);
        assert_eq!(velocity_to_midi(2.0), 127);
        assert_eq!(velocity_to_midi(-1.0), 0);
        assert_eq!(velocity_to_midi(f32::NAN), 0);
    }

    #[test]
    fn test_buffer_orders_by_offset() {
        let mut buffer = MidiBuffer::new(8);
        buffer.push(MidiEvent::note_on(10, 0, 60, 0.5));
        buffer.push(MidiEvent::note_off(10, 0, 62));
        buffer.push(MidiEvent::note_on(3, 1, 48, 0.5));

        let order: Vec<(usize, u8)> = buffer
            .events()
            .iter()
            .map(|event| (event.offset, event.channel()))
            .collect();
        assert_eq!(order, vec![(3, 1), (10, 0), (10, 0)]);
        assert_eq!(
            buffer.events()[2].message,
            MidiMessageKind::NoteOff { pitch: 62 }
        );
    }

    #[test]
    fn test_buffer_drops_when_full() {
        let mut buffer = MidiBuffer::new(2);
        assert!(buffer.push(MidiEvent::note_on(5, 0, 60, 0.5)));
        assert!(buffer.push(MidiEvent::note_off(1, 0, 60)));
        assert!(!buffer.push(MidiEvent::note_on(2, 0, 62, 0.5)));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.dropped(), 1);
        assert_eq!(buffer.events()[0].offset, 1);

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.dropped(), 1);
    }
}
