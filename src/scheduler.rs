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
//! Sample-accurate event scheduling.
//!
//! Events close to the playhead travel through a lock-free single producer,
//! single consumer ring so they can be pushed from the control thread while
//! the audio thread drains them. Everything further out waits in a sorted
//! queue owned by the scheduler. [`Scheduler::process_events`] runs once per
//! audio block and returns the events due in that block, each exactly once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rtrb::Consumer;

use crate::model::TimeSignature;

mod event;
mod queue;
mod transport;


pub use event::{EventKind, TimelineEvent};
pub use queue::{ring_capacity, EventSender, SortedQueue};
pub use transport::{LoopRegion, Position, Transport, TransportState, TICKS_PER_BEAT};

/// Converts a lookahead window into samples.
pub fn lookahead_samples(lookahead: Duration, sample_rate: u32) -> u64 {
    (lookahead.as_secs_f64() * sample_rate as f64).round() as u64
}

pub struct Scheduler {
    transport: Transport,
    sender: Option<EventSender>,
    receiver: Consumer<TimelineEvent>,
    queue: SortedQueue,
    /// Events due in the current block. Reused across blocks.
    due: Vec<TimelineEvent>,
    lookahead: Duration,
    dropped: Arc<AtomicU64>,
    expired: u64,
}

impl Scheduler {
    /// Creates a scheduler with a ring of at least `capacity` events.
    pub fn new(
        sample_rate: u32,
        tempo: f64,
        time_signature: TimeSignature,
        capacity: usize,
        lookahead: Duration,
    ) -> Scheduler {
        let (sender, receiver) = queue::event_ring(capacity);
        let capacity = ring_capacity(capacity);
        Scheduler {
            transport: Transport::new(sample_rate, tempo, time_signature),
            dropped: sender.dropped_counter(),
            sender: Some(sender),
            receiver,
            queue: SortedQueue::with_capacity(capacity),
            due: Vec::with_capacity(capacity * 2),
            lookahead,
            expired: 0,
        }
    }

    /// Hands the ring's writing half to another thread. Afterwards, events
    /// scheduled directly on the scheduler always go to the sorted queue.
    pub fn take_sender(&mut self) -> Option<EventSender> {
        self.sender.take()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn play(&mut self) {
        self.transport.play();
    }

    pub fn pause(&mut self) {
        self.transport.pause();
    }

    /// Stops playback and rewinds to 0. Queued events are kept.
    pub fn stop(&mut self) {
        self.transport.stop();
    }

    pub fn seek(&mut self, sample_time: u64) {
        self.transport.seek(sample_time);
    }

    pub fn set_tempo(&mut self, tempo: f64) -> bool {
        self.transport.set_tempo(tempo)
    }

    pub fn set_time_signature(&mut self, time_signature: TimeSignature) -> bool {
        self.transport.set_time_signature(time_signature)
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) -> bool {
        self.transport.set_sample_rate(sample_rate)
    }

    pub fn set_loop(&mut self, start: u64, end: u64) -> bool {
        self.transport.set_loop(start, end)
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.transport.set_looping(looping);
    }

    /// The lookahead window in samples at the current sample rate.
    pub fn lookahead_samples(&self) -> u64 {
        lookahead_samples(self.lookahead, self.transport.sample_rate())
    }

    /// Schedules an event. Events inside the lookahead window go through the
    /// ring while this scheduler still owns its sender. Returns false if the
    /// ring was full and the event was dropped.
    pub fn schedule_event(&mut self, event: TimelineEvent) -> bool {
        let horizon = self
            .transport
            .sample_time()
            .saturating_add(self.lookahead_samples());
        if event.sample_time < horizon {
            if let Some(sender) = self.sender.as_mut() {
                return sender.send(event);
            }
        }
        self.queue.insert(event);
        true
    }

    pub fn schedule_note_on(&mut self, voice: usize, pitch: u8, velocity: f32, time: u64) -> bool {
        self.schedule_event(TimelineEvent::note_on(voice, pitch, velocity, time))
    }

    pub fn schedule_note_off(&mut self, voice: usize, pitch: u8, time: u64) -> bool {
        self.schedule_event(TimelineEvent::note_off(voice, pitch, time))
    }

    pub fn schedule_parameter_change(
        &mut self,
        voice: usize,
        param: u32,
        value: f32,
        time: u64,
    ) -> bool {
        self.schedule_event(TimelineEvent::parameter_change(voice, param, value, time))
    }

    /// Moves events due before `end` out of `far` into the sorted queue
    /// while that needs no allocation. Returns how many were moved.
    pub fn admit_from(&mut self, far: &mut SortedQueue, end: u64) -> usize {
        let mut moved = 0;
        while !self.queue.is_full() {
            let Some(event) = far.pop_before(end) else {
                break;
            };
            self.queue.insert(event);
            moved += 1;
        }
        moved
    }

    /// Removes every event from the sorted queue. Events already in the ring
    /// are not affected.
    pub fn clear_events(&mut self) {
        self.queue.clear();
    }

    /// Removes a voice's events from the sorted queue.
    pub fn clear_voice_events(&mut self, voice: usize) {
        self.queue.retain(|event| event.voice != voice);
    }

    /// Events waiting in the sorted queue.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Events dropped because the ring was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Events discarded because their time had already passed when drained.
    pub fn expired_events(&self) -> u64 {
        self.expired
    }

    /// Collects the events due in `[position, position + samples)`, marks
    /// them processed and advances the transport. Returns nothing unless the
    /// transport is playing. Events that fall before the block are discarded.
    pub fn process_events(&mut self, samples: u64) -> &[TimelineEvent] {
        self.due.clear();
        if !self.transport.is_playing() {
            return &self.due;
        }

        let start = self.transport.sample_time();
        let end = start.saturating_add(samples);

        while let Ok(event) = self.receiver.pop() {
            if event.sample_time >= end {
                self.queue.insert(event);
            } else if event.sample_time >= start {
                push_due(&mut self.due, event);
            } else {
                self.expired += 1;
            }
        }

        while let Some(event) = self.queue.pop_before(end) {
            if event.sample_time >= start {
                push_due(&mut self.due, event);
            } else {
                self.expired += 1;
            }
        }

        self.transport.advance(samples);
        &self.due
    }
}

/// Inserts into the due list by time, keeping arrival order for ties.
fn push_due(due: &mut Vec<TimelineEvent>, mut event: TimelineEvent) {
    event.processed = true;
    let index = due.partition_point(|queued| queued.sample_time <= event.sample_time);
    due.insert(index, event);
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("transport", &self.transport)
            .field("pending", &self.queue.len())
            .field("dropped", &self.dropped_events())
            .field("expired", &self.expired)
            .finish()
    }
}
