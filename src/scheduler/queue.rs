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
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, PushError, RingBuffer};

use super::event::TimelineEvent;

/// Rounds a requested ring capacity up to a power of two.
pub fn ring_capacity(requested: usize) -> usize {
    requested.max(1).next_power_of_two()
}

/// Creates the near-term event ring. The sender side may live on another
/// thread; the consumer stays with the scheduler.
pub fn event_ring(requested: usize) -> (EventSender, Consumer<TimelineEvent>) {
    let (producer, consumer) = RingBuffer::new(ring_capacity(requested));
    (
        EventSender {
            producer,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        consumer,
    )
}

/// The writing half of the near-term event ring.
pub struct EventSender {
    producer: Producer<TimelineEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventSender {
    /// Pushes an event. A full ring drops the event and returns false.
    pub fn send(&mut self, event: TimelineEvent) -> bool {
        match self.producer.push(event) {
            Ok(()) => true,
            Err(PushError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Free slots in the ring.
    pub fn slots(&self) -> usize {
        self.producer.slots()
    }

    /// Events dropped because the ring was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(super) fn dropped_counter(&self) -> Arc<AtomicU64> {
        self.dropped.clone()
    }
}

impl std::fmt::Debug for EventSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSender")
            .field("slots", &self.producer.slots())
            .field("dropped", &self.dropped())
            .finish()
    }
}

/// Far-future events ordered by sample time. Events with equal times keep
/// their insertion order.
#[derive(Debug, Default)]
pub struct SortedQueue {
    events: VecDeque<TimelineEvent>,
}

impl SortedQueue {
    pub fn with_capacity(capacity: usize) -> SortedQueue {
        SortedQueue {
            events: VecDeque::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, event: TimelineEvent) {
        let index = self
            .events
            .partition_point(|queued| queued.sample_time <= event.sample_time);
        self.events.insert(index, event);
    }

    /// Removes and returns the earliest event if it is due before `end`.
    pub fn pop_before(&mut self, end: u64) -> Option<TimelineEvent> {
        match self.events.front() {
            Some(event) if event.sample_time < end => self.events.pop_front(),
            _ => None,
        }
    }

    pub fn retain(&mut self, keep: impl FnMut(&TimelineEvent) -> bool) {
        self.events.retain(keep);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when another insert would have to grow the queue.
    pub fn is_full(&self) -> bool {
        self.events.len() >= self.events.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineEvent> {
        self.events.iter()
    }
}
