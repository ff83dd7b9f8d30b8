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
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam_channel::Sender;

use super::crossfade::{advance_blend, equal_power_gains, mix};
use super::render::{BlockContext, GraphRenderer};
use super::{
    Retired, Shared, Switch, CANCEL_COMPLETE, CANCEL_NONE, CANCEL_REVERT, NO_SEEK,
    TRANSPORT_NONE, TRANSPORT_PAUSE, TRANSPORT_PLAY, TRANSPORT_STOP,
};
use crate::midi::MidiBuffer;
use crate::scheduler::Scheduler;

/// The audio half of the director. Call [`RenderEngine::process`] from the
/// audio callback.
///
/// Two decks render side by side during a crossfade. When it completes the
/// incoming deck becomes the active one, so its sounding notes carry on.
pub struct RenderEngine<R: GraphRenderer> {
    shared: Arc<Shared>,
    scheduler: Scheduler,
    deck_a: R,
    deck_b: R,
    /// The switch fading in on deck B.
    incoming: Option<Arc<Switch>>,
    blend: f64,
    song_epoch: u64,
    scratch_a: Vec<f32>,
    scratch_b: Vec<f32>,
    retire: Sender<Retired>,
}

impl<R: GraphRenderer> RenderEngine<R> {
    pub(super) fn new(
        shared: Arc<Shared>,
        scheduler: Scheduler,
        deck_a: R,
        deck_b: R,
        block_size: usize,
        retire: Sender<Retired>,
    ) -> RenderEngine<R> {
        let block_size = block_size.max(1);
        RenderEngine {
            shared,
            scheduler,
            deck_a,
            deck_b,
            incoming: None,
            blend: 0.0,
            song_epoch: 0,
            scratch_a: vec![0.0; block_size],
            scratch_b: vec![0.0; block_size],
            retire,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// The deck playing the active graph.
    pub fn active_deck(&self) -> &R {
        &self.deck_a
    }

    /// Largest block rendered at once. Longer buffers are split.
    pub fn block_size(&self) -> usize {
        self.scratch_a.len()
    }

    /// Renders `out.len()` frames into `out` and replaces the contents of
    /// `midi` with the block's MIDI. Produces silence when nothing is loaded
    /// or the transport is not playing.
    pub fn process(&mut self, out: &mut [f32], midi: &mut MidiBuffer) {
        midi.clear();
        self.apply_commands(midi);

        let mut offset = 0;
        while offset < out.len() {
            let frames = (out.len() - offset)
                .min(self.scratch_a.len())
                .min(self.frames_until_switch());
            self.process_block(&mut out[offset..offset + frames], offset, midi);
            offset += frames;
        }

        self.publish();
    }

    /// Frames left before a pending bar-aligned switch is due, so the block
    /// can be split on the bar line.
    fn frames_until_switch(&self) -> usize {
        let transport = self.scheduler.transport();
        if !transport.is_playing() {
            return usize::MAX;
        }
        match &*self.shared.pending.load() {
            Some(pending) => {
                let start = transport.bar_start(pending.target_bar);
                match start.checked_sub(transport.sample_time()) {
                    Some(frames) if frames > 0 => frames.min(usize::MAX as u64) as usize,
                    _ => usize::MAX,
                }
            }
            None => usize::MAX,
        }
    }

    fn apply_commands(&mut self, midi: &mut MidiBuffer) {
        let epoch = self.shared.song_epoch.load(Ordering::Acquire);
        if epoch != self.song_epoch {
            self.song_epoch = epoch;
            if let Some(song) = &*self.shared.song.load() {
                self.scheduler.set_sample_rate(song.sample_rate);
                self.scheduler.set_tempo(song.tempo);
                self.scheduler.set_time_signature(song.time_signature);
            }
            self.scheduler.seek(0);
            self.reset_decks(0, midi);
            self.shared.applied_epoch.store(epoch, Ordering::Release);
        }

        match self.shared.transport.swap(TRANSPORT_NONE, Ordering::AcqRel) {
            TRANSPORT_PLAY => self.scheduler.play(),
            TRANSPORT_PAUSE => {
                self.scheduler.pause();
                self.reset_decks(0, midi);
            }
            TRANSPORT_STOP => {
                self.scheduler.stop();
                self.reset_decks(0, midi);
            }
            _ => {}
        }

        let seek = self.shared.seek.swap(NO_SEEK, Ordering::AcqRel);
        if seek != NO_SEEK {
            self.scheduler.seek(seek);
        }
    }

    fn process_block(&mut self, out: &mut [f32], offset: usize, midi: &mut MidiBuffer) {
        if !self.scheduler.transport().is_playing() {
            out.fill(0.0);
            return;
        }

        let transport = self.scheduler.transport();
        let block = BlockContext {
            position: transport.sample_time(),
            frames: out.len(),
            sample_rate: transport.sample_rate(),
            offset,
        };

        self.apply_pending_switch(&block, midi);
        self.apply_cancel(&block, midi);
        self.take_crossfade_request(&block, midi);

        let active = self.shared.active.load();
        let mut completed = false;
        match &self.incoming {
            Some(switch) => {
                self.blend =
                    advance_blend(self.blend, block.frames, block.sample_rate, switch.seconds);
                let (gain_a, gain_b) = equal_power_gains(self.blend);
                let a = &mut self.scratch_a[..block.frames];
                let b = &mut self.scratch_b[..block.frames];
                match &*active {
                    Some(graph) => self.deck_a.render(graph, &block, a, midi),
                    None => a.fill(0.0),
                }
                self.deck_b.render(&switch.graph, &block, b, midi);
                mix(out, a, gain_a, b, gain_b);
                completed = self.blend >= 1.0;
            }
            None => match &*active {
                Some(graph) => self.deck_a.render(graph, &block, out, midi),
                None => out.fill(0.0),
            },
        }
        drop(active);

        if completed {
            let last = BlockContext {
                offset: offset + block.frames - 1,
                ..block
            };
            self.complete_crossfade(&last, midi);
        }

        self.admit_far_events(block.position.saturating_add(block.frames as u64));
        for event in self.scheduler.process_events(block.frames as u64) {
            if let Some(mut message) = event.to_midi(block.position) {
                message.offset += offset;
                midi.push(message);
            }
        }
    }

    /// Pulls far-future events that have come within the lookahead window of
    /// the block's end. Skipped for a block if the control thread holds the
    /// list.
    fn admit_far_events(&mut self, block_end: u64) {
        let horizon = block_end.saturating_add(self.scheduler.lookahead_samples());
        if let Some(mut far) = self.shared.far.try_lock() {
            self.scheduler.admit_from(&mut far, horizon);
        }
    }

    /// Executes a bar-aligned switch once its bar has been reached.
    fn apply_pending_switch(&mut self, block: &BlockContext, midi: &mut MidiBuffer) {
        let due = match &*self.shared.pending.load() {
            Some(pending) => self.scheduler.transport().bar() >= pending.target_bar,
            None => false,
        };
        if !due {
            return;
        }
        let Some(switch) = self.shared.pending.swap(None) else {
            return;
        };

        if let Some(incoming) = self.incoming.take() {
            self.deck_b.reset(block, midi);
            self.retire(Retired::Switch(incoming));
        }
        self.blend = 0.0;
        self.deck_a.reset(block, midi);
        self.install(&switch);
        self.retire(Retired::Switch(switch));
    }

    fn apply_cancel(&mut self, block: &BlockContext, midi: &mut MidiBuffer) {
        match self.shared.cancel.swap(CANCEL_NONE, Ordering::AcqRel) {
            CANCEL_REVERT => {
                if let Some(incoming) = self.incoming.take() {
                    self.deck_b.reset(block, midi);
                    self.blend = 0.0;
                    self.retire(Retired::Switch(incoming));
                }
            }
            CANCEL_COMPLETE => {
                if self.incoming.is_some() {
                    self.blend = 1.0;
                    self.complete_crossfade(block, midi);
                }
            }
            _ => {}
        }
    }

    /// Starts a requested crossfade. One already running completes first.
    fn take_crossfade_request(&mut self, block: &BlockContext, midi: &mut MidiBuffer) {
        if self.shared.crossfade.load().is_none() {
            return;
        }
        let Some(request) = self.shared.crossfade.swap(None) else {
            return;
        };

        if self.incoming.is_some() {
            self.complete_crossfade(block, midi);
        }
        self.deck_b.reset(block, midi);
        self.blend = 0.0;
        self.incoming = Some(request);
    }

    fn complete_crossfade(&mut self, block: &BlockContext, midi: &mut MidiBuffer) {
        let Some(switch) = self.incoming.take() else {
            return;
        };
        self.install(&switch);
        std::mem::swap(&mut self.deck_a, &mut self.deck_b);
        self.deck_b.reset(block, midi);
        self.blend = 0.0;
        self.retire(Retired::Switch(switch));
    }

    /// Makes the switch's graph and performance the active snapshots.
    fn install(&mut self, switch: &Switch) {
        if let Some(old) = self.shared.active.swap(Some(switch.graph.clone())) {
            self.retire(Retired::Graph(old));
        }
        if let Some(old) = self
            .shared
            .performance
            .swap(Some(switch.performance.clone()))
        {
            self.retire(Retired::Performance(old));
        }
    }

    fn reset_decks(&mut self, offset: usize, midi: &mut MidiBuffer) {
        let transport = self.scheduler.transport();
        let block = BlockContext {
            position: transport.sample_time(),
            frames: 0,
            sample_rate: transport.sample_rate(),
            offset,
        };
        self.deck_a.reset(&block, midi);
        self.deck_b.reset(&block, midi);
    }

    /// Hands a snapshot to the control thread. If the queue is full the
    /// snapshot is freed here.
    fn retire(&self, retired: Retired) {
        if self.retire.try_send(retired).is_err() {
            self.shared.retire_overflow.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn publish(&self) {
        let transport = self.scheduler.transport();
        self.shared
            .position
            .store(transport.sample_time(), Ordering::Release);
        self.shared.bar.store(transport.bar(), Ordering::Release);
        self.shared
            .lookahead
            .store(self.scheduler.lookahead_samples(), Ordering::Release);
        self.shared
            .playing
            .store(transport.is_playing(), Ordering::Release);
        self.shared
            .crossfading
            .store(self.incoming.is_some(), Ordering::Release);
        self.shared
            .blend
            .store(self.blend.to_bits(), Ordering::Release);
    }
}

impl<R: GraphRenderer> std::fmt::Debug for RenderEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderEngine")
            .field("scheduler", &self.scheduler)
            .field("crossfading", &self.incoming.is_some())
            .field("blend", &self.blend)
            .finish()
    }
}
