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
//! Runtime switching between performances of a song.
//!
//! The director is split in two. [`PerformanceDirector`] lives on the control
//! thread: it validates, projects and publishes snapshots. [`RenderEngine`]
//! lives on the audio thread: it reads the snapshots, renders blocks and
//! carries out crossfades and bar-aligned switches. The halves share only
//! atomically swapped snapshots and atomics; the engine never blocks and
//! hands replaced snapshots back to the control thread to be freed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use crossbeam_channel::Receiver;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, span, Level, Span};

use crate::config::{ConfigError, EngineSettings};
use crate::model::{Performance, RenderGraph, Song};
use crate::projection::{
    project_song, validate_performance, validate_song, ProjectionConfig, ProjectionError,
};
use crate::scheduler::{EventSender, Scheduler, SortedQueue, TimelineEvent, Transport};

mod crossfade;
mod engine;
mod render;


pub use crossfade::{advance_blend, equal_power_gains};
pub use engine::RenderEngine;
pub use render::{BlockContext, GraphRenderer, MidiNoteRenderer};

/// Replaced snapshots waiting to be freed by the control thread.
const RETIRE_CAPACITY: usize = 64;

const NO_SEEK: u64 = u64::MAX;

const CANCEL_NONE: u8 = 0;
const CANCEL_REVERT: u8 = 1;
const CANCEL_COMPLETE: u8 = 2;

const TRANSPORT_NONE: u8 = 0;
const TRANSPORT_PLAY: u8 = 1;
const TRANSPORT_PAUSE: u8 = 2;
const TRANSPORT_STOP: u8 = 3;

#[derive(Debug, thiserror::Error)]
pub enum DirectorError {
    #[error("no song is loaded")]
    NoSongLoaded,
    #[error("unknown performance: {0}")]
    UnknownPerformance(String),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DirectorState {
    /// One graph is playing.
    Idle,
    /// The active graph is fading out while another fades in.
    Crossfading { blend: f64 },
}

/// A projected graph waiting to replace the active one.
struct Switch {
    graph: Arc<RenderGraph>,
    performance: Arc<Performance>,
    /// Crossfade length in seconds. Unused by bar-aligned switches.
    seconds: f64,
    /// Bar at which a bar-aligned switch fires. Unused by crossfades.
    target_bar: u64,
}

/// Snapshots the audio thread let go of. The payloads are never read; they
/// only carry the last reference over to the control thread to be dropped.
#[allow(dead_code)]
enum Retired {
    Graph(Arc<RenderGraph>),
    Performance(Arc<Performance>),
    Switch(Arc<Switch>),
}

/// State shared by the two halves of the director.
struct Shared {
    song: ArcSwapOption<Song>,
    performance: ArcSwapOption<Performance>,
    active: ArcSwapOption<RenderGraph>,
    crossfade: ArcSwapOption<Switch>,
    pending: ArcSwapOption<Switch>,
    cancel: AtomicU8,
    transport: AtomicU8,
    seek: AtomicU64,
    /// Bumped on every song load so the engine can reset its transport.
    song_epoch: AtomicU64,
    /// Events past the lookahead window, drained by the engine as they come
    /// due. The engine only ever try-locks it.
    far: Mutex<SortedQueue>,
    // Published by the engine after every block.
    applied_epoch: AtomicU64,
    /// The lookahead window in samples at the engine's sample rate.
    lookahead: AtomicU64,
    position: AtomicU64,
    bar: AtomicU64,
    blend: AtomicU64,
    crossfading: AtomicBool,
    playing: AtomicBool,
    retire_overflow: AtomicU64,
}

impl Shared {
    fn new(lookahead: u64) -> Shared {
        Shared {
            song: ArcSwapOption::empty(),
            performance: ArcSwapOption::empty(),
            active: ArcSwapOption::empty(),
            crossfade: ArcSwapOption::empty(),
            pending: ArcSwapOption::empty(),
            cancel: AtomicU8::new(CANCEL_NONE),
            transport: AtomicU8::new(TRANSPORT_NONE),
            seek: AtomicU64::new(NO_SEEK),
            song_epoch: AtomicU64::new(0),
            far: Mutex::new(SortedQueue::default()),
            applied_epoch: AtomicU64::new(0),
            lookahead: AtomicU64::new(lookahead),
            position: AtomicU64::new(0),
            bar: AtomicU64::new(0),
            blend: AtomicU64::new(0f64.to_bits()),
            crossfading: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            retire_overflow: AtomicU64::new(0),
        }
    }
}

/// The control half of the director.
pub struct PerformanceDirector {
    shared: Arc<Shared>,
    performances: RwLock<HashMap<String, Arc<Performance>>>,
    projection: ProjectionConfig,
    crossfade: Duration,
    sender: Mutex<Option<EventSender>>,
    retired: Receiver<Retired>,
    last_error: Mutex<Option<String>>,
    span: Span,
}

impl PerformanceDirector {
    /// Creates a director and the render engine that plays for it. The
    /// engine belongs on the audio thread.
    pub fn new<R: GraphRenderer>(
        settings: &EngineSettings,
        deck_a: R,
        deck_b: R,
    ) -> Result<(PerformanceDirector, RenderEngine<R>), ConfigError> {
        let song = Song::new("", 120.0);
        let mut scheduler = Scheduler::new(
            settings.sample_rate(),
            song.tempo,
            song.time_signature,
            settings.event_queue_capacity(),
            settings.lookahead()?,
        );
        let sender = scheduler.take_sender();

        let shared = Arc::new(Shared::new(scheduler.lookahead_samples()));
        let (retire_tx, retire_rx) = crossbeam_channel::bounded(RETIRE_CAPACITY);
        let engine = RenderEngine::new(
            shared.clone(),
            scheduler,
            deck_a,
            deck_b,
            settings.block_size(),
            retire_tx,
        );

        let director = PerformanceDirector {
            shared,
            performances: RwLock::new(HashMap::new()),
            projection: settings.projection(),
            crossfade: settings.crossfade()?,
            sender: Mutex::new(sender),
            retired: retire_rx,
            last_error: Mutex::new(None),
            span: span!(Level::INFO, "director"),
        };
        Ok((director, engine))
    }

    /// Loads a song. If a performance is active, the song is projected with
    /// it and the result replaces the active graph. The transport rewinds.
    pub fn load_song(&self, song: Song) -> Result<(), DirectorError> {
        let _enter = self.span.enter();
        self.collect_retired();

        let result = self.try_load_song(song);
        self.record(result)
    }

    fn try_load_song(&self, song: Song) -> Result<(), DirectorError> {
        validate_song(&song)?;
        let song = Arc::new(song);
        let graph = match self.shared.performance.load_full() {
            Some(performance) => Some(self.project(&song, &performance)?),
            None => None,
        };

        self.shared.song.store(Some(song.clone()));
        self.shared.active.store(graph);
        self.drop_switches();
        self.shared.song_epoch.fetch_add(1, Ordering::AcqRel);

        info!(
            song = song.id,
            tempo = song.tempo,
            time_signature = %song.time_signature,
            "Loaded song"
        );
        Ok(())
    }

    /// Validates a performance and makes it available for switching.
    pub fn register_performance(&self, performance: Performance) -> Result<(), DirectorError> {
        let _enter = self.span.enter();

        let result = validate_performance(&performance)
            .map_err(DirectorError::from)
            .map(|_| {
                info!(performance = performance.id, "Registered performance");
                self.performances
                    .write()
                    .insert(performance.id.clone(), Arc::new(performance));
            });
        self.record(result)
    }

    /// Registers a performance and makes it active immediately.
    pub fn load_performance(&self, performance: Performance) -> Result<(), DirectorError> {
        let _enter = self.span.enter();
        self.collect_retired();

        let result = self.try_load_performance(performance);
        self.record(result)
    }

    fn try_load_performance(&self, performance: Performance) -> Result<(), DirectorError> {
        validate_performance(&performance)?;
        let song = self.shared.song.load_full().ok_or(DirectorError::NoSongLoaded)?;
        let performance = Arc::new(performance);
        let graph = self.project(&song, &performance)?;

        self.performances
            .write()
            .insert(performance.id.clone(), performance.clone());
        self.shared.performance.store(Some(performance.clone()));
        self.shared.active.store(Some(graph));
        self.drop_switches();

        info!(
            song = song.id,
            performance = performance.id,
            "Loaded performance"
        );
        Ok(())
    }

    /// Crossfades from the active graph to a registered performance over
    /// `seconds`. A length of zero or less switches on the next block.
    pub fn switch_to_performance(&self, id: &str, seconds: f64) -> Result<(), DirectorError> {
        let _enter = self.span.enter();
        self.collect_retired();

        let result = self.prepare_switch(id, seconds, 0).map(|switch| {
            self.shared.crossfade.store(Some(Arc::new(switch)));
            info!(performance = id, seconds, "Crossfading to performance");
        });
        self.record(result)
    }

    /// Switches to a registered performance at the start of the next bar,
    /// without a crossfade. Returns the bar the switch is due at.
    pub fn schedule_switch_at_next_bar(&self, id: &str) -> Result<u64, DirectorError> {
        let _enter = self.span.enter();
        self.collect_retired();

        let result = self
            .shared
            .song
            .load_full()
            .ok_or(DirectorError::NoSongLoaded)
            .and_then(|song| self.prepare_switch(id, 0.0, self.upcoming_bar(&song) + 1))
            .map(|switch| {
                let target_bar = switch.target_bar;
                self.shared.pending.store(Some(Arc::new(switch)));
                info!(performance = id, target_bar, "Scheduled switch");
                target_bar
            });
        self.record(result)
    }

    fn prepare_switch(
        &self,
        id: &str,
        seconds: f64,
        target_bar: u64,
    ) -> Result<Switch, DirectorError> {
        let song = self.shared.song.load_full().ok_or(DirectorError::NoSongLoaded)?;
        let performance = self
            .performances
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| DirectorError::UnknownPerformance(id.to_string()))?;
        let graph = self.project(&song, &performance)?;
        Ok(Switch {
            graph,
            performance,
            seconds,
            target_bar,
        })
    }

    /// The sample time the next block starts at, counting transport commands
    /// the engine has not applied yet.
    fn upcoming_position(&self) -> u64 {
        let seek = self.shared.seek.load(Ordering::Acquire);
        if seek != NO_SEEK {
            return seek;
        }
        let reloaded = self.shared.song_epoch.load(Ordering::Acquire)
            != self.shared.applied_epoch.load(Ordering::Acquire);
        if reloaded || self.shared.transport.load(Ordering::Acquire) == TRANSPORT_STOP {
            return 0;
        }
        self.shared.position.load(Ordering::Acquire)
    }

    fn upcoming_bar(&self, song: &Song) -> u64 {
        let mut transport = Transport::new(song.sample_rate, song.tempo, song.time_signature);
        transport.seek(self.upcoming_position());
        transport.bar()
    }

    /// Drops a scheduled bar-aligned switch. Returns false if none was pending.
    pub fn cancel_pending_switch(&self) -> bool {
        let cancelled = self.shared.pending.swap(None).is_some();
        if cancelled {
            info!("Cancelled pending switch");
        }
        cancelled
    }

    /// Ends a crossfade at the next block, either back on the outgoing graph
    /// or on the incoming one.
    pub fn cancel_crossfade(&self, complete: bool) {
        if !complete {
            self.shared.crossfade.store(None);
        }
        let command = if complete {
            CANCEL_COMPLETE
        } else {
            CANCEL_REVERT
        };
        self.shared.cancel.store(command, Ordering::Release);
    }

    /// Forgets requested switches the engine has not started yet and reverts
    /// any crossfade in progress.
    fn drop_switches(&self) {
        self.shared.crossfade.store(None);
        self.shared.pending.store(None);
        self.shared.cancel.store(CANCEL_REVERT, Ordering::Release);
    }

    fn project(
        &self,
        song: &Song,
        performance: &Performance,
    ) -> Result<Arc<RenderGraph>, ProjectionError> {
        project_song(song, performance, &self.projection).map(|result| Arc::new(result.graph))
    }

    fn record<T>(&self, result: Result<T, DirectorError>) -> Result<T, DirectorError> {
        if let Err(e) = &result {
            error!(err = %e, "Director operation failed");
            *self.last_error.lock() = Some(e.to_string());
        }
        result
    }

    pub fn play(&self) {
        self.shared
            .transport
            .store(TRANSPORT_PLAY, Ordering::Release);
    }

    pub fn pause(&self) {
        self.shared
            .transport
            .store(TRANSPORT_PAUSE, Ordering::Release);
    }

    /// Stops playback and rewinds to the start.
    pub fn stop(&self) {
        self.shared
            .transport
            .store(TRANSPORT_STOP, Ordering::Release);
    }

    pub fn seek(&self, sample_time: u64) {
        self.shared
            .seek
            .store(sample_time.min(NO_SEEK - 1), Ordering::Release);
    }

    /// Pushes an event to the engine's scheduler. Events inside the lookahead
    /// window go through the event ring; later ones wait in a sorted list the
    /// engine drains as they come due. Returns false if the ring was full.
    pub fn schedule_event(&self, event: TimelineEvent) -> bool {
        let horizon = self
            .upcoming_position()
            .saturating_add(self.shared.lookahead.load(Ordering::Acquire));
        if event.sample_time >= horizon {
            self.shared.far.lock().insert(event);
            return true;
        }

        let sent = match self.sender.lock().as_mut() {
            Some(sender) => sender.send(event),
            None => false,
        };
        if !sent {
            debug!(
                sample_time = event.sample_time,
                voice = event.voice,
                "Event queue full, dropping event"
            );
        }
        sent
    }

    /// Events waiting in the far-future list.
    pub fn deferred_events(&self) -> usize {
        self.shared.far.lock().len()
    }

    pub fn state(&self) -> DirectorState {
        if self.shared.crossfading.load(Ordering::Acquire) {
            DirectorState::Crossfading {
                blend: f64::from_bits(self.shared.blend.load(Ordering::Acquire)),
            }
        } else {
            DirectorState::Idle
        }
    }

    /// The transport position after the last rendered block.
    pub fn position(&self) -> u64 {
        self.shared.position.load(Ordering::Acquire)
    }

    pub fn current_bar(&self) -> u64 {
        self.shared.bar.load(Ordering::Acquire)
    }

    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }

    pub fn has_pending_switch(&self) -> bool {
        self.shared.pending.load().is_some()
    }

    pub fn song(&self) -> Option<Arc<Song>> {
        self.shared.song.load_full()
    }

    pub fn performance(&self) -> Option<Arc<Performance>> {
        self.shared.performance.load_full()
    }

    pub fn active_graph(&self) -> Option<Arc<RenderGraph>> {
        self.shared.active.load_full()
    }

    /// Ids of every registered performance, sorted.
    pub fn performance_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.performances.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The default crossfade length from the engine settings.
    pub fn default_crossfade(&self) -> Duration {
        self.crossfade
    }

    /// The message of the most recent failed operation.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    pub fn clear_last_error(&self) {
        *self.last_error.lock() = None;
    }

    /// Frees snapshots the engine has retired. Returns how many there were.
    pub fn collect_retired(&self) -> usize {
        self.retired.try_iter().count()
    }

    /// Snapshots the engine had to free itself because the retire queue was full.
    pub fn retire_overflow(&self) -> u64 {
        self.shared.retire_overflow.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for PerformanceDirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceDirector")
            .field("state", &self.state())
            .field("position", &self.position())
            .field("performances", &self.performance_ids())
            .finish()
    }
}
