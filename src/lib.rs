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
//! Compiles songs and performances into render graphs and plays them back.
//!
//! A [`model::Song`] describes what is played and a [`model::Performance`]
//! describes how. [`projection::project_song`] turns the pair into an
//! immutable [`model::RenderGraph`]. At runtime the
//! [`director::PerformanceDirector`] swaps graphs with crossfades or on bar
//! lines while the [`director::RenderEngine`] renders blocks on the audio
//! thread, driven by the [`scheduler::Scheduler`] and the
//! [`voices::VoiceManager`].

pub mod config;
pub mod director;
pub mod midi;
pub mod model;
pub mod projection;
pub mod scheduler;
pub mod voices;

#[cfg(test)]
mod testutil;
