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

/// The kind of a projection failure, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionErrorKind {
    InvalidSong,
    InvalidPerformance,
    GraphGenerationFailed,
    CircularRouting,
    OrphanedNodes,
}

impl fmt::Display for ProjectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectionErrorKind::InvalidSong => "invalidSong",
            ProjectionErrorKind::InvalidPerformance => "invalidPerformance",
            ProjectionErrorKind::GraphGenerationFailed => "graphGenerationFailed",
            ProjectionErrorKind::CircularRouting => "circularRouting",
            ProjectionErrorKind::OrphanedNodes => "orphanedNodes",
        };
        f.write_str(name)
    }
}

/// A failed projection. Every variant carries a message meant for users and
/// the raw detail behind it (offending field, cycle path, orphan list).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
    #[error("invalid song: {message}")]
    InvalidSong { message: String, detail: String },

    #[error("invalid performance: {message}")]
    InvalidPerformance { message: String, detail: String },

    #[error("graph generation failed: {message}")]
    GraphGenerationFailed { message: String, detail: String },

    #[error("circular routing: {message}")]
    CircularRouting { message: String, detail: String },

    #[error("orphaned nodes: {message}")]
    OrphanedNodes { message: String, detail: String },
}

impl ProjectionError {
    pub fn invalid_song(message: impl Into<String>, detail: impl Into<String>) -> Self {
        ProjectionError::InvalidSong {
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub fn invalid_performance(message: impl Into<String>, detail: impl Into<String>) -> Self {
        ProjectionError::InvalidPerformance {
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub fn graph_generation_failed(message: impl Into<String>, detail: impl Into<String>) -> Self {
        ProjectionError::GraphGenerationFailed {
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub fn circular_routing(message: impl Into<String>, detail: impl Into<String>) -> Self {
        ProjectionError::CircularRouting {
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub fn orphaned_nodes(message: impl Into<String>, detail: impl Into<String>) -> Self {
        ProjectionError::OrphanedNodes {
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ProjectionErrorKind {
        match self {
            ProjectionError::InvalidSong { .. } => ProjectionErrorKind::InvalidSong,
            ProjectionError::InvalidPerformance { .. } => ProjectionErrorKind::InvalidPerformance,
            ProjectionError::GraphGenerationFailed { .. } => {
                ProjectionErrorKind::GraphGenerationFailed
            }
            ProjectionError::CircularRouting { .. } => ProjectionErrorKind::CircularRouting,
            ProjectionError::OrphanedNodes { .. } => ProjectionErrorKind::OrphanedNodes,
        }
    }

    /// The user facing message.
    pub fn message(&self) -> &str {
        match self {
            ProjectionError::InvalidSong { message, .. }
            | ProjectionError::InvalidPerformance { message, .. }
            | ProjectionError::GraphGenerationFailed { message, .. }
            | ProjectionError::CircularRouting { message, .. }
            | ProjectionError::OrphanedNodes { message, .. } => message,
        }
    }

    /// The raw debug detail.
    pub fn detail(&self) -> &str {
        match self {
            ProjectionError::InvalidSong { detail, .. }
            | ProjectionError::InvalidPerformance { detail, .. }
            | ProjectionError::GraphGenerationFailed { detail, .. }
            | ProjectionError::CircularRouting { detail, .. }
            | ProjectionError::OrphanedNodes { detail, .. } => detail,
        }
    }
}
