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

//! Graph assembly: nodes, routing, resource estimates and automation.

use crate::model::{
    AutomationPoint, BusConfig, BusKind, Connection, GraphNode, NodeKind, ResourceEstimate,
    SectionKind, Timeline, VoiceAssignment, MASTER_BUS_ID,
};

use super::error::ProjectionError;

/// Highest CPU estimate, in percent, a graph may carry and still be playable.
pub const MAX_CPU_PERCENT: f32 = 90.0;

/// Largest voice count a playable graph may have.
pub const MAX_PLAYABLE_VOICES: usize = 100;

const BASE_CPU_PERCENT: f64 = 1.0;
const CPU_PERCENT_PER_VOICE: f64 = 2.0;
const CPU_PERCENT_PER_NOTE: f64 = 0.001;
const BYTES_PER_VOICE: u64 = 1024;
const BYTES_PER_NOTE: u64 = 64;

/// Gain scaling for automation in contrasting sections.
const CONTRAST_ENERGY: f32 = 0.8;

/// Builds one node per voice and per bus, connecting every voice to its bus
/// and every bus except master to master.
pub fn routing(
    voices: &[VoiceAssignment],
    buses: &[BusConfig],
) -> Result<(Vec<GraphNode>, Vec<Connection>), ProjectionError> {
    if voices.is_empty() {
        return Err(ProjectionError::graph_generation_failed(
            "the song has no voices to render",
            "voice assignments: 0",
        ));
    }
    if !buses.iter().any(|bus| bus.id == MASTER_BUS_ID) {
        return Err(ProjectionError::graph_generation_failed(
            "no master bus",
            format!(
                "buses: {}",
                buses
                    .iter()
                    .map(|bus| bus.id.as_str())
                    .collect::<Vec<&str>>()
                    .join(", ")
            ),
        ));
    }

    let mut nodes = Vec::with_capacity(voices.len() + buses.len());
    let mut connections = Vec::with_capacity(voices.len() + buses.len());

    for voice in voices {
        if !buses.iter().any(|bus| bus.id == voice.bus_id) {
            return Err(ProjectionError::graph_generation_failed(
                format!("voice {} targets a missing bus", voice.id),
                format!("voice={} bus={}", voice.id, voice.bus_id),
            ));
        }
        nodes.push(GraphNode::new(&voice.id, NodeKind::Voice));
        connections.push(Connection::new(&voice.id, &voice.bus_id));
    }

    for bus in buses {
        match bus.kind {
            BusKind::Master => nodes.push(GraphNode::new(&bus.id, NodeKind::Master)),
            BusKind::Voice => {
                nodes.push(GraphNode::new(&bus.id, NodeKind::Bus));
                connections.push(Connection::new(&bus.id, MASTER_BUS_ID));
            }
        }
    }

    Ok((nodes, connections))
}

/// Estimates CPU and memory. Returns the estimate, with CPU capped, and
/// whether the uncapped load is playable.
pub fn estimate_resources(voices: usize, notes: usize, density: f64) -> (ResourceEstimate, bool) {
    let raw_cpu = (BASE_CPU_PERCENT
        + CPU_PERCENT_PER_VOICE * voices as f64
        + CPU_PERCENT_PER_NOTE * notes as f64)
        * (0.5 + density);
    let cpu_percent = (raw_cpu as f32).min(MAX_CPU_PERCENT);
    let memory_bytes = BYTES_PER_VOICE * voices as u64 + BYTES_PER_NOTE * notes as u64;
    let playable = voices <= MAX_PLAYABLE_VOICES && raw_cpu <= MAX_CPU_PERCENT as f64;

    (
        ResourceEstimate {
            cpu_percent,
            memory_bytes,
        },
        playable,
    )
}

/// Gain points for every voice bus at the start of every section.
pub fn automation(buses: &[BusConfig], timeline: &Timeline) -> Vec<AutomationPoint> {
    let mut points = Vec::new();
    for section in timeline.sections.iter() {
        let energy = match section.kind {
            SectionKind::Statement => 1.0,
            SectionKind::Contrast => CONTRAST_ENERGY,
        };
        for bus in buses.iter().filter(|bus| bus.kind == BusKind::Voice) {
            points.push(AutomationPoint {
                bus_id: bus.id.clone(),
                sample_time: section.start,
                gain: bus.gain * energy,
            });
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArrangementStyle, Song};
    use crate::projection::buses::build_buses;
    use crate::projection::profiles::MixProfile;
    use crate::projection::roles::{build_voices, resolve_roles};
    use crate::projection::timeline::build_timeline;

    fn parts() -> (Vec<VoiceAssignment>, Vec<BusConfig>) {
        let song = Song::new("song", 120.0);
        let roles = resolve_roles(&song, ArrangementStyle::Standard);
        (
            build_voices(&roles, 0.5),
            build_buses(&roles, MixProfile::Balanced, ArrangementStyle::Standard),
        )
    }

    #[test]
    fn test_routing() {
        let (voices, buses) = parts();
        let (nodes, connections) = routing(&voices, &buses).expect("routing");

        assert_eq!(nodes.len(), voices.len() + buses.len());
        assert_eq!(connections.len(), voices.len() + buses.len() - 1);
        assert!(connections.contains(&Connection::new("voice-drums", "bus-drums")));
        assert!(connections.contains(&Connection::new("bus-drums", MASTER_BUS_ID)));
        assert!(!connections.iter().any(|c| c.from == MASTER_BUS_ID));
    }

    #[test]
    fn test_routing_rejects_missing_bus() {
        let (mut voices, buses) = parts();
        voices[0].bus_id = "bus-nowhere".to_string();
        let err = routing(&voices, &buses).expect_err("missing bus");
        assert!(err.detail().contains("bus-nowhere"));

        let err = routing(&[], &buses).expect_err("no voices");
        assert_eq!(
            err.kind(),
            crate::projection::ProjectionErrorKind::GraphGenerationFailed
        );
    }

    #[test]
    fn test_resource_estimate() {
        let (estimate, playable) = estimate_resources(4, 1000, 0.5);
        assert!((estimate.cpu_percent - 10.0).abs() < 1e-4);
        assert_eq!(estimate.memory_bytes, 4 * 1024 + 1000 * 64);
        assert!(playable);

        let (estimate, playable) = estimate_resources(60, 0, 1.0);
        assert_eq!(estimate.cpu_percent, MAX_CPU_PERCENT);
        assert!(!playable);

        let (_, playable) = estimate_resources(101, 0, 0.0);
        assert!(!playable);
    }

    #[test]
    fn test_automation_follows_sections() {
        let (_, buses) = parts();
        let timeline = build_timeline(&Song::new("song", 120.0), 8).expect("timeline");
        let points = automation(&buses, &timeline);

        assert_eq!(points.len(), 4 * 3);
        let contrast_start = timeline.sections[2].start;
        for point in points.iter().filter(|p| p.sample_time == contrast_start) {
            assert!((point.gain - 0.8 * CONTRAST_ENERGY).abs() < 1e-6);
        }
    }
}
