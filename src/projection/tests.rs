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
use super::*;
use crate::model::{ArrangementStyle, InstrumentRole, NodeKind, RhythmGenerator, MASTER_BUS_ID};
use crate::testutil::{test_performance, test_song};

#[test]
fn test_valid_projection_has_clean_routing() {
    for density in [0.0, 0.3, 0.7, 1.0] {
        for arrangement in [
            ArrangementStyle::Minimal,
            ArrangementStyle::Standard,
            ArrangementStyle::Full,
        ] {
            let performance = Performance::new("perf", density).with_arrangement(arrangement);
            let config = ProjectionConfig::default();
            assert!(config.validate_graph);
            let result = project_song(&test_song(), &performance, &config).expect("projection");
            let graph = &result.graph;
            assert_eq!(validate_graph(graph), Ok(()));
            assert_eq!(
                detect_circular_routing(graph.nodes(), graph.connections()),
                None
            );
            assert_eq!(
                detect_orphaned_nodes(graph.nodes(), graph.connections()),
                None
            );
        }
    }
}

#[test]
fn test_result_id_is_deterministic() {
    let config = ProjectionConfig::default();
    assert!(config.validate_graph);
    let first = project_song(&test_song(), &test_performance(), &config).expect("first");
    let second = project_song(&test_song(), &test_performance(), &config).expect("second");

    assert_eq!(first.result_id, second.result_id);
    assert_eq!(first.seed, second.seed);
    assert_eq!(first.graph.notes(), second.graph.notes());
    assert_eq!(first.graph.id(), second.graph.id());

    let other = Performance::new("other", 0.5);
    let third = project_song(&test_song(), &other, &config).expect("third");
    assert_ne!(first.result_id, third.result_id);

    let automated = ProjectionConfig {
        include_automation: true,
        ..Default::default()
    };
    let fourth = project_song(&test_song(), &test_performance(), &automated).expect("fourth");
    assert_ne!(first.result_id, fourth.result_id);
}

#[test]
fn test_explicit_seed() {
    let seeded = ProjectionConfig {
        seed: Some(42),
        ..Default::default()
    };
    let result = project_song(&test_song(), &test_performance(), &seeded).expect("seeded");
    assert_eq!(result.seed, 42);

    let again = project_song(&test_song(), &test_performance(), &seeded).expect("again");
    assert_eq!(result.graph.notes(), again.graph.notes());
}

#[test]
fn test_invalid_song() {
    let config = ProjectionConfig::default();

    let err = project_song(&Song::new("", 120.0), &test_performance(), &config)
        .expect_err("empty id");
    assert_eq!(err.kind(), ProjectionErrorKind::InvalidSong);

    for tempo in [0.0, -10.0, f64::NAN] {
        let err = project_song(&Song::new("song", tempo), &test_performance(), &config)
            .expect_err("bad tempo");
        assert_eq!(err.kind(), ProjectionErrorKind::InvalidSong);
        assert!(err.detail().contains("tempo"));
    }

    let song = Song::new("song", 120.0).with_instruments(vec![
        InstrumentRole::new("bass", "bass"),
        InstrumentRole::new("bass", "synth-bass"),
    ]);
    let err = project_song(&song, &test_performance(), &config).expect_err("duplicate role");
    assert_eq!(err.kind(), ProjectionErrorKind::InvalidSong);

    let song =
        Song::new("song", 120.0).with_generators(vec![RhythmGenerator::new(0.0, 0.0, 1.0)]);
    let err = project_song(&song, &test_performance(), &config).expect_err("bad generator");
    assert!(err.detail().starts_with("song.generators[0]"));
}

#[test]
fn test_invalid_performance() {
    let config = ProjectionConfig::default();

    let err = project_song(&test_song(), &Performance::new(" ", 0.5), &config)
        .expect_err("empty id");
    assert_eq!(err.kind(), ProjectionErrorKind::InvalidPerformance);

    for density in [-0.01, 1.01, f64::NAN] {
        let err = project_song(&test_song(), &Performance::new("perf", density), &config)
            .expect_err("bad density");
        assert_eq!(err.kind(), ProjectionErrorKind::InvalidPerformance);
    }
}

#[test]
fn test_zero_bars_fails_generation() {
    let config = ProjectionConfig {
        bars_per_section: 0,
        ..Default::default()
    };
    let err = project_song(&test_song(), &test_performance(), &config).expect_err("no bars");
    assert_eq!(err.kind(), ProjectionErrorKind::GraphGenerationFailed);
}

#[test]
fn test_vanishing_tempo_fails_generation() {
    let config = ProjectionConfig::default();
    for tempo in [1e-12, f64::MIN_POSITIVE] {
        let err = project_song(&Song::new("slow", tempo), &test_performance(), &config)
            .expect_err("timeline too long");
        assert_eq!(err.kind(), ProjectionErrorKind::GraphGenerationFailed);
    }
}

#[test]
fn test_performance_is_applied() {
    let performance = Performance::new("perf", 0.9)
        .with_groove("swing")
        .with_mix("bass-heavy")
        .with_transposition(-2);
    let result =
        project_song(&test_song(), &performance, &ProjectionConfig::default()).expect("projection");

    assert_eq!(result.song.density, 0.9);
    assert_eq!(result.song.groove_profile.as_deref(), Some("swing"));
    assert_eq!(result.song.mix_profile.as_deref(), Some("bass-heavy"));
    assert_eq!(result.song.tempo, test_song().tempo);
    assert!(result
        .graph
        .notes()
        .iter()
        .all(|note| note.transposition == -2));
    assert_eq!(result.graph.bus("bus-bass").map(|bus| bus.gain), Some(1.0));
}

#[test]
fn test_timeline_example() {
    let config = ProjectionConfig {
        validate_graph: true,
        ..Default::default()
    };
    let result =
        project_song(&Song::new("song", 120.0), &test_performance(), &config).expect("projection");
    let timeline = result.graph.timeline();
    let bar: u64 = 44100 * 60 / 120 * 4;

    assert_eq!(timeline.sections.len(), 4);
    assert!(timeline.sections.iter().all(|section| section.bars == 8));
    assert_eq!(timeline.total_duration(), 32 * bar);
    assert!(result
        .graph
        .notes()
        .iter()
        .all(|note| note.start < timeline.total_duration()));
}

#[test]
fn test_graph_shape() {
    let result = project_song(&test_song(), &test_performance(), &ProjectionConfig::default())
        .expect("projection");
    let graph = &result.graph;

    let voices = graph
        .nodes()
        .iter()
        .filter(|node| node.kind == NodeKind::Voice)
        .count();
    let masters: Vec<&str> = graph
        .nodes()
        .iter()
        .filter(|node| node.kind == NodeKind::Master)
        .map(|node| node.id.as_str())
        .collect();
    assert_eq!(voices, graph.voices().len());
    assert_eq!(masters, vec![MASTER_BUS_ID]);
    assert_eq!(graph.song_id(), "test-song");
    assert_eq!(graph.performance_id(), "test-performance");
    assert!(graph.is_playable());
    assert!(graph.automation().is_empty());
    assert!(graph
        .voices()
        .iter()
        .all(|voice| (MIN_POLYPHONY..=MAX_POLYPHONY).contains(&voice.polyphony)));
}

#[test]
fn test_automation_on_request() {
    let config = ProjectionConfig {
        include_automation: true,
        ..Default::default()
    };
    let result = project_song(&test_song(), &test_performance(), &config).expect("projection");
    let voice_buses = result.graph.buses().len() - 1;
    assert_eq!(result.graph.automation().len(), 4 * voice_buses);
}

#[test]
fn test_fingerprint_shape() {
    let (id, _) = fingerprint("proj", &["a", "b"]);
    assert!(id.starts_with("proj-"));
    assert_eq!(id.len(), "proj-".len() + 16);
    // Parts are delimited, so shifting a boundary changes the id.
    assert_ne!(fingerprint("proj", &["ab", ""]).0, fingerprint("proj", &["a", "b"]).0);
}
