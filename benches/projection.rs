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
use cadenza::config::EngineSettings;
use cadenza::director::{GraphRenderer, MidiNoteRenderer, PerformanceDirector};
use cadenza::midi::MidiBuffer;
use cadenza::model::{ArrangementStyle, InstrumentRole, Performance, Song};
use cadenza::projection::{project_song, project_song_blend, ProjectionConfig};
use cadenza::voices::StealPolicy;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn song(roles: usize) -> Song {
    let instruments = (0..roles)
        .map(|i| {
            let role = match i % 4 {
                0 => "lead",
                1 => "bass",
                2 => "drums",
                _ => "pad",
            };
            InstrumentRole::new(&format!("{}-{}", role, i), role)
        })
        .collect();
    Song::new("bench", 120.0).with_instruments(instruments)
}

fn benchmark_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");
    let config = ProjectionConfig::default();

    for roles in [4, 8, 16] {
        let song = song(roles);
        let performance = Performance::new("full", 0.8).with_arrangement(ArrangementStyle::Full);
        group.bench_with_input(BenchmarkId::new("project_song", roles), &song, |b, song| {
            b.iter(|| project_song(black_box(song), black_box(&performance), &config).unwrap())
        });
    }

    let song = song(8);
    let calm = Performance::new("calm", 0.2).with_mix("ambient");
    let drive = Performance::new("drive", 0.9).with_mix("drum-forward");
    group.bench_function("project_song_blend", |b| {
        b.iter(|| project_song_blend(&song, &calm, &drive, black_box(0.5), &config).unwrap())
    });

    group.finish();
}

fn benchmark_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("rendering");

    for block_size in [64, 256, 1024] {
        let settings = EngineSettings::default().with_block_size(block_size);
        let (director, mut engine) = PerformanceDirector::new(
            &settings,
            MidiNoteRenderer::new(32, true, StealPolicy::Oldest),
            MidiNoteRenderer::new(32, true, StealPolicy::Oldest),
        )
        .unwrap();
        director.load_song(song(8)).unwrap();
        director.load_performance(Performance::new("full", 0.8)).unwrap();
        director.play();

        let mut out = vec![0.0; block_size];
        let mut midi = MidiBuffer::default();
        group.bench_function(BenchmarkId::new("process", block_size), |b| {
            b.iter(|| {
                engine.process(black_box(&mut out), &mut midi);
                if director.position() > 44100 * 60 {
                    director.seek(0);
                }
            })
        });
    }

    let graph = project_song(&song(8), &Performance::new("full", 0.8), &ProjectionConfig::default())
        .unwrap()
        .graph;
    group.bench_function("midi_note_renderer", |b| {
        let mut renderer = MidiNoteRenderer::new(32, true, StealPolicy::Oldest);
        let mut out = vec![0.0; 512];
        let mut midi = MidiBuffer::default();
        let end = graph.timeline().total_duration();
        let mut position = 0;
        b.iter(|| {
            midi.clear();
            let block = cadenza::director::BlockContext {
                position,
                frames: out.len(),
                sample_rate: 44100,
                offset: 0,
            };
            renderer.render(&graph, &block, &mut out, &mut midi);
            position = (position + out.len() as u64) % end.max(1);
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_projection, benchmark_rendering);
criterion_main!(benches);
