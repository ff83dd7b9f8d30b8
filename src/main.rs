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
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cadenza::config::{EngineSettings, PerformanceDocument, SongDocument};
use cadenza::director::{MidiNoteRenderer, PerformanceDirector};
use cadenza::midi::MidiBuffer;
use cadenza::model::{Performance, RenderGraph, Song};
use cadenza::projection::{
    detect_orphaned_nodes, project_song, project_song_blend, validate_graph, validate_performance,
    validate_song, ProjectionResult,
};
use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Projects songs into render graphs and plays them back."
)]
struct Cli {
    /// The path to the engine settings.
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Projects a song with a performance and prints the render graph as JSON.
    Project {
        /// The path to the song document.
        song_path: PathBuf,
        /// The path to the performance document.
        performance_path: PathBuf,
        /// Pretty print the output.
        #[arg(short, long)]
        pretty: bool,
    },
    /// Blends two performances of a song and prints the render graph as JSON.
    Blend {
        /// The path to the song document.
        song_path: PathBuf,
        /// The path to the first performance document.
        performance_a_path: PathBuf,
        /// The path to the second performance document.
        performance_b_path: PathBuf,
        /// The blend factor, 0 for the first performance and 1 for the second.
        t: f64,
        /// Pretty print the output.
        #[arg(short, long)]
        pretty: bool,
    },
    /// Validates a song document and, optionally, a performance of it.
    Validate {
        /// The path to the song document.
        song_path: PathBuf,
        /// The path to the performance document.
        performance_path: Option<PathBuf>,
    },
    /// Plays a song offline and prints the MIDI it produces as JSON lines.
    Simulate {
        /// The path to the song document.
        song_path: PathBuf,
        /// The path to the performance document.
        performance_path: PathBuf,
        /// A performance to switch to after the first bar.
        #[arg(long)]
        switch_to: Option<PathBuf>,
        /// The crossfade length for the switch, e.g. 500ms. Defaults to the
        /// engine settings. Ignored with --at-next-bar.
        #[arg(short, long)]
        crossfade: Option<String>,
        /// Switch on the next bar line instead of crossfading.
        #[arg(long)]
        at_next_bar: bool,
        /// The number of bars to play.
        #[arg(short, long, default_value_t = 4)]
        bars: u64,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => EngineSettings::deserialize(path)?,
        None => EngineSettings::default(),
    };

    match cli.command {
        Commands::Project {
            song_path,
            performance_path,
            pretty,
        } => {
            let song = load_song(&song_path)?;
            let performance = load_performance(&performance_path)?;
            let result = project_song(&song, &performance, &settings.projection())?;
            print_result(&result, pretty)?;
        }
        Commands::Blend {
            song_path,
            performance_a_path,
            performance_b_path,
            t,
            pretty,
        } => {
            let song = load_song(&song_path)?;
            let performance_a = load_performance(&performance_a_path)?;
            let performance_b = load_performance(&performance_b_path)?;
            let result = project_song_blend(
                &song,
                &performance_a,
                &performance_b,
                t,
                &settings.projection(),
            )?;
            print_result(&result, pretty)?;
        }
        Commands::Validate {
            song_path,
            performance_path,
        } => {
            let song = load_song(&song_path)?;
            validate_song(&song)?;
            println!("Song {} is valid.", song.id);

            if let Some(performance_path) = performance_path {
                let performance = load_performance(&performance_path)?;
                validate_performance(&performance)?;

                let mut projection = settings.projection();
                projection.validate_graph = false;
                let result = project_song(&song, &performance, &projection)?;
                report_graph(&result.graph)?;
                println!("Performance {} is valid.", performance.id);
            }
        }
        Commands::Simulate {
            song_path,
            performance_path,
            switch_to,
            crossfade,
            at_next_bar,
            bars,
        } => {
            let song = load_song(&song_path)?;
            let performance = load_performance(&performance_path)?;
            let switch = match switch_to {
                Some(path) => Some(load_performance(&path)?),
                None => None,
            };
            let crossfade = match crossfade {
                Some(value) => Some(DurationString::from_string(value)?.into()),
                None => None,
            };
            simulate(&settings, song, performance, switch, crossfade, at_next_bar, bars)?;
        }
    }

    Ok(())
}

fn load_song(path: &Path) -> Result<Song, Box<dyn Error>> {
    Ok(SongDocument::deserialize(path)?.to_song()?)
}

fn load_performance(path: &Path) -> Result<Performance, Box<dyn Error>> {
    Ok(PerformanceDocument::deserialize(path)?.to_performance()?)
}

fn print_result(result: &ProjectionResult, pretty: bool) -> Result<(), Box<dyn Error>> {
    let output = json!({
        "result_id": result.result_id,
        "seed": result.seed,
        "graph": result.graph,
    });
    if pretty {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", serde_json::to_string(&output)?);
    }
    Ok(())
}

/// Prints the routing problems of a graph. Orphaned nodes are reported but
/// do not fail validation.
fn report_graph(graph: &RenderGraph) -> Result<(), Box<dyn Error>> {
    if let Some(orphans) = detect_orphaned_nodes(graph.nodes(), graph.connections()) {
        println!("Orphaned nodes: {}", orphans.join(", "));
    }
    validate_graph(graph)?;

    let resources = graph.resources();
    println!(
        "Graph {}: {} voices, {} buses, {} notes, {:.1}% cpu, {} bytes{}",
        graph.id(),
        graph.voices().len(),
        graph.buses().len(),
        graph.notes().len(),
        resources.cpu_percent,
        resources.memory_bytes,
        if graph.is_playable() {
            ""
        } else {
            " (not playable)"
        },
    );
    Ok(())
}

fn simulate(
    settings: &EngineSettings,
    song: Song,
    performance: Performance,
    switch: Option<Performance>,
    crossfade: Option<Duration>,
    at_next_bar: bool,
    bars: u64,
) -> Result<(), Box<dyn Error>> {
    let (director, mut engine) = PerformanceDirector::new(
        settings,
        MidiNoteRenderer::from_settings(settings),
        MidiNoteRenderer::from_settings(settings),
    )?;

    let bar_samples = song.bar_samples();
    director.load_song(song)?;
    director.load_performance(performance)?;
    let switch_id = match switch {
        Some(switch) => {
            let id = switch.id.clone();
            director.register_performance(switch)?;
            Some(id)
        }
        None => None,
    };
    director.play();

    let block_size = settings.block_size().max(1);
    let mut out = vec![0.0; block_size];
    let mut midi = MidiBuffer::default();
    let end = (bars as f64 * bar_samples).round() as u64;
    let mut switched = false;

    info!(bars, samples = end, "Simulating");
    loop {
        let position = director.position();
        if position >= end {
            break;
        }

        if !switched && director.current_bar() >= 1 {
            if let Some(id) = &switch_id {
                if at_next_bar {
                    director.schedule_switch_at_next_bar(id)?;
                } else {
                    let seconds = crossfade.unwrap_or(director.default_crossfade());
                    director.switch_to_performance(id, seconds.as_secs_f64())?;
                }
            }
            switched = true;
        }

        engine.process(&mut out, &mut midi);
        for event in midi.events() {
            let line = json!({
                "sample_time": position + event.offset as u64,
                "channel": event.channel(),
                "role": event.role,
                "message": event.message,
            });
            println!("{}", serde_json::to_string(&line)?);
        }
        director.collect_retired();
    }

    if midi.dropped() > 0 {
        warn!(dropped = midi.dropped(), "MIDI events were dropped");
    }
    Ok(())
}
