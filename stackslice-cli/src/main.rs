//! stackslice command-line interface.
//!
//! This binary slices channel stacks along a line and exports the grid.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand};

use stackslice_core::{
    BilinearProfileExtraction, Channel, GridDescriptor, LineProfileConfig, Point, ProfileLine,
    Quantity,
};
use stackslice_engine::config::{self, EngineConfig};
use stackslice_engine::{partition, CancellationToken, NoProgress, Outcome, SliceTask};
use stackslice_io::{read_stack, write_stack, GridFormat, GridWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    StacksliceIo(#[from] stackslice_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] stackslice_core::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] stackslice_engine::EngineError),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),
}

/// Parallel line-profile slicing for image stacks.
#[derive(Parser)]
#[command(name = "stackslice")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum worker threads (overrides config and STACKSLICE_MAX_WORKERS)
    #[arg(long, global = true)]
    max_workers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Slice every channel of a stack along a line
    Slice {
        /// Input stack file (JSON)
        input: PathBuf,

        /// Line start in pixels, as X,Y
        #[arg(long, value_parser = parse_point)]
        from: Point,

        /// Line end in pixels, as X,Y
        #[arg(long, value_parser = parse_point)]
        to: Point,

        /// Samples along the line (default: one per pixel)
        #[arg(long)]
        samples: Option<usize>,

        /// Physical size of one pixel
        #[arg(long, default_value = "1.0")]
        pixel_size: f64,

        /// Unit of the pixel size
        #[arg(long, default_value = "px")]
        unit: String,

        /// Output file path (.csv for CSV, anything else binary)
        #[arg(short, long)]
        output: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show how items would be split across workers
    Partition {
        /// Number of items
        items: usize,
    },

    /// Show information about a stack file
    Info {
        /// Input stack file (JSON)
        input: PathBuf,
    },

    /// Write a synthetic stack file
    Synthesize {
        /// Output stack file (JSON)
        output: PathBuf,

        /// Number of frames
        #[arg(long, default_value = "32")]
        frames: usize,

        /// Frame width and height in pixels
        #[arg(long, default_value = "128")]
        size: usize,
    },

    /// Benchmark the engine at several worker counts
    Benchmark {
        /// Number of synthetic frames
        #[arg(long, default_value = "256")]
        frames: usize,

        /// Frame width and height in pixels
        #[arg(long, default_value = "256")]
        size: usize,

        /// Number of iterations
        #[arg(short, long, default_value = "3")]
        iterations: usize,
    },
}

fn parse_point(s: &str) -> std::result::Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad X: {e}"))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad Y: {e}"))?;
    Ok(Point::new(x, y))
}

fn load_config(path: Option<&Path>, max_workers: Option<usize>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => {
            let file = std::fs::File::open(path)?;
            serde_json::from_reader(std::io::BufReader::new(file))?
        }
        None => EngineConfig::from_env()?,
    };
    if let Some(path) = path {
        log::debug!("loaded engine config from {}", path.display());
    }
    if let Some(workers) = max_workers {
        config = config.with_max_workers(workers);
    }
    config::set_global(config.clone())?;
    Ok(config)
}

/// Tilted plane with a bump that drifts across the frames.
fn synthetic_stack(frames: usize, size: usize) -> Result<Vec<Channel>> {
    let center = size as f64 / 2.0;
    let sigma = (size as f64 / 8.0).max(1.0);
    (0..frames)
        .map(|f| {
            let drift = f as f64 * 0.5;
            Channel::from_fn(format!("frame-{f}"), size, size, |x, y| {
                let dx = x as f64 - center - drift;
                let dy = y as f64 - center;
                0.01 * x as f64 + 0.02 * y as f64
                    + 5.0 * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
            })
            .map(|c| c.with_quantity(Quantity::new("Height", "nm")))
            .map_err(CliError::from)
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.max_workers)?;

    match cli.command {
        Commands::Slice {
            input,
            from,
            to,
            samples,
            pixel_size,
            unit,
            output,
            verbose,
        } => {
            let channels = read_stack(&input)?;
            if verbose {
                eprintln!("Read {} channels from {}", channels.len(), input.display());
                eprintln!("Max workers: {}", config.max_workers);
            }

            let mut profile = LineProfileConfig::along(ProfileLine::new(from, to));
            if let Some(samples) = samples {
                profile = profile.with_samples(samples);
            }
            let spacing = profile.spacing() * pixel_size;
            let quantity = channels
                .iter()
                .find_map(|c| c.quantity.clone())
                .unwrap_or_else(|| Quantity::new("Value", ""));
            let descriptor =
                GridDescriptor::new(profile.samples, quantity).with_spacing(spacing, unit);
            let extraction = BilinearProfileExtraction::new(profile)?;
            log::info!(
                "slicing {} channels with {} samples",
                channels.len(),
                descriptor.samples
            );

            let handle = SliceTask::new(channels, extraction, descriptor)?.spawn()?;
            let mut last_decile = 0;
            let outcome = handle.wait_with_progress(|done, total| {
                let decile = done * 10 / total.max(1);
                if verbose && decile > last_decile {
                    last_decile = decile;
                    eprintln!("  {}/{} channels", done, total);
                }
            })?;

            let Outcome::Completed(report) = outcome else {
                println!("Cancelled");
                return Ok(());
            };

            let format = GridFormat::from_path(&output);
            let mut writer = GridWriter::create(&output)?;
            writer.write(&report.grid, format)?;

            println!(
                "Sliced {} channels in {:.2}ms",
                report.grid.frames(),
                report.elapsed.as_secs_f64() * 1000.0
            );
            println!("Samples per profile: {}", report.grid.samples());
            println!("Failed channels: {}", report.failures);
            if verbose && report.failures > 0 {
                eprintln!("Missing frames: {:?}", report.grid.missing_frames());
            }
            println!("Wrote {:?} grid to {}", format, output.display());
        }

        Commands::Partition { items } => {
            let ranges = partition(items, config.max_workers)?;
            println!(
                "{} items, max {} workers -> {} ranges",
                items,
                config.max_workers,
                ranges.len()
            );
            for (i, range) in ranges.iter().enumerate() {
                println!("  worker {:<3} {} ({} items)", i, range, range.len());
            }
        }

        Commands::Info { input } => {
            let channels = read_stack(&input)?;
            println!("File: {}", input.display());
            println!("Channels: {}", channels.len());
            for channel in &channels {
                let quantity = channel
                    .quantity
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string);
                match channel.value_range() {
                    Some((lo, hi)) => println!(
                        "  {:<16} {}x{}  {}  range {:.4} - {:.4}",
                        channel.name,
                        channel.width(),
                        channel.height(),
                        quantity,
                        lo,
                        hi
                    ),
                    None => println!(
                        "  {:<16} {}x{}  {}  no finite data",
                        channel.name,
                        channel.width(),
                        channel.height(),
                        quantity
                    ),
                }
            }
        }

        Commands::Synthesize {
            output,
            frames,
            size,
        } => {
            if size == 0 {
                return Err(CliError::Usage("size must be at least 1".to_string()));
            }
            let channels = synthetic_stack(frames, size)?;
            write_stack(&output, &channels)?;
            println!(
                "Wrote {} frames of {}x{} to {}",
                frames,
                size,
                size,
                output.display()
            );
        }

        Commands::Benchmark {
            frames,
            size,
            iterations,
        } => {
            if size < 2 || iterations == 0 {
                return Err(CliError::Usage(
                    "size must be at least 2 and iterations at least 1".to_string(),
                ));
            }
            let channels = synthetic_stack(frames, size)?;
            let edge = (size - 1) as f64;
            let line = ProfileLine::new(Point::new(0.0, 0.0), Point::new(edge, edge));
            let profile = LineProfileConfig::along(line);

            println!(
                "Benchmarking {} frames of {}x{}, {} samples, {} iterations",
                frames, size, size, profile.samples, iterations
            );
            println!(
                "{:<10} | {:<15} | {:<15} | {:<15}",
                "Workers", "Mean Time (ms)", "Min Time (ms)", "Max Time (ms)"
            );
            println!("{:-<65}", "");

            let mut worker_counts = vec![1usize];
            while let Some(&last) = worker_counts.last() {
                let next = last * 2;
                if next > config.max_workers {
                    break;
                }
                worker_counts.push(next);
            }
            if worker_counts.last() != Some(&config.max_workers) {
                worker_counts.push(config.max_workers);
            }

            for workers in worker_counts {
                let extraction = BilinearProfileExtraction::new(profile.clone())?;
                let descriptor =
                    GridDescriptor::new(profile.samples, Quantity::new("Height", "nm"));
                let task = SliceTask::new(channels.clone(), extraction, descriptor)?
                    .with_config(config.clone().with_max_workers(workers));

                let mut times = Vec::with_capacity(iterations);
                for _ in 0..iterations {
                    let start = Instant::now();
                    let outcome = task.run(&NoProgress, &CancellationToken::new())?;
                    if outcome.is_cancelled() {
                        return Err(CliError::Usage("benchmark run was cancelled".to_string()));
                    }
                    times.push(start.elapsed().as_secs_f64() * 1000.0);
                }

                let min_time = times.iter().fold(f64::INFINITY, |a, &b| a.min(b));
                let max_time = times.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
                let mean_time = times.iter().sum::<f64>() / times.len() as f64;

                println!(
                    "{:<10} | {:<15.2} | {:<15.2} | {:<15.2}",
                    workers, mean_time, min_time, max_time
                );
            }
        }
    }

    Ok(())
}
