//! Threaded engine run: feeds a tone in real time and streams events as
//! JSON lines.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Args;
use eqscope_core::{EqEngine, Event, ParameterId};
use tracing::{info, warn};

use super::common::{load_config, tone, ChainArgs};

#[derive(Args)]
pub struct MonitorArgs {
    #[command(flatten)]
    chain: ChainArgs,

    /// Engine config JSON
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Test tone frequency in Hz
    #[arg(long, default_value = "440")]
    tone: f32,

    /// How long to run, in seconds
    #[arg(long, default_value = "2")]
    seconds: f32,

    /// Sweep the peak gain from -12 to +12 dB over the run
    #[arg(long)]
    sweep_gain: bool,

    /// Only print events of these types (e.g. FiltersUpdated)
    #[arg(long = "only", value_name = "TYPE")]
    only: Vec<String>,
}

pub fn run(args: MonitorArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let sample_rate = config.stream.sample_rate as f32;
    let block_size = config.stream.max_block_size as usize;
    let channels = config.stream.channels as usize;

    let (mut engine, mut processor) = EqEngine::prepare(config)?;
    args.chain.apply_to(engine.params())?;

    let block_duration = Duration::from_secs_f32(block_size as f32 / sample_rate);
    let run_time = Duration::from_secs_f32(args.seconds.max(0.0));
    let started = Instant::now();
    let mut next_block = started;
    let mut position = 0;

    info!(tone = args.tone, seconds = args.seconds, "Monitoring");

    while started.elapsed() < run_time {
        if args.sweep_gain {
            let progress = started.elapsed().as_secs_f32() / run_time.as_secs_f32();
            engine.set_parameter(ParameterId::PeakGain, -12.0 + 24.0 * progress);
        }

        // Stand-in for the host's audio callback
        let block = tone(args.tone, 0.25, block_size, position, sample_rate);
        let mut buffers = vec![block; channels];
        let mut slices: Vec<&mut [f32]> = buffers.iter_mut().map(|b| b.as_mut_slice()).collect();
        processor.process(&mut slices);
        position += block_size;

        while let Some(event) = engine.poll_event() {
            print_event(&event, &args.only)?;
        }

        next_block += block_duration;
        let now = Instant::now();
        if next_block > now {
            thread::sleep(next_block - now);
        } else if now - next_block > block_duration * 4 {
            warn!("Feeding audio slower than real time");
            next_block = now;
        }
    }

    engine.shutdown()?;
    while let Some(event) = engine.poll_event() {
        print_event(&event, &args.only)?;
    }

    Ok(())
}

fn print_event(event: &Event, only: &[String]) -> anyhow::Result<()> {
    let value = serde_json::to_value(event)?;
    let kind = value.get("type").and_then(|t| t.as_str()).unwrap_or_default();
    if only.is_empty() || only.iter().any(|o| o == kind) {
        println!("{}", value);
    }
    Ok(())
}
