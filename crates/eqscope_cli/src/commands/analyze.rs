//! Offline analysis command: synthetic tone -> processor -> analyzer.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use eqscope_core::{Pipeline, Point, RenderPath};
use eqscope_dsp::{map_to_log10, MAX_FREQUENCY, MIN_FREQUENCY};
use tracing::info;

use super::common::{load_config, tone, ChainArgs};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum AnalyzeFormat {
    /// Spectrum polyline as JSON
    Path,
    /// Loudest points, converted back to Hz and dB
    Peaks,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    chain: ChainArgs,

    /// Engine config JSON (sample rate, fft order, plot bounds, ...)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Test tone frequency in Hz (repeatable for a chord)
    #[arg(long = "tone", default_values_t = vec![1000.0])]
    tones: Vec<f32>,

    /// Amplitude of each tone (0.0 - 1.0)
    #[arg(long, default_value = "0.25")]
    amplitude: f32,

    /// Length of the run in seconds
    #[arg(long, default_value = "0.5")]
    seconds: f32,

    /// Channel whose spectrum is printed
    #[arg(long, default_value = "0")]
    channel: usize,

    #[arg(long, value_enum, default_value = "peaks")]
    format: AnalyzeFormat,

    /// Number of peaks to print
    #[arg(long, default_value = "5")]
    peaks: usize,
}

pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mut pipeline = Pipeline::prepare(&config)?;
    args.chain.apply_to(&pipeline.params)?;

    let sample_rate = config.stream.sample_rate as f32;
    let block_size = config.stream.max_block_size as usize;
    let channels = config.stream.channels as usize;
    let total_frames = (args.seconds.max(0.0) * sample_rate) as usize;

    // Tick at the configured refresh rate in audio time
    let frames_per_tick = (sample_rate / config.refresh_hz as f32).max(1.0) as usize;
    let mut frames_since_tick = frames_per_tick;

    let mut position = 0;
    let mut ticks = 0;
    while position < total_frames {
        if frames_since_tick >= frames_per_tick {
            pipeline.analyzer.tick();
            frames_since_tick = 0;
            ticks += 1;
        }

        let frames = block_size.min(total_frames - position);
        let mut mono = vec![0.0_f32; frames];
        for frequency in &args.tones {
            for (out, s) in mono
                .iter_mut()
                .zip(tone(*frequency, args.amplitude, frames, position, sample_rate))
            {
                *out += s;
            }
        }

        let mut buffers: Vec<Vec<f32>> = vec![mono; channels];
        let mut slices: Vec<&mut [f32]> = buffers.iter_mut().map(|b| b.as_mut_slice()).collect();
        pipeline.processor.process(&mut slices);

        position += frames;
        frames_since_tick += frames;
    }
    let summary = pipeline.analyzer.tick();
    info!(
        frames = total_frames,
        ticks = ticks + 1,
        last_tick_blocks = summary.blocks_consumed,
        "Analysis finished"
    );

    let path = pipeline
        .analyzer
        .get_spectrum_path(args.channel)
        .ok_or_else(|| anyhow::anyhow!("No channel {} (stream has {})", args.channel, channels))?;

    if path.is_empty() {
        anyhow::bail!(
            "No spectrum yet: run longer than one FFT window ({} samples)",
            config.fft_order.fft_size()
        );
    }

    match args.format {
        AnalyzeFormat::Path => println!("{}", serde_json::to_string(&*path)?),
        AnalyzeFormat::Peaks => print_peaks(&path, &config, args.peaks),
    }

    Ok(())
}

fn print_peaks(path: &RenderPath, config: &eqscope_core::EngineConfig, count: usize) {
    let bounds = config.plot;
    let floor = config.negative_infinity_db as f64;

    let to_hz = |p: &Point| {
        map_to_log10(
            ((p.x - bounds.x) / bounds.width) as f64,
            MIN_FREQUENCY as f64,
            MAX_FREQUENCY as f64,
        )
    };
    // y runs from 0 dB at the top to the floor at the bottom
    let to_db = |p: &Point| floor * ((p.y - bounds.top()) / bounds.height) as f64;

    // Local maxima; smaller y is louder
    let points = path.points();
    let mut peaks: Vec<&Point> = points
        .windows(3)
        .filter(|w| w[1].y <= w[0].y && w[1].y < w[2].y)
        .map(|w| &w[1])
        .collect();
    peaks.sort_by(|a, b| a.y.total_cmp(&b.y));

    println!("{:>12}  {:>8}", "Freq (Hz)", "dB");
    println!("{}", "-".repeat(22));
    for peak in peaks.iter().take(count) {
        println!("{:>12.1}  {:>8.1}", to_hz(peak), to_db(peak));
    }
}
