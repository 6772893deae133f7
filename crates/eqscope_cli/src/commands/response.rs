//! Response-curve command.

use clap::{Args, ValueEnum};
use eqscope_dsp::{evaluate_response, frequency_for_point, response_path, ChainControls, PlotBounds};
use serde::Serialize;

use super::common::ChainArgs;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ResponseFormat {
    /// Frequency / dB pairs as a JSON array
    Json,
    /// Pixel-space polyline as JSON
    Path,
    /// Human-readable table
    Table,
}

#[derive(Args)]
pub struct ResponseArgs {
    #[command(flatten)]
    chain: ChainArgs,

    /// Number of points (one per pixel column)
    #[arg(long, default_value = "600")]
    width: usize,

    /// Plot height in pixels, for --format path
    #[arg(long, default_value = "300")]
    height: f32,

    /// Sample rate in Hz
    #[arg(long, default_value = "48000")]
    sample_rate: f64,

    #[arg(long, value_enum, default_value = "table")]
    format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponsePoint {
    frequency: f64,
    db: f64,
}

pub fn run(args: ResponseArgs) -> anyhow::Result<()> {
    let settings = args.chain.resolve()?;

    let controls = ChainControls::new();
    controls.update_filters(&settings, args.sample_rate)?;
    let magnitudes = evaluate_response(&controls.snapshot(), args.width, args.sample_rate);

    match args.format {
        ResponseFormat::Json => {
            let points: Vec<ResponsePoint> = magnitudes
                .iter()
                .enumerate()
                .map(|(i, &db)| ResponsePoint {
                    frequency: frequency_for_point(i, args.width),
                    db,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&points)?);
        }
        ResponseFormat::Path => {
            let bounds = PlotBounds::new(0.0, 0.0, args.width as f32, args.height);
            println!("{}", serde_json::to_string(&response_path(&magnitudes, bounds))?);
        }
        ResponseFormat::Table => {
            println!("{:>12}  {:>9}", "Freq (Hz)", "dB");
            println!("{}", "-".repeat(23));
            // About twenty rows regardless of width
            let stride = (args.width / 20).max(1);
            for (i, db) in magnitudes.iter().enumerate().step_by(stride) {
                println!("{:>12.1}  {:>+9.2}", frequency_for_point(i, args.width), db);
            }
        }
    }

    Ok(())
}
