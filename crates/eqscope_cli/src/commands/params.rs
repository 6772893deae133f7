//! Parameter listing command.

use clap::Args;
use eqscope_core::{ParameterId, Slope};
use serde::Serialize;

#[derive(Args)]
pub struct ParamsArgs {
    /// Print as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ParamInfo {
    name: &'static str,
    min: f32,
    max: f32,
    step: f32,
    default: f32,
}

pub fn run(args: ParamsArgs) -> anyhow::Result<()> {
    let infos: Vec<ParamInfo> = ParameterId::ALL
        .into_iter()
        .map(|id| {
            let range = id.range();
            ParamInfo {
                name: id.name(),
                min: range.min,
                max: range.max,
                step: range.step,
                default: range.default,
            }
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    println!(
        "{:<18} {:>10} {:>10} {:>6} {:>10}",
        "Parameter", "Min", "Max", "Step", "Default"
    );
    println!("{}", "-".repeat(58));
    for info in &infos {
        println!(
            "{:<18} {:>10} {:>10} {:>6} {:>10}",
            info.name, info.min, info.max, info.step, info.default
        );
    }

    println!();
    let labels: Vec<String> = Slope::ALL
        .iter()
        .map(|slope| format!("{}={}", slope.index(), slope.label()))
        .collect();
    println!("Slopes: {}", labels.join(", "));

    Ok(())
}
