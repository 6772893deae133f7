//! Shared helpers for loading settings, configs and generating test tones.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Args;
use eqscope_core::{ChainSettings, EngineConfig, ParameterId, ParameterStore};

/// Filter settings: an optional JSON file plus individual overrides
#[derive(Args, Debug, Clone, Default)]
pub struct ChainArgs {
    /// JSON file with chain settings (missing fields use defaults)
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Override one parameter, e.g. --set "Peak Gain=6" (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub overrides: Vec<String>,
}

impl ChainArgs {
    /// Load the file and overrides into `store`
    pub fn apply_to(&self, store: &ParameterStore) -> anyhow::Result<()> {
        if let Some(path) = &self.settings {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            let settings: ChainSettings = serde_json::from_str(&json)
                .with_context(|| format!("Invalid settings in {}", path.display()))?;
            store.apply_settings(&settings);
        }

        for item in &self.overrides {
            let (id, value) = parse_override(item)?;
            let stored = store.set(id, value);
            if stored != value {
                tracing::warn!("{} clamped to {}", id.name(), stored);
            }
        }
        Ok(())
    }

    /// Resolve to a settings snapshot
    pub fn resolve(&self) -> anyhow::Result<ChainSettings> {
        let store = ParameterStore::new();
        self.apply_to(&store)?;
        Ok(store.chain_settings())
    }
}

/// Parse `NAME=VALUE`; booleans may be written as true/false
pub fn parse_override(item: &str) -> anyhow::Result<(ParameterId, f32)> {
    let Some((name, value)) = item.split_once('=') else {
        bail!("Expected NAME=VALUE, got '{}'", item);
    };

    let name = name.trim();
    let id = ParameterId::from_name(name)
        .or_else(|| {
            ParameterId::ALL
                .into_iter()
                .find(|id| id.name().eq_ignore_ascii_case(name))
        })
        .with_context(|| format!("Unknown parameter '{}' (see `eqscope params`)", name))?;

    let value = match value.trim() {
        "true" | "on" => 1.0,
        "false" | "off" => 0.0,
        number => number
            .parse::<f32>()
            .with_context(|| format!("Invalid value for {}: '{}'", id.name(), number))?,
    };
    Ok((id, value))
}

/// Engine config from a JSON file, or the defaults
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            Ok(EngineConfig::from_json(&json)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// `frames` samples of a sine starting at sample index `start`
pub fn tone(frequency: f32, amplitude: f32, frames: usize, start: usize, sample_rate: f32) -> Vec<f32> {
    (0..frames)
        .map(|i| {
            let t = (start + i) as f32 / sample_rate;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}
