//! eqscope Core - Engine
//!
//! This crate wires the DSP pieces into a running equalizer, including:
//! - Real-time processor (filter chain + analyzer tap)
//! - Lock-free overwrite-oldest audio fifo between the two threads
//! - Parameter store with a dirty flag for cheap change detection
//! - Analysis thread producing spectrum and response-curve paths
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        UI Thread                            │
//! │   params.set() ──▶ ParameterStore     Engine ◀──events──    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ crossbeam-channel / atomics
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Analysis Thread                         │
//! │   update_filters ──ArcSwap──▶ coefficients                  │
//! │   fifo ──▶ SpectrumGenerator ──▶ PathGenerator ──▶ paths    │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲ fifo (overwrite oldest)
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Audio Thread                           │
//! │   EqProcessor: 9-stage chain per channel ──▶ fifo push      │
//! │              (Zero allocation in this path)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod analyzer;
mod config;
mod engine;
mod error;
mod fifo;
mod message;
mod params;

pub use analyzer::{AnalysisHandle, Analyzer, TickSummary};
pub use config::{AnalyzerTap, EngineConfig, StreamConfig};
pub use engine::{EqEngine, EqProcessor, Pipeline};
pub use error::{EngineError, EngineResult};
pub use fifo::{AudioBlock, AudioFifo, FifoConsumer, FifoProducer, DEFAULT_FIFO_SLOTS};
pub use message::{Command, Event};
pub use params::{ParameterId, ParameterRange, ParameterStore, PARAMETER_COUNT};

// Re-export DSP types for convenience
pub use eqscope_dsp::{
    AudioProcessor, ChainSettings, PlotBounds, Point, ProcessContext, RenderPath, Slope,
};
