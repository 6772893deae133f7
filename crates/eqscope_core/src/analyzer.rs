//! Analysis side of the engine
//!
//! Runs on the low-priority refresh tick. Each tick it:
//!
//! 1. rebuilds the filter coefficients if any parameter changed
//! 2. drains the audio fifo into one spectrum generator per channel
//! 3. turns the newest spectrum frame into a render path
//! 4. publishes paths through atomic handles for the UI to pick up
//!
//! Nothing here runs on the audio thread.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, info, warn};

use eqscope_dsp::{
    evaluate_response, response_path, ChainControls, ChainSettings, ChainSnapshot, PathGenerator, PlotBounds,
    RenderPath, SpectrumGenerator,
};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::fifo::{AudioBlock, FifoConsumer};
use crate::params::ParameterStore;

/// Results readable from any thread
struct Published {
    spectrum: Vec<ArcSwap<RenderPath>>,
    response: ArcSwap<RenderPath>,
    bounds: ArcSwap<PlotBounds>,
}

/// Cheap, cloneable read access to the analyzer's output
#[derive(Clone)]
pub struct AnalysisHandle {
    controls: Arc<ChainControls>,
    published: Arc<Published>,
}

impl AnalysisHandle {
    /// Latest spectrum path for `channel`, or `None` past the last channel
    pub fn get_spectrum_path(&self, channel: usize) -> Option<Arc<RenderPath>> {
        self.published.spectrum.get(channel).map(|path| path.load_full())
    }

    /// Evaluate the current chain's response, one point per pixel column
    ///
    /// Reads the live coefficient handles, so the curve reflects whatever
    /// the audio thread is about to use.
    pub fn get_response_curve(&self, width: usize, sample_rate: f64) -> RenderPath {
        let bounds = PlotBounds {
            width: width as f32,
            ..self.plot_bounds()
        };
        let magnitudes = evaluate_response(&self.controls.snapshot(), width, sample_rate);
        response_path(&magnitudes, bounds)
    }

    /// Copy of the coefficients and bypass flags the audio thread is using
    pub fn chain_snapshot(&self) -> ChainSnapshot {
        self.controls.snapshot()
    }

    /// Response curve as of the last filter update
    pub fn latest_response_curve(&self) -> Arc<RenderPath> {
        self.published.response.load_full()
    }

    pub fn plot_bounds(&self) -> PlotBounds {
        **self.published.bounds.load()
    }

    pub fn channels(&self) -> usize {
        self.published.spectrum.len()
    }
}

/// What one tick changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickSummary {
    /// Settings the filters were rebuilt from, if they were
    pub filters_updated: Option<ChainSettings>,
    /// Whether the response overlay was recomputed
    pub response_updated: bool,
    /// Blocks pulled out of the fifo
    pub blocks_consumed: usize,
    /// Channels whose spectrum path was republished
    pub spectrum_channels: Vec<usize>,
    /// Why the filters could not be rebuilt, if they couldn't
    pub filter_error: Option<String>,
}

struct ChannelAnalyzer {
    spectrum: SpectrumGenerator,
    paths: PathGenerator,
}

/// Owner of the fifo consumer and the per-channel generators
pub struct Analyzer {
    consumer: FifoConsumer,
    block: AudioBlock,
    channels: Vec<ChannelAnalyzer>,
    params: Arc<ParameterStore>,
    handle: AnalysisHandle,
    sample_rate: f64,
    negative_infinity_db: f32,
    analyzer_was_enabled: bool,
    response_stale: bool,
    reported_drops: u64,
}

impl Analyzer {
    pub fn new(
        consumer: FifoConsumer,
        params: Arc<ParameterStore>,
        controls: Arc<ChainControls>,
        config: &EngineConfig,
    ) -> Self {
        let channels: Vec<ChannelAnalyzer> = (0..consumer.channels())
            .map(|_| ChannelAnalyzer {
                spectrum: SpectrumGenerator::new(config.fft_order, config.window),
                paths: PathGenerator::new(),
            })
            .collect();

        let published = Published {
            spectrum: (0..channels.len())
                .map(|_| ArcSwap::from_pointee(RenderPath::default()))
                .collect(),
            response: ArcSwap::from_pointee(RenderPath::default()),
            bounds: ArcSwap::from_pointee(config.plot),
        };

        Self {
            block: consumer.make_block(),
            consumer,
            channels,
            params,
            handle: AnalysisHandle {
                controls,
                published: Arc::new(published),
            },
            sample_rate: config.stream.sample_rate as f64,
            negative_infinity_db: config.negative_infinity_db,
            analyzer_was_enabled: true,
            response_stale: true,
            reported_drops: 0,
        }
    }

    pub fn handle(&self) -> AnalysisHandle {
        self.handle.clone()
    }

    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    pub fn get_spectrum_path(&self, channel: usize) -> Option<Arc<RenderPath>> {
        self.handle.get_spectrum_path(channel)
    }

    pub fn get_response_curve(&self, width: usize, sample_rate: f64) -> RenderPath {
        self.handle.get_response_curve(width, sample_rate)
    }

    /// Design and publish coefficients for `settings`
    ///
    /// On error the previous coefficients stay in place.
    pub fn update_filters(&mut self, settings: &ChainSettings) -> EngineResult<()> {
        self.handle.controls.update_filters(settings, self.sample_rate)?;
        self.response_stale = true;
        debug!(?settings, "Filters updated");
        Ok(())
    }

    /// Change the pixel rectangle paths are generated for
    ///
    /// Degenerate rectangles are rejected and the current bounds kept.
    pub fn set_plot_bounds(&mut self, bounds: PlotBounds) -> EngineResult<()> {
        bounds.validate()?;
        self.handle.published.bounds.store(Arc::new(bounds));
        self.response_stale = true;
        Ok(())
    }

    pub fn plot_bounds(&self) -> PlotBounds {
        self.handle.plot_bounds()
    }

    /// One refresh: filters, fifo, spectrum, paths
    pub fn tick(&mut self) -> TickSummary {
        let mut summary = TickSummary::default();

        if self.params.take_dirty() {
            let settings = self.params.chain_settings().limited_to(self.sample_rate);
            match self.update_filters(&settings) {
                Ok(()) => summary.filters_updated = Some(settings),
                Err(e) => {
                    warn!("Keeping previous filters: {}", e);
                    summary.filter_error = Some(e.to_string());
                }
            }
        }

        if self.response_stale {
            self.publish_response_curve();
            self.response_stale = false;
            summary.response_updated = true;
        }

        if self.params.analyzer_enabled() {
            if !self.analyzer_was_enabled {
                info!("Spectrum analyzer enabled");
                self.analyzer_was_enabled = true;
            }
            self.run_spectrum(&mut summary);
        } else {
            let discarded = self.consumer.clear();
            if self.analyzer_was_enabled {
                info!("Spectrum analyzer disabled");
                self.analyzer_was_enabled = false;
                for (channel, analyzer) in self.channels.iter_mut().enumerate() {
                    analyzer.spectrum.reset();
                    analyzer.paths.latest_path();
                    self.handle.published.spectrum[channel].store(Arc::new(RenderPath::default()));
                    summary.spectrum_channels.push(channel);
                }
            }
            summary.blocks_consumed = discarded;
        }

        let dropped = self.consumer.dropped_blocks();
        if dropped > self.reported_drops {
            debug!(
                "Audio fifo overwrote {} blocks ({} total)",
                dropped - self.reported_drops,
                dropped
            );
            self.reported_drops = dropped;
        }

        summary
    }

    fn run_spectrum(&mut self, summary: &mut TickSummary) {
        let sample_rate = self.sample_rate as f32;
        let floor = self.negative_infinity_db;

        while self.consumer.pop(&mut self.block) {
            for (channel, analyzer) in self.channels.iter_mut().enumerate() {
                analyzer
                    .spectrum
                    .process_block(self.block.channel(channel), sample_rate, floor);
            }
            summary.blocks_consumed += 1;
        }

        let bounds = self.plot_bounds();
        for (channel, analyzer) in self.channels.iter_mut().enumerate() {
            while let Some(frame) = analyzer.spectrum.pop_frame() {
                analyzer.paths.generate(&frame, bounds, floor);
            }
            if let Some(path) = analyzer.paths.latest_path() {
                self.handle.published.spectrum[channel].store(Arc::new(path));
                summary.spectrum_channels.push(channel);
            }
        }
    }

    fn publish_response_curve(&self) {
        let bounds = self.plot_bounds();
        let width = bounds.width.max(0.0) as usize;
        let curve = self.handle.get_response_curve(width, self.sample_rate);
        self.handle.published.response.store(Arc::new(curve));
    }
}
