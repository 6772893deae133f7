//! eqscope Engine - Main Entry Point
//!
//! Splits the work between two contexts:
//!
//! ```text
//! Audio thread (host callback)          Analysis thread ("eqscope-analysis")
//! ───────────────────────────           ────────────────────────────────────
//! EqProcessor::process                  Analyzer::tick every 1/refresh_hz s
//!   StereoChain (9 biquads / channel)     ParameterStore dirty? → update_filters
//!   FifoProducer::push ──── fifo ────▶    FifoConsumer::pop → SpectrumGenerator
//!                                         PathGenerator → published paths
//! ```
//!
//! The processor is handed to the host; the engine keeps the analysis thread
//! and talks to it over crossbeam channels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, error, info, warn};

use eqscope_dsp::{
    AudioProcessor, ChainControls, ChainSettings, PlotBounds, ProcessContext, RenderPath, StereoChain,
};

use crate::analyzer::{AnalysisHandle, Analyzer, TickSummary};
use crate::config::{AnalyzerTap, EngineConfig};
use crate::error::{EngineError, EngineResult};
use crate::fifo::{AudioFifo, FifoProducer};
use crate::message::{Command, Event};
use crate::params::{ParameterId, ParameterStore};

/// Events the UI has not collected yet; newer events are dropped past this
const EVENT_CAPACITY: usize = 256;

/// Real-time half: filter chain plus the fifo producer
///
/// # Real-time Safety
/// `process()` never allocates, locks or blocks.
pub struct EqProcessor {
    chain: StereoChain,
    producer: FifoProducer,
    tap: AnalyzerTap,
    context: ProcessContext,
    unanalyzed_blocks: u64,
}

impl EqProcessor {
    pub fn new(chain: StereoChain, producer: FifoProducer, tap: AnalyzerTap, context: ProcessContext) -> Self {
        Self {
            chain,
            producer,
            tap,
            context,
            unanalyzed_blocks: 0,
        }
    }

    /// Filter one planar block in place and hand a copy to the analyzer
    ///
    /// Blocks whose channel count does not match the configuration are
    /// still filtered but not analyzed.
    #[inline]
    pub fn process(&mut self, channels: &mut [&mut [f32]]) {
        if self.tap == AnalyzerTap::PreFilter {
            self.feed_analyzer(channels);
        }

        self.chain.process(channels, &self.context);

        if self.tap == AnalyzerTap::PostFilter {
            self.feed_analyzer(channels);
        }
    }

    /// Blocks that were filtered but never reached the analyzer
    pub fn unanalyzed_blocks(&self) -> u64 {
        self.unanalyzed_blocks
    }

    #[inline]
    fn feed_analyzer(&mut self, channels: &[&mut [f32]]) {
        // Only a channel-count mismatch fails; logging here would allocate
        if self.producer.push(channels).is_err() {
            self.unanalyzed_blocks += 1;
        }
    }

    pub fn context(&self) -> &ProcessContext {
        &self.context
    }

    pub fn chain(&self) -> &StereoChain {
        &self.chain
    }
}

impl AudioProcessor for EqProcessor {
    fn process(&mut self, channels: &mut [&mut [f32]], _context: &ProcessContext) {
        EqProcessor::process(self, channels);
    }

    fn reset(&mut self) {
        AudioProcessor::reset(&mut self.chain);
    }

    fn name(&self) -> &'static str {
        "eqscope"
    }
}

/// Everything `prepare` builds, before any thread is spawned
///
/// Drive `analyzer.tick()` yourself, or give the parts to [`EqEngine`].
pub struct Pipeline {
    pub processor: EqProcessor,
    pub analyzer: Analyzer,
    pub params: Arc<ParameterStore>,
}

impl Pipeline {
    pub fn prepare(config: &EngineConfig) -> EngineResult<Self> {
        Self::with_params(config, Arc::new(ParameterStore::new()))
    }

    /// Build around an existing parameter store
    pub fn with_params(config: &EngineConfig, params: Arc<ParameterStore>) -> EngineResult<Self> {
        config.validate().map_err(EngineError::ConfigError)?;

        let stream = config.stream;
        let sample_rate = stream.sample_rate as f64;

        // Audio starts with the current settings rather than pass-throughs
        let controls = Arc::new(ChainControls::new());
        controls.update_filters(&params.chain_settings().limited_to(sample_rate), sample_rate)?;

        let (producer, consumer) = AudioFifo::prepare(
            stream.channels as usize,
            stream.max_block_size as usize,
            config.fifo_slots,
        );

        let processor = EqProcessor::new(
            StereoChain::with_controls(Arc::clone(&controls), sample_rate),
            producer,
            config.analyzer_tap,
            ProcessContext::new(sample_rate, stream.channels as usize, stream.max_block_size as usize),
        );
        let analyzer = Analyzer::new(consumer, Arc::clone(&params), controls, config);

        Ok(Self {
            processor,
            analyzer,
            params,
        })
    }
}

/// The engine controller
///
/// Lives on the UI/main thread and owns the analysis thread.
pub struct EqEngine {
    /// Channel for sending commands to the analysis thread
    command_sender: Sender<Command>,

    /// Channel for receiving events from the analysis thread
    event_receiver: Receiver<Event>,

    /// Handle to the analysis thread
    analysis_thread: Option<JoinHandle<()>>,

    /// Flag to signal shutdown
    shutdown_flag: Arc<AtomicBool>,

    /// Whether the analysis loop is currently running
    is_running: Arc<AtomicBool>,

    params: Arc<ParameterStore>,
    analysis: AnalysisHandle,
    config: EngineConfig,
}

impl EqEngine {
    /// Build the pipeline and start the analysis thread
    ///
    /// Returns the engine and the processor to hand to the audio callback.
    pub fn prepare(config: EngineConfig) -> EngineResult<(Self, EqProcessor)> {
        let pipeline = Pipeline::prepare(&config)?;
        Self::start(config, pipeline)
    }

    /// Start the analysis thread for an already-built pipeline
    pub fn start(config: EngineConfig, pipeline: Pipeline) -> EngineResult<(Self, EqProcessor)> {
        let Pipeline {
            processor,
            analyzer,
            params,
        } = pipeline;

        let (command_sender, command_receiver) = bounded::<Command>(32);
        let (event_sender, event_receiver) = bounded::<Event>(EVENT_CAPACITY);

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let is_running = Arc::new(AtomicBool::new(false));
        let analysis = analyzer.handle();

        let shutdown_clone = Arc::clone(&shutdown_flag);
        let running_clone = Arc::clone(&is_running);
        let interval = config.refresh_interval();

        let analysis_thread = thread::Builder::new()
            .name("eqscope-analysis".into())
            .spawn(move || {
                Self::analysis_thread_main(
                    analyzer,
                    command_receiver,
                    event_sender,
                    shutdown_clone,
                    running_clone,
                    interval,
                );
            })
            .map_err(|e| EngineError::ThreadSpawn(e.to_string()))?;

        info!(
            sample_rate = config.stream.sample_rate,
            channels = config.stream.channels,
            fft_size = config.fft_order.fft_size(),
            "Engine prepared"
        );

        let engine = Self {
            command_sender,
            event_receiver,
            analysis_thread: Some(analysis_thread),
            shutdown_flag,
            is_running,
            params,
            analysis,
            config,
        };
        Ok((engine, processor))
    }

    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    /// Set one parameter; the analysis thread picks it up on its next tick
    pub fn set_parameter(&self, id: ParameterId, value: f32) -> f32 {
        self.params.set(id, value)
    }

    /// Replace every filter parameter at once
    pub fn update_filters(&self, settings: &ChainSettings) {
        self.params.apply_settings(settings);
    }

    pub fn set_analyzer_enabled(&self, enabled: bool) -> EngineResult<()> {
        self.send_command(Command::SetAnalyzerEnabled(enabled))
    }

    /// Resize the plot; degenerate rectangles are rejected here
    pub fn set_plot_bounds(&self, bounds: PlotBounds) -> EngineResult<()> {
        bounds
            .validate()
            .map_err(|e| EngineError::ConfigError(e.to_string()))?;
        self.send_command(Command::SetPlotBounds(bounds))
    }

    /// Force a filter rebuild on the next tick
    pub fn refresh(&self) -> EngineResult<()> {
        self.send_command(Command::Refresh)
    }

    pub fn get_spectrum_path(&self, channel: usize) -> Option<Arc<RenderPath>> {
        self.analysis.get_spectrum_path(channel)
    }

    pub fn get_response_curve(&self, width: usize, sample_rate: f64) -> RenderPath {
        self.analysis.get_response_curve(width, sample_rate)
    }

    pub fn analysis(&self) -> &AnalysisHandle {
        &self.analysis
    }

    /// Check if the analysis loop is running
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Get next event (non-blocking)
    pub fn poll_event(&self) -> Option<Event> {
        self.event_receiver.try_recv().ok()
    }

    /// Get next event, waiting at most `timeout`
    pub fn wait_event_timeout(&self, timeout: Duration) -> Option<Event> {
        self.event_receiver.recv_timeout(timeout).ok()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stop the analysis thread and wait for it
    pub fn shutdown(&mut self) -> EngineResult<()> {
        self.shutdown_flag.store(true, Ordering::SeqCst);
        // The thread may already be gone; joining below is what matters
        let _ = self.command_sender.try_send(Command::Shutdown);

        if let Some(handle) = self.analysis_thread.take() {
            handle
                .join()
                .map_err(|_| EngineError::ThreadSpawn("analysis thread panicked".into()))?;
        }
        Ok(())
    }

    fn send_command(&self, command: Command) -> EngineResult<()> {
        self.command_sender
            .send(command)
            .map_err(|_| EngineError::ChannelSendError)
    }

    fn analysis_thread_main(
        mut analyzer: Analyzer,
        command_receiver: Receiver<Command>,
        event_sender: Sender<Event>,
        shutdown_flag: Arc<AtomicBool>,
        is_running: Arc<AtomicBool>,
        interval: Duration,
    ) {
        info!("Analysis thread started");
        is_running.store(true, Ordering::SeqCst);
        emit(&event_sender, Event::Started);

        let mut next_tick = Instant::now();

        while !shutdown_flag.load(Ordering::SeqCst) {
            // recv_timeout doubles as the refresh timer
            let timeout = next_tick.saturating_duration_since(Instant::now());
            match command_receiver.recv_timeout(timeout) {
                Ok(Command::SetPlotBounds(bounds)) => {
                    debug!(?bounds, "Plot bounds changed");
                    if let Err(e) = analyzer.set_plot_bounds(bounds) {
                        warn!("Ignoring plot bounds: {}", e);
                        emit(&event_sender, Event::error(e));
                    }
                }
                Ok(Command::SetAnalyzerEnabled(enabled)) => {
                    analyzer.params().set_bool(ParameterId::AnalyzerEnabled, enabled);
                }
                Ok(Command::Refresh) => analyzer.params().mark_dirty(),
                Ok(Command::Shutdown) => {
                    info!("Shutdown command received");
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    let summary = analyzer.tick();
                    publish_tick(&analyzer, &summary, &event_sender);

                    next_tick += interval;
                    let now = Instant::now();
                    if next_tick < now {
                        // Fell behind; don't try to catch up with a burst of ticks
                        next_tick = now + interval;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    error!("Command channel disconnected");
                    break;
                }
            }
        }

        is_running.store(false, Ordering::SeqCst);
        emit(&event_sender, Event::Stopped);
        info!("Analysis thread stopped");
    }
}

impl Drop for EqEngine {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Send without blocking; a UI that stopped listening loses events
fn emit(sender: &Sender<Event>, event: Event) {
    match sender.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => debug!("Event queue full, dropping event"),
        Err(TrySendError::Disconnected(_)) => {}
    }
}

fn publish_tick(analyzer: &Analyzer, summary: &TickSummary, sender: &Sender<Event>) {
    if let Some(message) = &summary.filter_error {
        emit(
            sender,
            Event::Error {
                message: message.clone(),
            },
        );
    }

    if let Some(settings) = summary.filters_updated {
        emit(sender, Event::FiltersUpdated { settings });
    }

    if summary.response_updated {
        let curve = analyzer.handle().latest_response_curve();
        emit(
            sender,
            Event::ResponseCurveUpdated {
                points: curve.points().to_vec(),
            },
        );
    }

    for &channel in &summary.spectrum_channels {
        if let Some(path) = analyzer.get_spectrum_path(channel) {
            emit(
                sender,
                Event::SpectrumUpdated {
                    channel,
                    points: path.points().to_vec(),
                },
            );
        }
    }
}
