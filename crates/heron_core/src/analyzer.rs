//! Spectrum Analyzer Thread
//!
//! Moves analysis data from the audio thread to the renderer:
//!
//! ```text
//! audio thread        analyzer thread                                renderer
//! collector ──fifo──▶ sliding FFT ──fifo──▶ path generator ──fifo──▶ pull latest path
//! ```
//!
//! [`ChannelPathProducer`] does one channel's share of the work and can be
//! driven synchronously. [`AnalyzerHandle`] runs both channels on a timer
//! thread controlled through a crossbeam channel.

use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use heron_dsp::{
    fifo, CollectedBlocks, FftOrder, FifoConsumer, PathBounds, PathGenerator, SpectrumAnalyzer,
    SpectrumPath,
};
use tracing::{debug, info, warn};

use crate::config::AnalyzerConfig;
use crate::error::{EngineError, EngineResult};
use crate::message::{Command, Event};
use crate::processor::AnalysisTaps;

/// One channel: collected blocks in, paths out
pub struct ChannelPathProducer {
    blocks: CollectedBlocks,
    analyzer: SpectrumAnalyzer,
    generator: PathGenerator,
    block: Vec<f32>,
    spectrum: Vec<f32>,
    sample_rate: f64,
    reported_drops: u64,
}

impl ChannelPathProducer {
    /// Returns the producer and the renderer's end of its path Fifo
    pub fn new(
        blocks: CollectedBlocks,
        config: &AnalyzerConfig,
        sample_rate: f32,
    ) -> (Self, FifoConsumer<SpectrumPath>) {
        let (paths_tx, paths_rx) = fifo(config.fifo_capacity);

        let producer = Self {
            block: Vec::with_capacity(blocks.block_size()),
            blocks,
            analyzer: SpectrumAnalyzer::with_capacity(
                config.fft_order,
                config.floor_db,
                config.fifo_capacity,
            ),
            generator: PathGenerator::new(paths_tx, config.path_resolution),
            spectrum: Vec::new(),
            sample_rate: sample_rate as f64,
            reported_drops: 0,
        };

        (producer, paths_rx)
    }

    /// Drain every waiting block and turn the spectra into paths
    ///
    /// Spectra are consumed even when `bounds` is empty, so a hidden view
    /// does not leave stale data queued. Returns the number of paths pushed.
    pub fn process(&mut self, bounds: &PathBounds) -> usize {
        while self.blocks.pull(&mut self.block) {
            self.analyzer.produce_from_block(&self.block);
        }

        let bin_width = self.analyzer.order().bin_width(self.sample_rate);
        let floor_db = self.analyzer.floor_db();
        let mut pushed = 0;

        while self.analyzer.pull(&mut self.spectrum) {
            if bounds.is_empty() {
                continue;
            }
            if self.generator.generate(&self.spectrum, bounds, bin_width, floor_db) {
                pushed += 1;
            }
        }

        pushed
    }

    pub fn fft_order(&self) -> FftOrder {
        self.analyzer.order()
    }

    pub fn set_fft_order(&mut self, order: FftOrder) {
        self.analyzer.change_order(order);
    }

    /// Collector drops since the previous call
    pub fn take_new_drops(&mut self) -> u64 {
        let total = self.blocks.dropped_blocks();
        let new = total - self.reported_drops;
        self.reported_drops = total;
        new
    }
}

/// Renderer ends of the two path Fifos
pub struct AnalyzerPaths {
    pub left: FifoConsumer<SpectrumPath>,
    pub right: FifoConsumer<SpectrumPath>,
}

/// Controller for the analyzer thread
///
/// Lives on the UI thread. Dropping it stops and joins the thread.
pub struct AnalyzerHandle {
    command_sender: Sender<Command>,
    event_receiver: Receiver<Event>,
    thread: Option<JoinHandle<()>>,
}

impl AnalyzerHandle {
    /// Start analyzing the processor's taps
    ///
    /// No paths are generated until the first [`Command::SetBounds`].
    pub fn spawn(config: &AnalyzerConfig, taps: AnalysisTaps) -> EngineResult<(Self, AnalyzerPaths)> {
        config.validate().map_err(EngineError::ConfigError)?;

        let sample_rate = taps.sample_rate();
        let [left_blocks, right_blocks] = taps.into_channels();
        let (left, left_paths) = ChannelPathProducer::new(left_blocks, config, sample_rate);
        let (right, right_paths) = ChannelPathProducer::new(right_blocks, config, sample_rate);

        let (command_sender, command_receiver) = bounded::<Command>(32);
        let (event_sender, event_receiver) = unbounded::<Event>();

        let config = *config;
        let thread = thread::Builder::new()
            .name("heron-analyzer".into())
            .spawn(move || {
                Self::analyzer_thread_main(
                    command_receiver,
                    event_sender,
                    [left, right],
                    config,
                    sample_rate,
                );
            })?;

        let handle = Self {
            command_sender,
            event_receiver,
            thread: Some(thread),
        };
        let paths = AnalyzerPaths {
            left: left_paths,
            right: right_paths,
        };

        Ok((handle, paths))
    }

    pub fn set_bounds(&self, bounds: PathBounds) -> EngineResult<()> {
        self.send_command(Command::SetBounds(bounds))
    }

    pub fn set_fft_order(&self, order: FftOrder) -> EngineResult<()> {
        self.send_command(Command::SetFftOrder(order))
    }

    /// Switch transform size by sample count (2048, 4096 or 8192)
    pub fn set_fft_size(&self, size: usize) -> EngineResult<()> {
        let order = FftOrder::from_size(size)?;
        self.set_fft_order(order)
    }

    fn send_command(&self, command: Command) -> EngineResult<()> {
        self.command_sender
            .send(command)
            .map_err(|_| EngineError::ChannelSendError)
    }

    /// Next pending event, if any
    pub fn try_recv_event(&self) -> Option<Event> {
        self.event_receiver.try_recv().ok()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the thread and wait for it
    pub fn shutdown(mut self) -> EngineResult<()> {
        self.stop()
    }

    fn stop(&mut self) -> EngineResult<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        // The thread may already be gone; joining is what matters
        let _ = self.command_sender.send(Command::Shutdown);
        thread.join().map_err(|_| EngineError::ThreadPanicked)
    }

    fn analyzer_thread_main(
        command_receiver: Receiver<Command>,
        event_sender: Sender<Event>,
        mut producers: [ChannelPathProducer; 2],
        config: AnalyzerConfig,
        sample_rate: f32,
    ) {
        let fft_size = producers[0].fft_order().size();
        info!(fft_size, sample_rate, refresh_hz = config.refresh_hz, "Analyzer thread started");
        let _ = event_sender.send(Event::Started {
            fft_size,
            sample_rate,
        });

        let tick = config.tick_interval();
        let mut next_tick = Instant::now() + tick;
        let mut bounds = PathBounds::default();

        loop {
            let timeout = next_tick.saturating_duration_since(Instant::now());
            match command_receiver.recv_timeout(timeout) {
                Ok(Command::SetBounds(new_bounds)) => {
                    debug!(?new_bounds, "Analyzer bounds changed");
                    bounds = new_bounds;
                }
                Ok(Command::SetFftOrder(order)) => {
                    if order != producers[0].fft_order() {
                        info!(fft_size = order.size(), "FFT order changed");
                        for producer in producers.iter_mut() {
                            producer.set_fft_order(order);
                        }
                        let _ = event_sender.send(Event::FftOrderChanged(order));
                    }
                }
                Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    for (channel, producer) in producers.iter_mut().enumerate() {
                        producer.process(&bounds);

                        let count = producer.take_new_drops();
                        if count > 0 {
                            warn!(channel, count, "Analyzer fell behind, sample blocks dropped");
                            let _ = event_sender.send(Event::BlocksDropped { channel, count });
                        }
                    }

                    let now = Instant::now();
                    next_tick += tick;
                    if next_tick < now {
                        next_tick = now + tick;
                    }
                }
            }
        }

        info!("Analyzer thread stopped");
        let _ = event_sender.send(Event::Stopped);
    }
}

impl Drop for AnalyzerHandle {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(%err, "Analyzer thread did not stop cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heron_dsp::{sample_collector, SampleCollector};

    fn sine(frequency: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate).sin())
            .collect()
    }

    fn producer(block_size: usize) -> (SampleCollector, ChannelPathProducer, FifoConsumer<SpectrumPath>) {
        let config = AnalyzerConfig::default();
        let (collector, blocks) = sample_collector(block_size, config.fifo_capacity);
        let (producer, paths) = ChannelPathProducer::new(blocks, &config, 48000.0);
        (collector, producer, paths)
    }

    #[test]
    fn test_one_path_per_block() {
        let (mut collector, mut producer, mut paths) = producer(512);
        let bounds = PathBounds::new(0.0, 0.0, 400.0, 200.0);

        collector.update(&sine(1000.0, 48000.0, 512 * 3));
        assert_eq!(producer.process(&bounds), 3);
        assert_eq!(paths.num_available_for_reading(), 3);

        let path = paths.pull_latest().unwrap();
        // Bin 0 plus every second bin from 1 to 853 (20 kHz) of a 2048-point transform
        assert_eq!(path.len(), 1 + 427);
    }

    #[test]
    fn test_sine_path_peaks_near_frequency() {
        let (mut collector, mut producer, mut paths) = producer(2048);
        let bounds = PathBounds::new(0.0, 0.0, 600.0, 300.0);

        collector.update(&sine(1000.0, 48000.0, 2048));
        producer.process(&bounds);
        let path = paths.pull().unwrap();

        // Highest point on screen is the smallest y
        let top = path.points()[1..]
            .iter()
            .fold(path.points()[1], |best, p| if p.y < best.y { *p } else { best });
        let expected_x = heron_dsp::map_from_log10(1000.0, 20.0, 20000.0) * 600.0;
        assert!((top.x as f64 - expected_x).abs() < 10.0, "peak at x = {}", top.x);
    }

    #[test]
    fn test_empty_bounds_consume_without_paths() {
        let (mut collector, mut producer, paths) = producer(256);
        collector.update(&[0.1; 1024]);
        assert_eq!(producer.process(&PathBounds::default()), 0);
        assert!(paths.is_empty());

        // Nothing left queued afterwards
        assert_eq!(producer.process(&PathBounds::new(0.0, 0.0, 10.0, 10.0)), 0);
    }

    #[test]
    fn test_change_order() {
        let (mut collector, mut producer, mut paths) = producer(1024);
        producer.set_fft_order(FftOrder::Order4096);
        assert_eq!(producer.fft_order(), FftOrder::Order4096);

        collector.update(&[0.0; 1024]);
        producer.process(&PathBounds::new(0.0, 0.0, 100.0, 100.0));
        // 4096 points: odd bins 3..=1705 fall inside 20 Hz..20 kHz
        assert_eq!(paths.pull().unwrap().len(), 1 + 852);
    }

    #[test]
    fn test_drop_reporting() {
        let (mut collector, mut producer, _paths) = producer(16);
        for _ in 0..40 {
            collector.update(&[0.0; 16]);
        }
        assert_eq!(producer.take_new_drops(), 8);
        assert_eq!(producer.take_new_drops(), 0);
    }
}
