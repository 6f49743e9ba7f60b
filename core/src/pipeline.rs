use crate::{
	capture::{CaptureLoop, CaptureSource, CaptureStats},
	channel::FrameChannel,
	config::PipelineConfig,
	display::{DisplayLoop, DisplaySink},
	frame::Frame,
	shutdown::Shutdown,
	throughput::StatsReporter,
};
use color_eyre::eyre::{eyre, Result, WrapErr};
use std::sync::Arc;

/// Totals for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
	pub captured: u64,
	pub displayed: u64,
	pub dropped: u64,
	pub read_failures: u64,
}

/// A capture thread feeding the calling thread through a bounded channel.
///
/// Every pipeline owns its own channel and shutdown flag, so several can
/// run side by side in one process.
pub struct Pipeline<P> {
	config: PipelineConfig,
	channel: Arc<FrameChannel<Frame<P>>>,
	shutdown: Shutdown,
}

impl<P> Pipeline<P> {
	pub fn new(config: PipelineConfig) -> Result<Self> {
		let channel = FrameChannel::with_policy(config.capacity, config.overflow)
			.wrap_err("failed to create frame channel")?;
		Ok(Self {
			config,
			channel: Arc::new(channel),
			shutdown: Shutdown::new(),
		})
	}

	#[inline]
	pub fn config(&self) -> &PipelineConfig {
		&self.config
	}

	#[inline]
	pub fn channel(&self) -> &Arc<FrameChannel<Frame<P>>> {
		&self.channel
	}

	#[inline]
	pub fn shutdown(&self) -> &Shutdown {
		&self.shutdown
	}

	/// Handle for stopping the pipeline from elsewhere, e.g. a signal handler.
	pub fn stop_handle(&self) -> StopHandle<P> {
		StopHandle {
			channel: self.channel.clone(),
			shutdown: self.shutdown.clone(),
		}
	}

	/// Runs the pipeline to completion.
	///
	/// `source` is opened and read on a dedicated capture thread while `sink`
	/// is driven on the calling thread. Returns once the display loop has
	/// exited, the channel is closed and the capture thread has been joined.
	/// A source that fails to open is reported as an error.
	pub fn run<S, D, R>(
		self,
		source: S,
		sink: &mut D,
		reporter: &mut R,
	) -> Result<PipelineSummary>
	where
		S: CaptureSource<Pixels = P> + Send + 'static,
		P: Send + 'static,
		D: DisplaySink<P> + ?Sized,
		R: StatsReporter + ?Sized,
	{
		let (fps_sender, fps_receiver) = crossbeam_channel::unbounded();
		let capture_thread = CaptureLoop::new(
			source,
			self.channel.clone(),
			self.shutdown.clone(),
			self.config.clone(),
		)
		.with_fps_sender(fps_sender)
		.spawn()?;

		let display = DisplayLoop::new(
			self.channel.clone(),
			self.shutdown.clone(),
			self.config.clone(),
		)
		.with_capture_fps(fps_receiver)
		.run(sink, reporter);

		// Both are no-ops if the capture side already stopped the pipeline.
		self.shutdown.request();
		self.channel.close();

		let capture: CaptureStats = capture_thread
			.join()
			.map_err(|_| eyre!("capture thread panicked"))??;

		log::info!(
			"pipeline stopped: {} captured, {} displayed, {} dropped",
			capture.captured,
			display.displayed,
			self.channel.dropped()
		);
		Ok(PipelineSummary {
			captured: capture.captured,
			displayed: display.displayed,
			dropped: self.channel.dropped(),
			read_failures: capture.read_failures,
		})
	}
}

/// Requests shutdown of a running [`Pipeline`] from any thread.
pub struct StopHandle<P> {
	channel: Arc<FrameChannel<Frame<P>>>,
	shutdown: Shutdown,
}

impl<P> StopHandle<P> {
	pub fn stop(&self) {
		if self.shutdown.request() {
			log::info!("pipeline stop requested");
		}
		self.channel.close();
	}

	pub fn is_stopped(&self) -> bool {
		!self.shutdown.is_running()
	}
}

impl<P> Clone for StopHandle<P> {
	fn clone(&self) -> Self {
		Self {
			channel: self.channel.clone(),
			shutdown: self.shutdown.clone(),
		}
	}
}
