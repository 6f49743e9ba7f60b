//! Capture side of the pipeline.
//!
//! The capture loop is cooperative: it only looks at the shutdown flag
//! between reads. A source that blocks inside `read` delays shutdown until
//! that read returns, so shutdown latency is bounded by the source's own
//! read timeout.

use crate::{
	channel::FrameChannel, config::PipelineConfig, frame::Frame, shutdown::Shutdown,
	throughput::FpsCounter,
};
use color_eyre::eyre::{ContextCompat, Result, WrapErr};
use crossbeam_channel::Sender;
use std::{
	sync::Arc,
	thread::{self, JoinHandle},
};
use thread_priority::ThreadBuilderExt;

/// Something that produces frames, such as a camera or a file.
pub trait CaptureSource {
	type Pixels;

	/// Acquires the underlying device. A failure here stops the pipeline.
	fn open(&mut self) -> Result<()>;

	/// Reads the next frame. `Err` and `Ok(None)` (an empty frame) are both
	/// treated as transient and retried.
	fn read(&mut self) -> Result<Option<Self::Pixels>>;

	/// Releases the device. Called once when the loop exits.
	fn close(&mut self) {}
}

impl<S: CaptureSource + ?Sized> CaptureSource for Box<S> {
	type Pixels = S::Pixels;

	fn open(&mut self) -> Result<()> {
		(**self).open()
	}

	fn read(&mut self) -> Result<Option<Self::Pixels>> {
		(**self).read()
	}

	fn close(&mut self) {
		(**self).close()
	}
}

/// Counters returned by the capture thread when it exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
	pub captured: u64,
	pub read_failures: u64,
	pub empty_frames: u64,
}

pub type FpsSender = Sender<u32>;

pub struct CaptureLoop<S: CaptureSource> {
	source: S,
	channel: Arc<FrameChannel<Frame<S::Pixels>>>,
	shutdown: Shutdown,
	config: PipelineConfig,
	fps_sender: Option<FpsSender>,
}

impl<S: CaptureSource> CaptureLoop<S> {
	pub fn new(
		source: S,
		channel: Arc<FrameChannel<Frame<S::Pixels>>>,
		shutdown: Shutdown,
		config: PipelineConfig,
	) -> Self {
		Self {
			source,
			channel,
			shutdown,
			config,
			fps_sender: None,
		}
	}

	/// Publish each window's capture count on `sender`.
	pub fn with_fps_sender(mut self, sender: FpsSender) -> Self {
		self.fps_sender = Some(sender);
		self
	}

	/// Runs on the current thread until shutdown is requested.
	///
	/// If the source cannot be opened the pipeline is stopped and the channel
	/// closed before the error is returned, so a waiting consumer wakes up
	/// right away.
	pub fn run(mut self) -> Result<CaptureStats> {
		if let Err(err) = self.source.open() {
			log::error!("failed to open capture source: {err:#}");
			self.shutdown.request();
			self.channel.close();
			return Err(err).wrap_err("failed to open capture source");
		}
		log::info!("capture thread started");

		let mut stats = CaptureStats::default();
		let mut fps = FpsCounter::new(self.config.report_window);
		while self.shutdown.is_running() {
			match self.source.read() {
				Ok(Some(pixels)) => {
					stats.captured += 1;
					self.channel.push(Frame::new(stats.captured, pixels));
					if let Some(count) = fps.tick() {
						log::debug!("capture fps: {count}");
						if let Some(sender) = &self.fps_sender {
							// The display side may already be gone.
							let _ = sender.send(count);
						}
					}
				}
				Ok(None) => {
					stats.empty_frames += 1;
					log::warn!("empty frame received from capture source");
					thread::sleep(self.config.read_backoff);
				}
				Err(err) => {
					stats.read_failures += 1;
					log::warn!("failed to read frame: {err:#}");
					thread::sleep(self.config.read_backoff);
				}
			}
		}

		self.source.close();
		log::info!(
			"capture thread exiting after {} frames ({} read failures, {} empty)",
			stats.captured,
			stats.read_failures,
			stats.empty_frames
		);
		Ok(stats)
	}

	/// Moves the loop onto a dedicated, named capture thread, applying the
	/// configured priority and core affinity.
	pub fn spawn(self) -> Result<JoinHandle<Result<CaptureStats>>>
	where
		S: Send + 'static,
		S::Pixels: Send + 'static,
	{
		let core = match self.config.capture_core {
			Some(id) => Some(find_core(id)?),
			None => None,
		};
		let builder = thread::Builder::new().name("capture thread".to_owned());
		let handle = match self.config.capture_priority.clone() {
			Some(priority) => builder.spawn_with_priority(priority, move |result| {
				if let Err(err) = result {
					log::warn!("failed to set capture thread priority: {err:?}");
				}
				pin_to(core);
				self.run()
			}),
			None => builder.spawn(move || {
				pin_to(core);
				self.run()
			}),
		};
		handle.wrap_err("failed to spawn capture thread")
	}
}

fn find_core(id: usize) -> Result<core_affinity::CoreId> {
	core_affinity::get_core_ids()
		.wrap_err("failed to get CPU core IDs")?
		.into_iter()
		.find(|core| core.id == id)
		.wrap_err_with(|| format!("no CPU core with id {id}"))
}

fn pin_to(core: Option<core_affinity::CoreId>) {
	if let Some(core) = core {
		if !core_affinity::set_for_current(core) {
			log::warn!("failed to set capture thread affinity for core {}", core.id);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use color_eyre::eyre::bail;
	use std::{collections::VecDeque, time::Duration};

	enum Step {
		Frame(u32),
		Empty,
		Fail,
	}

	/// Plays back a fixed script, then stops the pipeline itself.
	struct Scripted {
		steps: VecDeque<Step>,
		shutdown: Shutdown,
		closed: Arc<parking_lot::Mutex<bool>>,
	}

	impl CaptureSource for Scripted {
		type Pixels = u32;

		fn open(&mut self) -> Result<()> {
			Ok(())
		}

		fn read(&mut self) -> Result<Option<u32>> {
			match self.steps.pop_front() {
				Some(Step::Frame(value)) => Ok(Some(value)),
				Some(Step::Empty) => Ok(None),
				Some(Step::Fail) => bail!("device busy"),
				None => {
					self.shutdown.request();
					Ok(None)
				}
			}
		}

		fn close(&mut self) {
			*self.closed.lock() = true;
		}
	}

	struct Unopenable;

	impl CaptureSource for Unopenable {
		type Pixels = u32;

		fn open(&mut self) -> Result<()> {
			bail!("no such device")
		}

		fn read(&mut self) -> Result<Option<u32>> {
			unreachable!("read after failed open")
		}
	}

	fn config() -> PipelineConfig {
		PipelineConfig::default()
			.with_capacity(8)
			.with_read_backoff(Duration::from_millis(1))
	}

	#[test]
	fn transient_failures_do_not_stop_the_loop() {
		let shutdown = Shutdown::new();
		let channel = Arc::new(FrameChannel::new(8).unwrap());
		let closed = Arc::new(parking_lot::Mutex::new(false));
		let source = Scripted {
			steps: VecDeque::from([
				Step::Frame(10),
				Step::Fail,
				Step::Empty,
				Step::Frame(20),
				Step::Fail,
				Step::Frame(30),
			]),
			shutdown: shutdown.clone(),
			closed: closed.clone(),
		};

		let stats = CaptureLoop::new(source, channel.clone(), shutdown, config())
			.run()
			.unwrap();

		assert_eq!(stats.captured, 3);
		assert_eq!(stats.read_failures, 2);
		assert_eq!(stats.empty_frames, 2);
		assert!(*closed.lock());

		let frames = std::iter::from_fn(|| channel.try_pop()).collect::<Vec<_>>();
		assert_eq!(
			frames.iter().map(|f| (f.index(), *f.pixels())).collect::<Vec<_>>(),
			vec![(1, 10), (2, 20), (3, 30)]
		);
	}

	#[test]
	fn open_failure_stops_pipeline_and_closes_channel() {
		let shutdown = Shutdown::new();
		let channel = Arc::new(FrameChannel::<Frame<u32>>::new(2).unwrap());
		let result =
			CaptureLoop::new(Unopenable, channel.clone(), shutdown.clone(), config()).run();

		assert!(result.is_err());
		assert!(!shutdown.is_running());
		assert!(channel.is_closed());
	}

	#[test]
	fn spawned_loop_publishes_fps() {
		let shutdown = Shutdown::new();
		let channel = Arc::new(FrameChannel::new(4).unwrap());
		let (fps_sender, fps_receiver) = crossbeam_channel::unbounded();
		let source = Scripted {
			steps: (0..50).map(Step::Frame).collect(),
			shutdown: shutdown.clone(),
			closed: Arc::new(parking_lot::Mutex::new(false)),
		};
		let config = config().with_report_window(Duration::ZERO);

		let handle = CaptureLoop::new(source, channel.clone(), shutdown, config)
			.with_fps_sender(fps_sender)
			.spawn()
			.unwrap();
		let stats = handle.join().unwrap().unwrap();

		assert_eq!(stats.captured, 50);
		assert_eq!(channel.size(), 4);
		assert_eq!(channel.dropped(), 46);
		assert_eq!(fps_receiver.try_iter().count(), 50);
	}
}
