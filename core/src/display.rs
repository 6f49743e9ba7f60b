use crate::{
	channel::FrameChannel,
	config::PipelineConfig,
	frame::Frame,
	shutdown::Shutdown,
	throughput::{FpsCounter, StatsReporter, Throughput},
};
use crossbeam_channel::Receiver;
use std::sync::Arc;

/// Consumer of frames on the controlling thread, e.g. a window.
pub trait DisplaySink<P> {
	/// Presents a frame. There is no way to push back on the capture side.
	fn show(&mut self, frame: Frame<P>);

	/// Polled once per display iteration.
	fn exit_requested(&mut self) -> bool {
		false
	}
}

impl<P, D: DisplaySink<P> + ?Sized> DisplaySink<P> for &mut D {
	fn show(&mut self, frame: Frame<P>) {
		(**self).show(frame)
	}

	fn exit_requested(&mut self) -> bool {
		(**self).exit_requested()
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayStats {
	pub displayed: u64,
	pub idle_timeouts: u64,
	/// Whether the loop ended because the sink asked to exit.
	pub exit_requested: bool,
}

pub struct DisplayLoop<P> {
	channel: Arc<FrameChannel<Frame<P>>>,
	shutdown: Shutdown,
	config: PipelineConfig,
	capture_fps: Option<Receiver<u32>>,
}

impl<P> DisplayLoop<P> {
	pub fn new(
		channel: Arc<FrameChannel<Frame<P>>>,
		shutdown: Shutdown,
		config: PipelineConfig,
	) -> Self {
		Self {
			channel,
			shutdown,
			config,
			capture_fps: None,
		}
	}

	/// Where to read the capture side's per-window counts from.
	pub fn with_capture_fps(mut self, receiver: Receiver<u32>) -> Self {
		self.capture_fps = Some(receiver);
		self
	}

	/// Pulls frames into `sink` until the pipeline stops, the channel closes
	/// or the sink asks to exit.
	///
	/// This does not close the channel or join anything; see
	/// [`Pipeline::run`](crate::pipeline::Pipeline::run) for the full
	/// teardown.
	pub fn run<D, R>(&self, sink: &mut D, reporter: &mut R) -> DisplayStats
	where
		D: DisplaySink<P> + ?Sized,
		R: StatsReporter + ?Sized,
	{
		let mut stats = DisplayStats::default();
		let mut fps = FpsCounter::new(self.config.report_window);
		let mut capture_fps = 0;

		while self.shutdown.is_running() && !self.channel.is_closed() {
			match self.channel.pop(self.config.pop_timeout) {
				Some(frame) => {
					sink.show(frame);
					stats.displayed += 1;
					if let Some(display_fps) = fps.tick() {
						if let Some(latest) = self
							.capture_fps
							.as_ref()
							.and_then(|receiver| receiver.try_iter().last())
						{
							capture_fps = latest;
						}
						reporter.report(&Throughput {
							capture_fps,
							display_fps,
							queue_depth: self.channel.size(),
							dropped: self.channel.dropped(),
						});
					}
				}
				None if !self.shutdown.is_running() => break,
				None => stats.idle_timeouts += 1,
			}

			if sink.exit_requested() {
				log::info!("exit requested by display sink");
				self.shutdown.request();
				stats.exit_requested = true;
				break;
			}
		}
		stats
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[derive(Default)]
	struct Recorder {
		shown: Vec<u64>,
		exit_after: Option<usize>,
	}

	impl DisplaySink<()> for Recorder {
		fn show(&mut self, frame: Frame<()>) {
			self.shown.push(frame.index());
		}

		fn exit_requested(&mut self) -> bool {
			self.exit_after.is_some_and(|n| self.shown.len() >= n)
		}
	}

	fn setup(capacity: usize) -> (Arc<FrameChannel<Frame<()>>>, Shutdown, PipelineConfig) {
		let config = PipelineConfig::default()
			.with_capacity(capacity)
			.with_pop_timeout(Duration::from_millis(20));
		(Arc::new(FrameChannel::new(capacity).unwrap()), Shutdown::new(), config)
	}

	#[test]
	fn sink_exit_stops_the_pipeline() {
		let (channel, shutdown, config) = setup(8);
		for i in 1..=5 {
			channel.push(Frame::new(i, ()));
		}
		let mut sink = Recorder {
			exit_after: Some(3),
			..Recorder::default()
		};

		let stats = DisplayLoop::new(channel.clone(), shutdown.clone(), config)
			.run(&mut sink, &mut |_: &Throughput| {});

		assert_eq!(sink.shown, vec![1, 2, 3]);
		assert!(stats.exit_requested);
		assert!(!shutdown.is_running());
		assert_eq!(channel.size(), 2);
	}

	#[test]
	fn idle_timeouts_keep_waiting_until_stopped() {
		let (channel, shutdown, config) = setup(2);
		let stopper = {
			let shutdown = shutdown.clone();
			let channel = channel.clone();
			std::thread::spawn(move || {
				std::thread::sleep(Duration::from_millis(100));
				channel.push(Frame::new(1, ()));
				std::thread::sleep(Duration::from_millis(100));
				shutdown.request();
			})
		};

		let mut sink = Recorder::default();
		let stats =
			DisplayLoop::new(channel, shutdown, config).run(&mut sink, &mut |_: &Throughput| {});
		stopper.join().unwrap();

		assert_eq!(sink.shown, vec![1]);
		assert!(stats.idle_timeouts >= 2);
		assert!(!stats.exit_requested);
	}

	#[test]
	fn reports_capture_and_display_rates() {
		let (channel, shutdown, config) = setup(4);
		let config = config.with_report_window(Duration::ZERO);
		let (fps_sender, fps_receiver) = crossbeam_channel::unbounded();
		fps_sender.send(12).unwrap();
		fps_sender.send(25).unwrap();
		channel.push(Frame::new(1, ()));
		channel.push(Frame::new(2, ()));

		let mut samples = Vec::new();
		let mut sink = Recorder {
			exit_after: Some(2),
			..Recorder::default()
		};
		DisplayLoop::new(channel, shutdown, config)
			.with_capture_fps(fps_receiver)
			.run(&mut sink, &mut |stats: &Throughput| samples.push(*stats));

		assert_eq!(sink.shown, vec![1, 2]);
		assert_eq!(
			samples,
			vec![
				Throughput {
					capture_fps: 25,
					display_fps: 1,
					queue_depth: 1,
					dropped: 0,
				},
				Throughput {
					capture_fps: 25,
					display_fps: 1,
					queue_depth: 0,
					dropped: 0,
				},
			]
		);
	}
}
