use std::time::{Duration, Instant};

/// Frames-per-window counter owned by a single loop.
///
/// `tick` is called once per processed frame and yields the window's count
/// each time the window rolls over.
#[derive(Debug)]
pub struct FpsCounter {
	window: Duration,
	count: u32,
	started: Instant,
	last: u32,
}

impl FpsCounter {
	pub fn new(window: Duration) -> Self {
		Self::starting_at(window, Instant::now())
	}

	pub fn starting_at(window: Duration, started: Instant) -> Self {
		Self {
			window,
			count: 0,
			started,
			last: 0,
		}
	}

	#[inline]
	pub fn tick(&mut self) -> Option<u32> {
		self.tick_at(Instant::now())
	}

	pub fn tick_at(&mut self, now: Instant) -> Option<u32> {
		self.count = self.count.saturating_add(1);
		if now.saturating_duration_since(self.started) < self.window {
			return None;
		}
		self.last = self.count;
		self.count = 0;
		self.started = now;
		Some(self.last)
	}

	/// Count published by the most recent completed window.
	#[inline]
	pub fn last(&self) -> u32 {
		self.last
	}
}

/// One observability sample, emitted once per display window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Throughput {
	pub capture_fps: u32,
	pub display_fps: u32,
	pub queue_depth: usize,
	pub dropped: u64,
}

/// Receives periodic [`Throughput`] samples from the display loop.
pub trait StatsReporter {
	fn report(&mut self, stats: &Throughput);
}

impl<F> StatsReporter for F
where
	F: FnMut(&Throughput),
{
	fn report(&mut self, stats: &Throughput) {
		self(stats)
	}
}

/// Writes every sample through the `log` facade.
#[derive(Debug, Default)]
pub struct LogReporter;

impl StatsReporter for LogReporter {
	fn report(&mut self, stats: &Throughput) {
		log::info!(
			"[FPS] Capture: {} | Display: {} | Queue: {} | Dropped: {}",
			stats.capture_fps,
			stats.display_fps,
			stats.queue_depth,
			stats.dropped
		);
	}
}
