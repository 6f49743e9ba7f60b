use crate::channel::OverflowPolicy;
use std::time::Duration;
use thread_priority::ThreadPriority;

pub const DEFAULT_QUEUE_SIZE: usize = 5;
pub const DEFAULT_POP_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_READ_BACKOFF: Duration = Duration::from_millis(10);
pub const DEFAULT_REPORT_WINDOW: Duration = Duration::from_secs(1);

/// Knobs for a single capture/display pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
	/// Maximum number of frames buffered between the two threads.
	pub capacity: usize,
	pub overflow: OverflowPolicy,
	/// How long the display loop waits for a frame before re-checking
	/// shutdown state.
	pub pop_timeout: Duration,
	/// Pause after a failed or empty read before trying again.
	pub read_backoff: Duration,
	/// Throughput window for both loops.
	pub report_window: Duration,
	pub capture_priority: Option<ThreadPriority>,
	/// Pin the capture thread to this CPU core id.
	pub capture_core: Option<usize>,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			capacity: DEFAULT_QUEUE_SIZE,
			overflow: OverflowPolicy::DropOldest,
			pop_timeout: DEFAULT_POP_TIMEOUT,
			read_backoff: DEFAULT_READ_BACKOFF,
			report_window: DEFAULT_REPORT_WINDOW,
			capture_priority: None,
			capture_core: None,
		}
	}
}

impl PipelineConfig {
	pub fn with_capacity(mut self, capacity: usize) -> Self {
		self.capacity = capacity;
		self
	}

	pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
		self.overflow = overflow;
		self
	}

	pub fn with_pop_timeout(mut self, pop_timeout: Duration) -> Self {
		self.pop_timeout = pop_timeout;
		self
	}

	pub fn with_read_backoff(mut self, read_backoff: Duration) -> Self {
		self.read_backoff = read_backoff;
		self
	}

	pub fn with_report_window(mut self, report_window: Duration) -> Self {
		self.report_window = report_window;
		self
	}

	pub fn with_capture_priority(mut self, priority: ThreadPriority) -> Self {
		self.capture_priority = Some(priority);
		self
	}

	pub fn with_capture_core(mut self, core: usize) -> Self {
		self.capture_core = Some(core);
		self
	}
}
