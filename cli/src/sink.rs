use camview_core::{DisplaySink, Frame};
use std::time::{Duration, Instant};

/// Swallows frames, keeping only counts and the worst observed latency.
#[derive(Debug, Default)]
pub struct Headless {
	pub shown: u64,
	pub max_latency: Duration,
}

impl<P> DisplaySink<P> for Headless {
	fn show(&mut self, frame: Frame<P>) {
		self.shown += 1;
		self.max_latency = self.max_latency.max(frame.age());
	}
}

/// Asks the pipeline to stop once `limit` has elapsed, or whenever the
/// wrapped sink does.
pub struct TimeLimited<D> {
	inner: D,
	deadline: Option<Instant>,
}

impl<D> TimeLimited<D> {
	pub fn new(inner: D, limit: Option<Duration>) -> Self {
		Self {
			inner,
			deadline: limit.map(|limit| Instant::now() + limit),
		}
	}

	pub fn into_inner(self) -> D {
		self.inner
	}
}

impl<P, D: DisplaySink<P>> DisplaySink<P> for TimeLimited<D> {
	fn show(&mut self, frame: Frame<P>) {
		self.inner.show(frame)
	}

	fn exit_requested(&mut self) -> bool {
		// Always poll the inner sink, it may need pumping every iteration.
		let inner = self.inner.exit_requested();
		inner || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
	}
}
