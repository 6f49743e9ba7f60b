use std::time::{Duration, Instant};

/// A single captured frame, as it travels from the capture thread to the
/// display thread.
///
/// The payload is opaque to the pipeline. Ownership moves into the channel on
/// push, so the source is free to reuse its own read buffer immediately.
#[derive(Debug, Clone)]
pub struct Frame<P> {
	index: u64,
	captured_at: Instant,
	pixels: P,
}

impl<P> Frame<P> {
	pub fn new(index: u64, pixels: P) -> Self {
		Self {
			index,
			captured_at: Instant::now(),
			pixels,
		}
	}

	/// Capture sequence number, starting at 1.
	#[inline]
	pub fn index(&self) -> u64 {
		self.index
	}

	#[inline]
	pub fn captured_at(&self) -> Instant {
		self.captured_at
	}

	/// How long ago this frame was read from the source.
	#[inline]
	pub fn age(&self) -> Duration {
		self.captured_at.elapsed()
	}

	#[inline]
	pub fn pixels(&self) -> &P {
		&self.pixels
	}

	#[inline]
	pub fn into_pixels(self) -> P {
		self.pixels
	}
}
