use crate::capture::CaptureSource;
use color_eyre::eyre::{bail, Result};
use std::{
	thread,
	time::{Duration, Instant},
};

/// Synthetic BGR source that draws a moving gradient, paced to a frame rate.
///
/// Stands in for a camera when none is attached.
#[derive(Debug)]
pub struct TestPattern {
	width: u32,
	height: u32,
	frame_interval: Option<Duration>,
	next_due: Option<Instant>,
	frame_count: u64,
	opened: bool,
}

impl TestPattern {
	pub fn new(width: u32, height: u32) -> Self {
		Self {
			width,
			height,
			frame_interval: None,
			next_due: None,
			frame_count: 0,
			opened: false,
		}
	}

	/// Limit output to `fps` frames per second. Zero means unpaced.
	pub fn with_fps(mut self, fps: u32) -> Self {
		self.frame_interval = (fps > 0).then(|| Duration::from_secs(1) / fps);
		self
	}

	#[inline]
	pub fn frame_len(&self) -> usize {
		self.width as usize * self.height as usize * 3
	}

	fn draw(&self) -> Vec<u8> {
		let shift = self.frame_count as usize;
		let width = self.width as usize;
		let mut pixels = vec![0u8; self.frame_len()];
		for (i, bgr) in pixels.chunks_exact_mut(3).enumerate() {
			let (x, y) = (i % width, i / width);
			bgr[0] = ((x + shift) % 256) as u8;
			bgr[1] = ((y + shift) % 256) as u8;
			bgr[2] = ((x + y) % 256) as u8;
		}
		pixels
	}

	fn pace(&mut self) {
		let Some(interval) = self.frame_interval else {
			return;
		};
		let now = Instant::now();
		let due = self.next_due.unwrap_or(now);
		if due > now {
			thread::sleep(due - now);
		}
		// Don't try to catch up after a stall.
		self.next_due = Some(due.max(now) + interval);
	}
}

impl CaptureSource for TestPattern {
	type Pixels = Vec<u8>;

	fn open(&mut self) -> Result<()> {
		if self.width == 0 || self.height == 0 {
			bail!("invalid test pattern size {}x{}", self.width, self.height);
		}
		self.opened = true;
		log::info!("test pattern opened ({}x{})", self.width, self.height);
		Ok(())
	}

	fn read(&mut self) -> Result<Option<Vec<u8>>> {
		if !self.opened {
			bail!("test pattern is not open");
		}
		self.pace();
		self.frame_count += 1;
		Ok(Some(self.draw()))
	}

	fn close(&mut self) {
		self.opened = false;
	}
}
