use camview_core::{StatsReporter, Throughput};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use std::{fmt::Write, time::Duration};

/// Live `[FPS] Capture | Display | Queue` line on stderr.
pub struct StatusLine {
	bar: ProgressBar,
}

impl StatusLine {
	pub fn new(capacity: usize) -> Result<Self> {
		let style =
			ProgressStyle::with_template("[{elapsed}] {spinner:.green} [FPS] {msg} | Queue: {queue}")
				.wrap_err("invalid status line template")?
				.with_key("queue", move |state: &ProgressState, w: &mut dyn Write| {
					let _ = write!(w, "{}/{capacity}", state.pos());
				});
		let bar = ProgressBar::new_spinner().with_style(style);
		bar.set_message("Capture: 0 | Display: 0");
		bar.enable_steady_tick(Duration::from_millis(100));
		Ok(Self { bar })
	}

	pub fn finish(&self) {
		self.bar.finish();
	}
}

impl StatsReporter for StatusLine {
	fn report(&mut self, stats: &Throughput) {
		self.bar.set_position(stats.queue_depth as u64);
		self.bar.set_message(format!(
			"Capture: {} | Display: {}",
			stats.capture_fps, stats.display_fps
		));
		log::debug!(
			"capture {} fps, display {} fps, queue {}, dropped {}",
			stats.capture_fps,
			stats.display_fps,
			stats.queue_depth,
			stats.dropped
		);
	}
}
