use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};

/// Pipeline-wide run flag shared by the capture and display loops.
///
/// Starts out running and flips to stopped at most once.
#[derive(Debug, Clone)]
pub struct Shutdown {
	running: Arc<AtomicBool>,
}

impl Shutdown {
	pub fn new() -> Self {
		Self {
			running: Arc::new(AtomicBool::new(true)),
		}
	}

	#[inline]
	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::Acquire)
	}

	/// Marks the pipeline as stopped. Returns `true` for the call that
	/// actually performed the transition.
	pub fn request(&self) -> bool {
		self.running.swap(false, Ordering::AcqRel)
	}
}

impl Default for Shutdown {
	fn default() -> Self {
		Self::new()
	}
}
