//! GStreamer pipeline descriptions for V4L2 cameras.

use std::{fmt, path::PathBuf};

pub const DEFAULT_DEVICE: &str = "/dev/video0";

/// Environment switches that make `videoconvert`/`videoflip` use the
/// Rockchip RGA 2D accelerator.
pub const RGA_ENV_VARS: [&str; 2] = ["GST_VIDEO_CONVERT_USE_RGA", "GST_VIDEO_FLIP_USE_RGA"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
	pub device: PathBuf,
	pub width: u32,
	pub height: u32,
	pub fps: u32,
	/// Raw format to request from the driver (e.g. `NV12`). When unset the
	/// driver picks one.
	pub format: Option<String>,
}

impl Default for DeviceConfig {
	fn default() -> Self {
		Self {
			device: PathBuf::from(DEFAULT_DEVICE),
			width: 1920,
			height: 1080,
			fps: 30,
			format: None,
		}
	}
}

impl DeviceConfig {
	/// A pipeline that ends in an `appsink` producing BGR frames, suitable for
	/// OpenCV's GStreamer backend.
	pub fn capture_pipeline(&self) -> String {
		self.to_string()
	}
}

impl fmt::Display for DeviceConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"v4l2src device={} min-buffers=2 io-mode=mmap ! video/x-raw",
			self.device.display()
		)?;
		if let Some(format) = &self.format {
			write!(f, ", format=(string){format}")?;
		}
		write!(
			f,
			", width=(int){}, height=(int){}, framerate=(fraction){}/1 ! videoconvert ! \
			 video/x-raw, format=(string)BGR ! appsink",
			self.width, self.height, self.fps
		)
	}
}

/// Turns on RGA acceleration for GStreamer elements created after this call.
pub fn enable_rga() {
	for var in RGA_ENV_VARS {
		std::env::set_var(var, "1");
	}
}
