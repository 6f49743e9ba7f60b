//! OpenCV-backed camera capture and HighGUI display.

use crate::{capture::CaptureSource, display::DisplaySink, frame::Frame, gstreamer::DeviceConfig};
use color_eyre::eyre::{bail, ContextCompat, Result, WrapErr};
use opencv::{
	core::{Mat, MatTraitConst},
	highgui,
	videoio::{
		VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst, CAP_GSTREAMER,
		CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH,
	},
};

const KEY_ESC: i32 = 27;

/// Reads BGR frames from a GStreamer pipeline through OpenCV.
pub struct GstCapture {
	pipeline: String,
	capture: Option<VideoCapture>,
	scratch: Mat,
}

impl GstCapture {
	pub fn new(pipeline: impl Into<String>) -> Self {
		Self {
			pipeline: pipeline.into(),
			capture: None,
			scratch: Mat::default(),
		}
	}

	pub fn from_device(device: &DeviceConfig) -> Self {
		Self::new(device.capture_pipeline())
	}

	#[inline]
	pub fn pipeline(&self) -> &str {
		&self.pipeline
	}
}

impl CaptureSource for GstCapture {
	type Pixels = Mat;

	fn open(&mut self) -> Result<()> {
		log::info!("opening gstreamer pipeline: {}", self.pipeline);
		let capture = VideoCapture::from_file(&self.pipeline, CAP_GSTREAMER)
			.wrap_err_with(|| format!("failed to open video capture for {}", self.pipeline))?;
		if !capture
			.is_opened()
			.wrap_err("failed to query video capture state")?
		{
			bail!("video capture did not open: {}", self.pipeline);
		}
		let width = capture
			.get(CAP_PROP_FRAME_WIDTH)
			.wrap_err("failed to get frame width property")?;
		let height = capture
			.get(CAP_PROP_FRAME_HEIGHT)
			.wrap_err("failed to get frame height property")?;
		log::info!("video size: {width}x{height}");
		self.capture = Some(capture);
		Ok(())
	}

	fn read(&mut self) -> Result<Option<Mat>> {
		let capture = self
			.capture
			.as_mut()
			.wrap_err("video capture is not open")?;
		if !capture
			.read(&mut self.scratch)
			.wrap_err("failed to read frame from video capture")?
		{
			bail!("video capture has no frame available");
		}
		if self.scratch.rows() == 0 || self.scratch.cols() == 0 {
			return Ok(None);
		}
		// The scratch buffer gets overwritten by the next read.
		self.scratch
			.try_clone()
			.map(Some)
			.wrap_err("failed to copy captured frame")
	}

	fn close(&mut self) {
		if let Some(mut capture) = self.capture.take() {
			if let Err(err) = capture.release() {
				log::warn!("failed to release video capture: {err}");
			}
		}
	}
}

/// Shows frames in a HighGUI window. `q`, `Q` or ESC asks the pipeline to
/// stop.
pub struct HighGuiDisplay {
	window: String,
}

impl HighGuiDisplay {
	pub fn new(window: impl Into<String>) -> Result<Self> {
		let window = window.into();
		highgui::named_window(&window, highgui::WINDOW_AUTOSIZE)
			.wrap_err_with(|| format!("failed to create window '{window}'"))?;
		Ok(Self { window })
	}
}

impl DisplaySink<Mat> for HighGuiDisplay {
	fn show(&mut self, frame: Frame<Mat>) {
		if frame.pixels().rows() == 0 {
			return;
		}
		if let Err(err) = highgui::imshow(&self.window, frame.pixels()) {
			log::warn!("failed to show frame {}: {err}", frame.index());
		}
	}

	fn exit_requested(&mut self) -> bool {
		// Also pumps the HighGUI event loop, which is what actually paints.
		match highgui::wait_key(1) {
			Ok(key) => {
				let exit = key == i32::from(b'q') || key == i32::from(b'Q') || key == KEY_ESC;
				if exit {
					log::info!("exit key detected");
				}
				exit
			}
			Err(err) => {
				log::warn!("failed to poll keyboard: {err}");
				false
			}
		}
	}
}

impl Drop for HighGuiDisplay {
	fn drop(&mut self) {
		let _ = highgui::destroy_all_windows();
	}
}
