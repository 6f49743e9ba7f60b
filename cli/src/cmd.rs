use camview_core::{config, gstreamer::DeviceConfig, OverflowPolicy};
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{ContextCompat, Result, WrapErr};
use itertools::Itertools;
use std::{path::PathBuf, str::FromStr};

#[derive(Parser)]
#[command(author, version, about, long_about = None, propagate_version = true)]
pub struct CliArgs {
	#[command(subcommand)]
	pub command: CliSubcommands,
}

#[derive(Subcommand)]
pub enum CliSubcommands {
	/// Capture from a camera and display it live.
	View(ViewArgs),
	/// Print the GStreamer pipeline that `view` would open.
	Pipeline(DeviceArgs),
}

#[derive(Args)]
pub struct DeviceArgs {
	/// The V4L2 device to capture from.
	#[arg(default_value = camview_core::gstreamer::DEFAULT_DEVICE)]
	pub device: PathBuf,
	/// The capture resolution (WIDTHxHEIGHT).
	#[arg(short, long, default_value = "1920x1080", value_parser = parse_resolution)]
	pub resolution: (u32, u32),
	/// The capture frame rate.
	#[arg(short, long, default_value = "30")]
	pub fps: u32,
	/// The raw pixel format to request from the driver, e.g. NV12.
	#[arg(long)]
	pub format: Option<String>,
}

impl DeviceArgs {
	pub fn to_config(&self) -> DeviceConfig {
		let (width, height) = self.resolution;
		DeviceConfig {
			device: self.device.clone(),
			width,
			height,
			fps: self.fps,
			format: self.format.clone(),
		}
	}
}

#[derive(Args)]
pub struct ViewArgs {
	#[command(flatten)]
	pub device: DeviceArgs,
	/// Where frames come from.
	#[arg(short, long, value_enum, default_value_t = SourceKind::default())]
	pub source: SourceKind,
	/// How many frames to buffer between capture and display.
	#[arg(short = 'q', long, default_value_t = config::DEFAULT_QUEUE_SIZE)]
	pub queue_size: usize,
	/// What to throw away when the display falls behind.
	#[arg(long, value_enum, default_value_t = Overflow::DropOldest)]
	pub overflow: Overflow,
	/// Don't open a window, just count frames.
	#[arg(long)]
	pub headless: bool,
	/// Stop after this many seconds.
	#[arg(short, long)]
	pub duration: Option<f64>,
	/// Run the capture thread at maximum priority.
	#[arg(long)]
	pub high_priority: bool,
	/// Pin the capture thread to this CPU core.
	#[arg(short = 'c', long)]
	pub core: Option<usize>,
	/// Use the Rockchip RGA for GStreamer colour conversion.
	#[arg(long)]
	pub rga: bool,
}

#[derive(Clone, Copy, Default, ValueEnum)]
pub enum SourceKind {
	/// A V4L2 camera through GStreamer and OpenCV.
	#[cfg_attr(feature = "opencv", default)]
	Gstreamer,
	/// A generated gradient, no camera needed.
	#[cfg_attr(not(feature = "opencv"), default)]
	TestPattern,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Overflow {
	DropOldest,
	DropNewest,
}

impl From<Overflow> for OverflowPolicy {
	fn from(overflow: Overflow) -> Self {
		match overflow {
			Overflow::DropOldest => OverflowPolicy::DropOldest,
			Overflow::DropNewest => OverflowPolicy::DropNewest,
		}
	}
}

fn parse_resolution(arg: &str) -> Result<(u32, u32)> {
	arg.split(['x', 'X'])
		.map(str::trim)
		.map(|side| u32::from_str(side).wrap_err_with(|| format!("invalid number '{}'", side)))
		.collect::<Result<Vec<u32>>>()
		.wrap_err("resolution should be formatted as WIDTHxHEIGHT")?
		.into_iter()
		.collect_tuple()
		.context("resolution should be formatted as WIDTHxHEIGHT")
}
