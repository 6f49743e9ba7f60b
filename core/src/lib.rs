pub mod capture;
pub mod channel;
pub mod config;
#[cfg(feature = "opencv")]
pub mod cv;
pub mod display;
pub mod frame;
pub mod gstreamer;
pub mod pattern;
pub mod pipeline;
pub mod shutdown;
pub mod throughput;

#[cfg(feature = "opencv")]
pub use opencv;
pub use thread_priority::ThreadPriority;

pub use self::{
	capture::{CaptureLoop, CaptureSource, CaptureStats},
	channel::{FrameChannel, OverflowPolicy},
	config::PipelineConfig,
	display::{DisplayLoop, DisplaySink, DisplayStats},
	frame::Frame,
	pipeline::{Pipeline, PipelineSummary, StopHandle},
	shutdown::Shutdown,
	throughput::{LogReporter, StatsReporter, Throughput},
};
