use crate::{
	cmd::{SourceKind, ViewArgs},
	report::StatusLine,
	sink::{Headless, TimeLimited},
};
use camview_core::{
	gstreamer, pattern::TestPattern, CaptureSource, DisplaySink, Pipeline, PipelineConfig,
	ThreadPriority,
};
use color_eyre::eyre::{Result, WrapErr};
use std::time::Duration;

pub fn view(args: ViewArgs) -> Result<()> {
	let mut config = PipelineConfig::default()
		.with_capacity(args.queue_size)
		.with_overflow(args.overflow.into());
	if args.high_priority {
		config = config.with_capture_priority(ThreadPriority::Max);
	}
	if let Some(core) = args.core {
		config = config.with_capture_core(core);
	}
	let duration = args
		.duration
		.map(Duration::try_from_secs_f64)
		.transpose()
		.wrap_err("invalid duration")?;
	if args.rga {
		gstreamer::enable_rga();
	}

	let device = args.device.to_config();
	log::info!(
		"device: {}, resolution: {}x{}, fps: {}, queue size: {}",
		device.device.display(),
		device.width,
		device.height,
		device.fps,
		config.capacity
	);

	match args.source {
		SourceKind::TestPattern => {
			if !args.headless {
				log::info!("test pattern has no window, running headless");
			}
			let source = TestPattern::new(device.width, device.height).with_fps(device.fps);
			run(config, source, Headless::default(), duration)
		}
		#[cfg(feature = "opencv")]
		SourceKind::Gstreamer => {
			use camview_core::cv::{GstCapture, HighGuiDisplay};

			let source = GstCapture::from_device(&device);
			if args.headless {
				run(config, source, Headless::default(), duration)
			} else {
				let window = HighGuiDisplay::new("V4L2 Camera Stream")
					.wrap_err("failed to open display window")?;
				println!("Press 'q' to quit");
				run(config, source, window, duration)
			}
		}
		#[cfg(not(feature = "opencv"))]
		SourceKind::Gstreamer => Err(color_eyre::eyre::eyre!(
			"camview was built without the `opencv` feature, use --source test-pattern"
		)),
	}
}

fn run<S, D>(config: PipelineConfig, source: S, sink: D, duration: Option<Duration>) -> Result<()>
where
	S: CaptureSource + Send + 'static,
	S::Pixels: Send + 'static,
	D: DisplaySink<S::Pixels>,
{
	let capacity = config.capacity;
	let pipeline = Pipeline::new(config).wrap_err("failed to set up pipeline")?;
	let stop = pipeline.stop_handle();
	ctrlc::set_handler(move || stop.stop()).wrap_err("failed to set Ctrl-C handler")?;

	let mut sink = TimeLimited::new(sink, duration);
	let mut status = StatusLine::new(capacity)?;
	let summary = pipeline.run(source, &mut sink, &mut status);
	status.finish();
	let summary = summary.wrap_err("pipeline failed")?;

	println!(
		"captured {} frames, displayed {}, dropped {} ({} read failures)",
		summary.captured, summary.displayed, summary.dropped, summary.read_failures
	);
	Ok(())
}
