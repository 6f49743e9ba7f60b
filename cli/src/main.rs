pub mod cmd;
pub mod report;
pub mod sink;
pub mod view;

use self::cmd::{CliArgs, CliSubcommands};
use clap::Parser;
use color_eyre::eyre::Result;

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

fn main() -> Result<()> {
	color_eyre::install()?;
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = CliArgs::parse();
	match args.command {
		CliSubcommands::View(args) => view::view(args),
		CliSubcommands::Pipeline(args) => {
			println!("{}", args.to_config().capture_pipeline());
			Ok(())
		}
	}
}
