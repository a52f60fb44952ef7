use std::io;

use clap::Parser;
use subject_models::{cli::Args, pipeline};

fn main() -> io::Result<()> {
    env_logger::init();

    let config = Args::parse().into_config()?;
    pipeline::run(&config)?;

    Ok(())
}
