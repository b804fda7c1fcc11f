#![doc = include_str!("../README.md")]

mod config;
mod run;
mod telemetry;

use std::io::{self, BufWriter};

use clap::Parser;
use config::{CliArgs, Config};
use telemetry::init_telemetry;
use tracing::info;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = Config::try_from(args)?;

    init_telemetry()?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match config {
        Config::Decode { id, epoch } => run::write_decoded(&mut out, id, epoch),
        Config::Generate(config) => {
            let generator = run::build_generator(&config)?;
            info!(
                node_id = generator.node_id(),
                generator = ?config.generator,
                epoch_ms = config.clock.epoch().as_millis(),
                count = config.count,
                threads = config.threads,
                "issuing ids"
            );
            let ids = run::issue(
                generator.as_ref(),
                config.count,
                config.threads,
                config.max_rollback_wait,
            )?;
            run::write_ids(&mut out, &ids, config.format, config.clock.epoch())
        }
    }
}
