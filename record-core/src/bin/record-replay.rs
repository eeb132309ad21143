//! Record list replay binary
//!
//! Replays a JSON handle script and prints the ordered records with their
//! digest. Two nodes that disagree on a record stream can replay the same
//! script and diff the output.

use anyhow::Context;
use clap::{Arg, Command};
use record_core::{replay::Replayer, Config};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let matches = Command::new("record-replay")
        .about("Replay a record list handle script")
        .arg(
            Arg::new("script")
                .long("script")
                .required(true)
                .help("Path to the JSON handle script"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Path to a TOML config; environment overrides apply otherwise"),
        )
        .get_matches();

    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(path).with_context(|| format!("loading {}", path))?,
        None => Config::from_env().context("loading config from environment")?,
    };
    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        max_preceding = config.handle.max_preceding_records,
        max_following = config.handle.max_following_records,
        "Starting record replay"
    );

    let script_path = matches
        .get_one::<String>("script")
        .context("--script is required")?;
    let script = std::fs::read_to_string(script_path)
        .with_context(|| format!("reading {}", script_path))?;

    let replayer = Replayer::new(config.handle, config.replay);
    let output = replayer.replay_json(&script)?;
    println!("{}", replayer.render(&output)?);

    Ok(())
}
