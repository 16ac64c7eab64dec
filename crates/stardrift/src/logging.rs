//! File logging. The terminal belongs to the UI, so log lines go to a file.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use env_logger::{Env, Target};
use stardrift_config::Config;

/// Install the global logger. Returns the log file path.
///
/// `RUST_LOG` overrides the configured level.
pub fn init(config: &Config) -> color_eyre::Result<PathBuf> {
    let path = config.log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    env_logger::Builder::from_env(Env::default().default_filter_or(config.log.level.as_str()))
        .format_timestamp_millis()
        .target(Target::Pipe(Box::new(file)))
        .try_init()?;
    Ok(path)
}
