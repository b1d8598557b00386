#![cfg(not(tarpaulin_include))]

use catalog::{Config, app};
use std::env;
use std::path::PathBuf;

/// Main entry point for the catalog web application
///
/// Accepts an optional `--config <file>` pointing at a JSON settings file;
/// defaults are used otherwise.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    let config = Config::load(config_path.as_deref())?;
    app::run(config).await
}
