//! Gridmap CLI
//!
//! Headless driver for the gridmap editor core. Reads editor commands from a
//! script file (or stdin) and runs them against a scene autosaved to a data
//! directory.
//!
//! Environment:
//! - `GRIDMAP_CONFIG`: path to an `EditorConfig` JSON file
//! - `GRIDMAP_DATA_DIR`: storage directory, `.gridmap` by default
//! - `RUST_LOG`: log filter, `info` by default

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;

use anyhow::Context;
use gridmap_core::{Editor, EditorConfig, FileStorage, Persistence, SceneStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::script::Command;
use crate::session::Session;

mod script;
mod session;

const DEFAULT_DATA_DIR: &str = ".gridmap";

fn load_config() -> anyhow::Result<EditorConfig> {
    let Some(path) = std::env::var_os("GRIDMAP_CONFIG") else {
        return Ok(EditorConfig::default());
    };
    let path = PathBuf::from(path);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    EditorConfig::from_json(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    let data_dir = std::env::var_os("GRIDMAP_DATA_DIR")
        .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);
    tracing::info!("Using data directory {}", data_dir.display());

    let persistence = Persistence::new(FileStorage::new(data_dir), &config);
    let store = SceneStore::open(config, persistence);
    let mut session = Session::new(Editor::new(store));

    let input: Box<dyn Read> = match std::env::args_os().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            Box::new(
                std::fs::File::open(&path)
                    .with_context(|| format!("failed to open script {}", path.display()))?,
            )
        }
        None => Box::new(std::io::stdin()),
    };

    let mut stdout = std::io::stdout().lock();
    for (index, line) in BufReader::new(input).lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let Some(command) =
            Command::parse(&line).with_context(|| format!("line {line_no}: {line}"))?
        else {
            continue;
        };
        session
            .run(command, &mut stdout)
            .with_context(|| format!("line {line_no}: {line}"))?;
    }

    Ok(())
}
