//! Resolves global CLI flags into an open [`crate::engine::Engine`].
//! Grounded on `bd/src/context.rs`'s role (build runtime state once in
//! `main`, before command dispatch) generalized from a `.beads` directory
//! handle to the catalog path + config + scheduler the engine needs.

use std::path::{Path, PathBuf};

use hustle_catalog::EngineConfig;
use hustle_core::Result;

use crate::cli::GlobalArgs;
use crate::engine::Engine;

const DEFAULT_CATALOG_PATH: &str = "hustle_catalog.json";

pub fn open_engine(global: &GlobalArgs) -> Result<Engine> {
    let catalog_path: PathBuf = global.catalog.as_deref().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH));

    let config_path: Option<PathBuf> = global.config.as_deref().map(PathBuf::from);
    let mut config = EngineConfig::load(config_path.as_deref().map(Path::new))?;
    if let Some(workers) = global.workers {
        config.workers = Some(workers);
    }

    Engine::open(&catalog_path, config)
}

pub fn init_logging(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter("hustle=debug")
            .with_writer(std::io::stderr)
            .init();
    }
}
