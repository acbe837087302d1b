//! Command handlers for CLI subcommands
//!
//! This module contains the implementation logic for each CLI subcommand.

mod check;
mod completions;
mod validate;

pub use check::handle_check;
pub use completions::handle_completions;
pub use validate::handle_validate;

use crate::error::{CliError, Result};
use crate::logging::timing::Timer;
use schemagraph::{FileLoader, Loader, LoaderConfig, SchemaLoader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fail with `FileNotFound` unless `path` exists
fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(CliError::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Start a loader session with every `--ref` document registered
fn open_session(config: LoaderConfig, refs: &[PathBuf]) -> Result<SchemaLoader> {
    let _timer = Timer::new("register_refs");
    let mut loader = SchemaLoader::with_config(config);

    let files = refs
        .iter()
        .map(|path| ensure_exists(path).map(|_| FileLoader::new(path)))
        .collect::<Result<Vec<_>>>()?;
    let loaders: Vec<&dyn Loader> = files.iter().map(|file| file as &dyn Loader).collect();
    loader.add_schemas(&loaders)?;

    debug!(refs = refs.len(), documents = loader.pool().len(), "Loader session ready");
    Ok(loader)
}
