use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn log_path() -> Result<PathBuf> {
    log_path_in(dirs::cache_dir())
}

fn log_path_in(cache_dir: Option<PathBuf>) -> Result<PathBuf> {
    let cache_dir = cache_dir.ok_or_else(|| anyhow!("Could not determine cache directory"))?;
    Ok(cache_dir.join("chemrag").join("chemrag.log"))
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))
}

/// The TUI owns the terminal, so its logs go to a file.
pub fn init_file(verbose: bool) -> Result<PathBuf> {
    let path = log_path()?;
    let file = open_log_file(&path)?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
        .with(filter(verbose))
        .try_init()?;

    Ok(path)
}

pub fn init_stderr(verbose: bool) -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter(verbose))
        .try_init()?;
    Ok(())
}
