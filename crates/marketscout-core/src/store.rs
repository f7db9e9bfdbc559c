//! Write-once JSON persistence for run results

use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// File name prefix for run results
pub const DEFAULT_PREFIX: &str = "pipeline_results";

/// Attempts at a unique file name within the same second
const MAX_NAME_ATTEMPTS: usize = 100;

/// Directory of timestamped result files
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
    prefix: String,
}

impl ResultStore {
    /// Store results under `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    /// Set the file name prefix
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Output directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `value` as `<prefix>_<YYYYmmdd_HHMMSS>.json`
    pub fn persist<T: Serialize>(&self, value: &T) -> Result<PathBuf> {
        self.persist_at(value, Local::now())
    }

    /// Persist with an explicit timestamp. Existing files are never
    /// overwritten; a `_N` suffix is added on collision. Nothing is left on
    /// disk when serialization or the write fails.
    pub fn persist_at<T: Serialize>(&self, value: &T, at: DateTime<Local>) -> Result<PathBuf> {
        let mut body = serde_json::to_vec_pretty(value)?;
        body.push(b'\n');

        std::fs::create_dir_all(&self.dir)?;
        let stem = format!("{}_{}", self.prefix, at.format("%Y%m%d_%H%M%S"));

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{}.json", stem)
            } else {
                format!("{}_{}.json", stem, attempt)
            };
            let path = self.dir.join(name);
            let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = write_all(file, &body) {
                let _ = std::fs::remove_file(&path);
                return Err(e.into());
            }
            info!(path = %path.display(), bytes = body.len(), "Results saved");
            return Ok(path);
        }

        Err(Error::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free file name for {} in {}", stem, self.dir.display()),
        )))
    }

    /// Read a persisted result back
    pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn write_all(mut file: std::fs::File, body: &[u8]) -> std::io::Result<()> {
    file.write_all(body)?;
    file.sync_all()
}
