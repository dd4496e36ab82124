//! Locates and reads the holdings file.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Clean holdings array.
pub const HOLDINGS_FILE: &str = "holdings.json";
/// Object with a `holdings` array.
pub const DATABASE_FILE: &str = "db.json";
/// Spreadsheet export with `ColumnN` keys.
pub const LEGACY_FILE: &str = "portfolioTable.json";

/// Reads raw holdings rows from a data directory.
///
/// Candidates are tried in order: [`HOLDINGS_FILE`], [`DATABASE_FILE`], [`LEGACY_FILE`].
/// A candidate that is missing or does not parse into the expected shape is skipped. The
/// legacy file is the last resort, so failing to read or parse it is an error.
#[derive(Debug, Clone)]
pub struct PortfolioSource {
    data_dir: PathBuf,
}

impl PortfolioSource {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn load(&self) -> Result<Vec<Value>> {
        if let Some(rows) = self.try_candidate(HOLDINGS_FILE, |data| match data {
            Value::Array(rows) => Some(rows),
            _ => None,
        }) {
            return Ok(rows);
        }

        if let Some(rows) = self.try_candidate(DATABASE_FILE, |data| match data {
            Value::Object(mut map) => match map.remove("holdings") {
                Some(Value::Array(rows)) => Some(rows),
                _ => None,
            },
            _ => None,
        }) {
            return Ok(rows);
        }

        let path = self.data_dir.join(LEGACY_FILE);
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read holdings file: {}", path.display()))?;
        let data: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse holdings file: {}", path.display()))?;
        debug!(path = %path.display(), "Loaded legacy holdings export");

        Ok(match data {
            Value::Array(rows) => rows,
            _ => Vec::new(),
        })
    }

    fn try_candidate(
        &self,
        file_name: &str,
        extract: impl FnOnce(Value) -> Option<Vec<Value>>,
    ) -> Option<Vec<Value>> {
        let path = self.data_dir.join(file_name);
        if !path.exists() {
            return None;
        }

        let rows = fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|contents| Ok(serde_json::from_str::<Value>(&contents)?))
            .map(extract);

        match rows {
            Ok(Some(rows)) => {
                debug!(path = %path.display(), rows = rows.len(), "Loaded holdings");
                Some(rows)
            }
            Ok(None) => {
                warn!(path = %path.display(), "Unexpected holdings layout, skipping");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable holdings file, skipping");
                None
            }
        }
    }
}
