//! Startup manifest: an ordered list of `key<TAB>location` rows.
//!
//! ```text
//! # key      location
//! wig1       /data/sample.bw
//! contacts   https://example.com/GM12878.hic
//! ```

use crate::{Error, Result};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<(String, String)>,
}

impl Manifest {
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        let mut seen_content = false;

        for (number, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut columns = trimmed.split('\t').map(str::trim);
            let key = columns.next().unwrap_or_default();
            let location = columns.next().unwrap_or_default();
            if key.is_empty() || location.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "manifest line {}: expected key<TAB>location",
                    number + 1
                )));
            }

            let is_header = key.eq_ignore_ascii_case("key") && location.eq_ignore_ascii_case("location");
            if !seen_content && is_header {
                seen_content = true;
                continue;
            }
            seen_content = true;
            entries.push((key.to_string(), location.to_string()));
        }

        Ok(Self { entries })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::InvalidInput(format!("cannot read manifest {}: {}", path.display(), e)))?;
        Self::parse(&text)
    }

    /// Entries in file order, duplicates included.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
