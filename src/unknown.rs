use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Append-only list of location strings that did not classify as UK, one per
/// line, each recorded once.
pub struct LocationLog {
    path: PathBuf,
    seen: HashSet<String>,
}

impl LocationLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let seen = match fs::read_to_string(&path) {
            Ok(text) => text.lines().map(|l| l.trim().to_string()).collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", path)),
        };
        Ok(LocationLog { path, seen })
    }

    /// Returns whether a new line was written.
    pub fn append(&mut self, location: &str) -> Result<bool> {
        // Multi-line card text is folded so each entry stays on one line.
        let location = location.split_whitespace().collect::<Vec<_>>().join(" ");
        if location.is_empty() || self.seen.contains(&location) {
            return Ok(false);
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {:?}", self.path))?;
        writeln!(file, "{}", location)?;
        self.seen.insert(location);
        Ok(true)
    }
}
