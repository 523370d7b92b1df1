//! Append-only JSON-lines record of completed actions.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::codec::Report;
use crate::error::{HuffError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: String,
    pub action: String,
    pub input: String,
    pub output: Option<String>,
    pub original_len: u64,
    pub compressed_len: u64,
}

impl JournalEntry {
    pub fn new(action: &str, input: &Path, output: Option<&Path>, report: Report) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            action: action.to_string(),
            input: input.display().to_string(),
            output: output.map(|p| p.display().to_string()),
            original_len: report.original_len,
            compressed_len: report.compressed_len,
        }
    }
}

pub fn append(path: &Path, entry: &JournalEntry) -> Result<()> {
    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;
    Ok(())
}

pub fn read_entries(path: &Path) -> Result<Vec<JournalEntry>> {
    let text = fs::read_to_string(path)?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(HuffError::from))
        .collect()
}
