//! Local tabular backends: JSON-lines files and an in-memory table

use std::collections::{HashMap, VecDeque};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::sink::{SinkError, Tabular};

/// One `{dest}.jsonl` file per destination; each line is a JSON array of cells.
///
/// The first line is the header. Used for offline runs and `--dry-run`.
#[derive(Debug)]
pub struct JsonlTable {
    dir: PathBuf,
}

impl JsonlTable {
    pub fn new(dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn path(&self, dest: &str) -> PathBuf {
        let file: String = dest
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.jsonl"))
    }

    fn append_lines<R: serde::Serialize>(&self, dest: &str, lines: &[R]) -> Result<(), SinkError> {
        let path = self.path(dest);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        let mut w = BufWriter::new(file);
        for line in lines {
            serde_json::to_writer(&mut w, line).map_err(|e| SinkError::new(e.to_string()))?;
            w.write_all(b"\n").map_err(|e| io_err(&path, e))?;
        }
        w.flush().map_err(|e| io_err(&path, e))
    }
}

fn io_err(path: &Path, e: std::io::Error) -> SinkError {
    SinkError::new(format!("{}: {e}", path.display()))
}

impl Tabular for JsonlTable {
    fn clear(&mut self, dest: &str) -> Result<(), SinkError> {
        let path = self.path(dest);
        File::create(&path).map(drop).map_err(|e| io_err(&path, e))
    }

    fn write_header(&mut self, dest: &str, header: &[&str]) -> Result<(), SinkError> {
        self.append_lines(dest, &[header])
    }

    fn append_rows(&mut self, dest: &str, rows: &[Vec<String>]) -> Result<(), SinkError> {
        self.append_lines(dest, rows)
    }
}

#[derive(Debug, Default)]
struct MemoryDest {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    clears: usize,
    header_writes: usize,
    append_sizes: Vec<usize>,
    append_attempts: usize,
}

/// In-memory table that records every call; can be scripted to fail appends.
#[derive(Debug, Default)]
pub struct MemoryTable {
    dests: HashMap<String, MemoryDest>,
    failures: VecDeque<SinkError>,
    succeed_first: usize,
}

impl MemoryTable {
    /// Fail the next appends with these errors, in order
    pub fn fail_appends(&mut self, errors: Vec<SinkError>) {
        self.fail_appends_after(0, errors);
    }

    /// Let `ok` appends through, then fail with these errors, in order
    pub fn fail_appends_after(&mut self, ok: usize, errors: Vec<SinkError>) {
        self.succeed_first = ok;
        self.failures = errors.into();
    }

    pub fn header(&self, dest: &str) -> Vec<String> {
        self.dests.get(dest).map(|d| d.header.clone()).unwrap_or_default()
    }

    pub fn rows(&self, dest: &str) -> Vec<Vec<String>> {
        self.dests.get(dest).map(|d| d.rows.clone()).unwrap_or_default()
    }

    pub fn clears(&self, dest: &str) -> usize {
        self.dests.get(dest).map_or(0, |d| d.clears)
    }

    pub fn header_writes(&self, dest: &str) -> usize {
        self.dests.get(dest).map_or(0, |d| d.header_writes)
    }

    /// Sizes of accepted appends
    pub fn append_sizes(&self, dest: &str) -> Vec<usize> {
        self.dests.get(dest).map(|d| d.append_sizes.clone()).unwrap_or_default()
    }

    /// Appends tried, accepted or not
    pub fn append_attempts(&self, dest: &str) -> usize {
        self.dests.get(dest).map_or(0, |d| d.append_attempts)
    }
}

impl Tabular for MemoryTable {
    fn clear(&mut self, dest: &str) -> Result<(), SinkError> {
        let d = self.dests.entry(dest.to_string()).or_default();
        d.header.clear();
        d.rows.clear();
        d.clears += 1;
        Ok(())
    }

    fn write_header(&mut self, dest: &str, header: &[&str]) -> Result<(), SinkError> {
        let d = self.dests.entry(dest.to_string()).or_default();
        d.header = header.iter().map(|h| h.to_string()).collect();
        d.header_writes += 1;
        Ok(())
    }

    fn append_rows(&mut self, dest: &str, rows: &[Vec<String>]) -> Result<(), SinkError> {
        let d = self.dests.entry(dest.to_string()).or_default();
        d.append_attempts += 1;
        if self.succeed_first > 0 {
            self.succeed_first -= 1;
        } else if let Some(e) = self.failures.pop_front() {
            return Err(e);
        }
        d.rows.extend_from_slice(rows);
        d.append_sizes.push(rows.len());
        Ok(())
    }
}
