//! Tabular sink: batched upload with batch- and session-level retry
//!
//! A destination is always rewritten from scratch: clear, header, then rows
//! in fixed-size batches. Errors are classified by their text, since remote
//! APIs report throttling and outages inconsistently.

use std::time::Duration;

/// Error from a tabular backend, carrying the remote message verbatim
#[derive(Debug, Clone)]
pub struct SinkError {
    pub message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        classify(&self.message)
    }
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SinkError {}

/// How a sink error should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Throttling or outage; retry the batch
    Retryable,
    /// Credentials, permissions or missing destination; give up now
    Terminal,
    /// Neither; escalate to a session-level restart
    Unknown,
}

const TERMINAL_PATTERNS: &[&str] = &[
    "401",
    "403",
    "404",
    "authentication",
    "unauthorized",
    "permission denied",
    "not found",
];

const RETRYABLE_PATTERNS: &[&str] = &[
    "429",
    "500",
    "502",
    "503",
    "504",
    "rate limit",
    "quota exceeded",
    "timeout",
    "timed out",
    "connection error",
    "internal error",
    "backend error",
];

/// Classify an error message. Terminal patterns win over retryable ones.
pub fn classify(message: &str) -> ErrorClass {
    let lower = message.to_ascii_lowercase();
    if TERMINAL_PATTERNS.iter().any(|p| lower.contains(p)) {
        ErrorClass::Terminal
    } else if RETRYABLE_PATTERNS.iter().any(|p| lower.contains(p)) {
        ErrorClass::Retryable
    } else {
        ErrorClass::Unknown
    }
}

/// A spreadsheet-like store with named destinations (worksheets, files, ...)
pub trait Tabular {
    /// Remove every row of `dest`
    fn clear(&mut self, dest: &str) -> Result<(), SinkError>;
    /// Write the header as the first row of `dest`
    fn write_header(&mut self, dest: &str, header: &[&str]) -> Result<(), SinkError>;
    /// Append rows after the existing content of `dest`
    fn append_rows(&mut self, dest: &str, rows: &[Vec<String>]) -> Result<(), SinkError>;
}

/// Batch size, delays and retry budgets for an upload
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub batch_size: usize,
    /// Pause between consecutive batches
    pub batch_delay: Duration,
    /// Attempts per batch for retryable errors
    pub batch_attempts: u32,
    /// Backoff base between batch attempts (doubles)
    pub batch_backoff: Duration,
    /// Full restarts (clear + header + all batches)
    pub session_attempts: u32,
    /// Backoff base between session attempts (5s, 10s, 20s, ...)
    pub session_backoff: Duration,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            batch_size: 100,
            batch_delay: Duration::from_secs(1),
            batch_attempts: 3,
            batch_backoff: Duration::from_secs(2),
            session_attempts: 3,
            session_backoff: Duration::from_secs(5),
        }
    }
}

impl UploadPolicy {
    /// Policy without any sleeping (tests, local backends)
    pub fn immediate() -> Self {
        Self {
            batch_delay: Duration::ZERO,
            batch_backoff: Duration::ZERO,
            session_backoff: Duration::ZERO,
            ..Self::default()
        }
    }

    fn total_batches(&self, rows: usize) -> usize {
        rows.div_ceil(self.batch_size.max(1))
    }
}

/// Why a single session attempt stopped
enum AttemptError {
    Terminal(SinkError),
    Restart(SinkError),
}

/// Uploads a header and rows to a destination, absorbing transient failures.
pub struct SheetSink<'a, T: Tabular> {
    table: &'a mut T,
    policy: UploadPolicy,
}

impl<'a, T: Tabular> SheetSink<'a, T> {
    pub fn new(table: &'a mut T, policy: UploadPolicy) -> Self {
        Self { table, policy }
    }

    /// Rewrite `dest` with `header` + `rows`.
    ///
    /// `on_batch(done, total)` is called after each accepted batch. Returns
    /// `false` on a terminal error or once session attempts are exhausted.
    pub fn write(
        &mut self,
        dest: &str,
        header: &[&str],
        rows: &[Vec<String>],
        mut on_batch: impl FnMut(usize, usize),
    ) -> bool {
        let total = self.policy.total_batches(rows.len());
        let attempts = self.policy.session_attempts.max(1);

        for session in 0..attempts {
            match self.attempt(dest, header, rows, total, &mut on_batch) {
                Ok(()) => {
                    log::info!("{dest}: uploaded {} rows in {total} batches", rows.len());
                    return true;
                }
                Err(AttemptError::Terminal(e)) => {
                    log::error!("{dest}: non-retryable error, aborting upload: {e}");
                    return false;
                }
                Err(AttemptError::Restart(e)) if session + 1 < attempts => {
                    let delay = self.policy.session_backoff * 2u32.saturating_pow(session);
                    log::warn!(
                        "{dest}: upload attempt {}/{attempts} failed: {e}; restarting from a clean sheet in {delay:?}",
                        session + 1
                    );
                    std::thread::sleep(delay);
                }
                Err(AttemptError::Restart(e)) => {
                    log::error!("{dest}: upload failed after {attempts} attempts: {e}");
                }
            }
        }
        false
    }

    fn attempt(
        &mut self,
        dest: &str,
        header: &[&str],
        rows: &[Vec<String>],
        total: usize,
        on_batch: &mut impl FnMut(usize, usize),
    ) -> Result<(), AttemptError> {
        self.with_retry(dest, "clear", |t| t.clear(dest))?;
        self.with_retry(dest, "header", |t| t.write_header(dest, header))?;

        for (i, batch) in rows.chunks(self.policy.batch_size.max(1)).enumerate() {
            if i > 0 {
                std::thread::sleep(self.policy.batch_delay);
            }
            let label = format!("batch {}/{total}", i + 1);
            self.with_retry(dest, &label, |t| t.append_rows(dest, batch))?;
            log::debug!("{dest}: {label} ({} rows) accepted", batch.len());
            on_batch(i + 1, total);
        }
        Ok(())
    }

    /// Run one table operation with the batch-level retry budget
    fn with_retry(
        &mut self,
        dest: &str,
        label: &str,
        mut op: impl FnMut(&mut T) -> Result<(), SinkError>,
    ) -> Result<(), AttemptError> {
        let attempts = self.policy.batch_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            let err = match op(&mut *self.table) {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            match err.class() {
                ErrorClass::Terminal => return Err(AttemptError::Terminal(err)),
                ErrorClass::Unknown => return Err(AttemptError::Restart(err)),
                ErrorClass::Retryable if attempt + 1 < attempts => {
                    let delay = self.policy.batch_backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    log::warn!("{dest}: {label} attempt {attempt}/{attempts} failed: {err}, retrying in {delay:?}");
                    std::thread::sleep(delay);
                }
                ErrorClass::Retryable => return Err(AttemptError::Restart(err)),
            }
        }
    }
}
