//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: a spinner per harvested partition and a bar per upload.
//! Non-TTY mode: hidden bars; log lines carry the progress instead.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Spinners and bars of one run, drawn only on a terminal.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Draw when stderr is a terminal
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: std::io::stderr().is_terminal(),
        }
    }

    /// Context that never draws (tests, piped output)
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: false,
        }
    }

    /// Spinner for one harvest partition; update with `set_message`.
    pub fn partition_line(&self, name: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(0));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {prefix:<10.cyan.bold} {wide_msg}")
                .expect("invalid template"),
        );
        pb.set_prefix(name.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// Batch bar for one upload destination
    pub fn upload_bar(&self, dest: &str, total_batches: u64) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(total_batches));
        pb.set_style(
            ProgressStyle::with_template("{prefix:<20.dim} {bar:30.green/dim} {pos:>4}/{len:4} batches")
                .expect("invalid template")
                .progress_chars("--"),
        );
        pb.set_prefix(dest.chars().take(20).collect::<String>());
        pb
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Bars the logger must print above
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// `12345` -> `"12,345"`
pub fn fmt_num(n: usize) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut out = String::from(&digits[..head]);
    for (i, group) in digits.as_bytes()[head..].chunks(3).enumerate() {
        if head > 0 || i > 0 {
            out.push(',');
        }
        out.extend(group.iter().map(|&b| b as char));
    }
    out
}
