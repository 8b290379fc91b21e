//! Logging: env_logger filtering, indicatif-aware output, optional log file

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use indicatif::MultiProgress;

/// ANSI color code and padded label for a log level.
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let label = match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return ("", label, "");
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    (ansi, label, "\x1b[0m")
}

/// Logger writing to stderr (above progress bars when a `MultiProgress` is
/// active) and, optionally, appending timestamped lines to a file.
pub struct RunLogger {
    filter: env_logger::Logger,
    multi: Option<MultiProgress>,
    file: Option<Mutex<File>>,
}

impl RunLogger {
    pub fn new(filter: env_logger::Logger, multi: Option<MultiProgress>, file: Option<File>) -> Self {
        Self {
            filter,
            multi,
            file: file.map(Mutex::new),
        }
    }
}

impl log::Log for RunLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.filter.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.filter.matches(record) {
            return;
        }
        match &self.multi {
            Some(multi) => {
                let (pre, label, post) = level_style(record.level(), true);
                let line = format!("[{pre}{label}{post}] {}", record.args());
                multi.suspend(|| eprintln!("{line}"));
            }
            None => {
                let (_, label, _) = level_style(record.level(), false);
                eprintln!("[{label}] {}", record.args());
            }
        }
        if let Some(file) = &self.file {
            let (_, label, _) = level_style(record.level(), false);
            let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{ts} [{label}] {}", record.args());
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = f.flush();
            }
        }
    }
}

/// Initialize logging.
///
/// `multi` routes console output above progress bars (TTY mode); `log_file`
/// additionally appends every enabled record to that file.
pub fn init_logging(
    quiet: bool,
    debug: bool,
    multi: Option<&MultiProgress>,
    log_file: Option<&Path>,
) -> std::io::Result<()> {
    let default_level = if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    let filter =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .build();
    let max_level = filter.filter();

    let file = match log_file {
        Some(path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
        None => None,
    };

    log::set_boxed_logger(Box::new(RunLogger::new(filter, multi.cloned(), file)))
        .map_err(std::io::Error::other)?;
    log::set_max_level(max_level);
    Ok(())
}
