//! Unified logging pipeline for kernel builds.
//!
//! Every `log::*` call is written to stderr for live progress and
//! appended to a per-run file under the workspace `logs/` directory, so
//! a failed build always leaves a complete transcript on disk. External
//! tool output is funneled through the same sink by the command runner.

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Disk-persisting logger backing the `log` crate facade.
pub struct LogCollector {
    file: Mutex<File>,
    path: PathBuf,
    max_level: LevelFilter,
}

impl LogCollector {
    /// Open a new per-run log file under `log_dir`.
    ///
    /// The filename carries a timestamp so successive runs never clobber
    /// each other's transcripts.
    pub fn new(log_dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(log_dir)?;
        let path = log_dir.join(format!(
            "gkibuild_{}.log",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(LogCollector {
            file: Mutex::new(file),
            path,
            max_level: LevelFilter::Info,
        })
    }

    /// Raise or lower the level ceiling before installation.
    pub fn with_max_level(mut self, level: LevelFilter) -> Self {
        self.max_level = level;
        self
    }

    /// Path of the transcript file for this run.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Install this collector as the global logger for the `log` crate.
    pub fn install(self) -> Result<PathBuf, log::SetLoggerError> {
        let path = self.path.clone();
        let max_level = self.max_level;
        log::set_boxed_logger(Box::new(self)).map(|()| log::set_max_level(max_level))?;
        Ok(path)
    }
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format!(
            "{} [{:<5}] {}",
            Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.args()
        );

        eprintln!("{}", line);

        // Disk write failures must never take down the build; the stderr
        // copy above already reached the user.
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", line);
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}
