// src/utils/log.rs

//! Run logs with server-style formatting.
//!
//! A [`RunLog`] is handed to each pipeline run instead of living in global
//! state. It brackets the run with `start`/`stop` and receives every
//! user-facing progress and summary line in between.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use chrono::Local;

use crate::error::Result;

/// Log level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Sink for the progress and summary lines of one run.
pub trait RunLog {
    /// Open the run: print a header and the settings it runs with.
    fn start(&mut self, title: &str, settings: &[(&str, String)]);

    /// Emit one line.
    fn write(&mut self, level: LogLevel, message: &str);

    /// Close the run and release any sink it holds.
    fn stop(&mut self);

    fn info(&mut self, message: &str) {
        self.write(LogLevel::Info, message);
    }

    fn warn(&mut self, message: &str) {
        self.write(LogLevel::Warn, message);
    }

    /// Log a sub-item (indented)
    fn sub_item(&mut self, message: &str) {
        self.write(LogLevel::Info, &format!("    {message}"));
    }

    /// Log a step in a process
    fn step(&mut self, step_num: usize, total: usize, message: &str) {
        self.write(
            LogLevel::Info,
            &format!("[STEP {step_num}/{total}] {message}"),
        );
    }

    /// Log a summary section
    fn summary(&mut self, title: &str, items: &[(String, String)]) {
        self.write(LogLevel::Info, &format!("[SUMMARY] {title}"));
        for (key, value) in items {
            self.write(LogLevel::Info, &format!("    {key}: {value}"));
        }
    }
}

/// Format a log message with timestamp and level
fn format_log(level: LogLevel, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{}] [{}] {}", timestamp, level.as_str(), message)
}

/// Console run log, optionally tee'd to a file.
pub struct ConsoleLog {
    level: LogLevel,
    file: Option<BufWriter<File>>,
    started: Option<Instant>,
}

impl ConsoleLog {
    /// Create a console log showing messages at `level` and above.
    pub fn new(level: &str) -> Self {
        Self {
            level: LogLevel::from_str(level),
            file: None,
            started: None,
        }
    }

    /// Also append every line to the file at `path`.
    pub fn with_file(mut self, path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        self.file = Some(BufWriter::new(file));
        Ok(self)
    }

    /// Check if a log level should be displayed
    fn should_log(&self, level: LogLevel) -> bool {
        level >= self.level
    }
}

impl RunLog for ConsoleLog {
    fn start(&mut self, title: &str, settings: &[(&str, String)]) {
        self.started = Some(Instant::now());

        let border = "═".repeat(60);
        self.write(LogLevel::Info, &border);
        self.write(LogLevel::Info, &format!("  {title}"));
        self.write(LogLevel::Info, &border);
        for (key, value) in settings {
            self.sub_item(&format!("{key}: {value}"));
        }
    }

    fn write(&mut self, level: LogLevel, message: &str) {
        let line = format_log(level, message);
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = writeln!(file, "{line}") {
                log::warn!("Run log file write failed: {e}");
                self.file = None;
            }
        }
        if !self.should_log(level) {
            return;
        }
        if level >= LogLevel::Warn {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            let elapsed = started.elapsed().as_secs_f64();
            self.write(LogLevel::Info, &format!("Completed in {elapsed:.2}s"));
        }
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush() {
                log::warn!("Run log file flush failed: {e}");
            }
        }
    }
}

/// Run log that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl RunLog for NullLog {
    fn start(&mut self, _title: &str, _settings: &[(&str, String)]) {}

    fn write(&mut self, _level: LogLevel, _message: &str) {}

    fn stop(&mut self) {}
}
