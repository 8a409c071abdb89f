use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::Mutex;

use chrono::Local;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARNING",
            Level::Error => "ERROR",
        }
    }
}

/// Append-only sink for pipeline milestones. Built once by the orchestrator
/// and handed to every stage.
pub trait Diagnostics {
    fn log(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Writes `<timestamp> - <LEVEL> - <message>` lines to a file and mirrors
/// them to tracing.
pub struct LogFile {
    path: PathBuf,
}

impl LogFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        LogFile {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl Diagnostics for LogFile {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Info => info!("{}", message),
            Level::Warn => warn!("{}", message),
            Level::Error => error!("{}", message),
        }
        // A broken log file must not change the outcome of the run.
        if let Err(e) = self.append(&format_line(level, message)) {
            warn!("could not append to {:?}: {}", self.path, e);
        }
    }
}

fn format_line(level: Level, message: &str) -> String {
    format!(
        "{} - {} - {}",
        Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
        level.as_str(),
        message
    )
}

/// In-memory sink, used by tests to assert on emitted milestones.
#[cfg(test)]
#[derive(Default)]
pub struct Recorder {
    entries: Mutex<Vec<(Level, String)>>,
}

#[cfg(test)]
impl Recorder {
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|(_, m)| m).collect()
    }
}

#[cfg(test)]
impl Diagnostics for Recorder {
    fn log(&self, level: Level, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }
}
