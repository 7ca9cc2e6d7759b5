//! Per-command execution logger.
//!
//! Each command instance owns its logger; file sinks are opened when the
//! context carries a logs folder and closed when the command is dropped.
//! `execution.log` receives info and above, `full.log` everything. Every
//! record is also forwarded to the process-wide `tracing` dispatcher so a
//! CLI subscriber can mirror the stream.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

pub const FILE_NAME_EXECUTION: &str = "execution.log";
pub const FILE_NAME_FULL: &str = "full.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO ",
            Level::Warning => "WARN ",
            Level::Error => "ERROR",
        }
    }
}

#[derive(Debug)]
pub struct ExecutionLogger {
    exec_sink: Option<Mutex<File>>,
    full_sink: Option<Mutex<File>>,
}

impl ExecutionLogger {
    /// Open file sinks under the given logs folder.
    ///
    /// Sink-open failures degrade to a tracing-only logger instead of
    /// failing the command; a pipeline job without log files is still a
    /// pipeline job.
    pub fn new(path_logs: &Path) -> Self {
        Self {
            exec_sink: open_sink(&path_logs.join(FILE_NAME_EXECUTION)),
            full_sink: open_sink(&path_logs.join(FILE_NAME_FULL)),
        }
    }

    /// Logger without file sinks; records go to `tracing` only.
    pub fn detached() -> Self {
        Self {
            exec_sink: None,
            full_sink: None,
        }
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        tracing::debug!("{}", msg);
        self.write(Level::Debug, msg);
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        tracing::info!("{}", msg);
        self.write(Level::Info, msg);
    }

    pub fn warning(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        tracing::warn!("{}", msg);
        self.write(Level::Warning, msg);
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        tracing::error!("{}", msg);
        self.write(Level::Error, msg);
    }

    fn write(&self, level: Level, msg: &str) {
        let line = format!(
            "[{}] [{}] {}\n",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            level.label(),
            msg
        );
        if level >= Level::Info {
            append(&self.exec_sink, &line);
        }
        append(&self.full_sink, &line);
    }
}

fn open_sink(path: &Path) -> Option<Mutex<File>> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .ok()
        .map(Mutex::new)
}

fn append(sink: &Option<Mutex<File>>, line: &str) {
    if let Some(file) = sink {
        if let Ok(mut file) = file.lock() {
            let _ = file.write_all(line.as_bytes());
        }
    }
}
