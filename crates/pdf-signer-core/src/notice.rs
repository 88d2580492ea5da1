//! User-visible notices and the persistent operation log.
//!
//! Every state change the editor performs is reported as a [`Notice`]. The
//! [`OperationLog`] keeps them in memory for display, forwards them to
//! `tracing` and, when configured, appends them to a JSON-lines file that
//! survives restarts.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub timestamp: SystemTime,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: SystemTime::now(),
        }
    }
}

/// In-memory notice list with an optional JSON-lines sink.
#[derive(Debug, Default)]
pub struct OperationLog {
    entries: Vec<Notice>,
    path: Option<PathBuf>,
}

impl OperationLog {
    /// Log that only keeps notices in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Log that also appends to `path`, creating parent directories.
    pub fn with_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            entries: Vec::new(),
            path: Some(path),
        })
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Notice::new(NoticeLevel::Info, message));
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Notice::new(NoticeLevel::Success, message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Notice::new(NoticeLevel::Warning, message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Notice::new(NoticeLevel::Error, message));
    }

    pub fn push(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!("{}", notice.message),
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            NoticeLevel::Error => tracing::error!("{}", notice.message),
        }

        if let Some(path) = &self.path
            && let Err(e) = append_line(path, &notice)
        {
            // The in-memory copy is still kept, so the notice is not lost for the UI.
            tracing::warn!("Failed to append to operation log {}: {}", path.display(), e);
        }

        self.entries.push(notice);
    }

    pub fn entries(&self) -> &[Notice] {
        &self.entries
    }

    pub fn last(&self) -> Option<&Notice> {
        self.entries.last()
    }

    /// Number of notices at `level`.
    pub fn count(&self, level: NoticeLevel) -> usize {
        self.entries.iter().filter(|n| n.level == level).count()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn append_line(path: &Path, notice: &Notice) -> std::io::Result<()> {
    let line = serde_json::to_string(notice)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}
