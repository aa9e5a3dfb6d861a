//! Session audit log.
//!
//! Every session step is appended to a plain text file as
//! `<YYYY-MM-DD HH:MM:SS> [step] message`. The file is opened per line so that
//! several sessions of the same process can share it.

use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Append-only audit log file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    permission: u32,
}

impl AuditLog {
    /// Creates an audit log writing to `path` with the given permission bits
    /// when the file has to be created.
    pub fn new(path: impl Into<PathBuf>, permission: u32) -> Self {
        Self {
            path: path.into(),
            permission,
        }
    }

    /// The log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line. Write failures are reported through `tracing`
    /// and otherwise ignored.
    pub async fn record(&self, message: &str) {
        if let Err(e) = self.append(message).await {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to write audit log"
            );
        }
    }

    async fn append(&self, message: &str) -> std::io::Result<()> {
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        options.mode(self.permission);
        let mut file = options.open(&self.path).await?;
        let line = format!(
            "{} {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}
