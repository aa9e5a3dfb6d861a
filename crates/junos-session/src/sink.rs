//! Offline set file sink.
//!
//! In offline mode staged statements are appended to a local file, one per
//! line, instead of being loaded on a device. The file is never truncated.

use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::{SessionError, SessionResult};

/// Permission bits of parent directories created for the sink file.
pub const DIRECTORY_PERMISSION: u32 = 0o755;

/// Append-only statement file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
    permission: u32,
}

impl FileSink {
    /// Creates a sink writing to `path`; the file is created with
    /// `permission` if absent.
    pub fn new(path: impl Into<PathBuf>, permission: u32) -> Self {
        Self {
            path: path.into(),
            permission,
        }
    }

    /// The sink file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends each statement on its own line, in order.
    pub async fn append(&self, lines: &[String]) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && fs::metadata(parent).await.is_err() {
                let mut builder = fs::DirBuilder::new();
                builder.recursive(true);
                #[cfg(unix)]
                builder.mode(DIRECTORY_PERMISSION);
                builder
                    .create(parent)
                    .await
                    .map_err(|source| SessionError::Sink {
                        action: "create parent directory of",
                        path: self.path.clone(),
                        source,
                    })?;
            }
        }

        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        options.mode(self.permission);
        let mut file = options
            .open(&self.path)
            .await
            .map_err(|source| SessionError::Sink {
                action: "open file",
                path: self.path.clone(),
                source,
            })?;

        let mut buf = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            buf.push_str(line);
            buf.push('\n');
        }
        let write = async {
            file.write_all(buf.as_bytes()).await?;
            file.flush().await
        };
        write.await.map_err(|source| SessionError::Sink {
                action: "write in file",
                path: self.path.clone(),
                source,
            })
    }
}
