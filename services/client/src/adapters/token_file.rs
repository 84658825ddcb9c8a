//! services/client/src/adapters/token_file.rs
//!
//! Durable storage for the bearer token, implementing the `TokenStorage` port.
//!
//! The token lives in a small JSON file with restricted permissions (0600 on
//! unix). It is never logged.

use carelink_core::ports::{PortError, PortResult, TokenStorage};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct TokenFile {
    token: String,
}

/// Stores the token in a file on disk.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_error(&self, action: &str, e: impl std::fmt::Display) -> PortError {
        PortError::Storage(format!("failed to {} {}: {}", action, self.path.display(), e))
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> PortResult<Option<String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.storage_error("read", e)),
        };
        let file: TokenFile =
            serde_json::from_str(&contents).map_err(|e| self.storage_error("parse", e))?;
        if file.token.is_empty() {
            return Ok(None);
        }
        Ok(Some(file.token))
    }

    fn save(&self, token: &str) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.storage_error("create directory for", e))?;
        }

        let contents = serde_json::to_string(&TokenFile {
            token: token.to_string(),
        })
        .map_err(|e| self.storage_error("serialize", e))?;

        // Write with restricted permissions
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .map_err(|e| self.storage_error("open", e))?;
            file.write_all(contents.as_bytes())
                .map_err(|e| self.storage_error("write", e))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents).map_err(|e| self.storage_error("write", e))?;
        }

        debug!(path = %self.path.display(), "Token persisted");
        Ok(())
    }

    fn clear(&self) -> PortResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Token removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.storage_error("remove", e)),
        }
    }
}

/// Keeps the token in memory only; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> PortResult<Option<String>> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, token: &str) -> PortResult<()> {
        *self.slot.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> PortResult<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}
