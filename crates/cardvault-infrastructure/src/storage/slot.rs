//! Single-value local storage slots.
//!
//! A slot is the local equivalent of one key in a browser's key-value store:
//! it holds at most one string.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use cardvault_core::error::{CardvaultError, Result};

use super::atomic_file::write_atomic;

/// A durable slot holding at most one string value.
pub trait LocalSlot: Send + Sync {
    /// Reads the value, or `None` when the slot is empty.
    ///
    /// Content that is not valid text is reported as `Serialization`, so
    /// callers can tell it apart from an IO failure.
    fn read(&self) -> Result<Option<String>>;

    /// Replaces the value.
    fn write(&self, value: &str) -> Result<()>;

    /// Empties the slot. Clearing an empty slot is not an error.
    fn clear(&self) -> Result<()>;
}

/// A slot backed by one file.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl LocalSlot for FileSlot {
    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path).map_err(|e| {
            CardvaultError::io(format!(
                "Failed to read slot file '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| CardvaultError::Serialization {
                format: "utf-8".to_string(),
                message: format!("slot file '{}': {}", self.path.display(), e),
            })
    }

    fn write(&self, value: &str) -> Result<()> {
        write_atomic(&self.path, value.as_bytes())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CardvaultError::io(format!(
                "Failed to remove slot file '{}': {}",
                self.path.display(),
                e
            ))),
        }
    }
}

/// An in-process slot. Clones share the same value.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    value: Arc<Mutex<Option<String>>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot pre-filled with `value`.
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Arc::new(Mutex::new(Some(value.into()))),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.value
            .lock()
            .map_err(|_| CardvaultError::internal("memory slot lock poisoned"))
    }
}

impl LocalSlot for MemorySlot {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.lock()?.clone())
    }

    fn write(&self, value: &str) -> Result<()> {
        *self.lock()? = Some(value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}
