//! Saving the application payload
//!
//! Saves are serialized: while one is in flight, further edits only
//! replace a single pending payload, so a burst of edits produces at most
//! one follow-up save carrying the latest state.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::app::AppPayload;

/// Errors raised by a persistence backend
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to encode or decode payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where payloads are read from and written to
pub trait PersistenceBackend {
    fn load(&self) -> Result<AppPayload, PersistError>;
    fn save(&mut self, payload: &AppPayload) -> Result<(), PersistError>;
}

/// JSON file on disk; writes go through a temporary file and a rename
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl PersistenceBackend for FileBackend {
    fn load(&self) -> Result<AppPayload, PersistError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&mut self, payload: &AppPayload) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(payload)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        tracing::debug!(path = %self.path.display(), "saved application payload");
        Ok(())
    }
}

/// In-memory backend that keeps every saved payload
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    pub saved: Vec<AppPayload>,
}

impl PersistenceBackend for MemoryBackend {
    fn load(&self) -> Result<AppPayload, PersistError> {
        Ok(self.saved.last().cloned().unwrap_or_default())
    }

    fn save(&mut self, payload: &AppPayload) -> Result<(), PersistError> {
        self.saved.push(payload.clone());
        Ok(())
    }
}

/// One in-flight save plus at most one pending payload
#[derive(Debug, Clone)]
pub struct SaveScheduler<T> {
    in_flight: bool,
    pending: Option<T>,
}

impl<T> Default for SaveScheduler<T> {
    fn default() -> Self {
        Self {
            in_flight: false,
            pending: None,
        }
    }
}

impl<T> SaveScheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for `payload` to be saved.
    ///
    /// Returns the payload to start saving now, or `None` if a save is in
    /// flight; in that case `payload` replaces any earlier pending one.
    pub fn request(&mut self, payload: T) -> Option<T> {
        if !self.in_flight {
            self.in_flight = true;
            tracing::debug!("starting save");
            return Some(payload);
        }
        if self.pending.replace(payload).is_some() {
            tracing::debug!("superseded pending save");
        } else {
            tracing::debug!("queued save behind in-flight save");
        }
        None
    }

    /// The in-flight save finished (successfully or not).
    ///
    /// Returns the pending payload to save next, if any; the scheduler
    /// stays in flight for it.
    pub fn complete(&mut self) -> Option<T> {
        match self.pending.take() {
            Some(next) => {
                tracing::debug!("starting queued save");
                Some(next)
            }
            None => {
                self.in_flight = false;
                None
            }
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl SaveScheduler<AppPayload> {
    /// Save `payload` and any follow-up queued meanwhile, synchronously.
    ///
    /// Returns the number of saves performed. On failure the scheduler is
    /// idle again and a queued payload is kept for the next request.
    pub fn save_with(
        &mut self,
        backend: &mut dyn PersistenceBackend,
        payload: AppPayload,
    ) -> Result<usize, PersistError> {
        let mut next = self.request(payload);
        let mut saves = 0;
        while let Some(payload) = next {
            if let Err(err) = backend.save(&payload) {
                self.in_flight = false;
                return Err(err);
            }
            saves += 1;
            next = self.complete();
        }
        Ok(saves)
    }
}
