//! Shared-file registry.
//!
//! DESIGN
//! ======
//! Append-only and session-scoped: entries are added when a local upload
//! completes or a remote announcement arrives, never removed, and the
//! whole registry is discarded when the room is left. Ids are generated
//! per upload — never derived from the filename — so identical filenames
//! from different uploaders coexist.
//!
//! The storage backend is external: callers obtain a public URL from the
//! [`FileUploader`] collaborator first, then register the result.

use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use crate::error::UploadFailure;
use crate::event::{FileSharedEvent, ParticipantId, now_ms};

/// Unique identifier for a shared file.
pub type FileId = Uuid;

/// External upload service returning a public URL for a file's bytes.
#[async_trait::async_trait]
pub trait FileUploader: Send + Sync {
    /// Upload the file and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns [`UploadFailure`] when the upload does not complete; no
    /// registry entry is created in that case.
    async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, UploadFailure>;
}

/// A shared file as stored locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFile {
    pub id: FileId,
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub uploader_id: ParticipantId,
    pub ts: i64,
}

/// Per-room registry of shared files.
pub struct FileShareRegistry {
    files: Vec<SharedFile>,
    seen: HashSet<FileId>,
}

impl FileShareRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { files: Vec::new(), seen: HashSet::new() }
    }

    /// Register a locally uploaded file under a fresh id and return the
    /// event to publish.
    pub fn register(&mut self, filename: &str, url: &str, size: u64, uploader_id: ParticipantId) -> FileSharedEvent {
        let event = FileSharedEvent {
            id: Uuid::new_v4(),
            filename: filename.to_owned(),
            url: url.to_owned(),
            size,
            uploader_id,
            timestamp: now_ms(),
        };
        self.seen.insert(event.id);
        self.files.push(SharedFile {
            id: event.id,
            filename: event.filename.clone(),
            url: event.url.clone(),
            size,
            uploader_id,
            ts: event.timestamp,
        });
        event
    }

    /// Append a remote entry verbatim; it already carries its publisher's
    /// id. Duplicates (including own echoes) are dropped.
    pub fn on_remote(&mut self, event: &FileSharedEvent) -> bool {
        if !self.seen.insert(event.id) {
            debug!(file = %event.id, "files: duplicate entry dropped");
            return false;
        }
        self.files.push(SharedFile {
            id: event.id,
            filename: event.filename.clone(),
            url: event.url.clone(),
            size: event.size,
            uploader_id: event.uploader_id,
            ts: event.timestamp,
        });
        true
    }

    #[must_use]
    pub fn files(&self) -> &[SharedFile] {
        &self.files
    }
}

impl Default for FileShareRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "files_test.rs"]
mod tests;
