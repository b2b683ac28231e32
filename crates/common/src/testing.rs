//! In-memory [`DriveApi`] for tests.
//!
//! Folders, files and payloads are registered up front; every call is
//! recorded so tests can assert on ordering. Anything not registered fails
//! with a [`DriveError`], which is how tests simulate broken requests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{FileDescriptor, FOLDER_MIME};
use crate::drive::DriveApi;
use crate::error::DriveError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveCall {
    List(String),
    Name(String),
    Download(String),
    Export { file_id: String, mime_type: String },
    Copy { file_id: String, name: String, mime_type: String },
    Delete(String),
}

#[derive(Default)]
pub struct FakeDrive {
    names: HashMap<String, String>,
    children: HashMap<String, Vec<FileDescriptor>>,
    broken_listings: HashSet<String>,
    media: HashMap<String, Vec<u8>>,
    exports: HashMap<(String, String), Vec<u8>>,
    broken_copies: HashSet<String>,
    broken_deletes: HashSet<String>,
    calls: Mutex<Vec<DriveCall>>,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a folder name for [`DriveApi::folder_name`]. Folders without
    /// a registered name fail the lookup.
    pub fn named(mut self, folder_id: &str, name: &str) -> Self {
        self.names.insert(folder_id.to_string(), name.to_string());
        self
    }

    /// Add a sub-folder under `parent` (name registered too).
    pub fn folder(self, parent: &str, id: &str, name: &str) -> Self {
        self.child(parent, FileDescriptor::new(id, name, FOLDER_MIME))
            .named(id, name)
    }

    /// Add a sub-folder whose name lookup fails.
    pub fn unnamed_folder(self, parent: &str, id: &str, listed_name: &str) -> Self {
        self.child(parent, FileDescriptor::new(id, listed_name, FOLDER_MIME))
    }

    pub fn child(mut self, parent: &str, file: FileDescriptor) -> Self {
        self.children.entry(parent.to_string()).or_default().push(file);
        self
    }

    /// Add a regular file under `parent` together with its downloadable bytes.
    pub fn file(self, parent: &str, id: &str, name: &str, mime_type: &str, bytes: &[u8]) -> Self {
        self.child(parent, FileDescriptor::new(id, name, mime_type))
            .media(id, bytes)
    }

    pub fn media(mut self, file_id: &str, bytes: &[u8]) -> Self {
        self.media.insert(file_id.to_string(), bytes.to_vec());
        self
    }

    /// Register the bytes [`DriveApi::export`] returns for `(file_id, mime_type)`.
    pub fn with_export(mut self, file_id: &str, mime_type: &str, bytes: &[u8]) -> Self {
        self.exports
            .insert((file_id.to_string(), mime_type.to_string()), bytes.to_vec());
        self
    }

    pub fn broken_listing(mut self, folder_id: &str) -> Self {
        self.broken_listings.insert(folder_id.to_string());
        self
    }

    pub fn broken_copy(mut self, file_id: &str) -> Self {
        self.broken_copies.insert(file_id.to_string());
        self
    }

    pub fn broken_delete(mut self, file_id: &str) -> Self {
        self.broken_deletes.insert(file_id.to_string());
        self
    }

    /// Id the fake assigns to a copy of `file_id`.
    pub fn copy_id(file_id: &str) -> String {
        format!("{file_id}-copy")
    }

    pub fn calls(&self) -> Vec<DriveCall> {
        self.lock().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.lock()
            .iter()
            .filter(|c| matches!(c, DriveCall::List(_)))
            .count()
    }

    fn record(&self, call: DriveCall) {
        self.lock().push(call);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DriveCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn missing(op: &str, what: &str) -> DriveError {
    DriveError::Status {
        op: op.to_string(),
        status: 404,
        message: format!("{what} not found"),
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn list_folder(
        &self,
        folder_id: &str,
        mime_types: &[&str],
    ) -> Result<Vec<FileDescriptor>, DriveError> {
        self.record(DriveCall::List(folder_id.to_string()));
        if self.broken_listings.contains(folder_id) {
            return Err(DriveError::request("files.list", "connection reset"));
        }
        Ok(self
            .children
            .get(folder_id)
            .map(|files| {
                files
                    .iter()
                    .filter(|f| f.is_folder() || mime_types.contains(&f.mime_type.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn folder_name(&self, folder_id: &str) -> Result<String, DriveError> {
        self.record(DriveCall::Name(folder_id.to_string()));
        self.names
            .get(folder_id)
            .cloned()
            .ok_or_else(|| missing("files.get", folder_id))
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        self.record(DriveCall::Download(file_id.to_string()));
        self.media
            .get(file_id)
            .cloned()
            .ok_or_else(|| missing("files.get", file_id))
    }

    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, DriveError> {
        self.record(DriveCall::Export {
            file_id: file_id.to_string(),
            mime_type: mime_type.to_string(),
        });
        self.exports
            .get(&(file_id.to_string(), mime_type.to_string()))
            .cloned()
            .ok_or_else(|| missing("files.export", file_id))
    }

    async fn copy_as(
        &self,
        file_id: &str,
        name: &str,
        mime_type: &str,
    ) -> Result<String, DriveError> {
        self.record(DriveCall::Copy {
            file_id: file_id.to_string(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
        });
        if self.broken_copies.contains(file_id) {
            return Err(DriveError::request("files.copy", "conversion rejected"));
        }
        Ok(Self::copy_id(file_id))
    }

    async fn delete(&self, file_id: &str) -> Result<(), DriveError> {
        self.record(DriveCall::Delete(file_id.to_string()));
        if self.broken_deletes.contains(file_id) {
            return Err(DriveError::request("files.delete", "forbidden"));
        }
        Ok(())
    }
}
