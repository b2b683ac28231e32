use async_trait::async_trait;

use crate::api::{FileDescriptor, FOLDER_MIME};
use crate::error::DriveError;

/// Largest page Drive returns for a single `files.list` call.
pub const LIST_PAGE_SIZE: u32 = 1000;

/// The Drive operations the walker and the extractors rely on.
///
/// Every call is a single request/response; callers issue them one at a time.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Immediate children of `folder_id` that are folders or have one of
    /// `mime_types`. At most [`LIST_PAGE_SIZE`] entries.
    async fn list_folder(
        &self,
        folder_id: &str,
        mime_types: &[&str],
    ) -> Result<Vec<FileDescriptor>, DriveError>;

    /// Display name of a folder.
    async fn folder_name(&self, folder_id: &str) -> Result<String, DriveError>;

    /// Raw content of a regular (non Drive-native) file.
    async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError>;

    /// Server-side export of a Drive-native document.
    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, DriveError>;

    /// Copy a file, converting it to `mime_type`. Returns the new file id.
    async fn copy_as(
        &self,
        file_id: &str,
        name: &str,
        mime_type: &str,
    ) -> Result<String, DriveError>;

    async fn delete(&self, file_id: &str) -> Result<(), DriveError>;
}

/// Build the `files.list` query selecting the children of `folder_id` that are
/// folders or match one of `mime_types`.
pub fn folder_query(folder_id: &str, mime_types: &[&str]) -> String {
    let mut clauses: Vec<String> = mime_types
        .iter()
        .map(|t| format!("mimeType = '{}'", escape_literal(t)))
        .collect();
    clauses.push(format!("mimeType = '{FOLDER_MIME}'"));
    format!(
        "'{}' in parents and ({})",
        escape_literal(folder_id),
        clauses.join(" or ")
    )
}

/// Drive query string literals escape `\` and `'` with a backslash.
fn escape_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_query() {
        let q = folder_query("abc123", &["text/plain", "application/pdf"]);
        assert_eq!(
            q,
            "'abc123' in parents and (mimeType = 'text/plain' or mimeType = 'application/pdf' \
             or mimeType = 'application/vnd.google-apps.folder')"
        );
    }

    #[test]
    fn test_folder_query_without_types_still_selects_folders() {
        let q = folder_query("root", &[]);
        assert_eq!(
            q,
            "'root' in parents and (mimeType = 'application/vnd.google-apps.folder')"
        );
    }

    #[test]
    fn test_folder_query_escapes_quotes() {
        let q = folder_query("it's", &[]);
        assert!(q.starts_with("'it\\'s' in parents"));
    }
}
