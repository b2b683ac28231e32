use serde::{Deserialize, Serialize};

/// MIME type Drive uses for folders.
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// One entry of a Drive folder listing: either a sub-folder or a leaf file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

impl FileDescriptor {
    pub fn new(id: &str, name: &str, mime_type: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }
}

/// A document whose text was extracted, tagged with the names of the folders
/// between the walk root and the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub name: String,
    pub content: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub tags: Vec<String>,
}
