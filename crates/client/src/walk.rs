//! Depth-first walk of a Drive folder tree.
//!
//! Every supported file below the root becomes a [`RecipeRecord`] tagged with
//! the names of the folders between the root and the file. A file that cannot
//! be extracted, or a folder whose name cannot be resolved, is logged and
//! skipped; only a failed listing stops the walk.

use recipe_common::api::{FileDescriptor, RecipeRecord};
use recipe_common::drive::DriveApi;
use recipe_common::error::{ExtractError, WalkError};
use recipe_extract_dispatch as dispatch;
use tracing::{debug, info, warn};

use crate::lazy_header;

#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    /// Add the root folder's own name as the first tag of every record.
    pub include_root_as_tag: bool,
}

/// One opened folder: the children still to visit and the tags its files get.
struct Frame {
    children: std::vec::IntoIter<FileDescriptor>,
    lineage: Vec<String>,
}

pub struct FolderWalker<'a> {
    drive: &'a dyn DriveApi,
    options: WalkOptions,
    mime_types: Vec<&'static str>,
}

impl<'a> FolderWalker<'a> {
    pub fn new(drive: &'a dyn DriveApi, options: WalkOptions) -> Self {
        Self {
            drive,
            options,
            mime_types: dispatch::supported_mime_types(),
        }
    }

    /// Collect every extractable document below `root_id`, in depth-first
    /// pre-order of discovery.
    ///
    /// The walk keeps an explicit stack of open folders instead of recursing,
    /// so arbitrarily deep trees don't grow the call stack. A sub-folder is
    /// opened the moment it is reached in its parent's listing, which keeps
    /// the output order identical to a recursive walk.
    pub async fn traverse(&self, root_id: &str) -> Result<Vec<RecipeRecord>, WalkError> {
        let mut records = Vec::new();
        let mut stack = vec![self.open_folder(root_id, &[], true).await?];

        while let Some(frame) = stack.last_mut() {
            let Some(child) = frame.children.next() else {
                stack.pop();
                continue;
            };

            if child.is_folder() {
                let lineage = frame.lineage.clone();
                let sub = self.open_folder(&child.id, &lineage, false).await?;
                stack.push(sub);
                continue;
            }

            if let Some(record) = self.extract_record(child, &frame.lineage).await {
                records.push(record);
            }
        }

        info!("walk of {root_id} produced {} documents", records.len());
        Ok(records)
    }

    /// Resolve the folder's tag contribution and list its children.
    async fn open_folder(
        &self,
        folder_id: &str,
        parent_lineage: &[String],
        is_root: bool,
    ) -> Result<Frame, WalkError> {
        let mut lineage = parent_lineage.to_vec();
        if !is_root || self.options.include_root_as_tag {
            match self.drive.folder_name(folder_id).await {
                Ok(name) => lineage.push(name),
                Err(e) => warn!("folder name lookup for {folder_id} failed, not tagging with it: {e}"),
            }
        }

        let children = self
            .drive
            .list_folder(folder_id, &self.mime_types)
            .await
            .map_err(|source| WalkError::Listing {
                folder_id: folder_id.to_string(),
                source,
            })?;
        debug!("folder {folder_id}: {} children, tags [{}]", children.len(), lineage.join(", "));

        Ok(Frame {
            children: children.into_iter(),
            lineage,
        })
    }

    async fn extract_record(&self, file: FileDescriptor, lineage: &[String]) -> Option<RecipeRecord> {
        lazy_header::set_pending(&file.name);
        let result = dispatch::extract(self.drive, &file).await;
        lazy_header::clear_pending();

        match result {
            Ok(content) => {
                info!("extracted {} ({}), tags [{}]", file.name, file.mime_type, lineage.join(", "));
                Some(RecipeRecord {
                    name: file.name,
                    content,
                    mime_type: file.mime_type,
                    tags: lineage.to_vec(),
                })
            }
            Err(ExtractError::UnsupportedType(t)) => {
                debug!("skipping {} ({}): unsupported type {t}", file.name, file.id);
                None
            }
            Err(e) => {
                warn!("skipping {} ({}, {}): {e}", file.name, file.id, file.mime_type);
                None
            }
        }
    }
}

/// Walk `root_folder_id` and return every extractable recipe document.
pub async fn get_all_recipe_docs(
    drive: &dyn DriveApi,
    root_folder_id: &str,
    options: WalkOptions,
) -> Result<Vec<RecipeRecord>, WalkError> {
    FolderWalker::new(drive, options).traverse(root_folder_id).await
}
