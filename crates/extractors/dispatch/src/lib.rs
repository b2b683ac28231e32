use recipe_common::api::FileDescriptor;
use recipe_common::drive::DriveApi;
use recipe_common::error::ExtractError;
use tracing::{debug, warn};

pub const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";
pub const GOOGLE_SHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
pub const TEXT_MIME: &str = "text/plain";
pub const CSV_MIME: &str = "text/csv";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const LEGACY_DOC_MIME: &str = "application/msword";
pub const PDF_MIME: &str = "application/pdf";

/// The content types the importer can turn into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Drive-native document, exported as plain text.
    GoogleDoc,
    /// Drive-native spreadsheet, exported as CSV.
    GoogleSheet,
    PlainText,
    Docx,
    /// `.doc`: no local decoder, converted to a Google Doc on the server.
    LegacyDoc,
    Pdf,
}

impl ContentKind {
    pub const ALL: [ContentKind; 6] = [
        ContentKind::GoogleDoc,
        ContentKind::GoogleSheet,
        ContentKind::PlainText,
        ContentKind::Docx,
        ContentKind::LegacyDoc,
        ContentKind::Pdf,
    ];

    pub fn from_mime(mime: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.mime_type() == mime)
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ContentKind::GoogleDoc => GOOGLE_DOC_MIME,
            ContentKind::GoogleSheet => GOOGLE_SHEET_MIME,
            ContentKind::PlainText => TEXT_MIME,
            ContentKind::Docx => DOCX_MIME,
            ContentKind::LegacyDoc => LEGACY_DOC_MIME,
            ContentKind::Pdf => PDF_MIME,
        }
    }

    /// Short name for log lines.
    pub fn label(self) -> &'static str {
        match self {
            ContentKind::GoogleDoc => "google-doc",
            ContentKind::GoogleSheet => "google-sheet",
            ContentKind::PlainText => "text",
            ContentKind::Docx => "docx",
            ContentKind::LegacyDoc => "doc",
            ContentKind::Pdf => "pdf",
        }
    }
}

/// MIME types passed to the listing filter, in dispatch order.
pub fn supported_mime_types() -> Vec<&'static str> {
    ContentKind::ALL.iter().map(|k| k.mime_type()).collect()
}

/// Extract the text of one Drive file.
///
/// An empty result is reported as [`ExtractError::Empty`]. Whitespace-only
/// text, such as an image-only PDF's page breaks, is still returned.
pub async fn extract(drive: &dyn DriveApi, file: &FileDescriptor) -> Result<String, ExtractError> {
    let kind = ContentKind::from_mime(&file.mime_type)
        .ok_or_else(|| ExtractError::UnsupportedType(file.mime_type.clone()))?;
    debug!("extracting {} ({}) as {}", file.name, file.id, kind.label());

    let text = match kind {
        ContentKind::GoogleDoc => export_text(drive, &file.id, TEXT_MIME).await?,
        ContentKind::GoogleSheet => export_text(drive, &file.id, CSV_MIME).await?,
        ContentKind::PlainText => recipe_extract_text::decode(&drive.download(&file.id).await?),
        ContentKind::Docx => {
            let bytes = drive.download(&file.id).await?;
            recipe_extract_office::extract_docx_from_bytes(&bytes)?
        }
        ContentKind::LegacyDoc => convert_legacy_doc(drive, file).await?,
        ContentKind::Pdf => {
            let bytes = drive.download(&file.id).await?;
            recipe_extract_pdf::extract_from_bytes(&bytes, &file.name)?
        }
    };

    if text.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(text)
}

async fn export_text(
    drive: &dyn DriveApi,
    file_id: &str,
    mime_type: &str,
) -> Result<String, ExtractError> {
    let bytes = drive.export(file_id, mime_type).await?;
    Ok(recipe_extract_text::decode(&bytes))
}

/// Copy the `.doc` as a Google Doc, export the copy as text, then delete the
/// copy whether or not the export worked. A failed delete is logged and does
/// not replace the export's outcome.
async fn convert_legacy_doc(
    drive: &dyn DriveApi,
    file: &FileDescriptor,
) -> Result<String, ExtractError> {
    let copy_name = format!("{} (converted)", file.name);
    let copy_id = drive.copy_as(&file.id, &copy_name, GOOGLE_DOC_MIME).await?;

    let exported = export_text(drive, &copy_id, TEXT_MIME).await;

    if let Err(e) = drive.delete(&copy_id).await {
        warn!("deleting temporary copy {copy_id} of {}: {e}", file.name);
    }
    exported
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_common::testing::{DriveCall, FakeDrive};
    use std::io::{Cursor, Write};

    fn file(id: &str, name: &str, mime: &str) -> FileDescriptor {
        FileDescriptor::new(id, name, mime)
    }

    #[test]
    fn test_from_mime_covers_all_kinds() {
        for kind in ContentKind::ALL {
            assert_eq!(ContentKind::from_mime(kind.mime_type()), Some(kind));
        }
        assert_eq!(ContentKind::from_mime("image/png"), None);
        assert_eq!(ContentKind::from_mime("application/vnd.google-apps.folder"), None);
    }

    #[test]
    fn test_supported_mime_types() {
        let types = supported_mime_types();
        assert_eq!(types.len(), 6);
        assert!(types.contains(&"application/msword"));
        assert!(types.contains(&"application/vnd.google-apps.spreadsheet"));
    }

    #[tokio::test]
    async fn test_google_doc_exported_as_text() {
        let drive = FakeDrive::new().with_export("cake", TEXT_MIME, b"flour, sugar");
        let text = extract(&drive, &file("cake", "Cake", GOOGLE_DOC_MIME)).await.unwrap();
        assert_eq!(text, "flour, sugar");
        assert_eq!(
            drive.calls(),
            vec![DriveCall::Export { file_id: "cake".into(), mime_type: TEXT_MIME.into() }]
        );
    }

    #[tokio::test]
    async fn test_google_sheet_exported_as_csv() {
        let drive = FakeDrive::new().with_export("s", CSV_MIME, b"item,qty\neggs,2\n");
        let text = extract(&drive, &file("s", "Shopping", GOOGLE_SHEET_MIME)).await.unwrap();
        assert_eq!(text, "item,qty\neggs,2\n");
    }

    #[tokio::test]
    async fn test_plain_text_downloaded() {
        let drive = FakeDrive::new().media("chili", b"spicy");
        let text = extract(&drive, &file("chili", "Chili.txt", TEXT_MIME)).await.unwrap();
        assert_eq!(text, "spicy");
        assert_eq!(drive.calls(), vec![DriveCall::Download("chili".into())]);
    }

    #[tokio::test]
    async fn test_docx_downloaded_and_parsed() {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(br#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t>Toast</w:t></w:r></w:p></w:body></w:document>"#)
            .unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let drive = FakeDrive::new().media("d", &bytes);
        let text = extract(&drive, &file("d", "Toast.docx", DOCX_MIME)).await.unwrap();
        assert_eq!(text, "Toast");
    }

    #[tokio::test]
    async fn test_legacy_doc_copy_export_delete_in_order() {
        let copy = FakeDrive::copy_id("old");
        let drive = FakeDrive::new().with_export(&copy, TEXT_MIME, b"Stew");
        let text = extract(&drive, &file("old", "Stew.doc", LEGACY_DOC_MIME)).await.unwrap();
        assert_eq!(text, "Stew");
        assert_eq!(
            drive.calls(),
            vec![
                DriveCall::Copy {
                    file_id: "old".into(),
                    name: "Stew.doc (converted)".into(),
                    mime_type: GOOGLE_DOC_MIME.into(),
                },
                DriveCall::Export { file_id: copy.clone(), mime_type: TEXT_MIME.into() },
                DriveCall::Delete(copy),
            ]
        );
    }

    #[tokio::test]
    async fn test_legacy_doc_copy_deleted_when_export_fails() {
        // No export registered for the copy, so the export step fails.
        let drive = FakeDrive::new();
        let err = extract(&drive, &file("old", "Stew.doc", LEGACY_DOC_MIME))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Drive(_)));
        assert_eq!(
            drive.calls().last(),
            Some(&DriveCall::Delete(FakeDrive::copy_id("old")))
        );
    }

    #[tokio::test]
    async fn test_legacy_doc_delete_failure_keeps_text() {
        let copy = FakeDrive::copy_id("old");
        let drive = FakeDrive::new()
            .with_export(&copy, TEXT_MIME, b"Stew")
            .broken_delete(&copy);
        let text = extract(&drive, &file("old", "Stew.doc", LEGACY_DOC_MIME)).await.unwrap();
        assert_eq!(text, "Stew");
    }

    #[tokio::test]
    async fn test_legacy_doc_copy_failure_skips_delete() {
        let drive = FakeDrive::new().broken_copy("old");
        assert!(extract(&drive, &file("old", "Stew.doc", LEGACY_DOC_MIME)).await.is_err());
        assert_eq!(drive.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_type() {
        let drive = FakeDrive::new();
        let err = extract(&drive, &file("p", "photo.png", "image/png")).await.unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedType(ref t) if t == "image/png"));
        assert!(drive.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_is_empty() {
        let drive = FakeDrive::new().media("blank", b"");
        let err = extract(&drive, &file("blank", "blank.txt", TEXT_MIME)).await.unwrap_err();
        assert!(matches!(err, ExtractError::Empty));
    }

    #[tokio::test]
    async fn test_whitespace_only_text_is_kept() {
        let drive = FakeDrive::new().media("ws", b" \n");
        let text = extract(&drive, &file("ws", "ws.txt", TEXT_MIME)).await.unwrap();
        assert_eq!(text, " \n");
    }

    #[tokio::test]
    async fn test_malformed_pdf_is_failed() {
        let drive = FakeDrive::new().media("pdf", b"not a pdf at all");
        let err = extract(&drive, &file("pdf", "x.pdf", PDF_MIME)).await.unwrap_err();
        assert!(matches!(err, ExtractError::Failed(_)));
    }
}
