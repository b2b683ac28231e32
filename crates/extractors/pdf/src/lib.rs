use recipe_common::error::ExtractError;

/// Extract the text of a PDF.
///
/// Each page is split into text runs (one per non-blank line that the parser
/// lays out), then reassembled: every run followed by a single space, every
/// page followed by a newline. The result is percent-decoded, since recipe
/// PDFs exported from web pages frequently carry `%20`-style escapes in their
/// text layer.
pub fn extract_from_bytes(bytes: &[u8], name: &str) -> Result<String, ExtractError> {
    // pdf-extract can panic on malformed PDFs; catch_unwind turns that into
    // an error so the walk moves on to the next file.
    let owned = bytes.to_vec();
    let result = std::panic::catch_unwind(move || pdf_extract::extract_text_from_mem_by_pages(&owned));

    let pages = match result {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            return Err(ExtractError::Failed(format!("PDF parse error in {name}: {e}")));
        }
        Err(_) => {
            return Err(ExtractError::Failed(format!("PDF parser panicked on {name}")));
        }
    };

    let runs: Vec<Vec<&str>> = pages.iter().map(|p| page_runs(p)).collect();
    Ok(percent_decode(&assemble(&runs)))
}

/// Non-blank, trimmed lines of one page.
fn page_runs(page: &str) -> Vec<&str> {
    page.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Join runs with a trailing space each and pages with a trailing newline each.
pub fn assemble<S: AsRef<str>>(pages: &[Vec<S>]) -> String {
    let mut out = String::new();
    for page in pages {
        for run in page {
            out.push_str(run.as_ref());
            out.push(' ');
        }
        out.push('\n');
    }
    out
}

/// Decode `%XX` escapes. Escapes that do not form valid UTF-8 leave the
/// whole string untouched; stray `%` signs ("50% butter") pass through.
pub fn percent_decode(s: &str) -> String {
    match urlencoding::decode(s) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::debug!("percent-decoding PDF text failed, keeping raw text: {e}");
            s.to_string()
        }
    }
}
