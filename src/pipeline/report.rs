//! Reporting stage: write extracted field values to a workbook.
//!
//! Not part of the default driver sequence; the CLI wires it in behind
//! `--excel`. One sheet per document, titled with the document name
//! truncated to the 31-character sheet-name limit, header `Names` in the
//! first row and one value per row below it.
//!
//! Documents whose truncated names collide collapse into one sheet and the
//! later document wins. That mirrors the behavior this tool replaces and
//! is deliberately not "fixed" here; callers needing distinct sheets must
//! keep the first 31 characters of their document names unique.

use crate::error::BatchError;
use crate::output::DocumentResult;
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tracing::{info, warn};

/// Hard limit Excel places on worksheet names.
const SHEET_TITLE_MAX: usize = 31;

/// First [`SHEET_TITLE_MAX`] characters of a document name.
fn sheet_title(name: &str) -> String {
    name.chars().take(SHEET_TITLE_MAX).collect()
}

/// Write one workbook at `path` with a sheet per document in `results`.
///
/// Creates parent directories as needed. An empty `results` slice writes
/// nothing: a workbook must hold at least one sheet.
pub fn write_workbook(results: &[DocumentResult], path: &Path) -> Result<(), BatchError> {
    if results.is_empty() {
        warn!("No documents to report; skipping {}", path.display());
        return Ok(());
    }

    // Collapse truncated-title collisions before touching the workbook:
    // the later document replaces the earlier one's sheet content.
    let mut sheets: Vec<(String, &DocumentResult)> = Vec::new();
    for doc in results {
        let title = sheet_title(&doc.file_name);
        match sheets.iter_mut().find(|(t, _)| *t == title) {
            Some(slot) => slot.1 = doc,
            None => sheets.push((title, doc)),
        }
    }

    let workbook_err = |reason: String| BatchError::Workbook {
        path: path.to_path_buf(),
        reason,
    };

    let mut workbook = Workbook::new();
    for (title, doc) in &sheets {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(title.as_str())
            .map_err(|e| workbook_err(e.to_string()))?;
        sheet
            .write_string(0, 0, "Names")
            .map_err(|e| workbook_err(e.to_string()))?;
        for (index, value) in doc.fields.iter().enumerate() {
            sheet
                .write_string(index as u32 + 1, 0, value.as_str())
                .map_err(|e| workbook_err(e.to_string()))?;
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BatchError::OutputWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    workbook.save(path).map_err(|e| workbook_err(e.to_string()))?;

    info!("Extracted fields saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_truncate_to_31_characters() {
        let long = "a-document-name-well-beyond-the-sheet-limit.pdf";
        let title = sheet_title(long);
        assert_eq!(title.chars().count(), 31);
        assert_eq!(title, long.chars().take(31).collect::<String>());
    }

    #[test]
    fn short_titles_pass_through() {
        assert_eq!(sheet_title("ward-7.pdf"), "ward-7.pdf");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        // 32 Devanagari characters, far more than 31 bytes.
        let name: String = "नाव".chars().cycle().take(32).collect();
        assert_eq!(sheet_title(&name).chars().count(), 31);
    }
}
