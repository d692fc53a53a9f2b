//! PDF page deletion
//!
//! Removes a selection of pages and drops objects nothing refers to anymore.

use crate::error::{PdfUtilError, Result};
use crate::range::PageSelection;
use lopdf::Document;

/// Delete the selected pages (zero-based) from `doc`.
///
/// Remaining pages keep their original relative order. Deleting every page
/// is refused because the result would have an empty page tree.
pub fn delete_pages(doc: &mut Document, selection: &PageSelection) -> Result<()> {
    let page_count = doc.get_pages().len();

    if let Some(last) = selection.last() {
        if last >= page_count {
            return Err(PdfUtilError::Pdf(format!(
                "Page {} does not exist (document has {} pages)",
                last + 1,
                page_count
            )));
        }
    }
    if selection.len() >= page_count {
        return Err(PdfUtilError::Usage(
            "Refusing to delete every page of the document".into(),
        ));
    }

    // Highest page first so the remaining page numbers stay valid
    for page_num in selection.page_numbers().into_iter().rev() {
        doc.delete_pages(&[page_num]);
    }

    doc.prune_objects();
    doc.compress();

    tracing::debug!(
        deleted = selection.len(),
        remaining = doc.get_pages().len(),
        "deleted pages"
    );
    Ok(())
}
