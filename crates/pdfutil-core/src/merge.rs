//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document.

use crate::document::PdfDocument;
use crate::error::{PdfUtilError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Page attributes that may be inherited from the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Merge documents into one, pages in argument order.
///
/// The algorithm:
/// 1. If empty, return error
/// 2. If single document, return it as-is
/// 3. Use the first document as the destination (its metadata is kept)
/// 4. For each further document:
///    a. Copy inherited page attributes onto the pages themselves
///    b. Import all objects with IDs shifted past the destination's
///    c. Append its pages to the destination page list
/// 5. Rebuild the page tree, prune what is no longer reachable
pub fn merge_documents(documents: Vec<PdfDocument>) -> Result<PdfDocument> {
    let mut documents = documents.into_iter();
    let Some(first) = documents.next() else {
        return Err(PdfUtilError::Usage("No documents to merge".into()));
    };

    let mut dest = first.into_inner();
    flatten_inherited_attributes(&mut dest);
    let mut dest_max_id = dest.max_id;
    let mut dest_page_refs = get_page_references(&dest);
    let mut merged = 1;

    for source in documents {
        let mut source = source.into_inner();
        flatten_inherited_attributes(&mut source);
        let source_pages = get_page_references(&source);

        let id_offset = dest_max_id;

        let mut remapped_objects = BTreeMap::new();
        for (old_id, object) in source.objects.into_iter() {
            let new_id = (old_id.0 + id_offset, old_id.1);
            remapped_objects.insert(new_id, remap_object_refs(object, id_offset));
        }
        dest.objects.extend(remapped_objects);

        for old_page_ref in source_pages {
            dest_page_refs.push((old_page_ref.0 + id_offset, old_page_ref.1));
        }

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
        merged += 1;
    }

    if merged > 1 {
        dest.max_id = dest_max_id;
        update_page_tree(&mut dest, &dest_page_refs)?;
        dest.prune_objects();
        dest.compress();
    }

    tracing::debug!(documents = merged, pages = dest_page_refs.len(), "merged documents");
    Ok(PdfDocument::from_document(dest))
}

/// Get all page object references from a document, in page order
fn get_page_references(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

/// Copy attributes a page inherits from its ancestors onto the page, so the
/// page keeps them once it is re-parented under another tree.
fn flatten_inherited_attributes(doc: &mut Document) {
    let mut updates: Vec<(ObjectId, Vec<(&[u8], Object)>)> = Vec::new();

    for page_id in get_page_references(doc) {
        let Ok(page) = doc.get_object(page_id).and_then(Object::as_dict) else {
            continue;
        };
        let missing: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter(|key| page.get(key).is_err())
            .filter_map(|key| {
                PdfDocument::inherited(doc, page, key).map(|value| (*key, value.clone()))
            })
            .collect();
        if !missing.is_empty() {
            updates.push((page_id, missing));
        }
    }

    for (page_id, attributes) in updates {
        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            for (key, value) in attributes {
                page.set(key.to_vec(), value);
            }
        }
    }
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            remap_dict(&mut dict, offset);
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            remap_dict(&mut stream.dict, offset);
            Object::Stream(stream)
        }
        other => other,
    }
}

fn remap_dict(dict: &mut Dictionary, offset: u32) {
    for (_, value) in dict.iter_mut() {
        *value = remap_object_refs(value.clone(), offset);
    }
}

/// Point the destination page tree root at `page_refs`, and every page at
/// that root. Pages must already carry their inherited attributes.
fn update_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<()> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| PdfUtilError::Pdf("No Root in trailer".into()))?;

    let pages_id = doc
        .get_object(catalog_id)
        .and_then(Object::as_dict)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| PdfUtilError::Pdf("No Pages in catalog".into()))?;

    let pages_dict = doc
        .get_object_mut(pages_id)
        .and_then(Object::as_dict_mut)
        .map_err(|_| PdfUtilError::Pdf("Invalid pages dictionary".into()))?;
    let kids = page_refs
        .iter()
        .map(|&id| Object::Reference(id))
        .collect::<Vec<_>>();
    pages_dict.set("Kids", Object::Array(kids));
    pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
    // Every page carries its own copy now; the root must not leak its
    // values onto appended pages
    for key in INHERITABLE {
        pages_dict.remove(key);
    }

    for &page_id in page_refs {
        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    Ok(())
}
