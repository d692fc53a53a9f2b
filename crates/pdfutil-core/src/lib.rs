//! Page and metadata editing for PDF files
//!
//! This crate decides what changes to make to a document and applies them
//! through [`PageDocument`], with [`PdfDocument`] backed by lopdf:
//! - `range`: page range tokens (`N`, `A-B`, `-B`, `A-`) to page sets
//! - `rotation`: per-page rotation composed on top of inherited values
//! - `metadata` / `date`: set / erase / keep resolution of document info
//! - `command`: validate-then-write operations (merge, rotate, delete, info)

pub mod command;
pub mod date;
pub mod delete;
pub mod document;
pub mod error;
pub mod merge;
pub mod metadata;
pub mod range;
pub mod rotation;
pub mod viewer;

pub use command::{
    dump_infos, edit_file, execute, merge_files, Edit, InfoEdits, Outcome, OutputTarget, PageSpec,
    Plan, RotateSpec,
};
pub use document::{DocumentInfo, PageDocument, PdfDocument};
pub use error::{PdfUtilError, RangeError, Result};
pub use merge::merge_documents;
pub use metadata::{Metadata, MetadataEdits, MetadataField};
pub use range::{resolve_tokens, PageIndex, PageSelection, RangeToken};
pub use rotation::Rotation;
pub use viewer::{ViewerEdits, ViewerFlag, ViewerPreferences};
