//! Operations
//!
//! Every editing operation runs in two phases. [`Plan::compute`] validates
//! the request against the document and works out the complete new state
//! without touching it. Only when that succeeds is the plan applied and the
//! document written, once.

use crate::document::{DocumentInfo, PageDocument, PdfDocument};
use crate::error::{PdfUtilError, Result};
use crate::merge::merge_documents;
use crate::metadata::{self, MetadataEdits, ResolvedMetadata};
use crate::range::{resolve_pairs, resolve_tokens, resolve_triples, PageSelection};
use crate::rotation::{Rotation, RotationPlan, RotationStep};
use crate::viewer::{self, ResolvedViewer, ViewerEdits};
use std::path::{Path, PathBuf};

/// Where an operation writes its result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    path: PathBuf,
    force: bool,
}

impl OutputTarget {
    pub fn new(path: impl Into<PathBuf>, force: bool) -> Self {
        Self {
            path: path.into(),
            force,
        }
    }

    /// Pick the output path. Without `-o`, `-f` means "overwrite `input`".
    pub fn resolve(output: Option<PathBuf>, force: bool, input: &Path) -> Result<Self> {
        match output {
            Some(path) => Ok(Self::new(path, force)),
            None if force => Ok(Self::new(input, true)),
            None => Err(PdfUtilError::Usage(
                "No output file given. Provide '-o <file>', or '-f' to overwrite the input".into(),
            )),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn force(&self) -> bool {
        self.force
    }

    /// Fail if the target exists and overwriting was not requested.
    pub fn check(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        if !self.force {
            return Err(PdfUtilError::OutputExists {
                path: self.path.clone(),
            });
        }
        tracing::warn!(path = %self.path.display(), "overwriting existing file");
        Ok(())
    }
}

/// Page selection for `delete`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSpec {
    /// `N`, `A-B`, `-B`, `A-` tokens
    Tokens(Vec<String>),
    /// `--ranges <start end>...`
    Pairs(Vec<String>),
    /// `--deletion <page>`
    Single(String),
}

impl PageSpec {
    /// Fails with a usage error when nothing is selected, e.g. for `,`.
    pub fn resolve(&self, page_count: usize) -> Result<PageSelection> {
        let selection = match self {
            PageSpec::Tokens(tokens) => resolve_tokens(tokens, page_count)?,
            PageSpec::Pairs(values) => resolve_pairs(values, page_count)?,
            PageSpec::Single(page) => resolve_tokens(&[page.as_str()], page_count)?,
        };
        if selection.is_empty() {
            return Err(PdfUtilError::Usage("No pages given to delete".into()));
        }
        Ok(selection)
    }
}

/// Rotation request for `rotate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotateSpec {
    /// `--rotation <deg>` on every page
    All(Rotation),
    /// `--ranges <start end rotation>...`
    Ranges(Vec<String>),
}

impl RotateSpec {
    pub fn steps(&self, page_count: usize) -> Result<Vec<RotationStep>> {
        match self {
            RotateSpec::All(rotation) => Ok(vec![RotationStep::all_pages(*rotation)]),
            RotateSpec::Ranges(values) => Ok(resolve_triples(values, page_count)?
                .into_iter()
                .map(|(pages, rotation)| RotationStep::pages(pages, rotation))
                .collect()),
        }
    }
}

/// Metadata and viewer preference changes for `info`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoEdits {
    pub metadata: MetadataEdits,
    pub viewer: ViewerEdits,
}

/// A single-document edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Rotate(RotateSpec),
    Delete(PageSpec),
    Info(InfoEdits),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoPlan {
    pub metadata: ResolvedMetadata,
    pub viewer: ResolvedViewer,
}

/// The fully validated new state for one [`Edit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Rotate(RotationPlan),
    Delete(PageSelection),
    Info(InfoPlan),
}

impl Plan {
    /// Validate `edit` against `doc` and compute the result. Never mutates.
    pub fn compute<D: PageDocument + ?Sized>(doc: &D, edit: &Edit) -> Result<Self> {
        let page_count = doc.page_count();
        match edit {
            Edit::Rotate(spec) => {
                let steps = spec.steps(page_count)?;
                Ok(Plan::Rotate(RotationPlan::compute(doc, &steps)?))
            }
            Edit::Delete(spec) => {
                let selection = spec.resolve(page_count)?;
                if selection.len() >= page_count {
                    return Err(PdfUtilError::Usage(
                        "Refusing to delete every page of the document".into(),
                    ));
                }
                Ok(Plan::Delete(selection))
            }
            Edit::Info(edits) => {
                let existing = doc.metadata();
                let metadata = metadata::resolve(existing.as_ref(), &edits.metadata)?;
                let viewer = viewer::resolve(&doc.viewer_preferences(), &edits.viewer)?;
                Ok(Plan::Info(InfoPlan { metadata, viewer }))
            }
        }
    }

    pub fn apply<D: PageDocument + ?Sized>(&self, doc: &mut D) -> Result<()> {
        match self {
            Plan::Rotate(plan) => plan.apply(doc),
            Plan::Delete(selection) => doc.delete_pages(selection),
            Plan::Info(plan) => {
                doc.set_metadata(&plan.metadata.metadata)?;
                doc.set_viewer_preferences(&plan.viewer.preferences)
            }
        }
    }

    /// Names of fields that were given both a set and an erase flag
    pub fn conflicts(&self) -> Vec<String> {
        match self {
            Plan::Info(plan) => plan
                .metadata
                .conflicts
                .iter()
                .map(|field| field.name().to_string())
                .chain(plan.viewer.conflicts.iter().map(|name| name.to_string()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// What a completed operation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub path: PathBuf,
    pub page_count: usize,
    pub conflicts: Vec<String>,
}

/// Plan, apply and write `edit` on an already opened document.
pub fn execute<D: PageDocument + ?Sized>(
    doc: &mut D,
    edit: &Edit,
    target: &OutputTarget,
) -> Result<Outcome> {
    target.check()?;
    let plan = Plan::compute(doc, edit)?;
    tracing::debug!(?plan, "validated edit");

    plan.apply(doc)?;
    doc.write(target.path())?;

    Ok(Outcome {
        path: target.path().to_path_buf(),
        page_count: doc.page_count(),
        conflicts: plan.conflicts(),
    })
}

/// Open `input`, apply `edit` and write the result.
pub fn edit_file(input: &Path, edit: &Edit, target: &OutputTarget) -> Result<Outcome> {
    let mut doc = PdfDocument::open(input)?;
    execute(&mut doc, edit, target)
}

/// Concatenate `inputs` in order. Every input is opened before anything is
/// written. A single input is written through unchanged.
pub fn merge_files(inputs: &[PathBuf], target: &OutputTarget) -> Result<Outcome> {
    if inputs.is_empty() {
        return Err(PdfUtilError::Usage("No input files given".into()));
    }
    target.check()?;

    let documents = inputs
        .iter()
        .map(PdfDocument::open)
        .collect::<Result<Vec<_>>>()?;
    let mut merged = merge_documents(documents)?;
    merged.write(target.path())?;

    Ok(Outcome {
        path: target.path().to_path_buf(),
        page_count: merged.page_count(),
        conflicts: Vec::new(),
    })
}

pub fn dump_infos(input: &Path) -> Result<DocumentInfo> {
    let doc = PdfDocument::open(input)?;
    DocumentInfo::collect(&doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use crate::metadata::{Metadata, MetadataField};
    use crate::viewer::ViewerFlag;
    use pretty_assertions::assert_eq;

    fn out() -> OutputTarget {
        OutputTarget::new("/nonexistent-dir/out.pdf", false)
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn sample_metadata() -> Metadata {
        [
            (MetadataField::Title, "Old title"),
            (MetadataField::Author, "Ada"),
            (MetadataField::Keywords, "pdf"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_output_target_requires_output_or_force() {
        let input = Path::new("in.pdf");
        assert!(matches!(
            OutputTarget::resolve(None, false, input).unwrap_err(),
            PdfUtilError::Usage(_)
        ));

        let in_place = OutputTarget::resolve(None, true, input).unwrap();
        assert_eq!(in_place.path(), input);
        assert!(in_place.force());
    }

    #[test]
    fn test_output_target_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken.pdf");
        std::fs::write(&path, b"x").unwrap();

        let err = OutputTarget::new(&path, false).check().unwrap_err();
        assert!(matches!(err, PdfUtilError::OutputExists { .. }));
        assert!(OutputTarget::new(&path, true).check().is_ok());
    }

    #[test]
    fn test_rotate_ranges() {
        let mut doc = MemoryDocument::with_pages(5);
        let edit = Edit::Rotate(RotateSpec::Ranges(strings(&["2", "4", "450"])));
        let outcome = execute(&mut doc, &edit, &out()).unwrap();

        assert_eq!(doc.rotations(), vec![0, 90, 90, 90, 0]);
        assert_eq!(outcome.page_count, 5);
        assert_eq!(doc.writes.len(), 1);
    }

    #[test]
    fn test_rotate_all_pages_on_top_of_prior() {
        let mut doc = MemoryDocument::with_rotations(vec![0, 90, 270]);
        let edit = Edit::Rotate(RotateSpec::All(Rotation::new(180).unwrap()));
        execute(&mut doc, &edit, &out()).unwrap();
        assert_eq!(doc.rotations(), vec![180, 270, 90]);
    }

    #[test]
    fn test_invalid_triple_writes_nothing() {
        let mut doc = MemoryDocument::with_pages(5);
        // First triple is fine, second has a bad rotation
        let edit = Edit::Rotate(RotateSpec::Ranges(strings(&["1", "2", "90", "3", "4", "45"])));

        let err = execute(&mut doc, &edit, &out()).unwrap_err();
        assert!(matches!(err, PdfUtilError::InvalidRotation { value: 45 }));
        assert_eq!(doc.mutations, 0);
        assert!(doc.writes.is_empty());
    }

    #[test]
    fn test_malformed_triples_write_nothing() {
        let mut doc = MemoryDocument::with_pages(5);
        let edit = Edit::Rotate(RotateSpec::Ranges(strings(&["1", "2"])));

        let err = execute(&mut doc, &edit, &out()).unwrap_err();
        assert!(matches!(
            err,
            PdfUtilError::MalformedRangeList { arity: 3, count: 2 }
        ));
        assert!(doc.writes.is_empty());
    }

    #[test]
    fn test_delete_tokens() {
        let mut doc = MemoryDocument::with_rotations(vec![0, 90, 180, 270, 0]);
        let edit = Edit::Delete(PageSpec::Tokens(strings(&["-2", "4"])));
        let outcome = execute(&mut doc, &edit, &out()).unwrap();

        assert_eq!(doc.rotations(), vec![180, 0]);
        assert_eq!(outcome.page_count, 2);
    }

    #[test]
    fn test_delete_pairs_and_single() {
        let mut doc = MemoryDocument::with_rotations(vec![0, 90, 180, 270]);
        let edit = Edit::Delete(PageSpec::Pairs(strings(&["2", "3"])));
        execute(&mut doc, &edit, &out()).unwrap();
        assert_eq!(doc.rotations(), vec![0, 270]);

        let edit = Edit::Delete(PageSpec::Single("1".into()));
        execute(&mut doc, &edit, &out()).unwrap();
        assert_eq!(doc.rotations(), vec![270]);
    }

    #[test]
    fn test_delete_out_of_range_writes_nothing() {
        let mut doc = MemoryDocument::with_pages(3);
        let edit = Edit::Delete(PageSpec::Tokens(strings(&["2-9"])));

        assert!(matches!(
            execute(&mut doc, &edit, &out()).unwrap_err(),
            PdfUtilError::Range(_)
        ));
        assert_eq!(doc.page_count(), 3);
        assert!(doc.writes.is_empty());
    }

    #[test]
    fn test_delete_everything_is_refused() {
        let mut doc = MemoryDocument::with_pages(3);
        let edit = Edit::Delete(PageSpec::Tokens(strings(&["1-"])));
        assert!(matches!(
            execute(&mut doc, &edit, &out()).unwrap_err(),
            PdfUtilError::Usage(_)
        ));
        assert_eq!(doc.mutations, 0);
    }

    #[test]
    fn test_delete_without_tokens_is_usage_error() {
        let doc = MemoryDocument::with_pages(3);
        let edit = Edit::Delete(PageSpec::Tokens(Vec::new()));
        assert!(matches!(
            Plan::compute(&doc, &edit).unwrap_err(),
            PdfUtilError::Usage(_)
        ));
    }

    #[test]
    fn test_delete_comma_only_selects_nothing() {
        let mut doc = MemoryDocument::with_pages(3);
        for tokens in [&[","][..], &[",", " , "][..]] {
            let edit = Edit::Delete(PageSpec::Tokens(strings(tokens)));
            assert!(matches!(
                execute(&mut doc, &edit, &out()).unwrap_err(),
                PdfUtilError::Usage(_)
            ));
        }
        assert_eq!(doc.mutations, 0);
        assert!(doc.writes.is_empty());
    }

    #[test]
    fn test_info_erase_clears_everything() {
        let mut doc = MemoryDocument::with_pages(1);
        doc.metadata = Some(sample_metadata());

        let edit = Edit::Info(InfoEdits {
            metadata: MetadataEdits::new(true),
            ..Default::default()
        });
        execute(&mut doc, &edit, &out()).unwrap();

        assert_eq!(doc.metadata, Some(Metadata::new()));
    }

    #[test]
    fn test_info_set_wins_over_erase() {
        let mut doc = MemoryDocument::with_pages(1);
        doc.metadata = Some(sample_metadata());

        let edit = Edit::Info(InfoEdits {
            metadata: MetadataEdits::new(false)
                .set(MetadataField::Title, "X")
                .erase(MetadataField::Title),
            ..Default::default()
        });
        let outcome = execute(&mut doc, &edit, &out()).unwrap();

        let metadata = doc.metadata.unwrap();
        assert_eq!(metadata.get(MetadataField::Title), Some("X"));
        assert_eq!(metadata.get(MetadataField::Author), Some("Ada"));
        assert_eq!(outcome.conflicts, vec!["title".to_string()]);
    }

    #[test]
    fn test_info_invalid_layout_writes_nothing() {
        let mut doc = MemoryDocument::with_pages(1);
        doc.metadata = Some(sample_metadata());

        let edit = Edit::Info(InfoEdits {
            metadata: MetadataEdits::new(false)
                .set(MetadataField::Title, "New")
                .set(MetadataField::PageLayout, "Diagonal"),
            ..Default::default()
        });
        assert!(matches!(
            execute(&mut doc, &edit, &out()).unwrap_err(),
            PdfUtilError::InvalidEnumValue { .. }
        ));
        assert_eq!(doc.metadata, Some(sample_metadata()));
        assert_eq!(doc.mutations, 0);
        assert!(doc.writes.is_empty());
    }

    #[test]
    fn test_info_viewer_preferences_survive_erase_mode() {
        let mut doc = MemoryDocument::with_pages(1);
        doc.viewer.flags.insert(ViewerFlag::CenterWindow, true);

        let edit = Edit::Info(InfoEdits {
            metadata: MetadataEdits::new(true),
            viewer: ViewerEdits::default().toggle(ViewerFlag::HideToolbar, true, false),
        });
        execute(&mut doc, &edit, &out()).unwrap();

        assert_eq!(doc.viewer.flag(ViewerFlag::CenterWindow), Some(true));
        assert_eq!(doc.viewer.flag(ViewerFlag::HideToolbar), Some(true));
    }

    #[test]
    fn test_existing_output_checked_before_planning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        std::fs::write(&path, b"x").unwrap();

        let mut doc = MemoryDocument::with_pages(2);
        let edit = Edit::Rotate(RotateSpec::All(Rotation::new(90).unwrap()));
        let err = execute(&mut doc, &edit, &OutputTarget::new(&path, false)).unwrap_err();

        assert!(matches!(err, PdfUtilError::OutputExists { .. }));
        assert_eq!(doc.rotations(), vec![0, 0]);
    }

    #[test]
    fn test_merge_needs_an_input() {
        let err = merge_files(&[], &out()).unwrap_err();
        assert!(matches!(err, PdfUtilError::Usage(_)));
    }

    #[test]
    fn test_merge_single_input_copies_it() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.pdf");
        let output = dir.path().join("merged.pdf");
        let mut source = PdfDocument::from_document(
            crate::document::fixtures::pdf_with_pages(3, Some(90)),
        );
        source.write(&input).unwrap();

        let outcome = merge_files(&[input], &OutputTarget::new(&output, false)).unwrap();

        assert_eq!(outcome.page_count, 3);
        let merged = PdfDocument::open(&output).unwrap();
        assert_eq!(merged.page_count(), 3);
        assert_eq!(merged.page_rotation(2).unwrap(), 90);
    }

    #[test]
    fn test_merge_missing_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("merged.pdf");
        let inputs = vec![dir.path().join("a.pdf"), dir.path().join("b.pdf")];

        let err = merge_files(&inputs, &OutputTarget::new(&output, false)).unwrap_err();
        assert!(matches!(err, PdfUtilError::NotFound { .. }));
        assert!(!output.exists());
    }
}
