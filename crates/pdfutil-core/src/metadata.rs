//! Metadata merge engine
//!
//! Decides, per field, whether the value is explicitly set, explicitly
//! erased, or kept from the source document. Resolution order:
//!
//! 1. `--<field> <value>` sets the value (a conflicting `---<field>` only warns)
//! 2. `---<field>` alone erases it
//! 3. otherwise the document's value is kept, unless erase mode is on
//!
//! Date fields pass through [`crate::date::normalize`] and the page layout is
//! checked against [`PAGE_LAYOUTS`] before the value is final.

use crate::date;
use crate::error::{PdfUtilError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Names accepted for the catalog `/PageLayout` entry
pub const PAGE_LAYOUTS: &[&str] = &[
    "SinglePage",
    "OneColumn",
    "TwoColumnLeft",
    "TwoColumnRight",
    "TwoPageLeft",
    "TwoPageRight",
];

/// The metadata fields this tool can edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    Author,
    Title,
    Subject,
    Creator,
    Producer,
    Keywords,
    CreationDate,
    ModDate,
    PageLayout,
}

impl MetadataField {
    pub const ALL: [MetadataField; 9] = [
        MetadataField::Author,
        MetadataField::Title,
        MetadataField::Subject,
        MetadataField::Creator,
        MetadataField::Producer,
        MetadataField::Keywords,
        MetadataField::CreationDate,
        MetadataField::ModDate,
        MetadataField::PageLayout,
    ];

    /// Command-line name, e.g. `creation_date`
    pub fn name(self) -> &'static str {
        match self {
            MetadataField::Author => "author",
            MetadataField::Title => "title",
            MetadataField::Subject => "subject",
            MetadataField::Creator => "creator",
            MetadataField::Producer => "producer",
            MetadataField::Keywords => "keywords",
            MetadataField::CreationDate => "creation_date",
            MetadataField::ModDate => "mod_date",
            MetadataField::PageLayout => "page_layout",
        }
    }

    /// PDF dictionary key. `PageLayout` lives in the catalog, every other
    /// field in the trailer's `/Info` dictionary.
    pub fn key(self) -> &'static str {
        match self {
            MetadataField::Author => "Author",
            MetadataField::Title => "Title",
            MetadataField::Subject => "Subject",
            MetadataField::Creator => "Creator",
            MetadataField::Producer => "Producer",
            MetadataField::Keywords => "Keywords",
            MetadataField::CreationDate => "CreationDate",
            MetadataField::ModDate => "ModDate",
            MetadataField::PageLayout => "PageLayout",
        }
    }

    pub fn is_info_entry(self) -> bool {
        self != MetadataField::PageLayout
    }

    pub fn is_date(self) -> bool {
        matches!(self, MetadataField::CreationDate | MetadataField::ModDate)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Field-specific post-processing of a resolved value.
    fn finalize(self, value: &str, explicit: bool) -> Result<Option<String>> {
        if self.is_date() {
            if explicit && value.eq_ignore_ascii_case("now") {
                return Ok(Some(date::now()));
            }
            return match date::normalize(Some(value)) {
                Ok(normalized) => Ok(normalized),
                // A malformed date already in the document is not the user's
                // input; keep it untouched
                Err(err) if !explicit => {
                    tracing::warn!(field = %self, "keeping unparseable date: {}", err);
                    Ok(Some(value.to_string()))
                }
                Err(err) => Err(err),
            };
        }

        if self == MetadataField::PageLayout && explicit {
            return page_layout(value).map(|layout| Some(layout.to_string()));
        }

        Ok(Some(value.to_string()))
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validate a page layout name; a leading `/` is ignored.
pub fn page_layout(value: &str) -> Result<&'static str> {
    let name = value.trim().trim_start_matches('/');
    PAGE_LAYOUTS
        .iter()
        .copied()
        .find(|layout| *layout == name)
        .ok_or_else(|| PdfUtilError::InvalidEnumValue {
            field: MetadataField::PageLayout.name(),
            value: value.to_string(),
            allowed: PAGE_LAYOUTS,
        })
}

/// Field values of one document. A missing entry means the field is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Metadata {
    fields: BTreeMap<MetadataField, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: MetadataField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn set(&mut self, field: MetadataField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    pub fn remove(&mut self, field: MetadataField) -> Option<String> {
        self.fields.remove(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetadataField, &str)> {
        self.fields.iter().map(|(field, value)| (*field, value.as_str()))
    }
}

impl<S: Into<String>> FromIterator<(MetadataField, S)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (MetadataField, S)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(field, value)| (field, value.into()))
                .collect(),
        }
    }
}

/// The flags given for a single field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldFlags {
    /// `--<field> <value>`
    pub set: Option<String>,
    /// `---<field>`
    pub erase: bool,
}

/// Requested metadata changes, as parsed from the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataEdits {
    /// `--erase`: drop every field that is not explicitly set
    pub erase_all: bool,
    flags: BTreeMap<MetadataField, FieldFlags>,
}

impl MetadataEdits {
    pub fn new(erase_all: bool) -> Self {
        Self {
            erase_all,
            flags: BTreeMap::new(),
        }
    }

    pub fn set(mut self, field: MetadataField, value: impl Into<String>) -> Self {
        self.flags.entry(field).or_default().set = Some(value.into());
        self
    }

    pub fn erase(mut self, field: MetadataField) -> Self {
        self.flags.entry(field).or_default().erase = true;
        self
    }

    /// Merge flags for `field` from optional set/erase arguments.
    pub fn with_flags(mut self, field: MetadataField, set: Option<String>, erase: bool) -> Self {
        if set.is_some() || erase {
            self.flags.insert(field, FieldFlags { set, erase });
        }
        self
    }

    pub fn flags(&self, field: MetadataField) -> FieldFlags {
        self.flags.get(&field).cloned().unwrap_or_default()
    }

    /// Whether running these edits can change anything at all
    pub fn is_empty(&self) -> bool {
        !self.erase_all && self.flags.is_empty()
    }
}

/// The action that won for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Set(String),
    Erase,
    Keep,
}

impl Directive {
    /// Apply the precedence rules to one field's flags.
    pub fn from_flags(flags: &FieldFlags, erase_all: bool) -> Self {
        match (&flags.set, flags.erase) {
            (Some(value), _) => Directive::Set(value.clone()),
            (None, true) => Directive::Erase,
            (None, false) if erase_all => Directive::Erase,
            (None, false) => Directive::Keep,
        }
    }
}

/// Outcome of [`resolve`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub metadata: Metadata,
    pub directives: BTreeMap<MetadataField, Directive>,
    /// Fields given both `--<field>` and `---<field>`
    pub conflicts: Vec<MetadataField>,
}

/// Resolve the final value of every field.
///
/// `existing` is `None` when the document has no metadata at all, in which
/// case kept fields resolve to absent.
pub fn resolve(existing: Option<&Metadata>, edits: &MetadataEdits) -> Result<ResolvedMetadata> {
    let mut resolved = ResolvedMetadata::default();

    for field in MetadataField::ALL {
        let flags = edits.flags(field);
        if flags.set.is_some() && flags.erase {
            tracing::warn!(
                "Ignoring '---{}' since '--{}' takes precedence",
                field,
                field
            );
            resolved.conflicts.push(field);
        }

        let directive = Directive::from_flags(&flags, edits.erase_all);
        let value = match &directive {
            Directive::Set(value) => field.finalize(value, true)?,
            Directive::Erase => None,
            Directive::Keep => match existing.and_then(|metadata| metadata.get(field)) {
                Some(value) => field.finalize(value, false)?,
                None => None,
            },
        };

        if let Some(value) = value {
            resolved.metadata.set(field, value);
        }
        resolved.directives.insert(field, directive);
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Metadata {
        [
            (MetadataField::Author, "Ada"),
            (MetadataField::Title, "Notes"),
            (MetadataField::Producer, "pdfTeX"),
            (MetadataField::CreationDate, "D:20240101120000"),
            (MetadataField::PageLayout, "OneColumn"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in MetadataField::ALL {
            assert_eq!(MetadataField::from_name(field.name()), Some(field));
        }
        assert_eq!(MetadataField::from_name("colour"), None);
    }

    #[test]
    fn test_keep_existing_values() {
        let resolved = resolve(Some(&sample()), &MetadataEdits::new(false)).unwrap();
        assert_eq!(resolved.metadata.get(MetadataField::Author), Some("Ada"));
        assert_eq!(resolved.metadata.get(MetadataField::Title), Some("Notes"));
        assert_eq!(resolved.metadata.get(MetadataField::Subject), None);
        assert_eq!(
            resolved.directives[&MetadataField::Author],
            Directive::Keep
        );
    }

    #[test]
    fn test_kept_dates_are_normalized() {
        let resolved = resolve(Some(&sample()), &MetadataEdits::new(false)).unwrap();
        assert_eq!(
            resolved.metadata.get(MetadataField::CreationDate),
            Some("D:20240101120000+00'00'")
        );
    }

    #[test]
    fn test_no_metadata_block_keeps_nothing() {
        let resolved = resolve(None, &MetadataEdits::new(false)).unwrap();
        assert!(resolved.metadata.is_empty());
    }

    #[test]
    fn test_erase_mode_clears_every_field() {
        let resolved = resolve(Some(&sample()), &MetadataEdits::new(true)).unwrap();
        assert!(resolved.metadata.is_empty());
        assert!(resolved
            .directives
            .values()
            .all(|directive| *directive == Directive::Erase));
    }

    #[test]
    fn test_erase_mode_keeps_explicit_sets() {
        let edits = MetadataEdits::new(true).set(MetadataField::Title, "Fresh");
        let resolved = resolve(Some(&sample()), &edits).unwrap();
        let expected: Metadata = [(MetadataField::Title, "Fresh")].into_iter().collect();
        assert_eq!(resolved.metadata, expected);
    }

    #[test]
    fn test_single_field_erase() {
        let edits = MetadataEdits::new(false).erase(MetadataField::Author);
        let resolved = resolve(Some(&sample()), &edits).unwrap();
        assert_eq!(resolved.metadata.get(MetadataField::Author), None);
        assert_eq!(resolved.metadata.get(MetadataField::Title), Some("Notes"));
    }

    #[test]
    fn test_set_wins_over_erase_with_conflict() {
        let edits = MetadataEdits::new(false)
            .set(MetadataField::Title, "X")
            .erase(MetadataField::Title);
        let resolved = resolve(Some(&sample()), &edits).unwrap();
        assert_eq!(resolved.metadata.get(MetadataField::Title), Some("X"));
        assert_eq!(resolved.conflicts, vec![MetadataField::Title]);
    }

    #[test]
    fn test_set_date_is_normalized() {
        let edits = MetadataEdits::new(false).set(MetadataField::ModDate, "20240615153000+0200");
        let resolved = resolve(None, &edits).unwrap();
        assert_eq!(
            resolved.metadata.get(MetadataField::ModDate),
            Some("D:20240615153000+02'00'")
        );
    }

    #[test]
    fn test_set_date_now() {
        let edits = MetadataEdits::new(false).set(MetadataField::CreationDate, "now");
        let resolved = resolve(None, &edits).unwrap();
        let value = resolved.metadata.get(MetadataField::CreationDate).unwrap();
        assert_eq!(value.len(), date::CANONICAL_LENGTH);
    }

    #[test]
    fn test_kept_malformed_date_is_left_alone() {
        let existing: Metadata = [(MetadataField::ModDate, "last tuesday")]
            .into_iter()
            .collect();
        let resolved = resolve(Some(&existing), &MetadataEdits::new(false)).unwrap();
        assert_eq!(
            resolved.metadata.get(MetadataField::ModDate),
            Some("last tuesday")
        );
    }

    #[test]
    fn test_invalid_date_fails() {
        let edits = MetadataEdits::new(false).set(MetadataField::CreationDate, "soon");
        assert!(matches!(
            resolve(None, &edits).unwrap_err(),
            PdfUtilError::InvalidDate { .. }
        ));
    }

    #[test]
    fn test_page_layout_validation() {
        let edits = MetadataEdits::new(false).set(MetadataField::PageLayout, "/TwoPageLeft");
        let resolved = resolve(None, &edits).unwrap();
        assert_eq!(
            resolved.metadata.get(MetadataField::PageLayout),
            Some("TwoPageLeft")
        );

        let edits = MetadataEdits::new(false).set(MetadataField::PageLayout, "Spread");
        match resolve(None, &edits).unwrap_err() {
            PdfUtilError::InvalidEnumValue {
                field,
                value,
                allowed,
            } => {
                assert_eq!(field, "page_layout");
                assert_eq!(value, "Spread");
                assert_eq!(allowed, PAGE_LAYOUTS);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_with_flags_ignores_empty() {
        let edits = MetadataEdits::new(false).with_flags(MetadataField::Author, None, false);
        assert!(edits.is_empty());
    }
}
