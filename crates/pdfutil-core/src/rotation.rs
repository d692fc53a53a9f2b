//! Page rotation
//!
//! Rotations are applied on top of whatever rotation a page already
//! inherits, and the stored value is always one of 0, 90, 180 or 270.

use crate::document::PageDocument;
use crate::error::{PdfUtilError, RangeError, Result};
use crate::range::{PageIndex, PageSelection};
use std::collections::BTreeMap;

/// A validated rotation amount: a non-negative multiple of 90 degrees.
/// Amounts above 360 are allowed and wrap when composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation(i64);

impl Rotation {
    pub fn new(degrees: i64) -> Result<Self> {
        if degrees < 0 || degrees % 90 != 0 {
            return Err(PdfUtilError::InvalidRotation { value: degrees });
        }
        Ok(Self(degrees))
    }

    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let degrees = input
            .parse::<i64>()
            .map_err(|_| PdfUtilError::Usage(format!("Rotation '{}' is not a number", input)))?;
        Self::new(degrees)
    }

    pub fn degrees(self) -> i64 {
        self.0
    }
}

/// Add `delta` to `prior` and normalize into `0..360`.
///
/// Works for any sign and magnitude of either argument. A value that is not
/// a multiple of 90 is first truncated toward zero to a quarter turn, so
/// the result is always one of 0, 90, 180 or 270.
pub fn compose(prior: i64, delta: i64) -> i64 {
    let quarter = |degrees: i64| (degrees - degrees % 90).rem_euclid(360);
    (quarter(prior) + quarter(delta)) % 360
}

/// One rotation request: a page selection (or every page) and an amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationStep {
    pub pages: Option<PageSelection>,
    pub rotation: Rotation,
}

impl RotationStep {
    pub fn all_pages(rotation: Rotation) -> Self {
        Self {
            pages: None,
            rotation,
        }
    }

    pub fn pages(pages: PageSelection, rotation: Rotation) -> Self {
        Self {
            pages: Some(pages),
            rotation,
        }
    }
}

/// Final rotation for every page that a set of steps touches.
///
/// Computed without mutating the document; [`RotationPlan::apply`] writes
/// the values afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationPlan {
    rotations: BTreeMap<PageIndex, i64>,
}

impl RotationPlan {
    /// Fold `steps` in order over the document's current rotations. Steps
    /// that target the same page accumulate.
    pub fn compute<D: PageDocument + ?Sized>(doc: &D, steps: &[RotationStep]) -> Result<Self> {
        let page_count = doc.page_count();
        let mut rotations = BTreeMap::new();

        for step in steps {
            let pages = match &step.pages {
                Some(selection) => {
                    if let Some(last) = selection.last() {
                        if last >= page_count {
                            return Err(RangeError::OutOfRange {
                                value: last as i64 + 1,
                                min: 1,
                                max: page_count,
                            }
                            .into());
                        }
                    }
                    selection.clone()
                }
                None => PageSelection::all(page_count),
            };

            for index in pages.iter() {
                let current = match rotations.get(&index) {
                    Some(&value) => value,
                    None => doc.page_rotation(index)?,
                };
                rotations.insert(index, compose(current, step.rotation.degrees()));
            }
        }

        tracing::debug!(pages = rotations.len(), "computed rotation plan");
        Ok(Self { rotations })
    }

    pub fn rotation_of(&self, index: PageIndex) -> Option<i64> {
        self.rotations.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.rotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty()
    }

    pub fn apply<D: PageDocument + ?Sized>(&self, doc: &mut D) -> Result<()> {
        for (&index, &degrees) in &self.rotations {
            doc.set_page_rotation(index, degrees)?;
        }
        Ok(())
    }
}
