//! Page range resolution
//!
//! Turns textual page selectors (`5`, `2-4`, `-3`, `7-`) into a set of
//! zero-based page indices, checked against the document's page count.

use crate::error::{PdfUtilError, RangeError, Result};
use crate::rotation::Rotation;
use std::collections::BTreeSet;
use std::fmt;

/// Zero-based page index
pub type PageIndex = usize;

/// A parsed page selector. Page numbers are one-based, as typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeToken {
    /// `N`
    Single(i64),
    /// `A-B`
    Bounded(i64, i64),
    /// `-B`, from the first page up to B
    OpenStart(i64),
    /// `A-`, from A up to the last page
    OpenEnd(i64),
    /// `-`, the whole document
    Full,
}

impl RangeToken {
    /// Parse a single selector. Only the syntax is checked here; bounds are
    /// checked by [`RangeToken::bounds`] once the page count is known.
    pub fn parse(input: &str) -> std::result::Result<Self, RangeError> {
        let input = input.trim();

        let Some((start, end)) = input.split_once('-') else {
            return parse_page_number(input).map(RangeToken::Single);
        };

        match (start.trim(), end.trim()) {
            ("", "") => Ok(RangeToken::Full),
            ("", end) => Ok(RangeToken::OpenStart(parse_page_number(end)?)),
            (start, "") => Ok(RangeToken::OpenEnd(parse_page_number(start)?)),
            (start, end) => Ok(RangeToken::Bounded(
                parse_page_number(start)?,
                parse_page_number(end)?,
            )),
        }
    }

    /// Resolve to an inclusive `(start, end)` pair of zero-based indices.
    pub fn bounds(&self, page_count: usize) -> std::result::Result<(PageIndex, PageIndex), RangeError> {
        let last = page_count.checked_sub(1);
        let (start, end) = match *self {
            RangeToken::Single(page) => {
                let index = page_index(page, page_count)?;
                (index, index)
            }
            RangeToken::Bounded(start, end) => {
                (page_index(start, page_count)?, page_index(end, page_count)?)
            }
            RangeToken::OpenStart(end) => (0, page_index(end, page_count)?),
            RangeToken::OpenEnd(start) => {
                let start = page_index(start, page_count)?;
                (start, last.unwrap_or(start))
            }
            RangeToken::Full => match last {
                Some(last) => (0, last),
                None => return Err(out_of_range(1, page_count)),
            },
        };

        if start > end {
            return Err(RangeError::Inverted {
                start: start + 1,
                end: end + 1,
            });
        }

        Ok((start, end))
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeToken::Single(page) => write!(f, "{}", page),
            RangeToken::Bounded(start, end) => write!(f, "{}-{}", start, end),
            RangeToken::OpenStart(end) => write!(f, "-{}", end),
            RangeToken::OpenEnd(start) => write!(f, "{}-", start),
            RangeToken::Full => f.write_str("-"),
        }
    }
}

/// A set of zero-based page indices. Duplicates collapse and iteration is
/// always in ascending page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSelection {
    pages: BTreeSet<PageIndex>,
}

impl PageSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every page of a document with `page_count` pages
    pub fn all(page_count: usize) -> Self {
        (0..page_count).collect()
    }

    pub fn insert_range(&mut self, start: PageIndex, end: PageIndex) {
        self.pages.extend(start..=end);
    }

    pub fn contains(&self, index: PageIndex) -> bool {
        self.pages.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = PageIndex> + '_ {
        self.pages.iter().copied()
    }

    /// Largest selected index, if any
    pub fn last(&self) -> Option<PageIndex> {
        self.pages.last().copied()
    }

    /// One-based page numbers, for display and for backends that count from 1
    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages.iter().map(|&index| index as u32 + 1).collect()
    }
}

impl FromIterator<PageIndex> for PageSelection {
    fn from_iter<I: IntoIterator<Item = PageIndex>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}

/// Resolve already-parsed tokens. Overlapping ranges are unioned.
pub fn resolve(tokens: &[RangeToken], page_count: usize) -> std::result::Result<PageSelection, RangeError> {
    let mut selection = PageSelection::new();
    for token in tokens {
        let (start, end) = token.bounds(page_count)?;
        selection.insert_range(start, end);
    }
    Ok(selection)
}

/// Parse and resolve textual tokens. Each token may itself be a
/// comma-separated list such as `1-3,5`.
pub fn resolve_tokens<S: AsRef<str>>(
    tokens: &[S],
    page_count: usize,
) -> std::result::Result<PageSelection, RangeError> {
    let mut parsed = Vec::with_capacity(tokens.len());
    for token in tokens {
        for part in token.as_ref().split(',') {
            if part.trim().is_empty() && token.as_ref().contains(',') {
                continue;
            }
            parsed.push(RangeToken::parse(part)?);
        }
    }

    let selection = resolve(&parsed, page_count)?;
    tracing::debug!(
        tokens = parsed.len(),
        pages = ?selection.page_numbers(),
        "resolved page selection"
    );
    Ok(selection)
}

/// Legacy `start end` pairs, both ends inclusive.
pub fn resolve_pairs<S: AsRef<str>>(values: &[S], page_count: usize) -> Result<PageSelection> {
    let mut selection = PageSelection::new();
    for pair in grouped(values, 2)? {
        let token = RangeToken::Bounded(
            parse_page_number(pair[0].as_ref())?,
            parse_page_number(pair[1].as_ref())?,
        );
        let (start, end) = token.bounds(page_count)?;
        selection.insert_range(start, end);
    }
    Ok(selection)
}

/// Legacy `start end rotation` triples, used only by rotation. Every triple
/// is validated before any of them is returned.
pub fn resolve_triples<S: AsRef<str>>(
    values: &[S],
    page_count: usize,
) -> Result<Vec<(PageSelection, Rotation)>> {
    let mut steps = Vec::new();
    for triple in grouped(values, 3)? {
        let start = page_index(parse_page_number(triple[0].as_ref())?, page_count)?;
        let end = page_index(parse_page_number(triple[1].as_ref())?, page_count)?;
        let rotation = Rotation::parse(triple[2].as_ref())?;

        if start > end {
            return Err(RangeError::Inverted {
                start: start + 1,
                end: end + 1,
            }
            .into());
        }

        let mut selection = PageSelection::new();
        selection.insert_range(start, end);
        steps.push((selection, rotation));
    }
    Ok(steps)
}

fn grouped<S>(values: &[S], arity: usize) -> Result<std::slice::Chunks<'_, S>> {
    if values.is_empty() || values.len() % arity != 0 {
        return Err(PdfUtilError::MalformedRangeList {
            arity,
            count: values.len(),
        });
    }
    Ok(values.chunks(arity))
}

fn parse_page_number(value: &str) -> std::result::Result<i64, RangeError> {
    let value = value.trim();
    value.parse::<i64>().map_err(|_| RangeError::NotANumber {
        value: value.to_string(),
    })
}

/// Convert a one-based page number into a checked zero-based index.
fn page_index(page: i64, page_count: usize) -> std::result::Result<PageIndex, RangeError> {
    if page < 1 || page as u64 > page_count as u64 {
        return Err(out_of_range(page, page_count));
    }
    Ok(page as usize - 1)
}

fn out_of_range(page: i64, page_count: usize) -> RangeError {
    RangeError::OutOfRange {
        value: page,
        min: 1,
        max: page_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pages(selection: &PageSelection) -> Vec<usize> {
        selection.iter().collect()
    }

    #[test]
    fn test_parse_single() {
        assert_eq!(RangeToken::parse("5").unwrap(), RangeToken::Single(5));
        assert_eq!(RangeToken::parse(" 12 ").unwrap(), RangeToken::Single(12));
    }

    #[test]
    fn test_parse_range_forms() {
        assert_eq!(RangeToken::parse("2-4").unwrap(), RangeToken::Bounded(2, 4));
        assert_eq!(RangeToken::parse("-3").unwrap(), RangeToken::OpenStart(3));
        assert_eq!(RangeToken::parse("7-").unwrap(), RangeToken::OpenEnd(7));
        assert_eq!(RangeToken::parse("-").unwrap(), RangeToken::Full);
    }

    #[test]
    fn test_parse_not_a_number() {
        assert_eq!(
            RangeToken::parse("abc").unwrap_err(),
            RangeError::NotANumber {
                value: "abc".into()
            }
        );
        assert_eq!(
            RangeToken::parse("1-x").unwrap_err(),
            RangeError::NotANumber { value: "x".into() }
        );
        assert!(RangeToken::parse("1-2-3").is_err());
        assert!(RangeToken::parse("").is_err());
    }

    #[test]
    fn test_single_page_is_zero_based() {
        let selection = resolve_tokens(&["1", "5"], 5).unwrap();
        assert_eq!(pages(&selection), vec![0, 4]);
    }

    #[test]
    fn test_single_page_out_of_range() {
        assert_eq!(
            resolve_tokens(&["6"], 5).unwrap_err(),
            RangeError::OutOfRange {
                value: 6,
                min: 1,
                max: 5
            }
        );
        assert!(resolve_tokens(&["0"], 5).is_err());
    }

    #[test]
    fn test_open_start_defaults_to_first_page() {
        let selection = resolve_tokens(&["-3"], 10).unwrap();
        assert_eq!(pages(&selection), vec![0, 1, 2]);
    }

    #[test]
    fn test_open_end_defaults_to_last_page() {
        let selection = resolve_tokens(&["8-"], 10).unwrap();
        assert_eq!(pages(&selection), vec![7, 8, 9]);
    }

    #[test]
    fn test_full_range() {
        let selection = resolve_tokens(&["-"], 3).unwrap();
        assert_eq!(pages(&selection), vec![0, 1, 2]);
        assert!(resolve_tokens(&["-"], 0).is_err());
    }

    #[test]
    fn test_inverted_range_fails() {
        assert_eq!(
            resolve_tokens(&["4-2"], 5).unwrap_err(),
            RangeError::Inverted { start: 4, end: 2 }
        );
    }

    #[test]
    fn test_bound_checked_before_inversion() {
        assert!(matches!(
            resolve_tokens(&["9-2"], 5).unwrap_err(),
            RangeError::OutOfRange { value: 9, .. }
        ));
    }

    #[test]
    fn test_overlapping_ranges_union() {
        let selection = resolve_tokens(&["1-3", "2-4", "3"], 5).unwrap();
        assert_eq!(pages(&selection), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_comma_separated_tokens() {
        let selection = resolve_tokens(&["1-2,5", "4,"], 5).unwrap();
        assert_eq!(pages(&selection), vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_pairs_are_inclusive() {
        let selection = resolve_pairs(&["1", "2", "4", "4"], 5).unwrap();
        assert_eq!(pages(&selection), vec![0, 1, 3]);
    }

    #[test]
    fn test_pairs_reject_odd_count() {
        assert!(matches!(
            resolve_pairs(&["1", "2", "3"], 5).unwrap_err(),
            PdfUtilError::MalformedRangeList { arity: 2, count: 3 }
        ));
    }

    #[test]
    fn test_triples_resolve_with_rotation() {
        let steps = resolve_triples(&["1", "2", "90", "2", "3", "180"], 3).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(pages(&steps[0].0), vec![0, 1]);
        assert_eq!(steps[0].1.degrees(), 90);
        assert_eq!(pages(&steps[1].0), vec![1, 2]);
        assert_eq!(steps[1].1.degrees(), 180);
    }

    #[test]
    fn test_triples_reject_bad_arity() {
        assert!(matches!(
            resolve_triples(&["1", "2"], 3).unwrap_err(),
            PdfUtilError::MalformedRangeList { arity: 3, count: 2 }
        ));
        assert!(matches!(
            resolve_triples::<&str>(&[], 3).unwrap_err(),
            PdfUtilError::MalformedRangeList { arity: 3, count: 0 }
        ));
    }

    #[test]
    fn test_triples_reject_bad_rotation() {
        assert!(matches!(
            resolve_triples(&["1", "2", "45"], 3).unwrap_err(),
            PdfUtilError::InvalidRotation { value: 45 }
        ));
    }

    #[test]
    fn test_triples_reject_out_of_range_end() {
        assert!(matches!(
            resolve_triples(&["1", "4", "90"], 3).unwrap_err(),
            PdfUtilError::Range(RangeError::OutOfRange { value: 4, .. })
        ));
    }

    #[test]
    fn test_token_display_round_trips_syntax() {
        for text in ["5", "2-4", "-3", "7-", "-"] {
            assert_eq!(RangeToken::parse(text).unwrap().to_string(), text);
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn token() -> impl Strategy<Value = String> {
        prop_oneof![
            (1i64..60).prop_map(|n| n.to_string()),
            (1i64..60, 1i64..60).prop_map(|(a, b)| format!("{}-{}", a, b)),
            (1i64..60).prop_map(|n| format!("-{}", n)),
            (1i64..60).prop_map(|n| format!("{}-", n)),
        ]
    }

    proptest! {
        /// Property: every resolved index lies in [0, n)
        #[test]
        fn resolved_indices_in_bounds(
            tokens in prop::collection::vec(token(), 1..6),
            page_count in 1usize..50
        ) {
            if let Ok(selection) = resolve_tokens(&tokens, page_count) {
                prop_assert!(selection.iter().all(|index| index < page_count));
            }
        }

        /// Property: a token's selection never depends on its repetition
        #[test]
        fn repeated_tokens_collapse(token in token(), page_count in 1usize..50) {
            let once = resolve_tokens(&[token.clone()], page_count);
            let twice = resolve_tokens(&[token.clone(), token], page_count);
            prop_assert_eq!(once, twice);
        }
    }
}
