//! Viewer preferences
//!
//! Catalog `/ViewerPreferences` entries. Boolean preferences are switched on
//! with `--<name>` and off with `---<name>`; enumerated ones are set with a
//! value or reset to their default.

use crate::error::{PdfUtilError, Result};
use crate::metadata::FieldFlags;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerFlag {
    HideToolbar,
    HideMenubar,
    HideWindowUi,
    FitWindow,
    CenterWindow,
    DisplayDocTitle,
}

impl ViewerFlag {
    pub const ALL: [ViewerFlag; 6] = [
        ViewerFlag::HideToolbar,
        ViewerFlag::HideMenubar,
        ViewerFlag::HideWindowUi,
        ViewerFlag::FitWindow,
        ViewerFlag::CenterWindow,
        ViewerFlag::DisplayDocTitle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ViewerFlag::HideToolbar => "hide_toolbar",
            ViewerFlag::HideMenubar => "hide_menubar",
            ViewerFlag::HideWindowUi => "hide_windowui",
            ViewerFlag::FitWindow => "fit_window",
            ViewerFlag::CenterWindow => "center_window",
            ViewerFlag::DisplayDocTitle => "display_doctitle",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ViewerFlag::HideToolbar => "HideToolbar",
            ViewerFlag::HideMenubar => "HideMenubar",
            ViewerFlag::HideWindowUi => "HideWindowUI",
            ViewerFlag::FitWindow => "FitWindow",
            ViewerFlag::CenterWindow => "CenterWindow",
            ViewerFlag::DisplayDocTitle => "DisplayDocTitle",
        }
    }
}

pub const NON_FULLSCREEN_PAGE_MODE: &str = "non_fullscreen_pagemode";
pub const DIRECTION: &str = "direction";

/// `/NonFullScreenPageMode` values, `UseNone` first as the default
pub const PAGE_MODES: &[&str] = &["UseNone", "UseOutlines", "UseThumbs", "UseOC"];

/// `/Direction` values, `L2R` first as the default
pub const DIRECTIONS: &[&str] = &["L2R", "R2L"];

/// The viewer preferences a document carries. `None` means the entry is
/// not present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewerPreferences {
    pub flags: BTreeMap<ViewerFlag, bool>,
    pub non_fullscreen_page_mode: Option<String>,
    pub direction: Option<String>,
}

impl ViewerPreferences {
    pub fn flag(&self, flag: ViewerFlag) -> Option<bool> {
        self.flags.get(&flag).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.non_fullscreen_page_mode.is_none() && self.direction.is_none()
    }
}

/// `--<flag>` / `---<flag>` for a boolean preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Toggle {
    pub on: bool,
    pub off: bool,
}

/// Requested viewer preference changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerEdits {
    pub flags: BTreeMap<ViewerFlag, Toggle>,
    pub non_fullscreen_page_mode: FieldFlags,
    pub direction: FieldFlags,
}

impl ViewerEdits {
    pub fn toggle(mut self, flag: ViewerFlag, on: bool, off: bool) -> Self {
        if on || off {
            self.flags.insert(flag, Toggle { on, off });
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
            && self.non_fullscreen_page_mode == FieldFlags::default()
            && self.direction == FieldFlags::default()
    }
}

/// Outcome of [`resolve`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedViewer {
    pub preferences: ViewerPreferences,
    /// Names given both `--<name>` and `---<name>`
    pub conflicts: Vec<&'static str>,
}

/// Apply `edits` on top of the document's current preferences.
pub fn resolve(existing: &ViewerPreferences, edits: &ViewerEdits) -> Result<ResolvedViewer> {
    let mut preferences = existing.clone();
    let mut conflicts = Vec::new();

    for (&flag, toggle) in &edits.flags {
        if toggle.on && toggle.off {
            warn_conflict(flag.name());
            conflicts.push(flag.name());
        }
        if toggle.on {
            preferences.flags.insert(flag, true);
        } else if toggle.off {
            preferences.flags.insert(flag, false);
        }
    }

    resolve_choice(
        &mut preferences.non_fullscreen_page_mode,
        &edits.non_fullscreen_page_mode,
        NON_FULLSCREEN_PAGE_MODE,
        PAGE_MODES,
        &mut conflicts,
    )?;
    resolve_choice(
        &mut preferences.direction,
        &edits.direction,
        DIRECTION,
        DIRECTIONS,
        &mut conflicts,
    )?;

    Ok(ResolvedViewer {
        preferences,
        conflicts,
    })
}

fn resolve_choice(
    current: &mut Option<String>,
    flags: &FieldFlags,
    field: &'static str,
    allowed: &'static [&'static str],
    conflicts: &mut Vec<&'static str>,
) -> Result<()> {
    if flags.set.is_some() && flags.erase {
        warn_conflict(field);
        conflicts.push(field);
    }

    if let Some(value) = &flags.set {
        let name = value.trim().trim_start_matches('/');
        let choice = allowed.iter().find(|candidate| **candidate == name).ok_or_else(|| {
            PdfUtilError::InvalidEnumValue {
                field,
                value: value.clone(),
                allowed,
            }
        })?;
        *current = Some(choice.to_string());
    } else if flags.erase {
        *current = Some(allowed[0].to_string());
    }

    Ok(())
}

fn warn_conflict(name: &str) {
    tracing::warn!("Ignoring '---{}' since '--{}' takes precedence", name, name);
}
