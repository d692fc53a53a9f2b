//! Command-line arguments

use clap::{ArgGroup, Args, Parser, Subcommand};
use pdfutil_core::metadata::FieldFlags;
use pdfutil_core::{
    InfoEdits, MetadataEdits, MetadataField, OutputTarget, PageSpec, PdfUtilError, RotateSpec,
    Rotation, ViewerEdits, ViewerFlag,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Names that accept the `---<name>` erase/reset form
const ERASABLE: &[&str] = &[
    "author",
    "title",
    "subject",
    "creator",
    "producer",
    "keywords",
    "creation_date",
    "mod_date",
    "page_layout",
    "hide_toolbar",
    "hide_menubar",
    "hide_windowui",
    "fit_window",
    "center_window",
    "display_doctitle",
    "non_fullscreen_pagemode",
    "direction",
];

/// Rewrite `---<name>` to `--erase-<name>` for every known name, up to a
/// literal `--`.
pub fn expand_erase_flags<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    let mut passthrough = false;
    args.into_iter()
        .map(|arg| {
            if passthrough {
                return arg;
            }
            if arg == "--" {
                passthrough = true;
                return arg;
            }
            let rewritten = arg
                .to_str()
                .and_then(|text| text.strip_prefix("---"))
                .filter(|name| ERASABLE.contains(name))
                .map(|name| OsString::from(format!("--erase-{}", name)));
            rewritten.unwrap_or(arg)
        })
        .collect()
}

#[derive(Parser, Debug)]
#[command(name = "pdfutil")]
#[command(
    version,
    about = "Merge PDF files, rotate or delete pages, and edit document metadata",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Print debug output on stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Concatenate files, pages in argument order
    Merge {
        /// Files to merge
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Rotate every page, or ranges of pages
    Rotate(RotateArgs),

    /// Delete pages
    Delete(DeleteArgs),

    /// Edit metadata and viewer preferences
    Info(InfoArgs),

    /// Show metadata, viewer preferences and page rotations
    DumpInfos {
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Output file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Overwrite the output if it exists. Without -o, overwrite the input
    #[arg(short, long)]
    pub force: bool,
}

impl OutputArgs {
    pub fn target(&self, input: &Path) -> pdfutil_core::Result<OutputTarget> {
        OutputTarget::resolve(self.output.clone(), self.force, input)
    }
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("amount").required(true).args(["ranges", "rotation"])))]
pub struct RotateArgs {
    pub input: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,

    /// `start end rotation` triples, pages 1-based and inclusive
    #[arg(long, num_args = 1.., value_name = "START END ROTATION", allow_negative_numbers = true)]
    pub ranges: Vec<String>,

    /// Degrees to rotate every page by, a positive multiple of 90
    #[arg(long, allow_negative_numbers = true)]
    pub rotation: Option<i64>,
}

impl RotateArgs {
    pub fn spec(&self) -> pdfutil_core::Result<RotateSpec> {
        match self.rotation {
            Some(degrees) => Ok(RotateSpec::All(Rotation::new(degrees)?)),
            None => Ok(RotateSpec::Ranges(self.ranges.clone())),
        }
    }
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("pages").required(true).args(["tokens", "ranges", "deletion"])))]
pub struct DeleteArgs {
    pub input: PathBuf,

    /// Pages to delete: N, A-B, -B (up to B), A- (from A), or lists like 1-3,5
    #[arg(value_name = "PAGES", allow_negative_numbers = true)]
    pub tokens: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,

    /// `start end` pairs, pages 1-based and inclusive
    #[arg(long, num_args = 1.., value_name = "START END")]
    pub ranges: Vec<String>,

    /// A single page to delete
    #[arg(long, value_name = "PAGE")]
    pub deletion: Option<String>,
}

impl DeleteArgs {
    pub fn spec(&self) -> PageSpec {
        if let Some(page) = &self.deletion {
            PageSpec::Single(page.clone())
        } else if !self.ranges.is_empty() {
            PageSpec::Pairs(self.ranges.clone())
        } else {
            PageSpec::Tokens(self.tokens.clone())
        }
    }
}

#[derive(Args, Debug)]
#[command(after_help = "Every field and preference also accepts '---<name>' \
    (same as '--erase-<name>') to remove it, or reset it to its default.")]
pub struct InfoArgs {
    pub input: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Remove every field that is not explicitly set
    #[arg(long)]
    pub erase: bool,

    #[arg(long)]
    pub author: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub subject: Option<String>,
    #[arg(long)]
    pub creator: Option<String>,
    #[arg(long)]
    pub producer: Option<String>,
    #[arg(long)]
    pub keywords: Option<String>,

    /// yyyymmddhhmmss with optional +hhmm, or "now"
    #[arg(long = "creation_date", value_name = "DATE")]
    pub creation_date: Option<String>,

    /// yyyymmddhhmmss with optional +hhmm, or "now"
    #[arg(long = "mod_date", value_name = "DATE")]
    pub mod_date: Option<String>,

    /// SinglePage, OneColumn, TwoColumnLeft, TwoColumnRight, TwoPageLeft or TwoPageRight
    #[arg(long = "page_layout", value_name = "LAYOUT")]
    pub page_layout: Option<String>,

    #[arg(long = "erase-author", hide = true)]
    pub erase_author: bool,
    #[arg(long = "erase-title", hide = true)]
    pub erase_title: bool,
    #[arg(long = "erase-subject", hide = true)]
    pub erase_subject: bool,
    #[arg(long = "erase-creator", hide = true)]
    pub erase_creator: bool,
    #[arg(long = "erase-producer", hide = true)]
    pub erase_producer: bool,
    #[arg(long = "erase-keywords", hide = true)]
    pub erase_keywords: bool,
    #[arg(long = "erase-creation_date", hide = true)]
    pub erase_creation_date: bool,
    #[arg(long = "erase-mod_date", hide = true)]
    pub erase_mod_date: bool,
    #[arg(long = "erase-page_layout", hide = true)]
    pub erase_page_layout: bool,

    /// Hide the viewer's toolbars
    #[arg(long = "hide_toolbar")]
    pub hide_toolbar: bool,
    /// Hide the viewer's menu bar
    #[arg(long = "hide_menubar")]
    pub hide_menubar: bool,
    /// Hide user interface elements in the document's window
    #[arg(long = "hide_windowui")]
    pub hide_windowui: bool,
    /// Resize the window to fit the first page
    #[arg(long = "fit_window")]
    pub fit_window: bool,
    /// Center the window on the screen
    #[arg(long = "center_window")]
    pub center_window: bool,
    /// Show the title instead of the file name in the title bar
    #[arg(long = "display_doctitle")]
    pub display_doctitle: bool,

    /// UseNone, UseOutlines, UseThumbs or UseOC
    #[arg(long = "non_fullscreen_pagemode", value_name = "MODE")]
    pub non_fullscreen_pagemode: Option<String>,

    /// L2R or R2L
    #[arg(long)]
    pub direction: Option<String>,

    #[arg(long = "erase-hide_toolbar", hide = true)]
    pub erase_hide_toolbar: bool,
    #[arg(long = "erase-hide_menubar", hide = true)]
    pub erase_hide_menubar: bool,
    #[arg(long = "erase-hide_windowui", hide = true)]
    pub erase_hide_windowui: bool,
    #[arg(long = "erase-fit_window", hide = true)]
    pub erase_fit_window: bool,
    #[arg(long = "erase-center_window", hide = true)]
    pub erase_center_window: bool,
    #[arg(long = "erase-display_doctitle", hide = true)]
    pub erase_display_doctitle: bool,
    #[arg(long = "erase-non_fullscreen_pagemode", hide = true)]
    pub erase_non_fullscreen_pagemode: bool,
    #[arg(long = "erase-direction", hide = true)]
    pub erase_direction: bool,
}

impl InfoArgs {
    pub fn edits(&self) -> InfoEdits {
        let fields = [
            (MetadataField::Author, &self.author, self.erase_author),
            (MetadataField::Title, &self.title, self.erase_title),
            (MetadataField::Subject, &self.subject, self.erase_subject),
            (MetadataField::Creator, &self.creator, self.erase_creator),
            (MetadataField::Producer, &self.producer, self.erase_producer),
            (MetadataField::Keywords, &self.keywords, self.erase_keywords),
            (
                MetadataField::CreationDate,
                &self.creation_date,
                self.erase_creation_date,
            ),
            (MetadataField::ModDate, &self.mod_date, self.erase_mod_date),
            (
                MetadataField::PageLayout,
                &self.page_layout,
                self.erase_page_layout,
            ),
        ];
        let metadata = fields
            .into_iter()
            .fold(MetadataEdits::new(self.erase), |edits, (field, set, erase)| {
                edits.with_flags(field, set.clone(), erase)
            });

        let toggles = [
            (ViewerFlag::HideToolbar, self.hide_toolbar, self.erase_hide_toolbar),
            (ViewerFlag::HideMenubar, self.hide_menubar, self.erase_hide_menubar),
            (ViewerFlag::HideWindowUi, self.hide_windowui, self.erase_hide_windowui),
            (ViewerFlag::FitWindow, self.fit_window, self.erase_fit_window),
            (ViewerFlag::CenterWindow, self.center_window, self.erase_center_window),
            (
                ViewerFlag::DisplayDocTitle,
                self.display_doctitle,
                self.erase_display_doctitle,
            ),
        ];
        let mut viewer = toggles
            .into_iter()
            .fold(ViewerEdits::default(), |edits, (flag, on, off)| {
                edits.toggle(flag, on, off)
            });
        viewer.non_fullscreen_page_mode = FieldFlags {
            set: self.non_fullscreen_pagemode.clone(),
            erase: self.erase_non_fullscreen_pagemode,
        };
        viewer.direction = FieldFlags {
            set: self.direction.clone(),
            erase: self.erase_direction,
        };

        InfoEdits { metadata, viewer }
    }
}

/// The first merge input, overwritten by `merge -f` without `-o`
pub fn first_input(inputs: &[PathBuf]) -> pdfutil_core::Result<&Path> {
    inputs
        .first()
        .map(PathBuf::as_path)
        .ok_or_else(|| PdfUtilError::Usage("No input files given".into()))
}
