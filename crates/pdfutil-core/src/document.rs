//! Document access
//!
//! [`PageDocument`] is everything the transformation core needs from a
//! document: page count, per-page rotation, metadata, viewer preferences,
//! page deletion and a single final write. [`PdfDocument`] implements it
//! on top of lopdf.

use crate::error::{PdfUtilError, Result};
use crate::metadata::{Metadata, MetadataField};
use crate::range::{PageIndex, PageSelection};
use crate::rotation::compose;
use crate::viewer::{ViewerFlag, ViewerPreferences};
use lopdf::{Dictionary, Object, ObjectId, StringFormat};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Page tree depth after which inherited attribute lookup gives up
const MAX_TREE_DEPTH: usize = 64;

pub trait PageDocument {
    fn page_count(&self) -> usize;

    /// Rotation currently in effect for a page, including any value
    /// inherited from the page tree. Always in `0..360`.
    fn page_rotation(&self, index: PageIndex) -> Result<i64>;

    fn set_page_rotation(&mut self, index: PageIndex, degrees: i64) -> Result<()>;

    /// `None` when the document carries no metadata at all.
    fn metadata(&self) -> Option<Metadata>;

    /// Replace the editable fields. Fields absent from `metadata` are removed.
    fn set_metadata(&mut self, metadata: &Metadata) -> Result<()>;

    fn viewer_preferences(&self) -> ViewerPreferences;

    fn set_viewer_preferences(&mut self, preferences: &ViewerPreferences) -> Result<()>;

    fn delete_pages(&mut self, selection: &PageSelection) -> Result<()>;

    fn write(&mut self, path: &Path) -> Result<()>;
}

/// A PDF file loaded into memory
#[derive(Debug, Clone)]
pub struct PdfDocument {
    inner: lopdf::Document,
    /// Page object ids in page order, kept in step with `inner`
    pages: Vec<ObjectId>,
    source: Option<PathBuf>,
}

impl PdfDocument {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PdfUtilError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let inner = lopdf::Document::load(path).map_err(|e| {
            PdfUtilError::Pdf(format!("Failed to load '{}': {}", path.display(), e))
        })?;
        let mut doc = Self::from_document(inner);
        doc.source = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), pages = doc.pages.len(), "opened document");

        Ok(doc)
    }

    pub fn load_mem(bytes: &[u8]) -> Result<Self> {
        let inner = lopdf::Document::load_mem(bytes)
            .map_err(|e| PdfUtilError::Pdf(format!("Failed to parse PDF: {}", e)))?;
        Ok(Self::from_document(inner))
    }

    pub fn from_document(inner: lopdf::Document) -> Self {
        let pages = inner.get_pages().into_values().collect();
        Self {
            inner,
            pages,
            source: None,
        }
    }

    /// Path the document was opened from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn inner(&self) -> &lopdf::Document {
        &self.inner
    }

    pub fn into_inner(self) -> lopdf::Document {
        self.inner
    }

    pub fn save_to<W: Write>(&mut self, target: &mut W) -> Result<()> {
        self.inner
            .save_to(target)
            .map_err(|e| PdfUtilError::Pdf(format!("Failed to save PDF: {}", e)))
    }

    fn page_id(&self, index: PageIndex) -> Result<ObjectId> {
        self.pages.get(index).copied().ok_or(PdfUtilError::Range(
            crate::error::RangeError::OutOfRange {
                value: index as i64 + 1,
                min: 1,
                max: self.pages.len(),
            },
        ))
    }

    fn catalog_id(&self) -> Result<ObjectId> {
        self.inner
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|_| PdfUtilError::Pdf("No Root in trailer".into()))
    }

    fn catalog(&self) -> Option<&Dictionary> {
        let id = self.catalog_id().ok()?;
        self.inner.get_object(id).ok()?.as_dict().ok()
    }

    fn catalog_mut(&mut self) -> Result<&mut Dictionary> {
        let id = self.catalog_id()?;
        self.inner
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(|_| PdfUtilError::Pdf("Invalid catalog".into()))
    }

    /// The trailer's `/Info` dictionary, following an indirect reference.
    fn info(&self) -> Option<&Dictionary> {
        let info = self.inner.trailer.get(b"Info").ok()?;
        resolve_dict(&self.inner, info)
    }

    fn viewer_dict(&self) -> Option<&Dictionary> {
        let entry = self.catalog()?.get(b"ViewerPreferences").ok()?;
        resolve_dict(&self.inner, entry)
    }

    /// Look up an inheritable page attribute, walking up the `/Parent` chain.
    pub(crate) fn inherited<'a>(
        doc: &'a lopdf::Document,
        page: &'a Dictionary,
        key: &[u8],
    ) -> Option<&'a Object> {
        let mut node = page;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = node.get(key) {
                return Some(value);
            }
            let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
            node = doc.get_object(parent).and_then(Object::as_dict).ok()?;
        }
        None
    }
}

impl PageDocument for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// A `/Rotate` that is a real number or not a quarter turn is read as
    /// the quarter turn below it (toward zero), e.g. `45` as `0` and
    /// `90.0` as `90`.
    fn page_rotation(&self, index: PageIndex) -> Result<i64> {
        let page_id = self.page_id(index)?;
        let page = self.inner.get_object(page_id).and_then(Object::as_dict)?;
        let rotation = match Self::inherited(&self.inner, page, b"Rotate")
            .map(|value| deref(&self.inner, value))
        {
            Some(Object::Integer(degrees)) => *degrees,
            Some(Object::Real(degrees)) => *degrees as i64,
            _ => 0,
        };
        Ok(compose(rotation, 0))
    }

    fn set_page_rotation(&mut self, index: PageIndex, degrees: i64) -> Result<()> {
        let page_id = self.page_id(index)?;
        let page = self
            .inner
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)?;
        page.set("Rotate", Object::Integer(compose(degrees, 0)));
        Ok(())
    }

    fn metadata(&self) -> Option<Metadata> {
        let info = self.info();
        let layout = self
            .catalog()
            .and_then(|catalog| catalog.get(b"PageLayout").ok())
            .and_then(|value| value.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).into_owned());

        if info.is_none() && layout.is_none() {
            return None;
        }

        let mut metadata = Metadata::new();
        if let Some(info) = info {
            for field in MetadataField::ALL.into_iter().filter(|f| f.is_info_entry()) {
                let value = info
                    .get(field.key().as_bytes())
                    .ok()
                    .map(|value| deref(&self.inner, value));
                if let Some(Object::String(bytes, _)) = value {
                    metadata.set(field, decode_text(bytes));
                }
            }
        }
        if let Some(layout) = layout {
            metadata.set(MetadataField::PageLayout, layout);
        }

        Some(metadata)
    }

    fn set_metadata(&mut self, metadata: &Metadata) -> Result<()> {
        let mut info = self.info().cloned().unwrap_or_default();
        for field in MetadataField::ALL.into_iter().filter(|f| f.is_info_entry()) {
            match metadata.get(field) {
                Some(value) => info.set(field.key(), encode_text(value)),
                None => {
                    info.remove(field.key().as_bytes());
                }
            }
        }

        let info_ref = self
            .inner
            .trailer
            .get(b"Info")
            .and_then(Object::as_reference)
            .ok();
        if info.is_empty() {
            self.inner.trailer.remove(b"Info");
        } else if let Some(id) = info_ref {
            self.inner.objects.insert(id, Object::Dictionary(info));
        } else {
            let id = self.inner.add_object(info);
            self.inner.trailer.set("Info", Object::Reference(id));
        }

        let layout = metadata.get(MetadataField::PageLayout).map(str::to_string);
        let catalog = self.catalog_mut()?;
        match layout {
            Some(layout) => catalog.set("PageLayout", Object::Name(layout.into_bytes())),
            None => {
                catalog.remove(b"PageLayout");
            }
        }

        Ok(())
    }

    fn viewer_preferences(&self) -> ViewerPreferences {
        let mut preferences = ViewerPreferences::default();
        let Some(dict) = self.viewer_dict() else {
            return preferences;
        };

        for flag in ViewerFlag::ALL {
            if let Ok(value) = dict.get(flag.key().as_bytes()).and_then(Object::as_bool) {
                preferences.flags.insert(flag, value);
            }
        }
        let name = |key: &[u8]| {
            dict.get(key)
                .and_then(Object::as_name)
                .ok()
                .map(|name| String::from_utf8_lossy(name).into_owned())
        };
        preferences.non_fullscreen_page_mode = name(b"NonFullScreenPageMode");
        preferences.direction = name(b"Direction");

        preferences
    }

    fn set_viewer_preferences(&mut self, preferences: &ViewerPreferences) -> Result<()> {
        let existing_ref = self
            .catalog()
            .and_then(|catalog| catalog.get(b"ViewerPreferences").ok())
            .and_then(|value| value.as_reference().ok());
        let mut dict = self.viewer_dict().cloned().unwrap_or_default();

        for flag in ViewerFlag::ALL {
            match preferences.flag(flag) {
                Some(value) => dict.set(flag.key(), Object::Boolean(value)),
                None => {
                    dict.remove(flag.key().as_bytes());
                }
            }
        }
        let choices = [
            ("NonFullScreenPageMode", &preferences.non_fullscreen_page_mode),
            ("Direction", &preferences.direction),
        ];
        for (key, value) in choices {
            match value {
                Some(name) => dict.set(key, Object::Name(name.clone().into_bytes())),
                None => {
                    dict.remove(key.as_bytes());
                }
            }
        }

        match existing_ref {
            Some(id) => {
                self.inner.objects.insert(id, Object::Dictionary(dict));
            }
            None => {
                let catalog = self.catalog_mut()?;
                if dict.is_empty() {
                    catalog.remove(b"ViewerPreferences");
                } else {
                    catalog.set("ViewerPreferences", Object::Dictionary(dict));
                }
            }
        }

        Ok(())
    }

    fn delete_pages(&mut self, selection: &PageSelection) -> Result<()> {
        let result = crate::delete::delete_pages(&mut self.inner, selection);
        self.pages = self.inner.get_pages().into_values().collect();
        result
    }

    fn write(&mut self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // Serialize next to the target, then rename over it in one step.
        // New files get 0666 less the umask; a replaced file keeps its mode.
        let mut builder = tempfile::Builder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let mut staged = builder.tempfile_in(dir)?;
        if let Ok(existing) = std::fs::metadata(path) {
            staged.as_file().set_permissions(existing.permissions())?;
        }
        self.save_to(&mut staged)?;
        staged.flush()?;
        staged.persist(path).map_err(|e| PdfUtilError::Io(e.error))?;

        tracing::info!(path = %path.display(), pages = self.page_count(), "wrote document");
        Ok(())
    }
}

/// Follow a single indirect reference, returning the object itself otherwise.
fn deref<'a>(doc: &'a lopdf::Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn resolve_dict<'a>(doc: &'a lopdf::Document, object: &'a Object) -> Option<&'a Dictionary> {
    deref(doc, object).as_dict().ok()
}

/// Decode a PDF text string: UTF-16BE with a byte order mark, UTF-8, or
/// single-byte text.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Encode a text string as a literal (ASCII) or UTF-16BE with a byte order mark.
pub fn encode_text(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// In-memory stand-in used by unit tests of the planning layer.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryDocument {
    pub rotations: Vec<i64>,
    pub metadata: Option<Metadata>,
    pub viewer: ViewerPreferences,
    pub writes: Vec<PathBuf>,
    pub mutations: usize,
}

#[cfg(test)]
impl MemoryDocument {
    pub fn with_pages(count: usize) -> Self {
        Self::with_rotations(vec![0; count])
    }

    pub fn with_rotations(rotations: Vec<i64>) -> Self {
        Self {
            rotations,
            ..Default::default()
        }
    }

    pub fn rotations(&self) -> Vec<i64> {
        self.rotations.clone()
    }

    fn check(&self, index: PageIndex) -> Result<()> {
        if index >= self.rotations.len() {
            return Err(crate::error::RangeError::OutOfRange {
                value: index as i64 + 1,
                min: 1,
                max: self.rotations.len(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
impl PageDocument for MemoryDocument {
    fn page_count(&self) -> usize {
        self.rotations.len()
    }

    fn page_rotation(&self, index: PageIndex) -> Result<i64> {
        self.check(index)?;
        Ok(self.rotations[index])
    }

    fn set_page_rotation(&mut self, index: PageIndex, degrees: i64) -> Result<()> {
        self.check(index)?;
        self.mutations += 1;
        self.rotations[index] = degrees;
        Ok(())
    }

    fn metadata(&self) -> Option<Metadata> {
        self.metadata.clone()
    }

    fn set_metadata(&mut self, metadata: &Metadata) -> Result<()> {
        self.mutations += 1;
        self.metadata = Some(metadata.clone());
        Ok(())
    }

    fn viewer_preferences(&self) -> ViewerPreferences {
        self.viewer.clone()
    }

    fn set_viewer_preferences(&mut self, preferences: &ViewerPreferences) -> Result<()> {
        self.mutations += 1;
        self.viewer = preferences.clone();
        Ok(())
    }

    fn delete_pages(&mut self, selection: &PageSelection) -> Result<()> {
        self.mutations += 1;
        let kept: Vec<i64> = self
            .rotations
            .iter()
            .enumerate()
            .filter(|(index, _)| !selection.contains(*index))
            .map(|(_, rotation)| *rotation)
            .collect();
        self.rotations = kept;
        Ok(())
    }

    fn write(&mut self, path: &Path) -> Result<()> {
        self.writes.push(path.to_path_buf());
        Ok(())
    }
}

/// Snapshot of a document for `dump-infos`
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub metadata: Option<Metadata>,
    pub viewer_preferences: ViewerPreferences,
    pub rotations: BTreeMap<u32, i64>,
}

impl DocumentInfo {
    /// Collect the inspectable state of `doc`. Only pages with a non-zero
    /// rotation are listed.
    pub fn collect<D: PageDocument + ?Sized>(doc: &D) -> Result<Self> {
        let mut rotations = BTreeMap::new();
        for index in 0..doc.page_count() {
            let rotation = doc.page_rotation(index)?;
            if rotation != 0 {
                rotations.insert(index as u32 + 1, rotation);
            }
        }
        Ok(Self {
            page_count: doc.page_count(),
            metadata: doc.metadata(),
            viewer_preferences: doc.viewer_preferences(),
            rotations,
        })
    }
}

impl fmt::Display for DocumentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pages: {}", self.page_count)?;
        match &self.metadata {
            Some(metadata) if !metadata.is_empty() => {
                for (field, value) in metadata.iter() {
                    writeln!(f, "{}: {}", field.key(), value)?;
                }
            }
            _ => writeln!(f, "No metadata")?,
        }

        let preferences = &self.viewer_preferences;
        for (flag, value) in &preferences.flags {
            writeln!(f, "{}: {}", flag.key(), value)?;
        }
        if let Some(mode) = &preferences.non_fullscreen_page_mode {
            writeln!(f, "NonFullScreenPageMode: {}", mode)?;
        }
        if let Some(direction) = &preferences.direction {
            writeln!(f, "Direction: {}", direction)?;
        }

        if !self.rotations.is_empty() {
            let rotations: Vec<String> = self
                .rotations
                .iter()
                .map(|(page, degrees)| format!("{}={}", page, degrees))
                .collect();
            writeln!(f, "Rotations: {}", rotations.join(", "))?;
        }
        Ok(())
    }
}
