use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use ttf_parser::name_id;
use usvg::fontdb;

use crate::foundation::error::{KinetypeError, KinetypeResult};

/// Serializable identity of the font a layout was measured with.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FontDescriptor {
    /// Primary family name.
    pub family: String,
    /// Font file on disk, when the face came from one.
    pub path: Option<PathBuf>,
    /// Face index inside a collection file.
    pub face_index: u32,
    /// `true` when no real font was found and estimated metrics are in use.
    pub fallback: bool,
}

impl FontDescriptor {
    /// Descriptor for the built-in estimated fallback.
    pub fn fallback() -> Self {
        Self {
            family: "fallback".to_string(),
            path: None,
            face_index: 0,
            fallback: true,
        }
    }

    /// Whether this is the estimated fallback font.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

/// Font bytes ready for shaping and rasterization.
#[derive(Clone)]
pub struct LoadedFont {
    /// Identity of the loaded face.
    pub descriptor: FontDescriptor,
    /// Raw font file bytes.
    pub bytes: Arc<Vec<u8>>,
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedFont")
            .field("descriptor", &self.descriptor)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

impl LoadedFont {
    /// Load a font file from disk, validating that it parses.
    pub fn from_file(path: &Path) -> KinetypeResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        let mut font = Self::from_bytes(bytes, 0)?;
        font.descriptor.path = Some(path.to_path_buf());
        Ok(font)
    }

    /// Wrap in-memory font data.
    pub fn from_bytes(bytes: Vec<u8>, face_index: u32) -> KinetypeResult<Self> {
        let face = ttf_parser::Face::parse(&bytes, face_index)
            .map_err(|e| KinetypeError::validation(format!("unparseable font data: {e}")))?;
        let family = family_name(&face).unwrap_or_else(|| "unknown".to_string());
        Ok(Self {
            descriptor: FontDescriptor {
                family,
                path: None,
                face_index,
                fallback: false,
            },
            bytes: Arc::new(bytes),
        })
    }
}

/// Outcome of resolving a font request.
#[derive(Clone, Debug)]
pub enum ResolvedFont {
    /// A real font face was found.
    Loaded(LoadedFont),
    /// Nothing matched; layout continues on estimated metrics.
    Fallback {
        /// The request that could not be satisfied.
        requested: String,
    },
}

impl ResolvedFont {
    /// Descriptor of the resolved face.
    pub fn descriptor(&self) -> FontDescriptor {
        match self {
            Self::Loaded(f) => f.descriptor.clone(),
            Self::Fallback { .. } => FontDescriptor::fallback(),
        }
    }
}

/// Turns a font request (family name or file path) into font data.
///
/// Resolvers never fail: an unsatisfiable request yields [`ResolvedFont::Fallback`].
pub trait FontResolver {
    /// Resolve `request`.
    fn resolve(&self, request: &str) -> ResolvedFont;
}

/// Resolver backed by a `fontdb` database of local fonts.
pub struct SystemFontResolver {
    db: fontdb::Database,
}

impl SystemFontResolver {
    /// Index `extra_dirs` and then all system fonts.
    pub fn new(extra_dirs: &[PathBuf]) -> Self {
        let mut db = fontdb::Database::new();
        for dir in extra_dirs {
            db.load_fonts_dir(dir);
        }
        db.load_system_fonts();
        Self::from_database(db)
    }

    /// Resolver that only knows about fonts in `dirs` (no system fonts).
    pub fn with_dirs_only(dirs: &[PathBuf]) -> Self {
        let mut db = fontdb::Database::new();
        for dir in dirs {
            db.load_fonts_dir(dir);
        }
        Self::from_database(db)
    }

    fn from_database(mut db: fontdb::Database) -> Self {
        bind_generic_families(&mut db);
        Self { db }
    }

    /// Number of indexed faces.
    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    fn query(&self, family: fontdb::Family<'_>) -> Option<fontdb::ID> {
        let families = [family];
        self.db.query(&fontdb::Query {
            families: &families,
            ..Default::default()
        })
    }

    fn load_face(&self, id: fontdb::ID) -> Option<LoadedFont> {
        let face = self.db.face(id)?;
        let path = match &face.source {
            fontdb::Source::File(p) => Some(p.clone()),
            fontdb::Source::SharedFile(p, _) => Some(p.clone()),
            _ => None,
        };
        let family = face
            .families
            .first()
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let (bytes, face_index) = self
            .db
            .with_face_data(id, |data, index| (data.to_vec(), index))?;
        Some(LoadedFont {
            descriptor: FontDescriptor {
                family,
                path,
                face_index,
                fallback: false,
            },
            bytes: Arc::new(bytes),
        })
    }
}

impl FontResolver for SystemFontResolver {
    fn resolve(&self, request: &str) -> ResolvedFont {
        let as_path = Path::new(request);
        if as_path.is_file() {
            match LoadedFont::from_file(as_path) {
                Ok(font) => return ResolvedFont::Loaded(font),
                Err(e) => tracing::warn!(font = request, error = %e, "font file unusable"),
            }
        }

        let family = generic_family(request);
        if let Some(font) = self.query(family).and_then(|id| self.load_face(id)) {
            return ResolvedFont::Loaded(font);
        }

        tracing::warn!(font = request, "font not found; trying sans-serif");
        if let Some(font) = self
            .query(fontdb::Family::SansSerif)
            .and_then(|id| self.load_face(id))
        {
            return ResolvedFont::Loaded(font);
        }

        if let Some(font) = self.db.faces().find_map(|face| self.load_face(face.id)) {
            tracing::warn!(
                font = request,
                family = %font.descriptor.family,
                "no sans-serif face; using first indexed font"
            );
            return ResolvedFont::Loaded(font);
        }

        tracing::warn!(
            font = request,
            faces = self.db.len(),
            "no usable font; falling back to estimated metrics"
        );
        ResolvedFont::Fallback {
            requested: request.to_string(),
        }
    }
}

fn generic_family(name: &str) -> fontdb::Family<'_> {
    match name.to_ascii_lowercase().as_str() {
        "sans-serif" | "sans" => fontdb::Family::SansSerif,
        "serif" => fontdb::Family::Serif,
        "monospace" | "mono" => fontdb::Family::Monospace,
        _ => fontdb::Family::Name(name),
    }
}

const SANS_SERIF_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Arial",
    "Helvetica",
];
const SERIF_FAMILIES: &[&str] = &[
    "DejaVu Serif",
    "Liberation Serif",
    "Noto Serif",
    "Times New Roman",
];
const MONOSPACE_FAMILIES: &[&str] = &[
    "DejaVu Sans Mono",
    "Liberation Mono",
    "Noto Sans Mono",
    "Courier New",
];

/// Point the generic families at installed faces.
///
/// fontdb's defaults name Windows/macOS families, so on most Linux hosts `sans-serif` matches
/// nothing until rebound. A generic family with no known candidate installed maps to the first
/// indexed family.
fn bind_generic_families(db: &mut fontdb::Database) {
    let Some(first) = db
        .faces()
        .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
    else {
        return;
    };

    let generics = [
        (fontdb::Family::SansSerif, SANS_SERIF_FAMILIES),
        (fontdb::Family::Serif, SERIF_FAMILIES),
        (fontdb::Family::Monospace, MONOSPACE_FAMILIES),
    ];
    for (generic, candidates) in generics {
        let families = [generic];
        let bound = db
            .query(&fontdb::Query {
                families: &families,
                ..Default::default()
            })
            .is_some();
        if bound {
            continue;
        }
        let name = installed_family(db, candidates).unwrap_or_else(|| first.clone());
        tracing::debug!(?generic, family = %name, "binding generic font family");
        match generic {
            fontdb::Family::Serif => db.set_serif_family(name),
            fontdb::Family::Monospace => db.set_monospace_family(name),
            _ => db.set_sans_serif_family(name),
        }
    }
}

fn installed_family(db: &fontdb::Database, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find(|want| {
            db.faces().any(|face| {
                face.families
                    .iter()
                    .any(|(name, _)| name.eq_ignore_ascii_case(want))
            })
        })
        .map(|name| (*name).to_string())
}

fn family_name(face: &ttf_parser::Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
#[path = "../../tests/unit/text/font.rs"]
mod tests;
