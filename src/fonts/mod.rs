//! TrueType font discovery and a shaper backed by `genpdf`'s font cache.
//!
//! Fonts are searched in `$MANUAL_COMPOSER_FONTS_DIR`, then `assets/fonts`
//! next to the running executable, then `assets/fonts` in the crate root.  When
//! none of those hold the Roboto family, the Windows Arial family is tried.

use std::path::{Path, PathBuf};
use std::{env, fmt, fs};

use genpdf::fonts::{FontCache, FontData, FontFamily};
use genpdf::style::Style;
use log::warn;

use crate::error::{Error, Result};
use crate::shaping::TextShaper;
use crate::style::ResolvedStyle;

/// Environment variable naming a directory with the TrueType font files.
pub const FONTS_DIR_ENV: &str = "MANUAL_COMPOSER_FONTS_DIR";

/// Environment variable overriding the Windows fallback font directory.
pub const WINDOWS_FONTS_DIR_ENV: &str = "MANUAL_COMPOSER_WINDOWS_FONTS_DIR";

/// Name of the bundled font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Roboto";

const FONT_FILES: &[&str] = &[
    "Roboto-Regular.ttf",
    "Roboto-Bold.ttf",
    "Roboto-Italic.ttf",
    "Roboto-BoldItalic.ttf",
];

const WINDOWS_FALLBACK_FAMILY_NAME: &str = "Arial";

/// Regular, bold, italic and bold-italic file names of the Windows fallback.
const WINDOWS_FONT_FILES: [(&str, &str); 4] = [
    ("regular", "arial.ttf"),
    ("bold", "arialbd.ttf"),
    ("italic", "ariali.ttf"),
    ("bold italic", "arialbi.ttf"),
];

/// Size used for measurements; widths scale linearly with the font size.
const MEASURE_SIZE: u8 = 100;

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
}

fn font_directory_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    let mut push = |candidate: PathBuf| {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    };

    if let Some(path) = env_path(FONTS_DIR_ENV) {
        push(path);
    }
    if let Some(bin_dir) = env::current_exe().ok().as_deref().and_then(Path::parent) {
        push(bin_dir.join("assets/fonts"));
    }
    push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"));

    candidates
}

fn missing_font_files(directory: &Path) -> Vec<&'static str> {
    FONT_FILES
        .iter()
        .copied()
        .filter(|name| !directory.join(name).is_file())
        .collect()
}

/// Finds the first candidate directory holding every bundled font file.
pub fn resolve_font_directory() -> Result<PathBuf> {
    let mut attempts = Vec::new();

    for candidate in font_directory_candidates() {
        if !candidate.is_dir() {
            attempts.push(format!("{} (directory missing)", candidate.display()));
            continue;
        }
        let missing = missing_font_files(&candidate);
        if missing.is_empty() {
            return Ok(candidate);
        }
        attempts.push(format!(
            "{} (missing files [{}])",
            candidate.display(),
            missing.join(", ")
        ));
    }

    Err(Error::FontLoad(format!(
        "unable to locate the {DEFAULT_FONT_FAMILY_NAME} font directory; checked {}; set {FONTS_DIR_ENV}",
        if attempts.is_empty() {
            "nothing".to_owned()
        } else {
            attempts.join(", ")
        }
    )))
}

/// Raw bytes of the four faces of a TrueType family.
///
/// The same bytes feed `genpdf` for measuring and `printpdf` for embedding, so
/// drawn text always uses the metrics it was laid out with.
#[derive(Clone)]
pub struct FontFiles {
    name: String,
    regular: Vec<u8>,
    bold: Vec<u8>,
    italic: Vec<u8>,
    bold_italic: Vec<u8>,
}

impl fmt::Debug for FontFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFiles")
            .field("name", &self.name)
            .field("regular", &self.regular.len())
            .field("bold", &self.bold.len())
            .field("italic", &self.italic.len())
            .field("bold_italic", &self.bold_italic.len())
            .finish()
    }
}

fn read_face(path: &Path, name: &str, face: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|err| {
        Error::FontLoad(format!(
            "failed to read {name} {face} face at {}: {err}",
            path.display()
        ))
    })
}

impl FontFiles {
    /// Loads `<name>-Regular.ttf`, `-Bold`, `-Italic` and `-BoldItalic` from `directory`.
    pub fn load(directory: impl AsRef<Path>, name: &str) -> Result<Self> {
        let directory = directory.as_ref();
        let face = |suffix: &str| {
            read_face(
                &directory.join(format!("{name}-{suffix}.ttf")),
                name,
                suffix,
            )
        };
        Ok(Self {
            name: name.to_owned(),
            regular: face("Regular")?,
            bold: face("Bold")?,
            italic: face("Italic")?,
            bold_italic: face("BoldItalic")?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes of the face matching the emphasis flags.
    pub fn face(&self, bold: bool, italic: bool) -> &[u8] {
        match (bold, italic) {
            (false, false) => &self.regular,
            (true, false) => &self.bold,
            (false, true) => &self.italic,
            (true, true) => &self.bold_italic,
        }
    }

    /// PostScript-style name of a face, e.g. `Roboto-BoldItalic`.
    pub fn face_name(&self, bold: bool, italic: bool) -> String {
        let suffix = match (bold, italic) {
            (false, false) => "Regular",
            (true, false) => "Bold",
            (false, true) => "Italic",
            (true, true) => "BoldItalic",
        };
        format!("{}-{suffix}", self.name)
    }

    /// Parses the faces into a `genpdf` family for measuring.
    pub fn to_family(&self) -> Result<FontFamily<FontData>> {
        let parse = |bytes: &Vec<u8>, face: &str| {
            FontData::new(bytes.clone(), None).map_err(|err| {
                Error::FontLoad(format!("failed to parse {} {face} face: {err}", self.name))
            })
        };
        Ok(FontFamily {
            regular: parse(&self.regular, "regular")?,
            bold: parse(&self.bold, "bold")?,
            italic: parse(&self.italic, "italic")?,
            bold_italic: parse(&self.bold_italic, "bold italic")?,
        })
    }
}

fn windows_font_directory() -> Option<PathBuf> {
    if let Some(path) = env_path(WINDOWS_FONTS_DIR_ENV) {
        return Some(path);
    }

    #[cfg(windows)]
    {
        for var in ["WINDIR", "SystemRoot"] {
            if let Some(root) = env_path(var) {
                let candidate = root.join("Fonts");
                if candidate.is_dir() {
                    return Some(candidate);
                }
            }
        }
    }

    None
}

fn windows_fallback_font_files() -> Result<FontFiles> {
    let directory = windows_font_directory()
        .ok_or_else(|| Error::FontLoad("Windows font directory not found".to_owned()))?;
    let [regular, bold, italic, bold_italic] = WINDOWS_FONT_FILES.map(|(face, file)| {
        read_face(&directory.join(file), WINDOWS_FALLBACK_FAMILY_NAME, face)
    });
    Ok(FontFiles {
        name: WINDOWS_FALLBACK_FAMILY_NAME.to_owned(),
        regular: regular?,
        bold: bold?,
        italic: italic?,
        bold_italic: bold_italic?,
    })
}

/// Returns the bundled Roboto faces, falling back to Windows Arial when they are missing.
pub fn default_font_files() -> Result<FontFiles> {
    let bundled_err = match resolve_font_directory() {
        Ok(directory) => return FontFiles::load(&directory, DEFAULT_FONT_FAMILY_NAME),
        Err(err) => err,
    };

    match windows_fallback_font_files() {
        Ok(files) => {
            warn!(
                "{bundled_err}; falling back to the Windows '{WINDOWS_FALLBACK_FAMILY_NAME}' family"
            );
            Ok(files)
        }
        Err(fallback_err) => {
            warn!("{bundled_err}; Windows fallback failed: {fallback_err}");
            Err(Error::FontLoad(format!(
                "bundled fonts unavailable and Windows fallback failed: {fallback_err}"
            )))
        }
    }
}

/// Whether the bundled fonts can be found without falling back.
pub fn default_fonts_available() -> bool {
    resolve_font_directory().is_ok()
}

/// Measures text with TrueType metrics of a single loaded family.
///
/// Every style is measured in the loaded family; the style's font family only
/// contributes its bold and italic flags.
pub struct TrueTypeShaper {
    cache: FontCache,
}

impl TrueTypeShaper {
    pub fn new(family: FontFamily<FontData>) -> Self {
        Self {
            cache: FontCache::new(family),
        }
    }

    /// Measures with the faces in `files`.
    pub fn from_files(files: &FontFiles) -> Result<Self> {
        files.to_family().map(Self::new)
    }

    /// Loads the default family found by [`default_font_files`].
    pub fn from_default_fonts() -> Result<Self> {
        Self::from_files(&default_font_files()?)
    }
}

impl TextShaper for TrueTypeShaper {
    fn run_width(&self, text: &str, style: &ResolvedStyle, bold: bool, italic: bool) -> f64 {
        let mut measure = Style::new();
        measure.set_font_size(MEASURE_SIZE);
        if bold || style.is_bold_family() {
            measure.set_bold();
        }
        if italic || style.is_italic_family() {
            measure.set_italic();
        }
        let width: printpdf::Mm = measure.str_width(&self.cache, text).into();
        crate::geometry::mm(width.0) * style.font_size / f64::from(MEASURE_SIZE)
    }
}
