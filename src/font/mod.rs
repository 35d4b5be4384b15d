//! Font resolution: an ordered list of sources, first success wins.
//!
//! A missing or broken preferred font is never an error. The resolver logs
//! the failure and moves on, ending at the embedded bitmap font.

mod builtin;

use std::fmt;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, PxScale};
use image::{Rgba, RgbaImage};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub use builtin::BitmapFont;

use crate::error::{Error, Result};

/// How deep to descend into a system font directory.
const MAX_SEARCH_DEPTH: usize = 8;

/// One place a font may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    /// A font file at an explicit path.
    File(PathBuf),
    /// A font file name, looked up in the working directory and then in the
    /// platform's font directories.
    System(String),
    /// The embedded 5x7 bitmap font.
    Builtin,
}

impl FontSource {
    /// Arial, then DejaVu Sans, then the embedded font.
    #[must_use]
    pub fn default_order() -> Vec<FontSource> {
        vec![
            FontSource::System("arial.ttf".to_string()),
            FontSource::System("DejaVuSans.ttf".to_string()),
            FontSource::Builtin,
        ]
    }
}

impl fmt::Display for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontSource::File(path) => write!(f, "file {}", path.display()),
            FontSource::System(name) => write!(f, "system font {name}"),
            FontSource::Builtin => f.write_str("built-in bitmap font"),
        }
    }
}

/// A resolved font face, independent of size.
pub enum Typeface {
    /// A TrueType/OpenType face rendered through `imageproc`.
    Outline {
        /// Parsed face.
        face: FontVec,
        /// File the face was read from.
        path: PathBuf,
    },
    /// The embedded bitmap font.
    Builtin,
}

impl fmt::Debug for Typeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Typeface::Outline { path, .. } => f.debug_tuple("Outline").field(path).finish(),
            Typeface::Builtin => f.write_str("Builtin"),
        }
    }
}

impl Typeface {
    /// Whether this is the embedded fallback.
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        matches!(self, Typeface::Builtin)
    }

    /// Width and height of `text` at `font_size` points.
    #[must_use]
    pub fn text_size(&self, font_size: u32, text: &str) -> (u32, u32) {
        match self {
            Typeface::Outline { face, .. } => {
                imageproc::drawing::text_size(px_scale(face, font_size), face, text)
            }
            Typeface::Builtin => BitmapFont::at_size(font_size).text_size(text),
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`.
    ///
    /// Glyph coverage is blended toward `color`, so an overlay pre-filled with
    /// the same RGB at zero alpha only picks up alpha at the glyph edges.
    pub fn draw_text_mut(
        &self,
        canvas: &mut RgbaImage,
        color: Rgba<u8>,
        (x, y): (i32, i32),
        font_size: u32,
        text: &str,
    ) {
        match self {
            Typeface::Outline { face, .. } => imageproc::drawing::draw_text_mut(
                canvas,
                color,
                x,
                y,
                px_scale(face, font_size),
                face,
                text,
            ),
            Typeface::Builtin => {
                BitmapFont::at_size(font_size).draw_text_mut(canvas, color, x, y, text);
            }
        }
    }
}

/// Scale so that one em spans `font_size` pixels.
#[allow(clippy::cast_precision_loss)]
fn px_scale(face: &FontVec, font_size: u32) -> PxScale {
    let size = font_size as f32;
    match face.units_per_em() {
        Some(upem) if upem > 0.0 => PxScale::from(size * face.height_unscaled() / upem),
        _ => PxScale::from(size),
    }
}

/// Try each source in order and return the first usable typeface.
///
/// # Errors
///
/// Returns [`Error::NoFont`] if every source fails, which can only happen
/// when [`FontSource::Builtin`] is not in the list.
pub fn resolve(sources: &[FontSource]) -> Result<Typeface> {
    for (i, source) in sources.iter().enumerate() {
        let loaded = match source {
            FontSource::File(path) => load_face(path),
            FontSource::System(name) => match find_system_font(name) {
                Some(path) => load_face(&path),
                None => Err(format!("{name} not found")),
            },
            FontSource::Builtin => {
                if i > 0 {
                    warn!("no preferred font available, using the built-in bitmap font");
                }
                return Ok(Typeface::Builtin);
            }
        };

        match loaded {
            Ok(typeface) => {
                debug!("resolved {source}");
                return Ok(typeface);
            }
            Err(reason) => debug!("skipping {source}: {reason}"),
        }
    }
    Err(Error::NoFont)
}

fn load_face(path: &Path) -> std::result::Result<Typeface, String> {
    let data = std::fs::read(path).map_err(|e| e.to_string())?;
    let face = FontVec::try_from_vec(data).map_err(|e| e.to_string())?;
    Ok(Typeface::Outline {
        face,
        path: path.to_path_buf(),
    })
}

/// Locate a font file by name.
///
/// A name that is itself an existing path wins; otherwise the platform font
/// directories are searched recursively, comparing file names
/// case-insensitively.
#[must_use]
pub fn find_system_font(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.is_file() {
        return Some(direct.to_path_buf());
    }

    system_font_dirs()
        .into_iter()
        .filter(|dir| dir.is_dir())
        .find_map(|dir| {
            WalkDir::new(dir)
                .follow_links(true)
                .max_depth(MAX_SEARCH_DEPTH)
                .sort_by_file_name()
                .into_iter()
                .filter_map(std::result::Result::ok)
                .find(|entry| {
                    entry.file_type().is_file()
                        && entry
                            .file_name()
                            .to_str()
                            .is_some_and(|f| f.eq_ignore_ascii_case(name))
                })
                .map(walkdir::DirEntry::into_path)
        })
}

/// Directories the platform keeps fonts in, most specific first.
#[must_use]
pub fn system_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    #[cfg(windows)]
    {
        let windir = std::env::var_os("WINDIR").unwrap_or_else(|| "C:\\Windows".into());
        dirs.push(PathBuf::from(windir).join("Fonts"));
        if let Some(local) = std::env::var_os("LOCALAPPDATA") {
            dirs.push(PathBuf::from(local).join("Microsoft\\Windows\\Fonts"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
        dirs.push(PathBuf::from("/Library/Fonts"));
        dirs.push(PathBuf::from("/System/Library/Fonts"));
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        match std::env::var_os("XDG_DATA_HOME") {
            Some(data) if !data.is_empty() => dirs.push(PathBuf::from(data).join("fonts")),
            _ => {
                if let Some(home) = &home {
                    dirs.push(home.join(".local/share/fonts"));
                }
            }
        }
        if let Some(home) = &home {
            dirs.push(home.join(".fonts"));
        }
        let data_dirs = std::env::var("XDG_DATA_DIRS")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string());
        dirs.extend(
            data_dirs
                .split(':')
                .filter(|d| !d.is_empty())
                .map(|d| PathBuf::from(d).join("fonts")),
        );
    }

    dirs
}
