//! Core watermarking engine.

use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Datelike;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use tracing::{debug, info, warn};

use crate::blending;
use crate::error::{Error, Result};
use crate::font::{self, FontSource, Typeface};
use crate::request::{WatermarkRequest, WatermarkStyle};

/// Distance in pixels between the text box and the right/bottom edges.
pub const MARGIN: i64 = 10;

/// JPEG quality used when none is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Options controlling how the engine renders and encodes.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Font sources, tried in order.
    pub fonts: Vec<FontSource>,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    /// Color transparent regions are flattened onto before JPEG encoding.
    pub background: Rgb<u8>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            fonts: FontSource::default_order(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            background: Rgb([255, 255, 255]),
        }
    }
}

/// What the batch driver does after an item fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failure; earlier outputs stay on disk.
    #[default]
    Abort,
    /// Attempt every item and collect the failures.
    Continue,
}

/// Options for [`WatermarkEngine::process_batch`].
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Behavior after a failed item.
    pub policy: FailurePolicy,
    /// Checked before each item; once set, the remaining items are skipped.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Result of stamping a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Source image.
    pub source: PathBuf,
    /// JPEG written, or that would have been written.
    pub destination: PathBuf,
    /// `Ok` if the output was written.
    pub outcome: Result<()>,
}

impl ProcessResult {
    /// Whether the output was written.
    #[must_use]
    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per attempted source, in order.
    pub results: Vec<ProcessResult>,
    /// Sources never attempted because the batch stopped early.
    pub not_attempted: Vec<PathBuf>,
    /// Set when the output directory could not be prepared.
    pub setup_error: Option<Error>,
    /// Whether the batch stopped because the cancel flag was raised.
    pub cancelled: bool,
}

impl BatchReport {
    /// Number of outputs written.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success()).count()
    }

    /// Number of attempted sources that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Whether every source was processed successfully.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.setup_error.is_none() && self.not_attempted.is_empty() && self.failed() == 0
    }
}

/// The watermark engine holding the resolved typeface.
///
/// Create once with [`WatermarkEngine::new()`] and reuse for multiple images.
/// Fonts are resolved at construction; the point size is applied per call.
#[derive(Debug)]
pub struct WatermarkEngine {
    typeface: Typeface,
    jpeg_quality: u8,
    background: Rgb<u8>,
}

impl WatermarkEngine {
    /// Create an engine, resolving the first usable font in `options.fonts`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFont`] if no font source works and the built-in
    /// font is not in the list.
    pub fn new(options: EngineOptions) -> Result<Self> {
        let typeface = font::resolve(&options.fonts)?;
        Ok(Self {
            typeface,
            jpeg_quality: options.jpeg_quality.clamp(1, 100),
            background: options.background,
        })
    }

    /// The typeface text is rendered with.
    #[must_use]
    pub fn typeface(&self) -> &Typeface {
        &self.typeface
    }

    /// Top-left corner of the text box for an image of the given size.
    ///
    /// The box sits [`MARGIN`] pixels from the right and bottom edges. Text
    /// wider or taller than the image gets a negative coordinate and is
    /// clipped when drawn.
    #[must_use]
    pub fn anchor(image_size: (u32, u32), text_size: (u32, u32)) -> (i32, i32) {
        let place = |image: u32, text: u32| {
            let pos = i64::from(image) - i64::from(text) - MARGIN;
            i32::try_from(pos).unwrap_or(if pos < 0 { i32::MIN } else { i32::MAX })
        };
        (
            place(image_size.0, text_size.0),
            place(image_size.1, text_size.1),
        )
    }

    /// Render the transparent text layer for an image of `size`.
    #[must_use]
    pub fn text_layer(&self, size: (u32, u32), style: &WatermarkStyle, year: i32) -> RgbaImage {
        let color = style.color;
        let mut layer = RgbaImage::from_pixel(size.0, size.1, Rgba([color[0], color[1], color[2], 0]));

        let text = style.copyright_text(year);
        let text_size = self.typeface.text_size(style.font_size, &text);
        let origin = Self::anchor(size, text_size);
        debug!(?origin, ?text_size, "placing {text:?}");

        self.typeface
            .draw_text_mut(&mut layer, color, origin, style.font_size, &text);
        layer
    }

    /// Stamp `image` in memory and return the composited RGBA result.
    ///
    /// The output has the same dimensions as the input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFontSize`] for a font size outside
    /// `1..=MAX_FONT_SIZE`.
    pub fn apply(&self, image: &DynamicImage, style: &WatermarkStyle, year: i32) -> Result<RgbaImage> {
        style.validate()?;
        let mut base = image.to_rgba8();
        let layer = self.text_layer(base.dimensions(), style, year);
        blending::composite_over(&mut base, &layer);
        Ok(base)
    }

    /// Stamp `image` and flatten it for JPEG output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFontSize`] for a font size outside
    /// `1..=MAX_FONT_SIZE`.
    pub fn apply_flattened(
        &self,
        image: &DynamicImage,
        style: &WatermarkStyle,
        year: i32,
    ) -> Result<RgbImage> {
        let composited = self.apply(image, style, year)?;
        Ok(blending::flatten(&composited, self.background))
    }

    /// Process a single image file: load, stamp, save as JPEG.
    ///
    /// The year is read from the local clock at call time.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedFormat`] if the destination is not `.jpg`/`.jpeg`.
    /// - [`Error::InvalidFontSize`] for a font size outside `1..=MAX_FONT_SIZE`.
    /// - [`Error::Load`] if the source cannot be read.
    /// - [`Error::Save`] if the output cannot be written.
    pub fn process_file(&self, request: &WatermarkRequest) -> Result<()> {
        if !is_jpeg_path(&request.destination) {
            return Err(Error::UnsupportedFormat(format!(
                "{} is not a .jpg/.jpeg path",
                request.destination.display()
            )));
        }
        request.style.validate()?;

        let image = image::open(&request.source).map_err(|source| Error::Load {
            path: request.source.clone(),
            source,
        })?;

        let year = chrono::Local::now().year();
        let flattened = self.apply_flattened(&image, &request.style, year)?;
        save_jpeg(&flattened, &request.destination, self.jpeg_quality)?;

        info!(
            "{} -> {}",
            request.source.display(),
            request.destination.display()
        );
        Ok(())
    }

    /// Stamp every source into `output_dir/<stem>.jpg`, one at a time.
    ///
    /// The output directory is created if missing. What happens after a
    /// failure is governed by [`BatchOptions::policy`].
    #[must_use]
    pub fn process_batch(
        &self,
        sources: &[PathBuf],
        output_dir: &Path,
        style: &WatermarkStyle,
        options: &BatchOptions,
    ) -> BatchReport {
        self.process_batch_with(sources, output_dir, style, options, |_| {})
    }

    /// Like [`process_batch`](Self::process_batch), calling `on_result` after
    /// each attempted item, before the cancel flag is checked again.
    pub fn process_batch_with(
        &self,
        sources: &[PathBuf],
        output_dir: &Path,
        style: &WatermarkStyle,
        options: &BatchOptions,
        mut on_result: impl FnMut(&ProcessResult),
    ) -> BatchReport {
        let mut report = BatchReport::default();

        if let Err(e) = std::fs::create_dir_all(output_dir) {
            report.setup_error = Some(Error::Io(e));
            report.not_attempted = sources.to_vec();
            return report;
        }

        let mut seen = HashSet::new();
        for (i, source) in sources.iter().enumerate() {
            if options
                .cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
            {
                debug!("batch cancelled before {}", source.display());
                report.cancelled = true;
                report.not_attempted = sources[i..].to_vec();
                break;
            }

            let destination = batch_output_path(source, output_dir);
            if !seen.insert(destination.clone()) {
                warn!(
                    "{} overwrites an earlier output at {}",
                    source.display(),
                    destination.display()
                );
            }

            let request = WatermarkRequest::new(source.clone(), destination.clone(), style.clone());
            let outcome = self.process_file(&request);
            let failed = outcome.is_err();
            let result = ProcessResult {
                source: source.clone(),
                destination,
                outcome,
            };
            on_result(&result);
            report.results.push(result);

            if failed && options.policy == FailurePolicy::Abort {
                report.not_attempted = sources[i + 1..].to_vec();
                break;
            }
        }

        report
    }
}

impl Default for WatermarkEngine {
    /// An engine using the embedded font only.
    fn default() -> Self {
        Self {
            typeface: Typeface::Builtin,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            background: Rgb([255, 255, 255]),
        }
    }
}

/// Expand inputs into a list of image files.
///
/// Files are kept as given. Directories contribute their supported images,
/// sorted by name, without descending into subdirectories.
///
/// # Errors
///
/// Returns [`Error::Io`] if a directory cannot be read.
pub fn collect_images(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "bmp" | "gif" | "tif" | "tiff" | "webp"
        ),
        None => false,
    }
}

fn is_jpeg_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}

/// Encode `img` as JPEG at `path`.
///
/// The data goes to a temporary file next to `path` and is renamed into place
/// only once fully written, so a failure never leaves a truncated output.
/// A new file gets mode `0666` minus the umask; an overwritten file keeps its
/// mode.
///
/// # Errors
///
/// Returns [`Error::Save`] if the directory is not writable or encoding fails.
pub fn save_jpeg(img: &RgbImage, path: &Path, quality: u8) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let save_err = |source: std::io::Error| Error::Save {
        path: path.to_path_buf(),
        source,
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".watermark-").suffix(".jpg.part");
    // Temp files default to 0600; outputs get the usual umask-derived mode.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(dir).map_err(save_err)?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        JpegEncoder::new_with_quality(&mut writer, quality)
            .encode_image(img)
            .map_err(|e| Error::save(path, e))?;
        writer.flush().map_err(save_err)?;
    }

    #[cfg(unix)]
    if let Ok(existing) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .map_err(save_err)?;
    }

    tmp.persist(path).map_err(|e| save_err(e.error))?;
    Ok(())
}

/// Output path for `source` inside a batch output directory.
///
/// Example: `"shots/photo.png"` becomes `"<output_dir>/photo.jpg"`.
#[must_use]
pub fn batch_output_path(source: &Path, output_dir: &Path) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default().to_string_lossy();
    output_dir.join(format!("{stem}.jpg"))
}

/// Output path used when a single image is stamped without an explicit target.
///
/// Example: `"photo.png"` becomes `"photo_watermarked.jpg"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_watermarked.jpg"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_sits_ten_pixels_from_bottom_right() {
        assert_eq!(WatermarkEngine::anchor((800, 600), (325, 35)), (465, 555));
    }

    #[test]
    fn anchor_goes_negative_for_oversized_text() {
        assert_eq!(WatermarkEngine::anchor((50, 20), (100, 40)), (-60, -30));
        assert_eq!(WatermarkEngine::anchor((0, 0), (0, 0)), (-10, -10));
    }

    #[test]
    fn text_layer_is_transparent_outside_the_text() {
        let engine = WatermarkEngine::default();
        let style = WatermarkStyle {
            color: Rgba([200, 10, 10, 255]),
            ..WatermarkStyle::default()
        };
        let layer = engine.text_layer((300, 100), &style, 2024);
        assert_eq!(layer.dimensions(), (300, 100));
        assert_eq!(*layer.get_pixel(0, 0), Rgba([200, 10, 10, 0]));
        assert!(layer.pixels().any(|p| *p == Rgba([200, 10, 10, 255])));
    }

    #[test]
    fn default_output_path_appends_watermarked_suffix() {
        let p = default_output_path(Path::new("/tmp/photo.png"));
        assert_eq!(p, PathBuf::from("/tmp/photo_watermarked.jpg"));

        let p = default_output_path(Path::new("image.jpeg"));
        assert_eq!(
            p.file_name().unwrap().to_str().unwrap(),
            "image_watermarked.jpg"
        );
    }

    #[test]
    fn batch_output_path_forces_jpg_extension() {
        let out = Path::new("/out");
        assert_eq!(
            batch_output_path(Path::new("/in/a.png"), out),
            PathBuf::from("/out/a.jpg")
        );
        assert_eq!(
            batch_output_path(Path::new("b.tar.gif"), out),
            PathBuf::from("/out/b.tar.jpg")
        );
        assert_eq!(
            batch_output_path(Path::new("noext"), out),
            PathBuf::from("/out/noext.jpg")
        );
    }

    #[test]
    fn jpeg_destinations_only() {
        assert!(is_jpeg_path(Path::new("a.jpg")));
        assert!(is_jpeg_path(Path::new("a.JPEG")));
        assert!(!is_jpeg_path(Path::new("a.png")));
        assert!(!is_jpeg_path(Path::new("a")));
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.webp")));
        assert!(is_supported_image(Path::new("photo.tiff")));
    }

    #[test]
    fn is_supported_image_rejects_unsupported_formats() {
        assert!(!is_supported_image(Path::new("photo.svg")));
        assert!(!is_supported_image(Path::new("photo.txt")));
        assert!(!is_supported_image(Path::new("photo")));
    }

    #[test]
    fn engine_clamps_quality() {
        let engine = WatermarkEngine::new(EngineOptions {
            fonts: vec![FontSource::Builtin],
            jpeg_quality: 0,
            ..EngineOptions::default()
        })
        .unwrap();
        assert_eq!(engine.jpeg_quality, 1);
        assert!(engine.typeface().is_builtin());
    }
}
