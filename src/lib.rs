//! Stamp a translucent copyright notice onto images.
//!
//! Each image gets `© <current year> <brand>` drawn in its bottom-right corner,
//! 10 pixels from both edges, on a transparent layer that is alpha-composited
//! over the source. The result is flattened and written as JPEG.
//!
//! # Quick Start
//!
//! ```no_run
//! use copyright_watermark::{EngineOptions, WatermarkEngine, WatermarkRequest, WatermarkStyle};
//!
//! let engine = WatermarkEngine::new(EngineOptions::default()).expect("failed to init engine");
//! let request = WatermarkRequest::new("photo.png", "photo.jpg", WatermarkStyle::default());
//! engine.process_file(&request).expect("failed to stamp image");
//! ```
//!
//! # Fonts
//!
//! Fonts are resolved from an ordered list of [`FontSource`]s; the first one
//! that loads wins. The default list tries Arial, then DejaVu Sans, and ends
//! with an embedded bitmap font so stamping never fails for lack of a font.
//!
//! ```no_run
//! use copyright_watermark::{EngineOptions, FontSource, WatermarkEngine};
//!
//! let options = EngineOptions {
//!     fonts: vec![FontSource::File("brand.otf".into()), FontSource::Builtin],
//!     ..EngineOptions::default()
//! };
//! let engine = WatermarkEngine::new(options).expect("failed to init engine");
//! println!("rendering with {:?}", engine.typeface());
//! ```

#![deny(missing_docs)]

pub mod blending;
mod engine;
pub mod error;
pub mod font;
mod request;

pub use engine::{
    batch_output_path, collect_images, default_output_path, is_supported_image, save_jpeg,
    BatchOptions, BatchReport, EngineOptions, FailurePolicy, ProcessResult, WatermarkEngine,
    DEFAULT_JPEG_QUALITY, MARGIN,
};
pub use error::{Error, Result};
pub use font::{FontSource, Typeface};
pub use request::{
    copyright_text, parse_color, WatermarkRequest, WatermarkStyle, DEFAULT_BRAND, DEFAULT_COLOR,
    DEFAULT_FONT_SIZE, MAX_FONT_SIZE,
};
