//! Error types for the copyright-watermark crate.

use std::path::PathBuf;

/// Errors that can occur while stamping a watermark onto an image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source image could not be opened or decoded.
    #[error("failed to load {}: {source}", path.display())]
    Load {
        /// Path of the source image.
        path: PathBuf,
        /// Underlying decode or I/O error.
        #[source]
        source: image::ImageError,
    },

    /// The output could not be encoded or written.
    #[error("failed to save {}: {source}", path.display())]
    Save {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The destination is not a JPEG target.
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// Font sizes must lie in `1..=MAX_FONT_SIZE` points.
    #[error("invalid font size {0}: expected 1 to {max}", max = crate::request::MAX_FONT_SIZE)]
    InvalidFontSize(u32),

    /// A color string could not be parsed.
    #[error("invalid color {0:?}: expected #RRGGBB, #RRGGBBAA, r,g,b or r,g,b,a")]
    InvalidColor(String),

    /// Every configured font source failed and no built-in fallback was listed.
    #[error("no usable font among the configured sources")]
    NoFont,

    /// An I/O error occurred while reading or creating directories.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an encoder error as a [`Error::Save`] for `path`.
    pub(crate) fn save(path: impl Into<PathBuf>, err: image::ImageError) -> Self {
        let source = match err {
            image::ImageError::IoError(e) => e,
            other => std::io::Error::other(other),
        };
        Self::Save {
            path: path.into(),
            source,
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let unsupported = Error::UnsupportedFormat("png".to_string());
        assert!(unsupported.to_string().contains("png"));

        let save = Error::Save {
            path: PathBuf::from("/nope/out.jpg"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = save.to_string();
        assert!(msg.contains("/nope/out.jpg"));
        assert!(msg.contains("denied"));

        assert!(Error::InvalidColor("teal".into()).to_string().contains("\"teal\""));
    }

    #[test]
    fn encoder_io_errors_are_unwrapped() {
        let err = Error::save(
            "out.jpg",
            image::ImageError::IoError(std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "disk full",
            )),
        );
        match err {
            Error::Save { source, .. } => assert_eq!(source.kind(), std::io::ErrorKind::StorageFull),
            other => panic!("unexpected {other:?}"),
        }
    }
}
