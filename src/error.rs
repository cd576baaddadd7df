//! Error types for notebook conversion

use crate::exporter::ExportError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving, converting or copying
#[derive(Error, Debug)]
pub enum Error {
    /// Path is neither a notebook file nor a directory
    #[error("invalid path, skipping: {}", path.display())]
    InvalidPath { path: PathBuf },

    /// Notebook file could not be read
    #[error("failed to read notebook: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Notebook content is not valid notebook JSON
    #[error("failed to parse notebook: {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Notebook is not nbformat v4
    #[error("unsupported notebook format {major}.{minor}: {}", path.display())]
    UnsupportedVersion {
        path: PathBuf,
        major: u32,
        minor: u32,
    },

    /// Rendering to HTML failed
    #[error("failed to export notebook: {}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: ExportError,
    },

    /// Output file could not be written
    #[error("failed to write output file: {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory listing failed
    #[error("failed to list directory: {}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Referenced local resource does not exist. Never fatal.
    #[error("resource not found: {}", path.display())]
    MissingResource { path: PathBuf },

    /// Referenced resource exists but could not be copied. Never fatal.
    #[error("failed to copy resource: {} -> {}", source_path.display(), dest.display())]
    CopyResource {
        source_path: PathBuf,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_path() {
        let err = Error::InvalidPath {
            path: PathBuf::from("missing.ipynb"),
        };
        assert_eq!(err.to_string(), "invalid path, skipping: missing.ipynb");

        let err = Error::UnsupportedVersion {
            path: PathBuf::from("old.ipynb"),
            major: 3,
            minor: 0,
        };
        assert_eq!(
            err.to_string(),
            "unsupported notebook format 3.0: old.ipynb"
        );
    }

    #[test]
    fn copy_failure_names_both_paths() {
        let err = Error::CopyResource {
            source_path: PathBuf::from("notes/fig.png"),
            dest: PathBuf::from("notes/html/fig.png"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        let rendered = format!("{:#}", anyhow::Error::from(err));
        assert!(rendered.starts_with(
            "failed to copy resource: notes/fig.png -> notes/html/fig.png: "
        ));
    }

    #[test]
    fn chain_includes_source() {
        let err = Error::Export {
            path: PathBuf::from("nb.ipynb"),
            source: ExportError::InvalidMimeData {
                mime: "image/png".to_string(),
            },
        };
        let rendered = format!("{:#}", anyhow::Error::from(err));
        assert!(rendered.contains("nb.ipynb"));
        assert!(rendered.contains("image/png"));
    }
}
