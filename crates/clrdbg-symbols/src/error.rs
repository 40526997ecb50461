//! Symbol-file errors.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while locating or decoding a debug-symbol sidecar.
#[derive(Debug, Error)]
pub enum SymbolError {
    /// The sidecar could not be read from disk.
    #[error("cannot read symbols '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Data ended before a read completed.
    #[error("truncated symbol data at offset {0}")]
    Truncated(usize),

    /// The file does not start with the metadata signature.
    #[error("bad metadata signature")]
    BadSignature,

    /// A required stream is absent.
    #[error("missing stream '{0}'")]
    MissingStream(&'static str),

    /// The metadata layout is valid but not one this reader handles.
    #[error("unsupported metadata layout: {0}")]
    Unsupported(&'static str),

    /// A blob-heap reference points outside the heap.
    #[error("malformed blob at index {0}")]
    BadBlob(u32),

    /// A compressed integer was malformed.
    #[error("invalid compressed integer at offset {0}")]
    BadCompressed(usize),
}

impl SymbolError {
    /// True when the sidecar simply does not exist; callers treat this as
    /// "no symbols" rather than a hard failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SymbolError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
