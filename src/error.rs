//! Error types, one enum per concern.

use std::path::PathBuf;

/// Failures while turning an uploaded file into a displayable bitmap.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not decode image {file_name}: {source}")]
    Decode {
        file_name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Could not encode converted page: {0}")]
    Encode(#[source] image::ImageError),

    #[error("PDF renderer is unavailable: {0}")]
    RendererUnavailable(String),

    #[error("Could not render PDF {file_name}: {reason}")]
    Pdf { file_name: String, reason: String },

    #[error("PDF {0} has no pages")]
    EmptyPdf(String),

    #[error("PDF support was not compiled into this build")]
    PdfUnsupported,

    #[error("Conversion worker stopped before reporting a result")]
    WorkerDisconnected,
}

/// Failures while producing the coordinate export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("There are no positions to export")]
    NoPositions,

    #[error("Failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures while loading or saving the preferences file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read configuration file: {0}")]
    Read(#[source] std::io::Error),

    #[error("Configuration file was corrupted: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to save config to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
