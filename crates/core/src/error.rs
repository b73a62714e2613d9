//! Error types for RiverShift

use thiserror::Error;

/// Main error type for RiverShift operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shapefile error: {0}")]
    Shapefile(String),

    #[error("Unsupported CRS transformation: {0}")]
    UnsupportedCrs(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Missing required input(s): {}", .0.join(", "))]
    MissingInput(Vec<&'static str>),

    #[error("Layer has no features: {0}")]
    EmptyLayer(String),

    #[error("Non-polygon geometry in {layer} (feature {index}): {kind}")]
    NonPolygonGeometry {
        layer: String,
        index: usize,
        kind: &'static str,
    },

    #[error("Field names {first} and {second} both truncate to {truncated}")]
    FieldNameCollision {
        first: String,
        second: String,
        truncated: String,
    },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl From<shapefile::Error> for Error {
    fn from(e: shapefile::Error) -> Self {
        Error::Shapefile(e.to_string())
    }
}

/// Result type alias for RiverShift operations
pub type Result<T> = std::result::Result<T, Error>;
