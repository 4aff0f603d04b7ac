use std::path::PathBuf;
use thiserror::Error;

/// Failures while retrieving the feature collection document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
}

/// The document was retrieved but does not describe a usable collection.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid GeoJSON: {0}")]
    InvalidGeoJson(#[from] geojson::Error),

    #[error("GeoJSON must be a FeatureCollection")]
    NotFeatureCollection,

    #[error("feature collection is empty")]
    NoFeatures,

    #[error("no property name contains {pattern:?}")]
    NoAttributes { pattern: String },

    #[error("feature {feature} has no {key:?} property")]
    MissingAttribute { feature: usize, key: String },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("attribute sequence is empty")]
    Empty,

    #[error("index {index} is outside the attribute sequence of length {len}")]
    OutOfRange { index: usize, len: usize },
}
