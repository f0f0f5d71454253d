use thiserror::Error;

use crate::host::SurfaceId;

/// Errors raised while loading or validating a showroom configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("entity name `{0}` is declared more than once")]
    DuplicateEntity(String),

    #[error("entity `{entity}` names unknown parent `{parent}`")]
    UnknownParent { entity: String, parent: String },

    #[error("entity `{0}` is its own ancestor")]
    ParentCycle(String),

    #[error("camera entity `{0}` is not declared")]
    MissingCamera(String),

    #[error("no waypoints resolved to declared entities")]
    NoWaypoints,

    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
}

/// Errors reported by a media host
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MediaError {
    #[error("playback surface {0:?} does not exist")]
    UnknownSurface(SurfaceId),

    #[error("playback of {0:?} was prevented: {1}")]
    PlaybackRejected(SurfaceId, String),

    #[error("failed to load `{url}`: {reason}")]
    Load { url: String, reason: String },
}

/// Runtime errors of the interaction core. None of them is fatal: callers log
/// and keep ticking.
#[derive(Debug, Error)]
pub enum ShowroomError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("feature {index} of product {product}: {reason}")]
    MalformedFeature {
        product: usize,
        index: usize,
        reason: &'static str,
    },
}

pub type Result<T, E = ShowroomError> = std::result::Result<T, E>;
