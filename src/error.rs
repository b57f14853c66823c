//! Error types for registries, the chunk codec and world operations

use std::path::PathBuf;

use glam::{IVec2, Vec2};
use thiserror::Error;

/// Errors raised by [`crate::registry::Registry`].
///
/// Every variant signals a programming error in content setup; startup code
/// propagates these and aborts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry '{registry}' is sealed, cannot register '{handle}'")]
    Sealed { registry: &'static str, handle: String },

    #[error("registry '{0}' has not completed registration yet")]
    NotSealed(&'static str),

    #[error("id {id} out of range for registry '{registry}' (size {size})")]
    OutOfRange {
        registry: &'static str,
        id: usize,
        size: usize,
    },

    #[error("unknown handle '{handle}' in registry '{registry}'")]
    NotFound { registry: &'static str, handle: String },

    #[error("handle '{handle}' registered twice in registry '{registry}'")]
    Duplicate { registry: &'static str, handle: String },

    #[error("malformed resource handle '{0}', expected 'namespace:name'")]
    InvalidHandle(String),
}

/// Errors raised while encoding or decoding a chunk file.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("chunk data truncated while reading {section} section")]
    Truncated { section: &'static str },

    #[error("failed to decompress {section} section: {source}")]
    Decompress {
        section: &'static str,
        #[source]
        source: lz4_flex::block::DecompressError,
    },

    #[error("{section} layer has {len} bytes, expected {expected}")]
    LayerSize {
        section: &'static str,
        len: usize,
        expected: usize,
    },

    #[error("malformed JSON in {section} section: {source}")]
    Json {
        section: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{layer} layer holds more than {max} distinct tiles")]
    TooManyTiles { layer: &'static str, max: usize },

    #[error("{section} section claims {size} bytes, limit is {max}")]
    SectionTooLarge {
        section: &'static str,
        size: usize,
        max: usize,
    },
}

/// Errors raised by world operations.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("I/O failure on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chunk ({}, {}): {}", .coord.x, .coord.y, .source)]
    Codec {
        coord: IVec2,
        #[source]
        source: CodecError,
    },

    #[error("malformed {file}: {source}")]
    Metadata {
        file: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("chunk ({}, {}) already exists", .0.x, .0.y)]
    ChunkExists(IVec2),

    #[error("unknown entity {0}")]
    UnknownEntity(crate::entity::EntityId),

    #[error("position {0} lies outside the world")]
    OutsideWorld(Vec2),
}

impl WorldError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WorldError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type WorldResult<T> = Result<T, WorldError>;
