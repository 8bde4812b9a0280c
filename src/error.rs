use std::path::PathBuf;

use crate::game::{HexCoord, Piece};

/// Errors raised by the feed-forward network.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("input has {actual} values but the first layer expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("training vector has {actual} values but the output layer has {expected}")]
    OutputMismatch { expected: usize, actual: usize },

    #[error("invalid layer configuration: {0}")]
    InvalidLayers(String),

    #[error("corrupt weight blob: {0}")]
    CorruptBlob(String),
}

/// Errors raised while applying a move to a position.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("piece {piece} is not in its side's reserve")]
    MissingReservePiece { piece: Piece },

    #[error("no piece to move at {cell}")]
    EmptyOrigin { cell: HexCoord },

    #[error("movement has no origin cell")]
    MissingOrigin,
}

/// Errors raised by a model store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("model store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("model store lock poisoned")]
    Poisoned,
}

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("no checkpoint metadata found")]
    NoMetadata,

    #[error("failed to (de)serialize checkpoint metadata: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while exporting CSV statistics.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

/// Fatal errors when setting up a training run.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("population is empty")]
    EmptyPopulation,
}
