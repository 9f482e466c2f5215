//! Error types shared by the facade and its collaborators.

use crate::path::PathError;

/// Errors reported by a collaborator: the cache client or the backing store.
///
/// Messages are carried as strings so an error can be kept and replayed, for
/// example by a deferred opener that failed once.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The path does not exist in the responding tier.
    #[error("path not found: {path}")]
    NotFound { path: String },

    /// The path already exists.
    #[error("path already exists: {path}")]
    AlreadyExists { path: String },

    /// Network, RPC or I/O failure talking to the tier.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The tier does not implement the operation.
    #[error("operation not supported: {operation}")]
    Unsupported { operation: String },

    /// Anything else.
    #[error("{message}")]
    Other { message: String },
}

impl ClientError {
    pub fn not_found(path: impl ToString) -> Self {
        ClientError::NotFound {
            path: path.to_string(),
        }
    }

    pub fn transport(message: impl ToString) -> Self {
        ClientError::Transport {
            message: message.to_string(),
        }
    }

    /// Whether this failure belongs to the not-found class.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => ClientError::NotFound {
                path: e.to_string(),
            },
            std::io::ErrorKind::AlreadyExists => ClientError::AlreadyExists {
                path: e.to_string(),
            },
            _ => ClientError::Transport {
                message: e.to_string(),
            },
        }
    }
}

/// Errors surfaced by the cache access facade.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The cache tier reported the path missing. Never retried.
    #[error("file does not exist: {path}")]
    NotFound { path: String },

    /// The path could not be placed in the backing namespace.
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// A read was requested on a directory.
    #[error("cannot open directory: {path}")]
    OpenDirectory { path: String },

    /// A read was requested on a file that is still being written.
    #[error("file is incomplete: {path}")]
    IncompleteFile { path: String },

    /// The cache tier failed on a path with no fallback.
    #[error("cache tier failed: {0}")]
    Cache(#[source] ClientError),

    /// The backing store failed. There is nothing further to fall back to.
    #[error("backing store failed: {0}")]
    Delegate(#[source] ClientError),
}

impl Error {
    /// True whenever either tier reported the path missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Cache(e) | Error::Delegate(e) => e.is_not_found(),
            _ => false,
        }
    }
}

/// Configuration loading failures.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}
