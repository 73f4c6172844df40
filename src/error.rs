//! Error types shared by the resolver, the file builder and markup rendering.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Failures that can occur while resolving a resource.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// The configured local mode is neither `direct` nor `build`.
  #[error("unknown local file mode: {0}")]
  UnknownMode(String),

  /// The configured hashing algorithm has no SRI digest implementation.
  #[error("unsupported hashing algorithm: {0}")]
  UnsupportedAlgorithm(String),

  /// The build output directory is missing or read-only.
  #[error("directory {} doesn't exist or isn't writable", .dir.display())]
  DirectoryNotWritable {
    /// Directory the artifact would have been written to.
    dir: PathBuf,
  },

  /// The resource identifier, or one segment of a combo, is not registered.
  #[error("resource not found: {0}")]
  ResourceNotFound(String),

  /// A remote resource was named inside a combo identifier.
  #[error("resource {0} is remote and cannot be built locally")]
  NotLocal(String),

  /// A build was requested without any source files.
  #[error("cannot build an artifact from an empty source list")]
  EmptyBuild,

  /// Reading a source file or writing an artifact failed.
  #[error("failed to access {}: {source}", .path.display())]
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    #[source]
    source: std::io::Error,
  },

  /// A markup attribute list could not be parsed.
  #[error("invalid attribute list: {0}")]
  InvalidAttribute(String),
}

impl ResolveError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }
}
