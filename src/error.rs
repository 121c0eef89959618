//! Error types for the heap, its backing region, and configuration loading.

use std::io;

use thiserror::Error;
use validator::ValidationErrors;

/// Failures of the address-space-extension primitive.
#[derive(Debug, Error)]
pub enum RegionError {
  /// The region cannot grow past its capacity.
  #[error("region exhausted: requested {requested} bytes, {available} of {capacity} bytes left")]
  Exhausted {
    requested: usize,
    available: usize,
    capacity: usize,
  },

  /// The operating system refused to map the reservation.
  #[error("failed to map {size} bytes: {source}")]
  Map {
    size: usize,
    #[source]
    source: io::Error,
  },
}

/// Errors returned by [`Heap`](crate::Heap) operations.
///
/// A zero-sized request is not an error: it yields the null handle.
#[derive(Debug, Error)]
pub enum HeapError {
  /// No free block fits and the region could not be extended.
  #[error("out of memory: {0}")]
  OutOfMemory(#[from] RegionError),

  /// The request overflows once rounded up and given a header.
  #[error("request of {requested} bytes is too large")]
  TooLarge { requested: usize },

  /// No block has its payload at this offset.
  #[error("invalid handle: no block payload at offset {offset}")]
  InvalidHandle { offset: usize },

  /// The handle's allocation was already released.
  #[error("stale handle: allocation at offset {offset} was released")]
  StaleHandle { offset: usize },
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("configuration file not found: {0}")]
  FileNotFound(std::path::PathBuf),

  #[error("configuration parsing error: {0}")]
  Parsing(#[from] Box<figment::Error>),

  #[error("invalid configuration: {0}")]
  Validation(#[from] ValidationErrors),
}

/// A backend name other than `arena` or `mmap`.
#[derive(Debug, Error)]
#[error("unknown backend `{0}` (expected arena or mmap)")]
pub struct UnknownBackend(pub String);

impl From<figment::Error> for ConfigError {
  fn from(error: figment::Error) -> Self {
    ConfigError::Parsing(Box::new(error))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_out_of_memory_wraps_region_error() {
    let error: HeapError = RegionError::Exhausted {
      requested: 64,
      available: 16,
      capacity: 1024,
    }
    .into();

    assert!(matches!(error, HeapError::OutOfMemory(_)));
    assert_eq!(
      error.to_string(),
      "out of memory: region exhausted: requested 64 bytes, 16 of 1024 bytes left"
    );
  }

  #[test]
  fn test_handle_errors_name_offset() {
    let error = HeapError::StaleHandle { offset: 32 };
    assert!(error.to_string().contains("offset 32"));
  }
}
