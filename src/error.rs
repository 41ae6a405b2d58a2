//! Error types shared by the history buffer, the subject and its observers.

use std::io;

/// Errors surfaced by the subject and its collaborators.
///
/// Only history reads fail during normal use. The other variants come from
/// construction: a zero capacity or a background thread that could not be
/// started.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SubjectError {
  /// A history read on a buffer that holds no entries.
  #[error("history buffer is empty")]
  Empty,

  /// A bounded structure was configured with a capacity of zero.
  #[error("{what} capacity must be greater than zero")]
  ZeroCapacity {
    /// Which capacity was rejected.
    what: &'static str,
  },

  /// An OS thread or the producer pool could not be created.
  #[error("failed to spawn background worker: {0}")]
  Spawn(#[from] io::Error),
}

impl SubjectError {
  /// Returns `true` for the [`SubjectError::Empty`] condition.
  pub fn is_empty(&self) -> bool { matches!(self, SubjectError::Empty) }
}

/// Result alias used across the crate.
pub type Result<T, E = SubjectError> = std::result::Result<T, E>;
