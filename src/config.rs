//! Construction settings for a [`Subject`](crate::subject::Subject).
//!
//! ## Sentinel values
//! - `pool_size = None` → producers run on the crate-wide shared pool

/// Settings used by [`Subject::with_config`](crate::subject::Subject::with_config).
///
/// ## Field semantics
/// - `history_capacity`: values retained by the history buffer (min 1)
/// - `relay_capacity`: values the relay queue holds before `publish` blocks
///   (min 1)
/// - `pool_size`: worker threads of a dedicated producer pool, `None` to share
/// - `relay_thread_name`: name given to the relay thread
#[derive(Clone, Debug)]
pub struct SubjectConfig {
  pub history_capacity: usize,
  pub relay_capacity: usize,
  pub pool_size: Option<usize>,
  pub relay_thread_name: String,
}

impl SubjectConfig {
  pub const DEFAULT_HISTORY_CAPACITY: usize = 10;
  pub const DEFAULT_RELAY_CAPACITY: usize = 100;

  pub fn history_capacity(mut self, capacity: usize) -> Self {
    self.history_capacity = capacity;
    self
  }

  pub fn relay_capacity(mut self, capacity: usize) -> Self {
    self.relay_capacity = capacity;
    self
  }

  /// Gives the subject its own producer pool of `size` threads.
  pub fn pool_size(mut self, size: usize) -> Self {
    self.pool_size = Some(size);
    self
  }

  pub fn relay_thread_name(mut self, name: impl Into<String>) -> Self {
    self.relay_thread_name = name.into();
    self
  }
}

impl Default for SubjectConfig {
  fn default() -> Self {
    Self {
      history_capacity: Self::DEFAULT_HISTORY_CAPACITY,
      relay_capacity: Self::DEFAULT_RELAY_CAPACITY,
      pool_size: None,
      relay_thread_name: "subject-relay".to_owned(),
    }
  }
}
