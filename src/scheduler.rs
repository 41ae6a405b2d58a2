//! Thread pool running deferred producers.

use futures::executor::ThreadPool;
use once_cell::sync::OnceCell;

use crate::{error::Result, observer::isolate};

static SHARED_POOL: OnceCell<ThreadPool> = OnceCell::new();

/// Runs producer functions off the caller's thread.
///
/// Backed by a `futures` [`ThreadPool`]. Subjects built without an explicit
/// pool size share one crate-wide pool created on first use.
#[derive(Clone)]
pub struct ProducerPool {
  pool: ThreadPool,
}

impl ProducerPool {
  /// The crate-wide pool, created on first call.
  pub fn shared() -> Result<Self> {
    let pool = SHARED_POOL.get_or_try_init(|| {
      ThreadPool::builder()
        .name_prefix("subject-producer-")
        .create()
    })?;
    Ok(Self { pool: pool.clone() })
  }

  /// A dedicated pool with `size` worker threads.
  pub fn with_size(size: usize) -> Result<Self> {
    let pool = ThreadPool::builder()
      .pool_size(size.max(1))
      .name_prefix("subject-producer-")
      .create()?;
    Ok(Self { pool })
  }

  /// Runs `task` on a worker thread. A panic inside `task` is logged and
  /// does not take the worker down.
  pub fn spawn<F>(&self, task: F)
  where
    F: FnOnce() + Send + 'static,
  {
    self.pool.spawn_ok(async move {
      isolate("producer", task);
    });
  }
}
