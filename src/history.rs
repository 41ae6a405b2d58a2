//! Fixed-capacity override ring keeping the most recent published values.
//!
//! ```text
//!   slots: [Option<Item>; max_size]   pos: index of the latest write
//!   actual_size: number of valid entries (<= max_size)
//!
//!   push(v)        => pos = (pos + 1) % max_size; slots[pos] = v
//!   i-th most recent (0 = latest) => slots[(pos + max_size - i) % max_size]
//! ```
//!
//! Once full, every push overrides the oldest entry.

use parking_lot::Mutex;

use crate::error::{Result, SubjectError};

/// Thread-safe override circular buffer.
///
/// All operations serialize on one mutex owned by the instance, so pushes and
/// reads may come from any thread.
///
/// ```rust
/// use histsubject::HistoryBuffer;
///
/// let history = HistoryBuffer::new(3).unwrap();
/// for v in ["A", "B", "C", "D"] {
///   history.push(v);
/// }
/// assert_eq!(history.last().unwrap(), "D");
/// assert_eq!(history.n_lasts(3).unwrap(), vec!["D", "C", "B"]);
/// ```
pub struct HistoryBuffer<Item> {
  inner: Mutex<Ring<Item>>,
}

struct Ring<Item> {
  slots: Vec<Option<Item>>,
  pos: usize,
  actual_size: usize,
}

impl<Item> Ring<Item> {
  fn max_size(&self) -> usize { self.slots.len() }

  fn nth_latest(&self, i: usize) -> Option<&Item> {
    if i >= self.actual_size {
      return None;
    }
    let max_size = self.max_size();
    self.slots[(self.pos + max_size - i) % max_size].as_ref()
  }
}

impl<Item> HistoryBuffer<Item> {
  /// Creates an empty buffer retaining at most `capacity` values.
  pub fn new(capacity: usize) -> Result<Self> {
    if capacity == 0 {
      return Err(SubjectError::ZeroCapacity { what: "history" });
    }
    let slots = (0..capacity).map(|_| None).collect();
    Ok(Self { inner: Mutex::new(Ring { slots, pos: 0, actual_size: 0 }) })
  }

  /// Stores `value`, overriding the oldest entry when the buffer is full.
  pub fn push(&self, value: Item) {
    let mut ring = self.inner.lock();
    let max_size = ring.max_size();
    ring.pos = (ring.pos + 1) % max_size;
    let pos = ring.pos;
    ring.slots[pos] = Some(value);
    ring.actual_size = (ring.actual_size + 1).min(max_size);
  }

  /// Number of valid entries, never above [`capacity`](Self::capacity).
  pub fn len(&self) -> usize { self.inner.lock().actual_size }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  pub fn capacity(&self) -> usize { self.inner.lock().max_size() }
}

impl<Item: Clone> HistoryBuffer<Item> {
  /// Returns the most recently pushed value.
  ///
  /// Fails with [`SubjectError::Empty`] when nothing was pushed yet.
  pub fn last(&self) -> Result<Item> {
    self
      .inner
      .lock()
      .nth_latest(0)
      .cloned()
      .ok_or(SubjectError::Empty)
  }

  /// Returns up to `n` values, most recent first.
  ///
  /// Fails with [`SubjectError::Empty`] when the buffer holds nothing. On a
  /// non-empty buffer `n == 0` yields an empty vector, so check the result
  /// rather than the length.
  pub fn n_lasts(&self, n: usize) -> Result<Vec<Item>> {
    let ring = self.inner.lock();
    if ring.actual_size == 0 {
      return Err(SubjectError::Empty);
    }
    let count = n.min(ring.actual_size);
    Ok(
      (0..count)
        .filter_map(|i| ring.nth_latest(i).cloned())
        .collect(),
    )
  }
}
