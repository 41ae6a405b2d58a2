use std::collections::VecDeque;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::observer::{same_observer, BoxedObserver};

/// A producer whose execution waits for the first observer.
pub type LazyTask<Item> = Box<dyn FnOnce() -> Item + Send>;

/// Observer storage: inline for the common case of one or two observers.
pub type ObserverList<Item> = SmallVec<[BoxedObserver<Item>; 2]>;

/// Thread-safe set of subscribed observers.
///
/// # Design
///
/// - **Identity removal**: observers are matched by pointer identity, the
///   first match is removed. Duplicated handles are allowed.
/// - **Swap removal**: the removed slot is filled with the last observer and
///   the list truncated, so removal never shifts the tail. Storage order is
///   therefore not insertion order once a removal happened.
/// - **Lazy gate**: the deferred producers live under the same lock as the
///   observers. A producer is either queued while the set is empty or handed
///   back for immediate execution, never both.
pub struct ObserverRegistry<Item> {
  inner: Mutex<RegistryState<Item>>,
}

struct RegistryState<Item> {
  observers: ObserverList<Item>,
  lazy: VecDeque<LazyTask<Item>>,
}

impl<Item> Default for ObserverRegistry<Item> {
  fn default() -> Self {
    Self {
      inner: Mutex::new(RegistryState { observers: SmallVec::new(), lazy: VecDeque::new() }),
    }
  }
}

impl<Item> ObserverRegistry<Item> {
  pub fn new() -> Self { Self::default() }

  /// Registers `observer` and drains every queued lazy task.
  ///
  /// The returned tasks are in FIFO order; the caller is responsible for
  /// running them now that an observer exists.
  pub fn add(&self, observer: BoxedObserver<Item>) -> Vec<LazyTask<Item>> {
    let mut state = self.inner.lock();
    state.observers.push(observer);
    state.lazy.drain(..).collect()
  }

  /// Removes the first observer identical to `observer`.
  ///
  /// Returns `false`, leaving the registry untouched, when it is not a member.
  pub fn remove(&self, observer: &BoxedObserver<Item>) -> bool {
    let mut state = self.inner.lock();
    match state
      .observers
      .iter()
      .position(|o| same_observer(o, observer))
    {
      Some(idx) => {
        state.observers.swap_remove(idx);
        true
      }
      None => false,
    }
  }

  /// Whether `observer` is currently registered.
  pub fn contains(&self, observer: &BoxedObserver<Item>) -> bool {
    self
      .inner
      .lock()
      .observers
      .iter()
      .any(|o| same_observer(o, observer))
  }

  /// Calls `f` for every observer in storage order, holding the lock.
  ///
  /// `f` must not subscribe or unsubscribe on the same registry: the lock is
  /// not re-entrant and doing so deadlocks.
  pub fn for_each(&self, mut f: impl FnMut(&BoxedObserver<Item>)) {
    let state = self.inner.lock();
    for observer in state.observers.iter() {
      f(observer);
    }
  }

  /// Clones the current observer handles.
  ///
  /// Deliveries iterate this copy so observer callbacks run without the lock.
  pub fn snapshot(&self) -> ObserverList<Item> { self.inner.lock().observers.clone() }

  pub fn has_observer(&self) -> bool { !self.inner.lock().observers.is_empty() }

  pub fn len(&self) -> usize { self.inner.lock().observers.len() }

  pub fn is_empty(&self) -> bool { !self.has_observer() }

  /// Queues `task` while no observer exists, otherwise hands it back.
  pub fn defer_unless_observed(&self, task: LazyTask<Item>) -> Option<LazyTask<Item>> {
    let mut state = self.inner.lock();
    if state.observers.is_empty() {
      state.lazy.push_back(task);
      None
    } else {
      Some(task)
    }
  }

  /// Number of lazy tasks waiting for an observer.
  pub fn pending_tasks(&self) -> usize { self.inner.lock().lazy.len() }
}
