//! Observer trait and implementations
//!
//! An observer is the consumer side of a [`Subject`](crate::subject::Subject).
//! The relay hands every published value to `next` of each registered
//! observer that reports itself as listening.

use std::{
  any::Any,
  panic::{catch_unwind, AssertUnwindSafe},
  sync::Arc,
};

mod listening;
pub use listening::{ListenerState, ListeningObserver};

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: receives the values published on a subject.
///
/// Observers are shared between the registry and the relay thread, so `next`
/// takes `&self`. Implementations needing mutable state use interior
/// mutability.
pub trait Observer<Item> {
  /// Receive the next value.
  fn next(&self, value: Item);

  /// Whether this observer currently accepts values.
  ///
  /// The relay skips observers returning `false` without error. Plain
  /// callbacks always listen.
  fn is_listening(&self) -> bool { true }
}

/// Shared, type-erased observer as stored by the registry.
///
/// Two handles denote the same observer when they point to the same
/// allocation.
pub type BoxedObserver<Item> = Arc<dyn Observer<Item> + Send + Sync>;

/// Identity comparison of two boxed observers by data address.
#[inline]
pub fn same_observer<Item>(a: &BoxedObserver<Item>, b: &BoxedObserver<Item>) -> bool {
  std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

// ============================================================================
// FnObserver - Closure adapter
// ============================================================================

/// Adapter turning a plain callback into an [`Observer`].
#[derive(Clone)]
pub struct FnObserver<F>(pub F);

impl<F, Item> Observer<Item> for FnObserver<F>
where
  F: Fn(Item),
{
  #[inline]
  fn next(&self, value: Item) { (self.0)(value) }
}

/// Wraps `f` into a [`BoxedObserver`] ready to be subscribed.
pub fn from_fn<Item, F>(f: F) -> BoxedObserver<Item>
where
  F: Fn(Item) + Send + Sync + 'static,
{
  Arc::new(FnObserver(f))
}

// ============================================================================
// Panic isolation
// ============================================================================

/// Runs one delivery, containing a panic so the calling thread survives.
///
/// Returns `false` when `f` panicked; the panic is logged under `origin`.
pub(crate) fn isolate(origin: &'static str, f: impl FnOnce()) -> bool {
  match catch_unwind(AssertUnwindSafe(f)) {
    Ok(()) => true,
    Err(payload) => {
      tracing::error!(origin, panic = %panic_message(payload.as_ref()), "callback panicked");
      false
    }
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
  if let Some(msg) = payload.downcast_ref::<&'static str>() {
    msg
  } else if let Some(msg) = payload.downcast_ref::<String>() {
    msg.as_str()
  } else {
    "<non-string panic payload>"
  }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  struct Collect {
    values: Mutex<Vec<i32>>,
  }

  impl Observer<i32> for Collect {
    fn next(&self, value: i32) { self.values.lock().unwrap().push(value); }
  }

  #[test]
  fn observer_trait() {
    let obs = Collect { values: Mutex::new(vec![]) };
    obs.next(1);
    obs.next(2);
    assert_eq!(*obs.values.lock().unwrap(), vec![1, 2]);
    assert!(obs.is_listening());
  }

  #[test]
  fn closure_as_observer() {
    let sum = Arc::new(Mutex::new(0));
    let c_sum = sum.clone();
    let obs = from_fn(move |v: i32| *c_sum.lock().unwrap() += v);
    obs.next(10);
    obs.next(20);
    assert_eq!(*sum.lock().unwrap(), 30);
  }

  #[test]
  fn boxed_identity_is_pointer_identity() {
    let a = from_fn(|_: i32| {});
    let b = from_fn(|_: i32| {});
    let a2 = a.clone();
    assert!(same_observer(&a, &a2));
    assert!(!same_observer(&a, &b));
  }

  #[test]
  fn isolate_contains_panics() {
    assert!(isolate("test", || {}));
    assert!(!isolate("test", || panic!("boom")));
    assert!(!isolate("test", || panic!("{}", String::from("formatted"))));
  }
}
