//! Subscription handles returned by `subscribe`.

/// Handle allowing an observer to be detached before the subject goes away.
pub trait Subscription {
  /// Removes the observer from its subject. Deliveries already in flight are
  /// not cancelled.
  fn unsubscribe(self);

  fn is_closed(&self) -> bool;
}

/// An RAII implementation of a "scoped subscription".
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard<T: Subscription>(Option<T>);

impl<T: Subscription> SubscriptionGuard<T> {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(Some(subscription)) }

  /// Releases the subscription without unsubscribing it.
  pub fn into_inner(mut self) -> Option<T> { self.0.take() }
}

impl<T: Subscription> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) {
    if let Some(subscription) = self.0.take() {
      subscription.unsubscribe();
    }
  }
}
