use std::sync::Weak;

use super::registry::ObserverRegistry;
use crate::{
  observer::BoxedObserver,
  subscription::{Subscription, SubscriptionGuard},
};

/// Subscription handle for a Subject.
///
/// Holds the subscribed observer and a weak pointer to the subject's
/// registry, so an outstanding handle does not keep the subject alive.
/// [`unsubscribe`](Subscription::unsubscribe) removes exactly this observer.
pub struct SubjectSubscription<Item> {
  registry: Weak<ObserverRegistry<Item>>,
  observer: BoxedObserver<Item>,
}

impl<Item> SubjectSubscription<Item> {
  pub(crate) fn new(registry: Weak<ObserverRegistry<Item>>, observer: BoxedObserver<Item>) -> Self {
    Self { registry, observer }
  }

  /// The observer registered by this subscription.
  pub fn observer(&self) -> &BoxedObserver<Item> { &self.observer }

  /// Unsubscribes automatically when the returned guard is dropped.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately.
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard<Self> { SubscriptionGuard::new(self) }
}

impl<Item> Subscription for SubjectSubscription<Item> {
  fn unsubscribe(self) {
    if let Some(registry) = self.registry.upgrade() {
      if registry.remove(&self.observer) {
        tracing::debug!("observer unsubscribed");
      }
    }
  }

  fn is_closed(&self) -> bool {
    self
      .registry
      .upgrade()
      .map_or(true, |registry| !registry.contains(&self.observer))
  }
}
