//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Observers
pub use crate::observer::{
  from_fn, same_observer, BoxedObserver, FnObserver, ListenerState, ListeningObserver, Observer,
};
// Subject
pub use crate::subject::{Subject, SubjectSubscription};
// Subscription
pub use crate::subscription::{Subscription, SubscriptionGuard};
pub use crate::{
  config::SubjectConfig,
  error::SubjectError,
  history::HistoryBuffer,
  scheduler::ProducerPool,
};
