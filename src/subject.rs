//! The publish point: history, observer registry and relay behind one handle.

use std::sync::Arc;

mod registry;
mod relay;
mod subject_subscription;

pub use registry::{LazyTask, ObserverList, ObserverRegistry};
pub use relay::Relay;
pub use subject_subscription::SubjectSubscription;

use crate::{
  config::SubjectConfig,
  error::Result,
  history::HistoryBuffer,
  observer::{from_fn, BoxedObserver, Observer},
  scheduler::ProducerPool,
};

/// Subject: multicasts published values to every subscribed observer.
///
/// A `Subject` owns a [`HistoryBuffer`] with the latest values, an
/// [`ObserverRegistry`] and a [`Relay`] thread delivering values. Handles
/// are cheap to clone and all clones drive the same subject.
///
/// # Delivery
///
/// [`publish`](Self::publish) enqueues the value for the relay and records
/// it in the history once accepted; it returns once the value is queued. Each observer sees
/// values in the order they were queued. There is no ordering between two
/// different observers.
///
/// # Lazy producers
///
/// [`publish_async`](Self::publish_async) runs a producer on a worker thread
/// and publishes its result. While nobody is subscribed the producer is kept
/// aside instead, and every kept producer starts as soon as the first
/// observer subscribes.
///
/// # Re-entrancy
///
/// Callbacks run on the relay thread. Subscribing, unsubscribing and
/// publishing from a callback are allowed, but publishing into a full queue
/// from there waits on the relay itself and never returns.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
///
/// use histsubject::prelude::*;
///
/// let subject = Subject::new(10).unwrap();
/// let received = Arc::new(Mutex::new(vec![]));
/// let c_received = received.clone();
///
/// subject.subscribe(move |v: &'static str| c_received.lock().unwrap().push(v));
/// subject.publish("x");
/// subject.publish("y");
///
/// // Waits until the relay delivered everything queued so far.
/// subject.close();
/// assert_eq!(*received.lock().unwrap(), vec!["x", "y"]);
/// assert_eq!(subject.n_lasts(2).unwrap(), vec!["y", "x"]);
/// ```
pub struct Subject<Item> {
  inner: Arc<Inner<Item>>,
}

struct Inner<Item> {
  history: HistoryBuffer<Item>,
  registry: Arc<ObserverRegistry<Item>>,
  relay: Relay<Item>,
  pool: ProducerPool,
}

impl<Item> Clone for Subject<Item> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

// ============================================================================
// Construction
// ============================================================================

impl<Item: Clone + Send + 'static> Subject<Item> {
  /// Creates a subject retaining the last `capacity` values, with default
  /// settings otherwise.
  pub fn new(capacity: usize) -> Result<Self> {
    Self::with_config(SubjectConfig::default().history_capacity(capacity))
  }

  /// Creates a subject and starts its relay thread.
  pub fn with_config(config: SubjectConfig) -> Result<Self> {
    let history = HistoryBuffer::new(config.history_capacity)?;
    let pool = match config.pool_size {
      Some(size) => ProducerPool::with_size(size)?,
      None => ProducerPool::shared()?,
    };
    let registry = Arc::new(ObserverRegistry::new());
    let relay = Relay::spawn(registry.clone(), config.relay_capacity, &config.relay_thread_name)?;
    tracing::debug!(
      history = config.history_capacity,
      relay = config.relay_capacity,
      "subject created"
    );
    Ok(Self { inner: Arc::new(Inner { history, registry, relay, pool }) })
  }

  /// Creates a subject whose first value comes from `producer`.
  ///
  /// The producer only runs once something subscribes.
  pub fn of<F>(capacity: usize, producer: F) -> Result<Self>
  where
    F: FnOnce() -> Item + Send + 'static,
  {
    let subject = Self::new(capacity)?;
    subject.publish_async(producer);
    Ok(subject)
  }

  // ==========================================================================
  // Publishing
  // ==========================================================================

  /// Queues `value` for delivery, then records it in the history.
  ///
  /// Blocks while the relay queue is full. After [`close`](Self::close), or
  /// when the subject closes while this call waits on a full queue, the value
  /// is dropped with a warning and the history is left untouched.
  ///
  /// A fast observer may receive the value before it shows up in the history.
  pub fn publish(&self, value: Item) {
    let inner = &self.inner;
    tracing::trace!("publishing value");
    if inner.relay.publish(value.clone()) {
      inner.history.push(value);
    }
  }

  /// Publishes the result of `producer`, computed on a worker thread.
  ///
  /// Without any observer the producer is deferred and does not run until
  /// the next [`subscribe`](Self::subscribe).
  pub fn publish_async<F>(&self, producer: F) -> &Self
  where
    F: FnOnce() -> Item + Send + 'static,
  {
    self.submit(Box::new(producer));
    self
  }

  fn submit(&self, task: LazyTask<Item>) {
    let Some(task) = self.inner.registry.defer_unless_observed(task) else {
      tracing::debug!(pending = self.pending_tasks(), "no observer, producer deferred");
      return;
    };
    let subject = self.clone();
    self.inner.pool.spawn(move || {
      let value = task();
      subject.publish(value);
    });
  }

  // ==========================================================================
  // Subscribing
  // ==========================================================================

  /// Subscribes a callback invoked for every published value.
  pub fn subscribe<F>(&self, callback: F) -> SubjectSubscription<Item>
  where
    F: Fn(Item) + Send + Sync + 'static,
  {
    self.subscribe_boxed(from_fn(callback))
  }

  /// Subscribes a typed observer, keeping the caller's handle usable.
  pub fn subscribe_with<O>(&self, observer: Arc<O>) -> SubjectSubscription<Item>
  where
    O: Observer<Item> + Send + Sync + 'static,
  {
    self.subscribe_boxed(observer)
  }

  /// Subscribes every observer of `observers`, in order.
  pub fn subscribe_all<I>(&self, observers: I) -> Vec<SubjectSubscription<Item>>
  where
    I: IntoIterator<Item = BoxedObserver<Item>>,
  {
    observers
      .into_iter()
      .map(|observer| self.subscribe_boxed(observer))
      .collect()
  }

  /// Registers `observer`, then starts any deferred producers.
  pub fn subscribe_boxed(&self, observer: BoxedObserver<Item>) -> SubjectSubscription<Item> {
    let registry = &self.inner.registry;
    let deferred = registry.add(observer.clone());
    tracing::debug!(observers = registry.len(), deferred = deferred.len(), "observer subscribed");
    for task in deferred {
      self.submit(task);
    }
    SubjectSubscription::new(Arc::downgrade(registry), observer)
  }
}

impl<Item> Subject<Item> {
  /// Removes `observer`; returns `false` when it was not subscribed.
  pub fn unsubscribe(&self, observer: &BoxedObserver<Item>) -> bool {
    let removed = self.inner.registry.remove(observer);
    if removed {
      tracing::debug!("observer unsubscribed");
    }
    removed
  }

  // ==========================================================================
  // Inspection
  // ==========================================================================

  /// The history of published values.
  pub fn history(&self) -> &HistoryBuffer<Item> { &self.inner.history }

  pub fn has_observer(&self) -> bool { self.inner.registry.has_observer() }

  pub fn subscriber_count(&self) -> usize { self.inner.registry.len() }

  /// Producers waiting for a first observer.
  pub fn pending_tasks(&self) -> usize { self.inner.registry.pending_tasks() }

  /// Values queued for the relay and not yet delivered.
  pub fn queued(&self) -> usize { self.inner.relay.queued() }

  /// Stops the relay once every queued value is delivered.
  ///
  /// Blocks until then, except when called from an observer callback.
  /// Publishing afterwards drops the value.
  pub fn close(&self) {
    self.inner.relay.close();
    tracing::debug!("subject closed");
  }

  pub fn is_closed(&self) -> bool { self.inner.relay.is_closed() }
}

impl<Item: Clone> Subject<Item> {
  /// The most recently published value, see [`HistoryBuffer::last`].
  pub fn last(&self) -> Result<Item> { self.inner.history.last() }

  /// Up to `n` latest values, most recent first, see
  /// [`HistoryBuffer::n_lasts`].
  pub fn n_lasts(&self, n: usize) -> Result<Vec<Item>> { self.inner.history.n_lasts(n) }
}

// ============================================================================
// Tests
// ============================================================================
