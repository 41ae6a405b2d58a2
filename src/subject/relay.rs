use std::{
  sync::Arc,
  thread::{self, JoinHandle, ThreadId},
};

use async_channel::{Receiver, Sender};
use parking_lot::Mutex;

use super::registry::ObserverRegistry;
use crate::{
  error::{Result, SubjectError},
  observer::{isolate, Observer},
};

/// Buffered relay decoupling `publish` from delivery.
///
/// Published values go through one bounded queue drained by a dedicated
/// thread. For every value the thread snapshots the registry and hands the
/// value to each observer that is listening, in storage order.
///
/// ```text
///   publish(v) ──► [bounded queue] ──► relay thread ──► snapshot ──► o1.next(v)
///                   (blocks when full)                          ├──► o2.next(v)
///                                                               └──► oN.next(v)
/// ```
///
/// # Guarantees
///
/// - Per-observer FIFO: one thread delivers in queue order.
/// - Back-pressure: a full queue blocks the publisher, nothing is dropped.
/// - Isolation: a panicking observer is logged and skipped.
pub struct Relay<Item> {
  sender: Sender<Item>,
  relay_thread: ThreadId,
  worker: Mutex<Option<JoinHandle<()>>>,
}

impl<Item: Clone + Send + 'static> Relay<Item> {
  /// Starts the relay thread draining a queue of `capacity` values.
  pub fn spawn(
    registry: Arc<ObserverRegistry<Item>>, capacity: usize, thread_name: &str,
  ) -> Result<Self> {
    if capacity == 0 {
      return Err(SubjectError::ZeroCapacity { what: "relay" });
    }
    let (sender, receiver) = async_channel::bounded(capacity);
    let worker = thread::Builder::new()
      .name(thread_name.to_owned())
      .spawn(move || relay_loop(receiver, registry))?;
    Ok(Self { sender, relay_thread: worker.thread().id(), worker: Mutex::new(Some(worker)) })
  }
}

impl<Item> Relay<Item> {
  /// Enqueues `value`, blocking while the queue is full.
  ///
  /// Returns `false` when the relay was closed and the value dropped.
  pub fn publish(&self, value: Item) -> bool {
    if self.sender.send_blocking(value).is_err() {
      tracing::warn!("relay closed, published value dropped");
      return false;
    }
    true
  }

  /// Values accepted but not yet delivered.
  pub fn queued(&self) -> usize { self.sender.len() }

  pub fn capacity(&self) -> Option<usize> { self.sender.capacity() }

  pub fn is_closed(&self) -> bool { self.sender.is_closed() }

  /// Stops accepting values and waits until the relay delivered the ones
  /// already queued.
  ///
  /// Called from the relay thread itself (inside an observer callback) the
  /// queue is closed but the wait is skipped.
  pub fn close(&self) {
    if self.sender.close() {
      tracing::debug!("relay closing");
    }
    if thread::current().id() == self.relay_thread {
      return;
    }
    if let Some(worker) = self.worker.lock().take() {
      if worker.join().is_err() {
        tracing::error!("relay thread terminated abnormally");
      }
    }
  }
}

fn relay_loop<Item: Clone>(receiver: Receiver<Item>, registry: Arc<ObserverRegistry<Item>>) {
  while let Ok(value) = receiver.recv_blocking() {
    deliver(&registry, value);
  }
  tracing::debug!("relay stopped");
}

/// Hands `value` to every listening observer, cloning for all but the last.
fn deliver<Item: Clone>(registry: &ObserverRegistry<Item>, value: Item) {
  let observers = registry.snapshot();
  let mut listening = observers
    .iter()
    .filter(|observer| observer.is_listening())
    .peekable();
  tracing::trace!(observers = observers.len(), "relaying value");
  while let Some(observer) = listening.next() {
    if listening.peek().is_some() {
      let value = value.clone();
      isolate("relay", || observer.next(value));
    } else {
      isolate("relay", || observer.next(value));
      break;
    }
  }
}
