use std::{
  sync::{
    atomic::{AtomicBool, AtomicU8, Ordering},
    Arc,
  },
  thread::{self, JoinHandle, ThreadId},
};

use async_channel::{Receiver, Sender};
use futures::{channel::oneshot, executor::block_on, FutureExt};
use parking_lot::Mutex;

use super::{isolate, Observer};
use crate::error::{Result, SubjectError};

/// Lifecycle of a [`ListeningObserver`].
///
/// ```text
///   Idle --listen()--> Starting --loop ready--> Listening
///    ^                                              |
///    +------ loop acknowledged <-- Stopping <-------+ stop_listening()
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum ListenerState {
  Idle = 0,
  Starting = 1,
  Listening = 2,
  Stopping = 3,
}

impl ListenerState {
  fn from_u8(raw: u8) -> Self {
    match raw {
      1 => ListenerState::Starting,
      2 => ListenerState::Listening,
      3 => ListenerState::Stopping,
      _ => ListenerState::Idle,
    }
  }
}

/// Stop request: the loop acknowledges through the enclosed sender.
type StopRequest = oneshot::Sender<()>;

/// An observer with its own bounded inbox and background loop.
///
/// Values handed to [`next`](Observer::next) are queued and consumed by a
/// dedicated thread running the callback, so a slow callback only delays its
/// own inbox. The loop exists only between [`listen`](Self::listen) and
/// [`stop_listening`](Self::stop_listening); while idle the observer reports
/// `is_listening() == false` and the relay skips it.
///
/// A full inbox blocks the sender until the loop catches up.
///
/// ```rust
/// use std::sync::{mpsc, Arc};
///
/// use histsubject::prelude::*;
///
/// let (tx, rx) = mpsc::channel();
/// let tx = std::sync::Mutex::new(tx);
/// let listener = Arc::new(ListeningObserver::new(move |v: i32| {
///   tx.lock().unwrap().send(v).unwrap();
/// }));
/// listener.listen().unwrap();
///
/// let subject = Subject::new(4).unwrap();
/// let _sub = subject.subscribe_with(listener.clone());
/// subject.publish(7);
/// assert_eq!(rx.recv().unwrap(), 7);
///
/// listener.stop_listening();
/// assert!(!listener.is_listening());
/// ```
pub struct ListeningObserver<Item> {
  shared: Arc<Shared<Item>>,
}

struct Shared<Item> {
  state: AtomicU8,
  stop_inline: AtomicBool,
  inbox_tx: Sender<Item>,
  inbox_rx: Receiver<Item>,
  stop_tx: Sender<StopRequest>,
  stop_rx: Receiver<StopRequest>,
  callback: Box<dyn Fn(Item) + Send + Sync>,
  loop_thread: Mutex<Option<ThreadId>>,
  worker: Mutex<Option<JoinHandle<()>>>,
}

enum Event<Item> {
  Stop(Option<StopRequest>),
  Value(Option<Item>),
}

impl<Item: Send + 'static> ListeningObserver<Item> {
  /// Inbox size used by [`new`](Self::new).
  pub const DEFAULT_INBOX_CAPACITY: usize = 10;

  pub fn new<F>(callback: F) -> Self
  where
    F: Fn(Item) + Send + Sync + 'static,
  {
    let (inbox_tx, inbox_rx) = async_channel::bounded(Self::DEFAULT_INBOX_CAPACITY);
    Self::from_parts(Box::new(callback), inbox_tx, inbox_rx)
  }

  /// Builds an observer whose inbox holds at most `capacity` values.
  pub fn with_capacity<F>(callback: F, capacity: usize) -> Result<Self>
  where
    F: Fn(Item) + Send + Sync + 'static,
  {
    if capacity == 0 {
      return Err(SubjectError::ZeroCapacity { what: "listener inbox" });
    }
    let (inbox_tx, inbox_rx) = async_channel::bounded(capacity);
    Ok(Self::from_parts(Box::new(callback), inbox_tx, inbox_rx))
  }

  fn from_parts(
    callback: Box<dyn Fn(Item) + Send + Sync>, inbox_tx: Sender<Item>, inbox_rx: Receiver<Item>,
  ) -> Self {
    let (stop_tx, stop_rx) = async_channel::bounded(1);
    let shared = Shared {
      state: AtomicU8::new(ListenerState::Idle as u8),
      stop_inline: AtomicBool::new(false),
      inbox_tx,
      inbox_rx,
      stop_tx,
      stop_rx,
      callback,
      loop_thread: Mutex::new(None),
      worker: Mutex::new(None),
    };
    Self { shared: Arc::new(shared) }
  }

  /// Starts the background loop and blocks until it is ready.
  ///
  /// Values left in the inbox by a previous run are discarded first. Calling
  /// this while the observer is not idle does nothing.
  pub fn listen(&self) -> Result<()> {
    if !self
      .shared
      .transition(ListenerState::Idle, ListenerState::Starting)
    {
      return Ok(());
    }
    self.shared.stop_inline.store(false, Ordering::Release);

    let (ready_tx, ready_rx) = oneshot::channel();
    let shared = self.shared.clone();
    let spawned = thread::Builder::new()
      .name("subject-listener".into())
      .spawn(move || shared.run(ready_tx));
    match spawned {
      Ok(handle) => *self.shared.worker.lock() = Some(handle),
      Err(err) => {
        self.shared.set_state(ListenerState::Idle);
        return Err(err.into());
      }
    }

    // The loop signals only after draining stale values. Listening is
    // published after the handle is stored so a stopper always finds it.
    let _ = block_on(ready_rx);
    self.shared.set_state(ListenerState::Listening);
    tracing::debug!("listener started");
    Ok(())
  }
}

impl<Item> ListeningObserver<Item> {
  /// Stops the background loop and waits for its acknowledgment.
  ///
  /// A no-op unless the observer is listening. Called from inside the
  /// observer's own callback it only requests the stop; the loop exits once
  /// the callback returns.
  pub fn stop_listening(&self) {
    let shared = &self.shared;
    if shared.on_loop_thread() {
      if shared.transition(ListenerState::Listening, ListenerState::Stopping) {
        shared.stop_inline.store(true, Ordering::Release);
      }
      return;
    }
    if !shared.transition(ListenerState::Listening, ListenerState::Stopping) {
      return;
    }

    // Must be taken before the loop reports Idle and a new `listen` stores
    // its own handle.
    let worker = shared.worker.lock().take();
    let (ack_tx, ack_rx) = oneshot::channel();
    if shared.stop_tx.send_blocking(ack_tx).is_ok() {
      let _ = block_on(ack_rx);
    }
    if let Some(worker) = worker {
      if worker.join().is_err() {
        tracing::error!("listener thread terminated abnormally");
      }
    }
    tracing::debug!("listener stopped");
  }

  /// Current position in the listener lifecycle.
  pub fn state(&self) -> ListenerState { self.shared.state() }

  /// Number of values waiting in the inbox.
  pub fn pending(&self) -> usize { self.shared.inbox_rx.len() }
}

impl<Item> Shared<Item> {
  fn state(&self) -> ListenerState { ListenerState::from_u8(self.state.load(Ordering::Acquire)) }

  fn set_state(&self, state: ListenerState) { self.state.store(state as u8, Ordering::Release); }

  fn transition(&self, from: ListenerState, to: ListenerState) -> bool {
    self
      .state
      .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
  }

  fn on_loop_thread(&self) -> bool { *self.loop_thread.lock() == Some(thread::current().id()) }

  fn drain_inbox(&self) {
    while self.inbox_rx.try_recv().is_ok() {}
  }

  fn run(self: Arc<Self>, ready: oneshot::Sender<()>) {
    *self.loop_thread.lock() = Some(thread::current().id());
    self.drain_inbox();
    let _ = ready.send(());

    let ack = block_on(self.listen_loop());

    // Releases a relay blocked on a full inbox.
    self.drain_inbox();
    *self.loop_thread.lock() = None;
    if ack.is_none() {
      // Stopped from its own callback: nobody joins this thread.
      drop(self.worker.lock().take());
    }
    self.set_state(ListenerState::Idle);
    if let Some(ack) = ack {
      let _ = ack.send(());
    }
  }

  async fn listen_loop(&self) -> Option<StopRequest> {
    loop {
      let event = {
        let stop = self.stop_rx.recv().fuse();
        let value = self.inbox_rx.recv().fuse();
        futures::pin_mut!(stop, value);
        futures::select_biased! {
          req = stop => Event::Stop(req.ok()),
          value = value => Event::Value(value.ok()),
        }
      };
      match event {
        Event::Stop(ack) => return ack,
        Event::Value(Some(value)) => {
          isolate("listener", || (self.callback)(value));
          if self.stop_inline.load(Ordering::Acquire) {
            return None;
          }
        }
        Event::Value(None) => return None,
      }
    }
  }
}

impl<Item> Observer<Item> for ListeningObserver<Item> {
  fn next(&self, value: Item) {
    if self.shared.state() != ListenerState::Listening {
      return;
    }
    if self.shared.inbox_tx.send_blocking(value).is_err() {
      tracing::warn!("listener inbox closed, value dropped");
    }
  }

  fn is_listening(&self) -> bool { self.shared.state() == ListenerState::Listening }
}

impl<Item> Drop for ListeningObserver<Item> {
  // Without a stop the loop thread would keep the shared state alive.
  fn drop(&mut self) { self.stop_listening(); }
}
