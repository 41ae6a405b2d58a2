//! Integration tests for histsubject
//!
//! Tests subscribe/publish flows, deferred producers and listening observers
//! across threads.

use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc, Arc, Barrier, Mutex,
  },
  thread,
  time::Duration,
};

use histsubject::prelude::*;

const WAIT: Duration = Duration::from_secs(5);

fn channel_observer<T: Send + 'static>() -> (BoxedObserver<T>, mpsc::Receiver<T>) {
  let (tx, rx) = mpsc::channel();
  let tx = Mutex::new(tx);
  (from_fn(move |v| tx.lock().unwrap().send(v).unwrap()), rx)
}

#[test]
fn test_values_arrive_in_publish_order() {
  let subject = Subject::new(10).unwrap();
  let (observer, rx) = channel_observer();
  subject.subscribe_boxed(observer);

  subject.publish("x".to_owned());
  subject.publish("y".to_owned());

  assert_eq!(rx.recv_timeout(WAIT).unwrap(), "x");
  assert_eq!(rx.recv_timeout(WAIT).unwrap(), "y");
}

#[test]
fn test_history_keeps_latest_values() {
  let subject = Subject::new(3).unwrap();
  for v in ["A", "B", "C", "D"] {
    subject.publish(v);
  }
  assert_eq!(subject.last().unwrap(), "D");
  assert_eq!(subject.n_lasts(3).unwrap(), vec!["D", "C", "B"]);
  assert_eq!(subject.n_lasts(10).unwrap(), vec!["D", "C", "B"]);
  assert_eq!(subject.history().len(), 3);
}

#[test]
fn test_slow_producer_waits_for_first_subscriber() {
  let subject = Subject::new(5).unwrap();
  let started = Arc::new(AtomicUsize::new(0));
  let c_started = started.clone();
  subject.publish_async(move || {
    c_started.fetch_add(1, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(100));
    "slow".to_owned()
  });

  thread::sleep(Duration::from_millis(150));
  assert_eq!(started.load(Ordering::SeqCst), 0);
  assert!(matches!(subject.last(), Err(SubjectError::Empty)));

  let (observer, rx) = channel_observer();
  subject.subscribe_boxed(observer);
  assert_eq!(rx.recv_timeout(WAIT).unwrap(), "slow");
  assert_eq!(started.load(Ordering::SeqCst), 1);
}

#[test]
fn test_deferred_producers_run_exactly_once() {
  let subject = Subject::new(5).unwrap();
  let runs = Arc::new(AtomicUsize::new(0));
  for v in 0..4 {
    let c_runs = runs.clone();
    subject.publish_async(move || {
      c_runs.fetch_add(1, Ordering::SeqCst);
      v
    });
  }

  let (first, first_rx) = channel_observer();
  let (second, _second_rx) = channel_observer();
  subject.subscribe_all(vec![first, second]);

  let mut got: Vec<i32> = (0..4).map(|_| first_rx.recv_timeout(WAIT).unwrap()).collect();
  got.sort();
  assert_eq!(got, vec![0, 1, 2, 3]);
  assert!(first_rx.recv_timeout(Duration::from_millis(100)).is_err());
  assert_eq!(runs.load(Ordering::SeqCst), 4);
  assert_eq!(subject.pending_tasks(), 0);
}

#[test]
fn test_producers_racing_first_subscribe_run_once() {
  let subject = Subject::new(8).unwrap();
  let runs = Arc::new(AtomicUsize::new(0));
  let barrier = Arc::new(Barrier::new(5));
  let handles: Vec<_> = (0..4)
    .map(|publisher| {
      let subject = subject.clone();
      let runs = runs.clone();
      let barrier = barrier.clone();
      thread::spawn(move || {
        barrier.wait();
        for seq in 0..50 {
          let runs = runs.clone();
          subject.publish_async(move || {
            runs.fetch_add(1, Ordering::SeqCst);
            publisher * 100 + seq
          });
        }
      })
    })
    .collect();

  let (observer, rx) = channel_observer();
  barrier.wait();
  subject.subscribe_boxed(observer);
  for handle in handles {
    handle.join().unwrap();
  }

  let mut got: Vec<usize> = (0..200).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
  got.sort();
  let expected: Vec<usize> = (0..4)
    .flat_map(|publisher| (0..50).map(move |seq| publisher * 100 + seq))
    .collect();
  assert_eq!(got, expected);
  assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
  assert_eq!(runs.load(Ordering::SeqCst), 200);
  assert_eq!(subject.pending_tasks(), 0);
}

#[test]
fn test_subscribe_then_unsubscribe_many() {
  let subject = Subject::<u64>::new(2).unwrap();
  let subscriptions: Vec<_> = (0..50).map(|_| subject.subscribe(|_| {})).collect();
  assert_eq!(subject.subscriber_count(), 50);
  for subscription in subscriptions {
    subscription.unsubscribe();
  }
  assert!(!subject.has_observer());
}

#[test]
fn test_concurrent_subscribe_and_unsubscribe() {
  let subject = Subject::<u64>::new(2).unwrap();
  let handles: Vec<_> = (0..8)
    .map(|_| {
      let subject = subject.clone();
      thread::spawn(move || {
        for _ in 0..100 {
          subject.subscribe(|_| {}).unsubscribe();
        }
      })
    })
    .collect();
  for v in 0..200 {
    subject.publish(v);
  }
  for handle in handles {
    handle.join().unwrap();
  }
  assert_eq!(subject.subscriber_count(), 0);
}

#[test]
fn test_unsubscribed_observer_receives_nothing() {
  let subject = Subject::new(4).unwrap();
  let (kept, kept_rx) = channel_observer();
  let (removed, removed_rx) = channel_observer();
  subject.subscribe_boxed(kept);
  subject.subscribe_boxed(removed.clone());
  assert!(subject.unsubscribe(&removed));

  subject.publish(1);
  assert_eq!(kept_rx.recv_timeout(WAIT).unwrap(), 1);
  subject.close();
  assert!(removed_rx.try_recv().is_err());
}

#[test]
fn test_concurrent_publishers_keep_per_publisher_order() {
  let subject = Subject::new(16).unwrap();
  let received = Arc::new(Mutex::new(vec![]));
  let c_received = received.clone();
  subject.subscribe(move |v: (usize, usize)| c_received.lock().unwrap().push(v));

  let handles: Vec<_> = (0..4)
    .map(|publisher| {
      let subject = subject.clone();
      thread::spawn(move || {
        for seq in 0..250 {
          subject.publish((publisher, seq));
        }
      })
    })
    .collect();
  for handle in handles {
    handle.join().unwrap();
  }
  subject.close();

  let received = received.lock().unwrap();
  assert_eq!(received.len(), 1000);
  for publisher in 0..4 {
    let seqs: Vec<_> = received
      .iter()
      .filter(|(p, _)| *p == publisher)
      .map(|(_, seq)| *seq)
      .collect();
    assert_eq!(seqs, (0..250).collect::<Vec<_>>());
  }
}

#[test]
fn test_listening_observer_lifecycle() {
  let subject = Subject::new(4).unwrap();
  let (tx, rx) = mpsc::channel();
  let tx = Mutex::new(tx);
  let listener = Arc::new(ListeningObserver::new(move |v: i32| {
    tx.lock().unwrap().send(v).unwrap();
  }));
  let _subscription = subject.subscribe_with(listener.clone());
  let (probe, probe_rx) = channel_observer();
  subject.subscribe_boxed(probe);

  // Not listening yet: the value is skipped.
  subject.publish(1);
  assert_eq!(probe_rx.recv_timeout(WAIT).unwrap(), 1);
  listener.listen().unwrap();
  assert_eq!(listener.state(), ListenerState::Listening);
  subject.publish(2);
  assert_eq!(rx.recv_timeout(WAIT).unwrap(), 2);

  listener.stop_listening();
  assert_eq!(listener.state(), ListenerState::Idle);
  subject.publish(3);
  subject.close();
  assert!(rx.try_recv().is_err());
  assert_eq!(subject.n_lasts(3).unwrap(), vec![3, 2, 1]);
}

#[test]
fn test_panicking_observer_does_not_stop_others() {
  let subject = Subject::new(4).unwrap();
  subject.subscribe(|v: i32| {
    if v == 1 {
      panic!("observer failed");
    }
  });
  let (observer, rx) = channel_observer();
  subject.subscribe_boxed(observer);

  subject.publish(1);
  subject.publish(2);
  assert_eq!(rx.recv_timeout(WAIT).unwrap(), 1);
  assert_eq!(rx.recv_timeout(WAIT).unwrap(), 2);
}

#[test]
fn test_subscribe_from_callback() {
  let subject = Subject::new(4).unwrap();
  let (late, late_rx) = channel_observer();
  let late = Mutex::new(Some(late));
  let c_subject = subject.clone();
  subject.subscribe(move |_: i32| {
    if let Some(observer) = late.lock().unwrap().take() {
      c_subject.subscribe_boxed(observer);
    }
  });

  subject.publish(1);
  subject.publish(2);
  subject.close();
  assert_eq!(late_rx.try_iter().collect::<Vec<_>>(), vec![2]);
}
