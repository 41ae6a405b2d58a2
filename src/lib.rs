//! # histsubject: multicast subjects with history
//!
//! A [`Subject`] hands every published value to all of its subscribed
//! observers and remembers the most recent values in a fixed-size
//! [`HistoryBuffer`].
//!
//! ## Quick Start
//!
//! ```rust
//! use histsubject::prelude::*;
//!
//! let subject = Subject::new(10).unwrap();
//! subject.subscribe(|v: i32| println!("Value: {}", v));
//! for v in 0..5 {
//!   subject.publish(v);
//! }
//! subject.close();
//! assert_eq!(subject.n_lasts(2).unwrap(), vec![4, 3]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Subject`] | Publish point: history, registry and relay thread |
//! | [`HistoryBuffer`] | Fixed capacity ring of the latest values |
//! | [`Observer`] | Consumes published values through `next` |
//! | [`ListeningObserver`] | Observer with its own thread and listen/stop control |
//! | [`Subscription`] | Handle to detach an observer |
//!
//! ## Logging
//!
//! The crate reports through [`tracing`]: subscription changes at `debug`,
//! every relayed value at `trace`, dropped values at `warn` and panicking
//! callbacks at `error`. Install any subscriber to see them.
//!
//! [`Observer`]: observer::Observer
//! [`ListeningObserver`]: observer::ListeningObserver
//! [`Subscription`]: subscription::Subscription

pub mod config;
pub mod error;
pub mod history;
pub mod observer;
pub mod prelude;
pub mod scheduler;
pub mod subject;
pub mod subscription;

pub use config::SubjectConfig;
pub use error::{Result, SubjectError};
pub use history::HistoryBuffer;
pub use observer::BoxedObserver;
pub use subject::Subject;

#[cfg(doctest)]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
