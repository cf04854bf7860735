//! # rxcore: the lifecycle engine of a push-based reactive stream library
//!
//! rxcore is the part of a Reactive Extensions implementation that every
//! operator relies on: how a producer meets its observer, how the observer
//! protocol is enforced, how cancellation composes, and how operators are
//! chained without losing the kind of the source.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! let source = Observable::new(|s: &Subscriber<i32, String>| {
//!   (0..10).for_each(|v| s.next(v));
//!   s.complete();
//! });
//! source
//!   .pipe((ops::filter(|v: &i32| v % 2 == 0), ops::map(|v: i32| v * 2)))
//!   .subscribe_next(|v| println!("Value: {v}"));
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | Lazy descriptor of a stream, runs its producer per subscription |
//! | [`Subject`] | Multicast node, both an observer and a source |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` events |
//! | [`Subscriber`] | Protocol-enforcing wrapper handed to producers; the cancellation handle |
//! | [`Subscription`] | Registry of teardown actions run once on unsubscribe |
//! | [`Liftable`] / [`Operator`] | Extension point for operators that keep the source kind |
//!
//! Everything here is single-threaded (`Rc` based); no part of the engine
//! locks.
//!
//! ## Configuration
//!
//! Errors that no observer can take go to a process-wide hook, see
//! [`config`]. By default they are logged with `tracing` at error level.
//!
//! [`Observable`]: observable::Observable
//! [`Subject`]: subject::Subject
//! [`Observer`]: observer::Observer
//! [`Subscriber`]: subscriber::Subscriber
//! [`Subscription`]: subscription::Subscription
//! [`Liftable`]: observable::Liftable
//! [`Operator`]: observable::Operator

pub mod config;
pub mod error;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod subject;
pub mod subscriber;
pub mod subscription;

pub use prelude::*;
