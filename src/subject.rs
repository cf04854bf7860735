//! Subject: a multicast node that is both an observer and a source.
//!
//! Values pushed into a [`Subject`] are forwarded to every subscriber that is
//! active at that moment, in subscription order. Once the subject errors or
//! completes, current subscribers receive the terminal notification and any
//! later subscriber receives it immediately on subscribe.
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! let subject = Subject::<i32, String>::new();
//! let a = subject.clone().subscribe_next(|v| println!("a: {v}"));
//! subject.clone().subscribe_next(|v| println!("b: {v}"));
//!
//! subject.next(1);
//! a.unsubscribe();
//! subject.next(2);
//! assert_eq!(subject.observer_count(), 1);
//! ```

use std::{
  cell::RefCell,
  fmt::{Debug, Formatter},
  rc::Rc,
};

use crate::{
  error::RecursionLimitExceeded,
  observable::{Liftable, Observable, Operator, Pipe, Subscribable},
  observer::Observer,
  subscriber::Subscriber,
  subscription::{SubscriptionLike, Teardown},
};

mod anonymous_subject;
mod subscribers;

pub use anonymous_subject::*;
pub use subscribers::Subscribers;
use subscribers::broadcast;

/// A multicast source that is also an observer.
///
/// Cloning yields another handle to the same subject.
pub struct Subject<Item, Err>(Rc<SubjectInner<Item, Err>>);

struct SubjectInner<Item, Err> {
  observers: RefCell<Subscribers<Subscriber<Item, Err>>>,
  state: RefCell<SubjectState<Err>>,
}

#[derive(Clone)]
enum SubjectState<Err> {
  Active,
  Errored(Err),
  Completed,
  /// `unsubscribe` was called on the subject itself.
  Closed,
}

impl<Item, Err> Subject<Item, Err> {
  pub fn new() -> Self {
    Subject(Rc::new(SubjectInner {
      observers: RefCell::new(Subscribers::default()),
      state: RefCell::new(SubjectState::Active),
    }))
  }

  /// Whether at least one subscriber is active.
  #[inline]
  pub fn observed(&self) -> bool { !self.0.observers.borrow().is_empty() }

  #[inline]
  pub fn observer_count(&self) -> usize { self.0.observers.borrow().len() }

  /// True once the subject has errored or completed.
  pub fn is_stopped(&self) -> bool {
    matches!(&*self.0.state.borrow(), SubjectState::Errored(_) | SubjectState::Completed)
  }

  /// True once [`Subject::unsubscribe`] has been called.
  pub fn is_closed(&self) -> bool { matches!(&*self.0.state.borrow(), SubjectState::Closed) }

  /// Close the subject and drop all subscribers without notifying them.
  ///
  /// Afterwards emissions are ignored and new subscribers are unsubscribed
  /// as soon as they subscribe.
  pub fn unsubscribe(&self) {
    *self.0.state.borrow_mut() = SubjectState::Closed;
    let dropped = self.0.observers.borrow_mut().take_all();
    tracing::debug!(observers = dropped.len(), "subject closed");
  }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }

  fn is_active(&self) -> bool { matches!(&*self.0.state.borrow(), SubjectState::Active) }
}

impl<Item: Clone, Err: Clone> Subject<Item, Err> {
  pub fn next(&self, value: Item) {
    if !self.is_active() {
      return;
    }
    let targets = self.0.observers.borrow().snapshot();
    broadcast(targets, value, |subscriber, value| subscriber.next(value));
  }

  pub fn error(&self, err: Err) {
    if !self.is_active() {
      return;
    }
    *self.0.state.borrow_mut() = SubjectState::Errored(err.clone());
    let targets = self.0.observers.borrow_mut().take_all();
    tracing::trace!(observers = targets.len(), "subject errored");
    broadcast(targets, err, |subscriber, err| subscriber.error(err));
  }

  pub fn complete(&self) {
    if !self.is_active() {
      return;
    }
    *self.0.state.borrow_mut() = SubjectState::Completed;
    let targets = self.0.observers.borrow_mut().take_all();
    tracing::trace!(observers = targets.len(), "subject completed");
    for subscriber in targets {
      subscriber.complete();
    }
  }
}

impl<Item, Err> Subject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + From<RecursionLimitExceeded> + 'static,
{
  /// An observable view of the subject that hides its observer side.
  pub fn as_observable(&self) -> Observable<Item, Err> {
    let subject = self.clone();
    Observable::new(move |subscriber: &Subscriber<Item, Err>| {
      subject.actual_subscribe(subscriber.clone());
    })
  }
}

impl<Item, Err> Default for Subject<Item, Err> {
  fn default() -> Self { Self::new() }
}

impl<Item, Err> Clone for Subject<Item, Err> {
  #[inline]
  fn clone(&self) -> Self { Subject(self.0.clone()) }
}

impl<Item, Err> Debug for Subject<Item, Err> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subject")
      .field("observers", &self.observer_count())
      .field("stopped", &self.is_stopped())
      .field("closed", &self.is_closed())
      .finish()
  }
}

impl<Item: Clone, Err: Clone> Observer<Item, Err> for Subject<Item, Err> {
  #[inline]
  fn next(&mut self, value: Item) { Subject::next(self, value) }

  #[inline]
  fn error(&mut self, err: Err) { Subject::error(self, err) }

  #[inline]
  fn complete(&mut self) { Subject::complete(self) }

  #[inline]
  fn is_closed(&self) -> bool { !self.is_active() }
}

impl<Item, Err> Subscribable<Item, Err> for Subject<Item, Err>
where
  Item: 'static,
  Err: Clone + 'static,
{
  fn actual_subscribe(&self, subscriber: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let state = self.0.state.borrow().clone();
    match state {
      SubjectState::Errored(err) => subscriber.error(err),
      SubjectState::Completed => subscriber.complete(),
      SubjectState::Closed => subscriber.unsubscribe(),
      SubjectState::Active => {
        let id = self.0.observers.borrow_mut().add(subscriber.clone());
        let subject = Rc::downgrade(&self.0);
        subscriber.add(Teardown::callback(move || {
          if let Some(subject) = subject.upgrade() {
            subject.observers.borrow_mut().remove(id);
          }
        }));
      }
    }
    subscriber
  }
}

impl<Item, Err> Liftable<Item, Err> for Subject<Item, Err>
where
  Item: 'static,
  Err: Clone + From<RecursionLimitExceeded> + 'static,
{
  type Lifted<R: 'static> = AnonymousSubject<Item, R, Err>;

  fn lift<R, Op>(&self, operator: Op) -> AnonymousSubject<Item, R, Err>
  where
    R: 'static,
    Op: Operator<Item, R, Err> + 'static,
  {
    AnonymousSubject::new(self.clone(), Observable::lift_from(self.clone(), operator))
  }
}

impl<Item, Err> Pipe for Subject<Item, Err> {}

impl<Item, Err> SubscriptionLike for Subject<Item, Err> {
  #[inline]
  fn unsubscribe(&self) { Subject::unsubscribe(self) }

  #[inline]
  fn is_closed(&self) -> bool { Subject::is_closed(self) }
}
