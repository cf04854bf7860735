use std::{
  cell::{Cell, RefCell},
  collections::VecDeque,
  fmt::{Debug, Formatter},
  rc::Rc,
};

use crate::{
  config::report_unhandled_error,
  error::ErrorSource,
  observer::{EmptyObserver, Observer},
  subscription::{Subscription, SubscriptionLike, Teardown, TeardownKey},
};

/// An event waiting behind a running handler.
enum Notification<Item, Err> {
  Next(Item),
  Error(Err),
  Complete,
}

/// Implements the Observer trait and Subscription trait. While the Observer is
/// the public API for consuming the values of an Observable, all Observers get
/// converted to a Subscriber, in order to provide Subscription capabilities.
///
/// The Subscriber enforces the observer protocol no matter what the producer
/// does:
///
/// - nothing is forwarded once it is stopped (after `error` or `complete`) or
///   closed (after `unsubscribe`);
/// - at most one of `error` / `complete` reaches the destination, and teardown
///   runs right after it has been delivered;
/// - a call made from inside the destination's own handler is queued and
///   delivered in order once that handler returns;
/// - an `error` that can no longer be delivered goes to the unhandled-error
///   hook.
///
/// Cloning yields another handle to the same subscriber.
pub struct Subscriber<Item, Err>(Rc<SubscriberInner<Item, Err>>);

struct SubscriberInner<Item, Err> {
  subscription: Subscription,
  stopped: Cell<bool>,
  delivering: Cell<bool>,
  destination: RefCell<Option<Box<dyn Observer<Item, Err>>>>,
  pending: RefCell<VecDeque<Notification<Item, Err>>>,
  lost_error: fn(Err),
}

impl<Item: 'static, Err: 'static> Subscriber<Item, Err> {
  pub fn new(observer: impl Observer<Item, Err> + 'static) -> Self {
    Self::with_subscription(observer, Subscription::new())
  }

  /// A subscriber that ignores values and completion. Errors sent to it go
  /// to the unhandled-error hook.
  pub fn empty() -> Self { Self::new(EmptyObserver) }

  /// Wrap `observer` in a subscriber owned by `destination`: unsubscribing
  /// `destination` also unsubscribes the new subscriber.
  ///
  /// This is how operators build the subscriber they pass upstream.
  pub fn chained<DItem, DErr>(
    destination: &Subscriber<DItem, DErr>, observer: impl Observer<Item, Err> + 'static,
  ) -> Self {
    let subscriber = Self::new(observer);
    destination.subscription().add(subscriber.subscription().clone());
    subscriber
  }

  /// A new subscriber forwarding to `destination` and owned by it.
  pub fn wrap(destination: Subscriber<Item, Err>) -> Self {
    Self::chained(&destination.clone(), destination)
  }

  pub(crate) fn with_subscription(
    observer: impl Observer<Item, Err> + 'static, subscription: Subscription,
  ) -> Self {
    let inner = Rc::new(SubscriberInner {
      subscription,
      stopped: Cell::new(false),
      delivering: Cell::new(false),
      destination: RefCell::new(Some(Box::new(observer))),
      pending: RefCell::new(VecDeque::new()),
      lost_error: |err| report_unhandled_error(ErrorSource::AfterTermination, err),
    });

    let weak = Rc::downgrade(&inner);
    inner.subscription.add(Teardown::callback(move || {
      if let Some(inner) = weak.upgrade() {
        let released = inner.destination.borrow_mut().take();
        drop(released);
      }
    }));
    Subscriber(inner)
  }
}

impl<Item, Err> Subscriber<Item, Err> {
  pub fn next(&self, value: Item) {
    if self.is_stopped() || self.is_closed() {
      tracing::trace!("next dropped by a stopped subscriber");
      return;
    }
    self.dispatch(Notification::Next(value));
  }

  pub fn error(&self, err: Err) {
    if self.is_stopped() || self.is_closed() {
      tracing::trace!("error dropped by a stopped subscriber");
      return;
    }
    self.0.stopped.set(true);
    self.dispatch(Notification::Error(err));
  }

  pub fn complete(&self) {
    if self.is_stopped() || self.is_closed() {
      tracing::trace!("complete dropped by a stopped subscriber");
      return;
    }
    self.0.stopped.set(true);
    self.dispatch(Notification::Complete);
  }

  /// True once `error` or `complete` has been called.
  #[inline]
  pub fn is_stopped(&self) -> bool { self.0.stopped.get() }

  /// True once the subscriber has been unsubscribed, either explicitly or
  /// after delivering a terminal notification.
  #[inline]
  pub fn is_closed(&self) -> bool { self.0.subscription.is_closed() }

  /// Cancel the subscription.
  ///
  /// Called from inside one of this subscriber's own handlers after an
  /// `error` or `complete` was queued behind it, queued values are dropped
  /// and the terminal notification is delivered before teardown runs.
  pub fn unsubscribe(&self) {
    let inner = &*self.0;
    if inner.delivering.get() && inner.stopped.get() {
      let mut pending = inner.pending.borrow_mut();
      pending.retain(|n| !matches!(n, Notification::Next(_)));
      if !pending.is_empty() {
        tracing::trace!("unsubscribe deferred behind a queued terminal notification");
        return;
      }
    }
    inner.subscription.unsubscribe()
  }

  /// Register teardown to run when this subscriber is unsubscribed.
  #[inline]
  pub fn add(&self, teardown: impl Into<Teardown>) -> TeardownKey {
    self.0.subscription.add(teardown)
  }

  #[inline]
  pub fn remove(&self, key: TeardownKey) -> Option<Teardown> { self.0.subscription.remove(key) }

  /// The teardown registry owned by this subscriber.
  #[inline]
  pub fn subscription(&self) -> &Subscription { &self.0.subscription }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }

  fn dispatch(&self, notification: Notification<Item, Err>) {
    let inner = &*self.0;
    if inner.delivering.get() {
      inner.pending.borrow_mut().push_back(notification);
      return;
    }
    let Some(destination) = inner.destination.borrow_mut().take() else {
      return;
    };

    inner.delivering.set(true);
    let mut delivery = Delivery { inner, destination: Some(destination) };
    let mut current = Some(notification);
    while let Some(notification) = current {
      delivery.deliver(notification);
      current = inner.pending.borrow_mut().pop_front();
    }
  }
}

/// The destination while it is on loan to a running delivery. Dropping it
/// hands the destination back, even if a handler panicked.
struct Delivery<'a, Item, Err> {
  inner: &'a SubscriberInner<Item, Err>,
  destination: Option<Box<dyn Observer<Item, Err>>>,
}

impl<Item, Err> Delivery<'_, Item, Err> {
  fn deliver(&mut self, notification: Notification<Item, Err>) {
    let inner = self.inner;
    if inner.subscription.is_closed() {
      tracing::debug!("notification dropped by a closed subscriber");
      if let Notification::Error(err) = notification {
        (inner.lost_error)(err);
      }
      return;
    }
    let Some(destination) = self.destination.as_mut() else {
      return;
    };
    match notification {
      Notification::Next(value) => destination.next(value),
      Notification::Error(err) => {
        destination.error(err);
        inner.subscription.unsubscribe();
      }
      Notification::Complete => {
        destination.complete();
        inner.subscription.unsubscribe();
      }
    }
  }
}

impl<Item, Err> Drop for Delivery<'_, Item, Err> {
  fn drop(&mut self) {
    self.inner.delivering.set(false);
    let pending = std::mem::take(&mut *self.inner.pending.borrow_mut());
    drop(pending);
    if !self.inner.subscription.is_closed() {
      *self.inner.destination.borrow_mut() = self.destination.take();
    }
  }
}

impl<Item, Err> Clone for Subscriber<Item, Err> {
  #[inline]
  fn clone(&self) -> Self { Subscriber(self.0.clone()) }
}

impl<Item, Err> Debug for Subscriber<Item, Err> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscriber")
      .field("stopped", &self.is_stopped())
      .field("closed", &self.is_closed())
      .finish()
  }
}

impl<Item: 'static, Err: 'static> Observer<Item, Err> for Subscriber<Item, Err> {
  #[inline]
  fn next(&mut self, value: Item) { Subscriber::next(self, value) }

  #[inline]
  fn error(&mut self, err: Err) { Subscriber::error(self, err) }

  #[inline]
  fn complete(&mut self) { Subscriber::complete(self) }

  #[inline]
  fn is_closed(&self) -> bool { self.is_stopped() || Subscriber::is_closed(self) }

  #[inline]
  fn into_subscriber(self) -> Subscriber<Item, Err> { self }
}

impl<Item, Err> SubscriptionLike for Subscriber<Item, Err> {
  #[inline]
  fn unsubscribe(&self) { Subscriber::unsubscribe(self) }

  #[inline]
  fn is_closed(&self) -> bool { Subscriber::is_closed(self) }
}

impl<Item, Err> From<Subscriber<Item, Err>> for Teardown {
  #[inline]
  fn from(subscriber: Subscriber<Item, Err>) -> Self {
    Teardown::Subscription(subscriber.subscription().clone())
  }
}
