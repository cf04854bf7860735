//! `for_each`: consume a stream from async code.
//!
//! The returned [`ForEach`] future settles when the stream terminates:
//!
//! - completion resolves it with `Ok(())`;
//! - a stream error resolves it with `Err(err)`;
//! - a handler returning `Err(err)` cancels the subscription and resolves it
//!   with that error. No later value reaches the handler.
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! let source = Observable::new(|s: &Subscriber<i32, String>| {
//!   (1..=4).for_each(|v| s.next(v));
//!   s.complete();
//! });
//! let mut sum = 0;
//! let done = source.for_each(move |v| {
//!   sum += v;
//!   Ok(())
//! });
//! assert_eq!(futures::executor::block_on(done), Ok(()));
//! ```

use std::{
  cell::RefCell,
  future::Future,
  pin::Pin,
  rc::Rc,
  task::{Context, Poll, Waker},
};

use crate::{
  observer::Observer,
  subscriber::Subscriber,
  subscription::{Subscription, SubscriptionLike},
};

struct Shared<Err> {
  result: Option<Result<(), Err>>,
  waker: Option<Waker>,
  settled: bool,
}

impl<Err> Shared<Err> {
  fn settle(&mut self, result: Result<(), Err>) {
    if self.settled {
      return;
    }
    self.settled = true;
    self.result = Some(result);
    if let Some(waker) = self.waker.take() {
      waker.wake();
    }
  }
}

/// Future returned by [`Subscribable::for_each`](super::Subscribable::for_each).
#[must_use = "futures do nothing unless polled"]
pub struct ForEach<Err> {
  shared: Rc<RefCell<Shared<Err>>>,
}

impl<Err> ForEach<Err> {
  /// Whether the stream has already terminated.
  pub fn is_settled(&self) -> bool { self.shared.borrow().settled }
}

impl<Err> Future for ForEach<Err> {
  type Output = Result<(), Err>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let mut shared = self.shared.borrow_mut();
    match shared.result.take() {
      Some(result) => Poll::Ready(result),
      None => {
        shared.waker = Some(cx.waker().clone());
        Poll::Pending
      }
    }
  }
}

struct ForEachObserver<F, Err> {
  handler: F,
  shared: Rc<RefCell<Shared<Err>>>,
  subscription: Subscription,
}

impl<Item, Err, F> Observer<Item, Err> for ForEachObserver<F, Err>
where
  F: FnMut(Item) -> Result<(), Err>,
{
  fn next(&mut self, value: Item) {
    if let Err(err) = (self.handler)(value) {
      tracing::debug!("for_each handler failed, cancelling");
      self.shared.borrow_mut().settle(Err(err));
      self.subscription.unsubscribe();
    }
  }

  fn error(&mut self, err: Err) { self.shared.borrow_mut().settle(Err(err)); }

  fn complete(&mut self) { self.shared.borrow_mut().settle(Ok(())); }

  fn is_closed(&self) -> bool { self.shared.borrow().settled }
}

pub(super) fn for_each_subscriber<Item, Err, F>(handler: F) -> (ForEach<Err>, Subscriber<Item, Err>)
where
  F: FnMut(Item) -> Result<(), Err> + 'static,
  Item: 'static,
  Err: 'static,
{
  let shared = Rc::new(RefCell::new(Shared { result: None, waker: None, settled: false }));
  let subscription = Subscription::new();
  let observer =
    ForEachObserver { handler, shared: shared.clone(), subscription: subscription.clone() };
  (ForEach { shared }, Subscriber::with_subscription(observer, subscription))
}
