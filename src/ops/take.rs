use std::cell::Cell;

use crate::{
  observable::{Liftable, Operator, Subscribable},
  observer::Observer,
  subscriber::Subscriber,
  subscription::Teardown,
};

/// Emits only the first `count` values, then completes and cancels the
/// source.
///
/// `take(0)` completes as soon as it is subscribed without touching the
/// source.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let ticks = Subject::<u32, String>::new();
/// let first_two = ticks.as_observable().pipe((ops::take(2),));
/// first_two.subscribe_all(|v| println!("{v}"), |_| {}, || println!("done"));
///
/// ticks.next(1);
/// ticks.next(2);
/// assert!(!ticks.observed());
/// ```
pub fn take<S, Item, Err>(
  count: usize,
) -> impl FnOnce(S) -> <S as Liftable<Item, Err>>::Lifted<Item>
where
  S: Liftable<Item, Err>,
  Item: 'static,
  Err: 'static,
{
  move |source: S| source.lift::<Item, _>(Take::new(count))
}

/// The [`Operator`] behind [`take`].
#[derive(Clone, Copy, Debug)]
pub struct Take {
  count: usize,
}

impl Take {
  pub fn new(count: usize) -> Self { Take { count } }
}

impl<Item, Err> Operator<Item, Item, Err> for Take
where
  Item: 'static,
  Err: 'static,
{
  fn call(
    &self, subscriber: Subscriber<Item, Err>, source: &dyn Subscribable<Item, Err>,
  ) -> Result<Teardown, Err> {
    if self.count == 0 {
      subscriber.complete();
      return Ok(Teardown::Empty);
    }
    let observer =
      TakeObserver { destination: subscriber.clone(), count: self.count, seen: Cell::new(0) };
    source.actual_subscribe(Subscriber::chained(&subscriber, observer));
    Ok(Teardown::Empty)
  }
}

struct TakeObserver<Item, Err> {
  destination: Subscriber<Item, Err>,
  count: usize,
  seen: Cell<usize>,
}

impl<Item, Err> Observer<Item, Err> for TakeObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    let seen = self.seen.get();
    if seen >= self.count {
      return;
    }
    self.seen.set(seen + 1);
    self.destination.next(value);
    if seen + 1 == self.count {
      self.destination.complete();
    }
  }

  #[inline]
  fn error(&mut self, err: Err) { self.destination.error(err) }

  #[inline]
  fn complete(&mut self) { self.destination.complete() }

  fn is_closed(&self) -> bool {
    self.seen.get() >= self.count || self.destination.is_stopped() || self.destination.is_closed()
  }
}
