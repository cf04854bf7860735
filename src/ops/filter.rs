use std::rc::Rc;

use crate::{
  observable::{Liftable, Operator, Subscribable},
  observer::Observer,
  subscriber::Subscriber,
  subscription::Teardown,
};

/// Emit only those values that pass `predicate`.
pub fn filter<S, Item, Err, F>(
  predicate: F,
) -> impl FnOnce(S) -> <S as Liftable<Item, Err>>::Lifted<Item>
where
  S: Liftable<Item, Err>,
  F: Fn(&Item) -> bool + 'static,
  Item: 'static,
  Err: 'static,
{
  move |source: S| source.lift::<Item, _>(Filter::new(predicate))
}

/// The [`Operator`] behind [`filter`].
pub struct Filter<F> {
  predicate: Rc<F>,
}

impl<F> Filter<F> {
  pub fn new(predicate: F) -> Self { Filter { predicate: Rc::new(predicate) } }
}

impl<Item, Err, F> Operator<Item, Item, Err> for Filter<F>
where
  F: Fn(&Item) -> bool + 'static,
  Item: 'static,
  Err: 'static,
{
  fn call(
    &self, subscriber: Subscriber<Item, Err>, source: &dyn Subscribable<Item, Err>,
  ) -> Result<Teardown, Err> {
    let observer =
      FilterObserver { destination: subscriber.clone(), predicate: self.predicate.clone() };
    source.actual_subscribe(Subscriber::chained(&subscriber, observer));
    Ok(Teardown::Empty)
  }
}

struct FilterObserver<Item, Err, F> {
  destination: Subscriber<Item, Err>,
  predicate: Rc<F>,
}

impl<Item, Err, F> Observer<Item, Err> for FilterObserver<Item, Err, F>
where
  F: Fn(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if (self.predicate)(&value) {
      self.destination.next(value)
    }
  }

  #[inline]
  fn error(&mut self, err: Err) { self.destination.error(err) }

  #[inline]
  fn complete(&mut self) { self.destination.complete() }

  #[inline]
  fn is_closed(&self) -> bool { self.destination.is_stopped() || self.destination.is_closed() }
}
