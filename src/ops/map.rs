use std::rc::Rc;

use crate::{
  observable::{Liftable, Operator, Subscribable},
  observer::Observer,
  subscriber::Subscriber,
  subscription::Teardown,
};

/// Applies a function to every value.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let source = Observable::new(|s: &Subscriber<i32, String>| {
///   s.next(1);
///   s.next(2);
///   s.complete();
/// });
/// source.pipe((ops::map(|v: i32| v * 10),)).subscribe_next(|v| println!("{v}"));
///
/// // print log:
/// // 10
/// // 20
/// ```
pub fn map<S, In, Out, Err, F>(
  func: F,
) -> impl FnOnce(S) -> <S as Liftable<In, Err>>::Lifted<Out>
where
  S: Liftable<In, Err>,
  F: Fn(In) -> Out + 'static,
  In: 'static,
  Out: 'static,
  Err: 'static,
{
  move |source: S| source.lift::<Out, _>(Map::new(func))
}

/// The [`Operator`] behind [`map`].
pub struct Map<F> {
  func: Rc<F>,
}

impl<F> Map<F> {
  pub fn new(func: F) -> Self { Map { func: Rc::new(func) } }
}

impl<In, Out, Err, F> Operator<In, Out, Err> for Map<F>
where
  F: Fn(In) -> Out + 'static,
  In: 'static,
  Out: 'static,
  Err: 'static,
{
  fn call(
    &self, subscriber: Subscriber<Out, Err>, source: &dyn Subscribable<In, Err>,
  ) -> Result<Teardown, Err> {
    let observer = MapObserver { destination: subscriber.clone(), func: self.func.clone() };
    source.actual_subscribe(Subscriber::chained(&subscriber, observer));
    Ok(Teardown::Empty)
  }
}

struct MapObserver<Out, Err, F> {
  destination: Subscriber<Out, Err>,
  func: Rc<F>,
}

impl<In, Out, Err, F> Observer<In, Err> for MapObserver<Out, Err, F>
where
  F: Fn(In) -> Out,
{
  #[inline]
  fn next(&mut self, value: In) { self.destination.next((self.func)(value)) }

  #[inline]
  fn error(&mut self, err: Err) { self.destination.error(err) }

  #[inline]
  fn complete(&mut self) { self.destination.complete() }

  #[inline]
  fn is_closed(&self) -> bool { self.destination.is_stopped() || self.destination.is_closed() }
}
