use crate::{
  error::RecursionLimitExceeded,
  observable::{Liftable, Observable, Operator, Pipe, Subscribable},
  observer::Observer,
  subject::Subject,
  subscriber::Subscriber,
};

/// What lifting a [`Subject`] produces: a subject-shaped value whose observer
/// side still feeds the original subject and whose source side runs the
/// operator chain.
///
/// Lifting an `AnonymousSubject` again keeps the same destination, so a
/// whole `pipe` over a subject stays subject-shaped.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let subject = Subject::<i32, String>::new();
/// let doubled = subject.pipe((ops::map(|v: i32| v * 2),));
/// doubled.subscribe_next(|v| assert_eq!(v, 42));
///
/// // Pushing into the lifted value pushes into the original subject.
/// let mut input = doubled.clone();
/// input.next(21);
/// ```
pub struct AnonymousSubject<In, Item, Err> {
  destination: Subject<In, Err>,
  source: Observable<Item, Err>,
}

impl<In, Item, Err> AnonymousSubject<In, Item, Err> {
  pub fn new(destination: Subject<In, Err>, source: Observable<Item, Err>) -> Self {
    AnonymousSubject { destination, source }
  }

  /// The subject receiving what is pushed into this one.
  #[inline]
  pub fn destination(&self) -> &Subject<In, Err> { &self.destination }

  #[inline]
  pub fn as_observable(&self) -> Observable<Item, Err> { self.source.clone() }
}

impl<In, Item, Err> Clone for AnonymousSubject<In, Item, Err> {
  fn clone(&self) -> Self {
    AnonymousSubject { destination: self.destination.clone(), source: self.source.clone() }
  }
}

impl<In: Clone, Item, Err: Clone> Observer<In, Err> for AnonymousSubject<In, Item, Err> {
  #[inline]
  fn next(&mut self, value: In) { self.destination.next(value) }

  #[inline]
  fn error(&mut self, err: Err) { self.destination.error(err) }

  #[inline]
  fn complete(&mut self) { self.destination.complete() }

  #[inline]
  fn is_closed(&self) -> bool { self.destination.is_stopped() || self.destination.is_closed() }
}

impl<In, Item, Err> Subscribable<Item, Err> for AnonymousSubject<In, Item, Err>
where
  Err: From<RecursionLimitExceeded> + 'static,
{
  #[inline]
  fn actual_subscribe(&self, subscriber: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    self.source.actual_subscribe(subscriber)
  }
}

impl<In, Item, Err> Liftable<Item, Err> for AnonymousSubject<In, Item, Err>
where
  Item: 'static,
  Err: From<RecursionLimitExceeded> + 'static,
{
  type Lifted<R: 'static> = AnonymousSubject<In, R, Err>;

  fn lift<R, Op>(&self, operator: Op) -> AnonymousSubject<In, R, Err>
  where
    R: 'static,
    Op: Operator<Item, R, Err> + 'static,
  {
    AnonymousSubject::new(self.destination.clone(), self.source.lift(operator))
  }
}

impl<In, Item, Err> Pipe for AnonymousSubject<In, Item, Err> {}
