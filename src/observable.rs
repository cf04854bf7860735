//! Observable: the descriptor of a push-based sequence.
//!
//! An [`Observable`] does nothing until it is subscribed. Subscribing wraps the
//! observer in a [`Subscriber`] and runs the producer (or, for a lifted
//! observable, the operator chain down to the root producer) synchronously
//! with it.
//!
//! The "kind" of a source is modelled by two traits:
//!
//! - [`Subscribable`] is anything that can be subscribed: an `Observable`, a
//!   `Subject`, or a user-defined variant.
//! - [`Liftable`] adds `lift`, returning a new source of the same kind that
//!   runs an [`Operator`] in front of the original one. A custom variant
//!   implements `Liftable` to keep its own type through operator chains.

use std::{cell::Cell, marker::PhantomData, rc::Rc};

use crate::{
  config::{max_subscribe_depth, report_unhandled_error},
  error::{ErrorSource, RecursionLimitExceeded},
  observer::{FnMutObserver, Observer, PartialObserver},
  subscriber::Subscriber,
  subscription::{Subscription, Teardown},
};

mod for_each;
mod pipe;

use for_each::for_each_subscriber;
pub use for_each::ForEach;
pub use pipe::{Pipe, PipeChain};

// ============================================================================
// Subscribable / Liftable / Operator
// ============================================================================

/// A source that can be subscribed.
pub trait Subscribable<Item, Err> {
  /// Wire an already constructed subscriber to this source and return it as
  /// the cancellation handle.
  fn actual_subscribe(&self, subscriber: Subscriber<Item, Err>) -> Subscriber<Item, Err>;

  /// Subscribe with any observer. A [`Subscriber`] is used as is.
  fn subscribe<O>(&self, observer: O) -> Subscriber<Item, Err>
  where
    Self: Sized,
    O: Observer<Item, Err> + 'static,
    Item: 'static,
    Err: 'static,
  {
    self.actual_subscribe(observer.into_subscriber())
  }

  /// Subscribe with a `next` handler only. Errors go to the unhandled-error
  /// hook.
  fn subscribe_next<F>(&self, next: F) -> Subscriber<Item, Err>
  where
    Self: Sized,
    F: FnMut(Item) + 'static,
    Item: 'static,
    Err: 'static,
  {
    self.subscribe(FnMutObserver(next))
  }

  fn subscribe_all<N, E, C>(&self, next: N, error: E, complete: C) -> Subscriber<Item, Err>
  where
    Self: Sized,
    N: FnMut(Item) + 'static,
    E: FnMut(Err) + 'static,
    C: FnMut() + 'static,
    Item: 'static,
    Err: 'static,
  {
    self.subscribe(PartialObserver::new().on_next(next).on_error(error).on_complete(complete))
  }

  /// Consume every value with `handler` and return a future settling when the
  /// stream ends.
  ///
  /// The future resolves to `Ok(())` on completion and to `Err` with the
  /// stream's error. If `handler` returns `Err`, the subscription is cancelled
  /// at once, so no further value reaches the handler, and the future resolves
  /// to that error.
  fn for_each<F>(&self, handler: F) -> ForEach<Err>
  where
    Self: Sized,
    F: FnMut(Item) -> Result<(), Err> + 'static,
    Item: 'static,
    Err: 'static,
  {
    let (future, subscriber) = for_each_subscriber(handler);
    self.actual_subscribe(subscriber);
    future
  }
}

/// A source kind that can be lifted through an operator.
///
/// `Lifted<R>` is the kind produced; implementations keep their own kind so
/// operator chains built on a variant stay in that variant.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// struct Labeled<T, E>(Observable<T, E>, &'static str);
///
/// impl<T, E> Clone for Labeled<T, E> {
///   fn clone(&self) -> Self { Labeled(self.0.clone(), self.1) }
/// }
///
/// impl<T: 'static, E: From<RecursionLimitExceeded> + 'static> Subscribable<T, E>
///   for Labeled<T, E>
/// {
///   fn actual_subscribe(&self, subscriber: Subscriber<T, E>) -> Subscriber<T, E> {
///     self.0.actual_subscribe(subscriber)
///   }
/// }
///
/// impl<T: 'static, E: From<RecursionLimitExceeded> + 'static> Liftable<T, E> for Labeled<T, E> {
///   type Lifted<R: 'static> = Labeled<R, E>;
///
///   fn lift<R, Op>(&self, operator: Op) -> Labeled<R, E>
///   where
///     R: 'static,
///     Op: Operator<T, R, E> + 'static,
///   {
///     Labeled(Observable::lift_from(self.clone(), operator), self.1)
///   }
/// }
///
/// let source = Labeled(Observable::<i32, String>::never(), "ticks");
/// let doubled: Labeled<i32, String> = source.lift(ops::Map::new(|v: i32| v * 2));
/// assert_eq!(doubled.1, "ticks");
/// ```
pub trait Liftable<Item, Err>: Subscribable<Item, Err> {
  type Lifted<R: 'static>: Subscribable<R, Err>;

  fn lift<R, Op>(&self, operator: Op) -> Self::Lifted<R>
  where
    R: 'static,
    Op: Operator<Item, R, Err> + 'static;
}

/// A transformation step between an upstream source and a downstream
/// subscriber.
///
/// `call` runs once per subscription. It subscribes `source` with a
/// subscriber of its own (usually built with [`Subscriber::chained`]) and
/// returns extra teardown for the downstream subscriber. Returning `Err`
/// counts as a failure to set up and is delivered through `error`.
pub trait Operator<In, Out, Err> {
  fn call(
    &self, subscriber: Subscriber<Out, Err>, source: &dyn Subscribable<In, Err>,
  ) -> Result<Teardown, Err>;
}

impl<In, Out, Err, F> Operator<In, Out, Err> for F
where
  F: Fn(Subscriber<Out, Err>, &dyn Subscribable<In, Err>) -> Result<Teardown, Err>,
{
  #[inline]
  fn call(
    &self, subscriber: Subscriber<Out, Err>, source: &dyn Subscribable<In, Err>,
  ) -> Result<Teardown, Err> {
    self(subscriber, source)
  }
}

// ============================================================================
// Producer output
// ============================================================================

/// What a producer function may return: nothing, some teardown, or a
/// `Result` whose `Err` is delivered to the subscriber.
pub trait ProducerOutput<Err> {
  fn into_result(self) -> Result<Teardown, Err>;
}

impl<Err> ProducerOutput<Err> for () {
  #[inline]
  fn into_result(self) -> Result<Teardown, Err> { Ok(Teardown::Empty) }
}

impl<Err> ProducerOutput<Err> for Teardown {
  #[inline]
  fn into_result(self) -> Result<Teardown, Err> { Ok(self) }
}

impl<Err> ProducerOutput<Err> for Subscription {
  #[inline]
  fn into_result(self) -> Result<Teardown, Err> { Ok(self.into()) }
}

impl<Item, E, Err> ProducerOutput<Err> for Subscriber<Item, E> {
  #[inline]
  fn into_result(self) -> Result<Teardown, Err> { Ok(self.into()) }
}

impl<T: Into<Teardown>, Err> ProducerOutput<Err> for Result<T, Err> {
  #[inline]
  fn into_result(self) -> Result<Teardown, Err> { self.map(Into::into) }
}

// ============================================================================
// Observable
// ============================================================================

type Producer<Item, Err> = dyn Fn(&Subscriber<Item, Err>) -> Result<Teardown, Err>;

/// A representation of any set of values over any amount of time. This is the
/// most basic building block of rxcore.
///
/// Cloning is cheap and yields a handle to the same descriptor.
pub struct Observable<Item, Err> {
  origin: Rc<Origin<Item, Err>>,
}

enum Origin<Item, Err> {
  /// No producer and no source: never emits, never terminates.
  Never,
  Producer(Box<Producer<Item, Err>>),
  Lifted(Box<dyn LiftedSource<Item, Err>>),
}

/// A source paired with the operator that turns it into this observable.
trait LiftedSource<Item, Err> {
  fn call(&self, subscriber: Subscriber<Item, Err>) -> Result<Teardown, Err>;
}

struct Lift<S, Op, In> {
  source: S,
  operator: Op,
  _p: PhantomData<fn(In)>,
}

impl<S, Op, In, Item, Err> LiftedSource<Item, Err> for Lift<S, Op, In>
where
  S: Subscribable<In, Err>,
  Op: Operator<In, Item, Err>,
{
  #[inline]
  fn call(&self, subscriber: Subscriber<Item, Err>) -> Result<Teardown, Err> {
    self.operator.call(subscriber, &self.source)
  }
}

impl<Item, Err> Clone for Observable<Item, Err> {
  #[inline]
  fn clone(&self) -> Self { Observable { origin: self.origin.clone() } }
}

impl<Item, Err> Default for Observable<Item, Err> {
  fn default() -> Self { Self::never() }
}

impl<Item, Err> Observable<Item, Err> {
  /// param `producer`: the function that is called when the Observable is
  /// initially subscribed to. This function is given a Subscriber, to which
  /// new values can be `next`ed, or an `error` method can be called to raise
  /// an error, or `complete` can be called to notify of a successful
  /// completion. Teardown can be registered with `add` or returned.
  ///
  /// Returning `Err(e)` is the same as a synchronous failure: `e` reaches the
  /// subscriber through `error`.
  pub fn new<F, R>(producer: F) -> Self
  where
    F: Fn(&Subscriber<Item, Err>) -> R + 'static,
    R: ProducerOutput<Err>,
    Item: 'static,
    Err: 'static,
  {
    let producer = move |subscriber: &Subscriber<Item, Err>| producer(subscriber).into_result();
    Observable { origin: Rc::new(Origin::Producer(Box::new(producer))) }
  }

  /// An observable with no producer: subscribers stay open and silent until
  /// they unsubscribe.
  pub fn never() -> Self { Observable { origin: Rc::new(Origin::Never) } }

  /// Build the observable that runs `operator` in front of `source`.
  ///
  /// This is the default `lift`; custom kinds call it and wrap the result.
  pub fn lift_from<S, Op, In>(source: S, operator: Op) -> Self
  where
    S: Subscribable<In, Err> + 'static,
    Op: Operator<In, Item, Err> + 'static,
    In: 'static,
    Item: 'static,
    Err: 'static,
  {
    let lifted = Lift { source, operator, _p: PhantomData };
    Observable { origin: Rc::new(Origin::Lifted(Box::new(lifted))) }
  }

  /// Whether both handles describe the very same observable.
  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.origin, &other.origin) }

  fn produce(&self, subscriber: &Subscriber<Item, Err>) -> Result<Teardown, Err> {
    match &*self.origin {
      Origin::Never => Ok(Teardown::Empty),
      Origin::Producer(producer) => producer(subscriber),
      Origin::Lifted(lifted) => lifted.call(subscriber.clone()),
    }
  }
}

impl<Item, Err> Subscribable<Item, Err> for Observable<Item, Err>
where
  Err: From<RecursionLimitExceeded> + 'static,
{
  fn actual_subscribe(&self, subscriber: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    tracing::trace!("subscribe");
    let produced = match DepthGuard::enter() {
      Ok(_depth) => self.produce(&subscriber),
      Err(exceeded) => Err(exceeded.into()),
    };
    match produced {
      Ok(teardown) => {
        subscriber.add(teardown);
      }
      Err(err) if subscriber.is_stopped() => {
        report_unhandled_error(ErrorSource::AfterTermination, err);
      }
      Err(err) => subscriber.error(err),
    }
    subscriber
  }
}

impl<Item, Err> Liftable<Item, Err> for Observable<Item, Err>
where
  Item: 'static,
  Err: From<RecursionLimitExceeded> + 'static,
{
  type Lifted<R: 'static> = Observable<R, Err>;

  fn lift<R, Op>(&self, operator: Op) -> Observable<R, Err>
  where
    R: 'static,
    Op: Operator<Item, R, Err> + 'static,
  {
    Observable::lift_from(self.clone(), operator)
  }
}

impl<Item, Err> Pipe for Observable<Item, Err> {}

// ============================================================================
// Subscribe depth guard
// ============================================================================

thread_local! {
  static SUBSCRIBE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Counts nested `subscribe` calls on this thread for as long as it lives.
struct DepthGuard;

impl DepthGuard {
  fn enter() -> Result<Self, RecursionLimitExceeded> {
    let limit = max_subscribe_depth();
    SUBSCRIBE_DEPTH.with(|depth| {
      if depth.get() >= limit {
        tracing::warn!(limit, "subscribe recursion limit reached");
        Err(RecursionLimitExceeded { limit })
      } else {
        depth.set(depth.get() + 1);
        Ok(DepthGuard)
      }
    })
  }
}

impl Drop for DepthGuard {
  fn drop(&mut self) { SUBSCRIBE_DEPTH.with(|depth| depth.set(depth.get() - 1)); }
}
