//! Observer trait and implementations
//!
//! The Observer trait defines the consumer of data in the reactive pattern.
//! It provides three methods: next (for values), error (for errors), and
//! complete (for stream completion).

use crate::{config::report_unhandled_error, error::ErrorSource, subscriber::Subscriber};

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: The consumer of data in reactive programming
///
/// An Observer receives values, errors, and completion notifications from
/// an Observable. Implementors do not need to guard against calls after
/// termination; the [`Subscriber`] wrapping them does that.
pub trait Observer<Item, Err> {
  /// Receive the next value from the observable
  fn next(&mut self, value: Item);

  /// Handle an error from the observable. No more values follow.
  fn error(&mut self, err: Err);

  /// Handle completion of the observable. No more values follow.
  fn complete(&mut self);

  /// Checks if the observer is closed.
  ///
  /// Sources may poll this to stop producing early.
  fn is_closed(&self) -> bool { false }

  /// Convert into the protocol-enforcing [`Subscriber`] that
  /// `subscribe` hands to producers.
  ///
  /// A `Subscriber` returns itself, so subscribing with one never wraps it a
  /// second time.
  fn into_subscriber(self) -> Subscriber<Item, Err>
  where
    Self: Sized + 'static,
    Item: 'static,
    Err: 'static,
  {
    Subscriber::new(self)
  }
}

impl<Item, Err, O> Observer<Item, Err> for Box<O>
where
  O: Observer<Item, Err> + ?Sized,
{
  #[inline]
  fn next(&mut self, value: Item) { (**self).next(value) }

  #[inline]
  fn error(&mut self, err: Err) { (**self).error(err) }

  #[inline]
  fn complete(&mut self) { (**self).complete() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

// ============================================================================
// PartialObserver - any subset of the three handlers
// ============================================================================

/// An observer assembled from optional handlers.
///
/// A missing `next` or `complete` handler ignores the notification. A missing
/// `error` handler sends the error to the unhandled-error hook, so an error is
/// never lost just because nobody asked for it.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let observer = PartialObserver::<i32, String>::new()
///   .on_next(|v| println!("{v}"))
///   .on_complete(|| println!("done"));
/// Observable::new(|s: &Subscriber<i32, String>| {
///   s.next(1);
///   s.complete();
/// })
/// .subscribe(observer);
/// ```
pub struct PartialObserver<Item, Err> {
  next: Option<Box<dyn FnMut(Item)>>,
  error: Option<Box<dyn FnMut(Err)>>,
  complete: Option<Box<dyn FnMut()>>,
}

impl<Item, Err> Default for PartialObserver<Item, Err> {
  fn default() -> Self { Self { next: None, error: None, complete: None } }
}

impl<Item, Err> PartialObserver<Item, Err> {
  pub fn new() -> Self { Self::default() }

  pub fn on_next(mut self, f: impl FnMut(Item) + 'static) -> Self {
    self.next = Some(Box::new(f));
    self
  }

  pub fn on_error(mut self, f: impl FnMut(Err) + 'static) -> Self {
    self.error = Some(Box::new(f));
    self
  }

  pub fn on_complete(mut self, f: impl FnMut() + 'static) -> Self {
    self.complete = Some(Box::new(f));
    self
  }
}

impl<Item, Err: 'static> Observer<Item, Err> for PartialObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    if let Some(next) = &mut self.next {
      next(value);
    }
  }

  fn error(&mut self, err: Err) {
    match &mut self.error {
      Some(error) => error(err),
      None => report_unhandled_error(ErrorSource::MissingErrorHandler, err),
    }
  }

  fn complete(&mut self) {
    if let Some(complete) = &mut self.complete {
      complete();
    }
  }
}

// ============================================================================
// FnMutObserver - Closure adapter
// ============================================================================

/// Closure adapter: the closure becomes the `next` handler, completion is
/// ignored and errors go to the unhandled-error hook.
#[derive(Clone)]
pub struct FnMutObserver<F>(pub F);

impl<F, Item, Err: 'static> Observer<Item, Err> for FnMutObserver<F>
where
  F: FnMut(Item),
{
  #[inline]
  fn next(&mut self, v: Item) { (self.0)(v); }

  fn error(&mut self, err: Err) { report_unhandled_error(ErrorSource::MissingErrorHandler, err); }

  #[inline]
  fn complete(&mut self) {}
}

/// The sink behind [`Subscriber::empty`]: drops values and completion, and
/// reports errors as unhandled.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyObserver;

impl<Item, Err: 'static> Observer<Item, Err> for EmptyObserver {
  #[inline]
  fn next(&mut self, _: Item) {}

  fn error(&mut self, err: Err) { report_unhandled_error(ErrorSource::MissingErrorHandler, err); }

  #[inline]
  fn complete(&mut self) {}
}

// ============================================================================
// Tests
// ============================================================================
