use std::{
  cell::RefCell,
  fmt::{Debug, Formatter},
  rc::Rc,
};

use smallvec::SmallVec;

use crate::{
  config::report_unhandled_error,
  error::{ErrorSource, TeardownError, UnsubscriptionError},
};

/// Anything that can be cancelled: the handle returned from
/// `Observable::subscribe`, a `Subscriber`, or a bare `Subscription`.
pub trait SubscriptionLike {
  /// Cancel and run every registered teardown. Calling it again is a no-op.
  fn unsubscribe(&self);

  fn is_closed(&self) -> bool;

  /// Activates "RAII" behavior for this subscription. That means
  /// `unsubscribe()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately, which is probably not what you
  /// want!
  fn unsubscribe_when_dropped(self) -> SubscriptionGuard<Self>
  where
    Self: Sized,
  {
    SubscriptionGuard(self)
  }
}

/// A resource with a single release operation, such as a timer handle or a
/// connection owned by a producer.
pub trait Release {
  fn release(&mut self) -> Result<(), TeardownError>;
}

/// One teardown action owned by a [`Subscription`].
///
/// Producers return a `Teardown` from their setup; `()` converts to
/// [`Teardown::Empty`].
#[derive(Default)]
pub enum Teardown {
  /// Nothing to run.
  #[default]
  Empty,
  /// A nested registry, unsubscribed together with its parent.
  Subscription(Subscription),
  Callback(Box<dyn FnOnce()>),
  Fallible(Box<dyn FnOnce() -> Result<(), TeardownError>>),
  Resource(Box<dyn Release>),
}

impl Teardown {
  pub fn callback(f: impl FnOnce() + 'static) -> Self { Teardown::Callback(Box::new(f)) }

  pub fn fallible(f: impl FnOnce() -> Result<(), TeardownError> + 'static) -> Self {
    Teardown::Fallible(Box::new(f))
  }

  pub fn resource(resource: impl Release + 'static) -> Self { Teardown::Resource(Box::new(resource)) }

  #[inline]
  pub fn is_empty(&self) -> bool { matches!(self, Teardown::Empty) }

  fn execute(self, errors: &mut Vec<TeardownError>) {
    match self {
      Teardown::Empty => {}
      Teardown::Subscription(subscription) => {
        if let Err(err) = subscription.try_unsubscribe() {
          errors.extend(err.errors);
        }
      }
      Teardown::Callback(f) => f(),
      Teardown::Fallible(f) => {
        if let Err(err) = f() {
          errors.push(err);
        }
      }
      Teardown::Resource(mut resource) => {
        if let Err(err) = resource.release() {
          errors.push(err);
        }
      }
    }
  }

  /// Run this teardown on its own, reporting failures to the unhandled-error
  /// hook.
  pub(crate) fn execute_now(self) {
    let mut errors = vec![];
    self.execute(&mut errors);
    if !errors.is_empty() {
      report_unhandled_error(ErrorSource::Teardown, UnsubscriptionError { errors });
    }
  }
}

impl From<()> for Teardown {
  #[inline]
  fn from(_: ()) -> Self { Teardown::Empty }
}

impl From<Subscription> for Teardown {
  #[inline]
  fn from(subscription: Subscription) -> Self { Teardown::Subscription(subscription) }
}

impl From<Box<dyn Release>> for Teardown {
  #[inline]
  fn from(resource: Box<dyn Release>) -> Self { Teardown::Resource(resource) }
}

impl Debug for Teardown {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Teardown::Empty => f.write_str("Empty"),
      Teardown::Subscription(s) => f.debug_tuple("Subscription").field(s).finish(),
      Teardown::Callback(_) => f.write_str("Callback"),
      Teardown::Fallible(_) => f.write_str("Fallible"),
      Teardown::Resource(_) => f.write_str("Resource"),
    }
  }
}

/// Identifies a teardown registered with [`Subscription::add`], so it can be
/// detached again with [`Subscription::remove`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TeardownKey(usize);

/// The teardown registry: a composable, idempotent cancellation handle.
///
/// Cloning yields another handle to the same registry. Teardowns run in the
/// order they were added, each exactly once, on the first call to
/// `unsubscribe`.
#[derive(Clone, Default)]
pub struct Subscription(Rc<RefCell<Inner>>);

#[derive(Default)]
struct Inner {
  closed: bool,
  next_key: usize,
  teardowns: SmallVec<[(TeardownKey, Teardown); 2]>,
}

impl Subscription {
  pub fn new() -> Self { Self::default() }

  /// A registry that is already closed; anything added to it runs at once.
  pub fn new_closed() -> Self {
    let inner = Inner { closed: true, ..Inner::default() };
    Subscription(Rc::new(RefCell::new(inner)))
  }

  /// Register a teardown.
  ///
  /// If the registry is already closed, the teardown runs immediately instead
  /// and any failure goes to the unhandled-error hook. Adding a registry to
  /// itself, or to one of its own descendants, is ignored.
  pub fn add(&self, teardown: impl Into<Teardown>) -> TeardownKey {
    let teardown = teardown.into();
    let mut inner = self.0.borrow_mut();
    let key = TeardownKey(inner.next_key);
    inner.next_key += 1;
    if teardown.is_empty() {
      return key;
    }
    if let Teardown::Subscription(child) = &teardown {
      if child.reaches(self) {
        tracing::debug!("ignoring teardown registration that would form a cycle");
        return key;
      }
    }

    if inner.closed {
      drop(inner);
      teardown.execute_now();
    } else {
      inner.teardowns.retain(|(_, t)| !matches!(t, Teardown::Subscription(s) if s.is_closed()));
      inner.teardowns.push((key, teardown));
    }
    key
  }

  /// Detach a teardown without running it. Unknown keys are ignored.
  pub fn remove(&self, key: TeardownKey) -> Option<Teardown> {
    let mut inner = self.0.borrow_mut();
    let pos = inner.teardowns.iter().position(|(k, _)| *k == key)?;
    Some(inner.teardowns.remove(pos).1)
  }

  /// Detach a nested registry without unsubscribing it.
  pub fn remove_subscription(&self, subscription: &Subscription) -> bool {
    let mut inner = self.0.borrow_mut();
    let pos = inner
      .teardowns
      .iter()
      .position(|(_, t)| matches!(t, Teardown::Subscription(s) if s.ptr_eq(subscription)));
    match pos {
      Some(pos) => {
        inner.teardowns.remove(pos);
        true
      }
      None => false,
    }
  }

  /// Close the registry and run its teardowns, collecting every failure.
  ///
  /// A failing teardown does not stop the ones after it. Only the first call
  /// does any work; later calls return `Ok(())`.
  pub fn try_unsubscribe(&self) -> Result<(), UnsubscriptionError> {
    let teardowns = {
      let mut inner = self.0.borrow_mut();
      if inner.closed {
        return Ok(());
      }
      inner.closed = true;
      std::mem::take(&mut inner.teardowns)
    };
    tracing::trace!(teardowns = teardowns.len(), "unsubscribe");

    let mut errors = vec![];
    for (_, teardown) in teardowns {
      teardown.execute(&mut errors);
    }
    if errors.is_empty() {
      Ok(())
    } else {
      Err(UnsubscriptionError { errors })
    }
  }

  /// Number of teardowns currently registered.
  pub fn teardown_size(&self) -> usize { self.0.borrow().teardowns.len() }

  #[inline]
  pub fn ptr_eq(&self, other: &Subscription) -> bool { Rc::ptr_eq(&self.0, &other.0) }

  /// Whether `target` is this registry or nested anywhere below it.
  fn reaches(&self, target: &Subscription) -> bool {
    let mut visited: SmallVec<[*const RefCell<Inner>; 8]> = SmallVec::new();
    let mut stack = vec![self.clone()];
    while let Some(current) = stack.pop() {
      if current.ptr_eq(target) {
        return true;
      }
      let ptr = Rc::as_ptr(&current.0);
      if visited.contains(&ptr) {
        continue;
      }
      visited.push(ptr);
      let inner = current.0.borrow();
      stack.extend(inner.teardowns.iter().filter_map(|(_, t)| match t {
        Teardown::Subscription(s) => Some(s.clone()),
        _ => None,
      }));
    }
    false
  }
}

impl SubscriptionLike for Subscription {
  fn unsubscribe(&self) {
    if let Err(err) = self.try_unsubscribe() {
      report_unhandled_error(ErrorSource::Teardown, err);
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.borrow().closed }
}

impl Debug for Subscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let inner = self.0.borrow();
    f.debug_struct("Subscription")
      .field("closed", &inner.closed)
      .field("teardown_count", &inner.teardowns.len())
      .finish()
  }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard<T: SubscriptionLike>(pub(crate) T);

impl<T: SubscriptionLike> SubscriptionGuard<T> {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(subscription) }

  pub fn inner(&self) -> &T { &self.0 }
}

impl<T: SubscriptionLike> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) { self.0.unsubscribe() }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use super::*;
  use crate::config::with_unhandled_error_handler;

  fn counter() -> (Rc<Cell<u32>>, impl FnOnce() + 'static) {
    let count = Rc::new(Cell::new(0));
    let c_count = count.clone();
    (count, move || c_count.set(c_count.get() + 1))
  }

  #[rxcore_macro::test]
  fn add_remove() {
    let parent = Subscription::new();
    let l1 = Subscription::new();
    parent.add(l1.clone());
    assert_eq!(parent.teardown_size(), 1);
    parent.add(Subscription::new());
    let key = parent.add(Teardown::callback(|| {}));
    assert_eq!(parent.teardown_size(), 3);

    assert!(parent.remove(key).is_some());
    assert!(parent.remove(key).is_none());
    assert!(parent.remove_subscription(&l1));
    assert_eq!(parent.teardown_size(), 1);

    parent.unsubscribe();
    assert!(!l1.is_closed());
  }

  #[rxcore_macro::test]
  fn teardown_runs_exactly_once() {
    let (count, f) = counter();
    let subscription = Subscription::new();
    subscription.add(Teardown::callback(f));
    subscription.unsubscribe();
    subscription.unsubscribe();
    assert!(subscription.is_closed());
    assert_eq!(count.get(), 1);
  }

  #[rxcore_macro::test]
  fn teardowns_run_in_addition_order() {
    let order = Rc::new(RefCell::new(vec![]));
    let subscription = Subscription::new();
    for i in 0..3 {
      let order = order.clone();
      subscription.add(Teardown::callback(move || order.borrow_mut().push(i)));
    }
    subscription.unsubscribe();
    assert_eq!(*order.borrow(), vec![0, 1, 2]);
  }

  #[rxcore_macro::test]
  fn add_to_closed_runs_immediately() {
    let (count, f) = counter();
    let subscription = Subscription::new_closed();
    subscription.add(Teardown::callback(f));
    assert_eq!(count.get(), 1);

    let child = Subscription::new();
    subscription.add(child.clone());
    assert!(child.is_closed());
    assert_eq!(subscription.teardown_size(), 0);
  }

  #[rxcore_macro::test]
  fn nested_registry_closes_with_parent() {
    let parent = Subscription::new();
    let child = Subscription::new();
    let (count, f) = counter();
    child.add(Teardown::callback(f));
    parent.add(child.clone());
    parent.unsubscribe();
    assert!(child.is_closed());
    assert_eq!(count.get(), 1);
  }

  #[rxcore_macro::test]
  fn closed_children_are_pruned_on_add() {
    let parent = Subscription::new();
    let child = Subscription::new();
    parent.add(child.clone());
    child.unsubscribe();
    parent.add(Subscription::new());
    assert_eq!(parent.teardown_size(), 1);
  }

  #[rxcore_macro::test]
  fn cycles_are_rejected() {
    let a = Subscription::new();
    let b = Subscription::new();
    a.add(a.clone());
    assert_eq!(a.teardown_size(), 0);

    a.add(b.clone());
    b.add(a.clone());
    assert_eq!(b.teardown_size(), 0);

    a.unsubscribe();
    assert!(b.is_closed());
  }

  struct Flaky(&'static str);

  impl Release for Flaky {
    fn release(&mut self) -> Result<(), TeardownError> { Err(self.0.into()) }
  }

  #[rxcore_macro::test]
  fn teardown_errors_are_aggregated() {
    let parent = Subscription::new();
    let child = Subscription::new();
    let (count, f) = counter();
    parent.add(Teardown::fallible(|| Err("first".into())));
    child.add(Teardown::resource(Flaky("nested")));
    parent.add(child);
    parent.add(Teardown::callback(f));

    let err = parent.try_unsubscribe().unwrap_err();
    let messages: Vec<_> = err.errors.iter().map(|e| e.to_string()).collect();
    assert_eq!(messages, vec!["first", "nested"]);
    assert_eq!(count.get(), 1);
    assert!(parent.try_unsubscribe().is_ok());
  }

  #[rxcore_macro::test]
  fn implicit_unsubscribe_reports_teardown_errors() {
    let reported = Rc::new(Cell::new(0));
    let c_reported = reported.clone();
    with_unhandled_error_handler(
      move |err| {
        assert_eq!(err.origin(), ErrorSource::Teardown);
        let err = err.downcast_ref::<UnsubscriptionError>().unwrap();
        c_reported.set(c_reported.get() + err.len());
      },
      || {
        let subscription = Subscription::new();
        subscription.add(Teardown::fallible(|| Err("a".into())));
        subscription.add(Teardown::fallible(|| Err("b".into())));
        subscription.unsubscribe();
      },
    );
    assert_eq!(reported.get(), 2);
  }

  #[rxcore_macro::test]
  fn teardown_may_unsubscribe_its_own_registry() {
    let subscription = Subscription::new();
    let c_subscription = subscription.clone();
    let (count, f) = counter();
    subscription.add(Teardown::callback(move || c_subscription.unsubscribe()));
    subscription.add(Teardown::callback(f));
    subscription.unsubscribe();
    assert_eq!(count.get(), 1);
  }

  #[rxcore_macro::test]
  fn guard_unsubscribes_on_drop() {
    let subscription = Subscription::new();
    {
      let _guard = subscription.clone().unsubscribe_when_dropped();
      assert!(!subscription.is_closed());
    }
    assert!(subscription.is_closed());
  }
}
