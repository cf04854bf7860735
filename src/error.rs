//! Error types shared by the engine.
//!
//! Stream errors themselves are generic (`Observer<Item, Err>`); the types here
//! cover what the engine raises on its own: aggregated teardown failures, the
//! subscribe-depth guard, and errors that reach the unhandled-error hook.

use std::{
  any::{type_name, Any},
  fmt::{self, Display, Formatter},
  rc::Rc,
  sync::Arc,
};

use thiserror::Error;

/// A failure raised by a single teardown action.
pub type TeardownError = Box<dyn std::error::Error + 'static>;

/// Every failure collected while running the teardown of one registry.
///
/// Failures of nested registries are flattened into the outermost list, so a
/// caller sees each failing action exactly once.
#[derive(Error, Debug)]
#[error("{} error(s) occurred during unsubscription", .errors.len())]
pub struct UnsubscriptionError {
  pub errors: Vec<TeardownError>,
}

impl UnsubscriptionError {
  pub fn len(&self) -> usize { self.errors.len() }

  pub fn is_empty(&self) -> bool { self.errors.is_empty() }
}

/// Raised when nested `subscribe` calls on one thread go deeper than
/// [`max_subscribe_depth`](crate::config::max_subscribe_depth).
///
/// It is delivered through the subscriber's `error` channel like any other
/// producer failure, so the stream error type has to be able to hold it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("maximum subscribe depth of {limit} exceeded")]
pub struct RecursionLimitExceeded {
  pub limit: usize,
}

impl From<RecursionLimitExceeded> for String {
  fn from(err: RecursionLimitExceeded) -> Self { err.to_string() }
}

impl From<RecursionLimitExceeded> for &'static str {
  fn from(_: RecursionLimitExceeded) -> Self { "maximum subscribe depth exceeded" }
}

impl From<RecursionLimitExceeded> for () {
  fn from(_: RecursionLimitExceeded) -> Self {}
}

impl From<RecursionLimitExceeded> for Rc<dyn std::error::Error> {
  fn from(err: RecursionLimitExceeded) -> Self { Rc::new(err) }
}

impl From<RecursionLimitExceeded> for Arc<dyn std::error::Error + Send + Sync> {
  fn from(err: RecursionLimitExceeded) -> Self { Arc::new(err) }
}

/// Why an error ended up at the unhandled-error hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
  /// `error` reached an observer with no error handler.
  MissingErrorHandler,
  /// An error arrived after its subscriber had stopped, or was cancelled
  /// before a queued error could be delivered.
  AfterTermination,
  /// Teardown failed during an implicit unsubscribe.
  Teardown,
}

impl Display for ErrorSource {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      ErrorSource::MissingErrorHandler => f.write_str("missing error handler"),
      ErrorSource::AfterTermination => f.write_str("error after termination"),
      ErrorSource::Teardown => f.write_str("teardown failure"),
    }
  }
}

/// An error that no observer could take.
///
/// The payload keeps its concrete type; use [`UnhandledError::downcast_ref`]
/// to inspect it.
#[derive(Error, Debug)]
#[error("unhandled error ({origin}) of type `{type_name}`")]
pub struct UnhandledError {
  origin: ErrorSource,
  type_name: &'static str,
  payload: Box<dyn Any>,
}

impl UnhandledError {
  pub(crate) fn new<E: 'static>(origin: ErrorSource, err: E) -> Self {
    Self { origin, type_name: type_name::<E>(), payload: Box::new(err) }
  }

  #[inline]
  pub fn origin(&self) -> ErrorSource { self.origin }

  /// Type name of the payload, as reported by `std::any::type_name`.
  #[inline]
  pub fn type_name(&self) -> &'static str { self.type_name }

  pub fn downcast_ref<E: 'static>(&self) -> Option<&E> { self.payload.downcast_ref() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxcore_macro::test]
  fn unhandled_error_keeps_payload() {
    let err = UnhandledError::new(ErrorSource::AfterTermination, String::from("late"));
    assert_eq!(err.origin(), ErrorSource::AfterTermination);
    assert_eq!(err.downcast_ref::<String>().map(String::as_str), Some("late"));
    assert!(err.downcast_ref::<&str>().is_none());
    assert!(err.to_string().contains("error after termination"));
  }

  #[rxcore_macro::test]
  fn recursion_limit_converts_into_common_error_types() {
    let err = RecursionLimitExceeded { limit: 8 };
    let as_string: String = err.into();
    assert_eq!(as_string, "maximum subscribe depth of 8 exceeded");
    let boxed: Box<dyn std::error::Error> = err.into();
    assert!(boxed.downcast_ref::<RecursionLimitExceeded>().is_some());
  }

  #[rxcore_macro::test]
  fn unsubscription_error_counts_failures() {
    let err = UnsubscriptionError { errors: vec!["a".into(), "b".into()] };
    assert_eq!(err.len(), 2);
    assert_eq!(err.to_string(), "2 error(s) occurred during unsubscription");
  }
}
