//! Process-wide engine configuration.
//!
//! Two knobs live here: the unhandled-error hook, which is the single place
//! errors go when no observer can take them, and the maximum depth of nested
//! `subscribe` calls on one thread.
//!
//! Both are set once at start-up in normal use. Tests that need their own
//! values should use [`with_unhandled_error_handler`] and
//! [`with_max_subscribe_depth`], which only affect the calling thread.

use std::{
  cell::{Cell, RefCell},
  rc::Rc,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, PoisonError, RwLock,
  },
};

use once_cell::sync::Lazy;

use crate::error::{ErrorSource, UnhandledError};

/// Default value of [`max_subscribe_depth`].
pub const DEFAULT_MAX_SUBSCRIBE_DEPTH: usize = 256;

type GlobalHandler = Arc<dyn Fn(&UnhandledError) + Send + Sync>;
type LocalHandler = Rc<dyn Fn(&UnhandledError)>;

static UNHANDLED_ERROR_HANDLER: Lazy<RwLock<GlobalHandler>> =
  Lazy::new(|| RwLock::new(Arc::new(log_unhandled_error)));

static MAX_SUBSCRIBE_DEPTH: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_SUBSCRIBE_DEPTH);

thread_local! {
  static LOCAL_HANDLERS: RefCell<Vec<LocalHandler>> = const { RefCell::new(Vec::new()) };
  static LOCAL_MAX_DEPTH: Cell<Option<usize>> = const { Cell::new(None) };
}

fn log_unhandled_error(err: &UnhandledError) {
  tracing::error!(origin = %err.origin(), type_name = err.type_name(), "{err}");
}

/// Replace the process-wide unhandled-error hook.
pub fn set_unhandled_error_handler<F>(handler: F)
where
  F: Fn(&UnhandledError) + Send + Sync + 'static,
{
  let mut slot = UNHANDLED_ERROR_HANDLER.write().unwrap_or_else(PoisonError::into_inner);
  *slot = Arc::new(handler);
}

/// Restore the default hook, which logs through `tracing`.
pub fn reset_unhandled_error_handler() { set_unhandled_error_handler(log_unhandled_error); }

/// Run `body` with `handler` receiving every unhandled error raised on the
/// current thread.
///
/// The thread-local handler shadows the process-wide one and calls nest: the
/// innermost handler wins.
pub fn with_unhandled_error_handler<F, R>(handler: F, body: impl FnOnce() -> R) -> R
where
  F: Fn(&UnhandledError) + 'static,
{
  struct Pop;
  impl Drop for Pop {
    fn drop(&mut self) {
      LOCAL_HANDLERS.with(|handlers| {
        handlers.borrow_mut().pop();
      });
    }
  }

  LOCAL_HANDLERS.with(|handlers| handlers.borrow_mut().push(Rc::new(handler)));
  let _pop = Pop;
  body()
}

/// Route `err` to the unhandled-error hook.
///
/// This is the only place the engine hands errors to the hook.
pub fn report_unhandled_error<E: 'static>(origin: ErrorSource, err: E) {
  let err = UnhandledError::new(origin, err);
  // Clone the handler out so it may itself report or reconfigure.
  let local = LOCAL_HANDLERS.with(|handlers| handlers.borrow().last().cloned());
  match local {
    Some(handler) => handler(&err),
    None => {
      let global = UNHANDLED_ERROR_HANDLER.read().unwrap_or_else(PoisonError::into_inner).clone();
      global(&err)
    }
  }
}

/// Set how many `subscribe` calls may be nested on one thread before the
/// innermost one fails with
/// [`RecursionLimitExceeded`](crate::error::RecursionLimitExceeded).
pub fn set_max_subscribe_depth(depth: usize) { MAX_SUBSCRIBE_DEPTH.store(depth, Ordering::Relaxed); }

/// The depth limit in effect on the calling thread.
pub fn max_subscribe_depth() -> usize {
  LOCAL_MAX_DEPTH
    .with(Cell::get)
    .unwrap_or_else(|| MAX_SUBSCRIBE_DEPTH.load(Ordering::Relaxed))
}

/// Run `body` with the depth limit set to `depth` on the current thread only.
/// The previous limit is restored afterwards, even if `body` panics.
pub fn with_max_subscribe_depth<R>(depth: usize, body: impl FnOnce() -> R) -> R {
  struct Restore(Option<usize>);
  impl Drop for Restore {
    fn drop(&mut self) { LOCAL_MAX_DEPTH.with(|local| local.set(self.0)); }
  }

  let _restore = Restore(LOCAL_MAX_DEPTH.with(|local| local.replace(Some(depth))));
  body()
}
