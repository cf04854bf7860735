//! Prelude module for convenient imports

pub use crate::{
  config::{
    max_subscribe_depth, reset_unhandled_error_handler, set_max_subscribe_depth,
    set_unhandled_error_handler, with_max_subscribe_depth, with_unhandled_error_handler,
  },
  error::{ErrorSource, RecursionLimitExceeded, UnhandledError, UnsubscriptionError},
  observable::{ForEach, Liftable, Observable, Operator, Pipe, PipeChain, Subscribable},
  observer::{EmptyObserver, FnMutObserver, Observer, PartialObserver},
  ops,
  subject::{AnonymousSubject, Subject},
  subscriber::Subscriber,
  subscription::{
    Release, Subscription, SubscriptionGuard, SubscriptionLike, Teardown, TeardownKey,
  },
};
