//! End-to-end behaviour of the subscription lifecycle: producers, operator
//! chains, subjects and error routing working together.

use std::{
  cell::{Cell, RefCell},
  rc::Rc,
};

use rxcore::prelude::*;

type Log = Rc<RefCell<Vec<String>>>;

fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

fn recorder<T: std::fmt::Debug + 'static>(log: &Log) -> PartialObserver<T, String> {
  let (c_next, c_error, c_complete) = (log.clone(), log.clone(), log.clone());
  PartialObserver::new()
    .on_next(move |v| c_next.borrow_mut().push(format!("next {v:?}")))
    .on_error(move |e| c_error.borrow_mut().push(format!("error {e:?}")))
    .on_complete(move || c_complete.borrow_mut().push("complete".to_owned()))
}

/// A producer that keeps calling into its subscriber whatever happens.
fn stubborn(slot: Rc<RefCell<Option<Subscriber<i32, String>>>>) -> Observable<i32, String> {
  Observable::new(move |s: &Subscriber<i32, String>| {
    *slot.borrow_mut() = Some(s.clone());
  })
}

#[rxcore_macro::test]
fn silent_producer_stays_open_until_unsubscribed() {
  init_tracing();
  let subscription = Observable::<i32, String>::new(|s| {
    s.next(1);
  })
  .subscribe_next(|_| {});
  assert!(!subscription.is_closed());
  assert!(!subscription.is_stopped());
  subscription.unsubscribe();
  assert!(subscription.is_closed());
}

#[rxcore_macro::test]
fn producer_teardown_runs_at_most_once() {
  let runs = Rc::new(Cell::new(0));
  let c_runs = runs.clone();
  let source = Observable::<i32, String>::new(move |s| {
    let c_runs = c_runs.clone();
    s.add(Teardown::callback(move || c_runs.set(c_runs.get() + 1)));
  });
  let subscription = source.subscribe_next(|_| {});
  for _ in 0..3 {
    subscription.unsubscribe();
  }
  assert_eq!(runs.get(), 1);
}

#[rxcore_macro::test]
fn nothing_is_observable_after_a_terminal_notification() {
  let log = Log::default();
  let slot = Rc::default();
  stubborn(Rc::clone(&slot)).subscribe(recorder::<i32>(&log));
  let producer = slot.borrow_mut().take().unwrap();

  producer.next(1);
  producer.error("first".to_owned());
  producer.next(2);
  producer.error("second".to_owned());
  producer.complete();

  assert_eq!(*log.borrow(), vec!["next 1", "error \"first\""]);
}

#[rxcore_macro::test]
fn nothing_is_observable_after_unsubscribe() {
  let log = Log::default();
  let slot = Rc::default();
  let subscription = stubborn(Rc::clone(&slot)).subscribe(recorder::<i32>(&log));
  let producer = slot.borrow_mut().take().unwrap();

  producer.next(1);
  subscription.unsubscribe();
  producer.next(2);
  producer.error("late".to_owned());
  producer.complete();

  assert_eq!(*log.borrow(), vec!["next 1"]);
}

#[rxcore_macro::test]
fn terminal_emitted_from_a_handler_survives_its_unsubscribe() {
  for terminal in ["error", "complete"] {
    let log = Log::default();
    let handle: Rc<RefCell<Option<Subscriber<i32, String>>>> = Rc::default();
    let (c_handle, c_log) = (handle.clone(), log.clone());
    let source = Observable::new(move |s: &Subscriber<i32, String>| {
      *c_handle.borrow_mut() = Some(s.clone());
      let c_log = c_log.clone();
      s.add(Teardown::callback(move || c_log.borrow_mut().push("teardown".to_owned())));
      s.next(1);
      s.next(2);
    });

    let (c_handle, c_log) = (handle.clone(), log.clone());
    let observer = recorder::<i32>(&log).on_next(move |v| {
      c_log.borrow_mut().push(format!("next {v:?}"));
      let s = c_handle.borrow().clone().unwrap();
      if terminal == "error" {
        s.error("stop".to_owned());
      } else {
        s.complete();
      }
      s.unsubscribe();
      s.unsubscribe();
    });
    let subscription = source.subscribe(observer);

    let expected = if terminal == "error" { "error \"stop\"" } else { "complete" };
    assert_eq!(*log.borrow(), vec!["next 1", expected, "teardown"]);
    assert!(subscription.is_closed());
    handle.borrow_mut().take();
  }
}

#[rxcore_macro::test]
fn empty_pipe_is_identity() {
  let source = Observable::<i32, String>::new(|s| s.complete());
  assert!(source.pipe(()).ptr_eq(&source));

  let subject = Subject::<i32, String>::new();
  assert!(subject.pipe(()).ptr_eq(&subject));
}

#[rxcore_macro::test]
fn producer_failure_carries_the_exact_value() {
  let log = Log::default();
  Observable::<i32, String>::new(|_| Err::<(), _>(String::new())).subscribe(recorder(&log));
  assert_eq!(*log.borrow(), vec!["error \"\""]);
}

#[rxcore_macro::test]
fn synchronous_values_are_recorded_before_subscribe_returns() {
  let log = Log::default();
  let c_log = log.clone();
  let subscription = Observable::new(|s: &Subscriber<i32, String>| {
    s.next(1);
    s.complete();
  })
  .subscribe(recorder(&log));
  c_log.borrow_mut().push("returned".to_owned());

  assert_eq!(*log.borrow(), vec!["next 1", "complete", "returned"]);
  assert!(subscription.is_closed());
}

#[rxcore_macro::test]
fn for_each_stops_at_the_failing_value() {
  let log = Log::default();
  let c_log = log.clone();
  let source = Observable::new(|s: &Subscriber<i32, String>| {
    for v in 1..=4 {
      s.next(v);
    }
    s.complete();
  });
  let done = source.for_each(move |v| {
    c_log.borrow_mut().push(v.to_string());
    if v == 3 { Err("boom".to_owned()) } else { Ok(()) }
  });
  if let Err(err) = futures::executor::block_on(done) {
    log.borrow_mut().push(err);
  }
  assert_eq!(*log.borrow(), vec!["1", "2", "3", "boom"]);
}

#[rxcore_macro::test]
fn subject_delivers_to_peers_independently() {
  let log = Log::default();
  let subject = Subject::<i32, String>::new();
  let (c_a, c_b) = (log.clone(), log.clone());
  let a = subject.subscribe_next(move |v| c_a.borrow_mut().push(format!("a {v}")));
  subject.subscribe_next(move |v| c_b.borrow_mut().push(format!("b {v}")));

  subject.next(1);
  a.unsubscribe();
  subject.next(2);

  assert_eq!(*log.borrow(), vec!["a 1", "b 1", "b 2"]);
}

#[rxcore_macro::test]
fn never_emits_anything() {
  let log = Log::default();
  let never = Observable::<i32, String>::default();
  let subscription = never.subscribe(recorder(&log));
  never.subscribe(recorder(&log));
  assert!(log.borrow().is_empty());
  assert!(!subscription.is_closed());
}

/// A variant that counts how many subscriptions went through it.
struct Counted<T> {
  inner: Observable<T, String>,
  subscriptions: Rc<Cell<usize>>,
}

impl<T> Clone for Counted<T> {
  fn clone(&self) -> Self {
    Counted { inner: self.inner.clone(), subscriptions: self.subscriptions.clone() }
  }
}

impl<T: 'static> Subscribable<T, String> for Counted<T> {
  fn actual_subscribe(&self, subscriber: Subscriber<T, String>) -> Subscriber<T, String> {
    self.subscriptions.set(self.subscriptions.get() + 1);
    self.inner.actual_subscribe(subscriber)
  }
}

impl<T: 'static> Liftable<T, String> for Counted<T> {
  type Lifted<R: 'static> = Counted<R>;

  fn lift<R, Op>(&self, operator: Op) -> Counted<R>
  where
    R: 'static,
    Op: Operator<T, R, String> + 'static,
  {
    Counted {
      inner: Observable::lift_from(self.clone(), operator),
      subscriptions: self.subscriptions.clone(),
    }
  }
}

impl<T> Pipe for Counted<T> {}

#[rxcore_macro::test]
fn lifting_a_custom_variant_keeps_the_variant() {
  let seen = Rc::new(RefCell::new(vec![]));
  let c_seen = seen.clone();
  let source = Counted {
    inner: Observable::new(|s: &Subscriber<i32, String>| {
      (1..=5).for_each(|v| s.next(v));
      s.complete();
    }),
    subscriptions: Rc::default(),
  };

  let chained: Counted<String> = source.pipe((
    ops::filter(|v: &i32| v % 2 == 1),
    ops::map(|v: i32| format!("odd {v}")),
    ops::take(2),
  ));
  chained.subscribe_next(move |v| c_seen.borrow_mut().push(v));

  assert_eq!(*seen.borrow(), vec!["odd 1", "odd 3"]);
  // Every lifted layer is itself a `Counted`, so each one counted the
  // subscription passing through it.
  assert_eq!(source.subscriptions.get(), 4);
}

#[rxcore_macro::test]
fn unsubscribing_the_end_of_a_chain_reaches_the_producer() {
  let torn = Rc::new(Cell::new(false));
  let c_torn = torn.clone();
  let source = Observable::<i32, String>::new(move |_| {
    let c_torn = c_torn.clone();
    Teardown::callback(move || c_torn.set(true))
  });
  let subscription = source
    .pipe((ops::map(|v: i32| v + 1), ops::filter(|v: &i32| *v > 0), ops::map(|v: i32| v * 2)))
    .subscribe_next(|_| {});
  subscription.unsubscribe();
  assert!(torn.get());
}

#[rxcore_macro::test]
fn runaway_self_subscription_is_reported_as_error() {
  let log = Log::default();
  let slot: Rc<RefCell<Option<Observable<i32, String>>>> = Rc::default();
  let c_slot = slot.clone();
  let looping = Observable::new(move |s: &Subscriber<i32, String>| {
    let again = c_slot.borrow().clone();
    if let Some(again) = again {
      again.subscribe(s.clone());
    }
  });
  *slot.borrow_mut() = Some(looping.clone());

  with_max_subscribe_depth(32, || looping.subscribe(recorder(&log)));
  slot.borrow_mut().take();

  let expected: String = RecursionLimitExceeded { limit: 32 }.into();
  assert_eq!(*log.borrow(), vec![format!("error {expected:?}")]);
}

#[rxcore_macro::test]
fn unroutable_errors_reach_the_hook() {
  let reported = Rc::new(RefCell::new(vec![]));
  let c_reported = reported.clone();
  with_unhandled_error_handler(
    move |err| c_reported.borrow_mut().push(err.origin()),
    || {
      // No error handler.
      Observable::<i32, String>::new(|s| s.error("unheard".to_owned())).subscribe_next(|_| {});
      // Failure after completion.
      Observable::<i32, String>::new(|s| {
        s.complete();
        Err::<(), _>("late".to_owned())
      })
      .subscribe_next(|_| {});
      // Teardown failure during an implicit unsubscribe.
      Observable::<i32, String>::new(|s| {
        s.add(Teardown::fallible(|| Err("teardown".into())));
        s.complete();
      })
      .subscribe_next(|_| {});
    },
  );
  assert_eq!(
    *reported.borrow(),
    vec![ErrorSource::MissingErrorHandler, ErrorSource::AfterTermination, ErrorSource::Teardown]
  );
}

#[rxcore_macro::test]
fn explicit_unsubscribe_aggregates_teardown_failures() {
  let subscription = Subscription::new();
  let ran = Rc::new(Cell::new(0));
  for name in ["a", "b"] {
    subscription.add(Teardown::fallible(move || Err(name.into())));
    let c_ran = ran.clone();
    subscription.add(Teardown::callback(move || c_ran.set(c_ran.get() + 1)));
  }
  let err = subscription.try_unsubscribe().unwrap_err();
  assert_eq!(err.len(), 2);
  assert_eq!(ran.get(), 2);
  assert!(subscription.try_unsubscribe().is_ok());
}

#[cfg(not(target_arch = "wasm32"))]
#[rxcore_macro::test]
async fn for_each_awaits_an_asynchronous_source() {
  let subject = Subject::<i32, String>::new();
  let sum = Rc::new(Cell::new(0));
  let c_sum = sum.clone();
  let done = subject.for_each(move |v| {
    c_sum.set(c_sum.get() + v);
    Ok(())
  });

  let feed = async {
    for v in 1..=3 {
      tokio::time::sleep(std::time::Duration::from_millis(1)).await;
      subject.next(v);
    }
    subject.complete();
    subject.next(100);
  };
  let (result, ()) = tokio::join!(done, feed);

  assert_eq!(result, Ok(()));
  assert_eq!(sum.get(), 6);
}

#[rxcore_macro::test]
async fn for_each_cancels_an_asynchronous_source() {
  let subject = Subject::<i32, String>::new();
  let done = subject.for_each(|v| if v == 2 { Err(format!("stop at {v}")) } else { Ok(()) });
  subject.next(1);
  subject.next(2);
  assert!(!subject.observed());
  subject.next(3);
  assert_eq!(done.await, Err("stop at 2".to_owned()));
}
