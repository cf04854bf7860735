use std::rc::Rc;

use crate::{
  observable::{Liftable, Operator, Subscribable},
  subscriber::Subscriber,
  subscription::Teardown,
};

/// Call `func` once per subscription when it ends, whether by completion,
/// error or unsubscribe.
///
/// `func` runs after the source's own teardown.
pub fn finalize<S, Item, Err, F>(
  func: F,
) -> impl FnOnce(S) -> <S as Liftable<Item, Err>>::Lifted<Item>
where
  S: Liftable<Item, Err>,
  F: Fn() + 'static,
  Item: 'static,
  Err: 'static,
{
  move |source: S| source.lift::<Item, _>(Finalize::new(func))
}

/// The [`Operator`] behind [`finalize`].
pub struct Finalize<F> {
  func: Rc<F>,
}

impl<F> Finalize<F> {
  pub fn new(func: F) -> Self { Finalize { func: Rc::new(func) } }
}

impl<Item, Err, F> Operator<Item, Item, Err> for Finalize<F>
where
  F: Fn() + 'static,
  Item: 'static,
  Err: 'static,
{
  fn call(
    &self, subscriber: Subscriber<Item, Err>, source: &dyn Subscribable<Item, Err>,
  ) -> Result<Teardown, Err> {
    source.actual_subscribe(Subscriber::wrap(subscriber));
    let func = self.func.clone();
    Ok(Teardown::callback(move || func()))
  }
}
