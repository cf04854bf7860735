//! Left-to-right operator composition.
//!
//! `source.pipe((a, b, c))` is `c(b(a(source)))`. Each step is any
//! `FnOnce(Input) -> Output`, usually one of the functions in
//! [`ops`](crate::ops). `source.pipe(())` hands back the source itself.
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! let source = Observable::new(|s: &Subscriber<i32, String>| {
//!   (1..=6).for_each(|v| s.next(v));
//!   s.complete();
//! });
//! let evens = source.pipe((ops::filter(|v: &i32| v % 2 == 0), ops::map(|v: i32| v * 10)));
//! evens.subscribe_next(|v| println!("{v}"));
//!
//! assert!(source.pipe(()).ptr_eq(&source));
//! ```

/// A sequence of steps that can be applied to a source of type `S`.
pub trait PipeChain<S> {
  type Output;

  fn apply(self, source: S) -> Self::Output;
}

impl<S> PipeChain<S> for () {
  type Output = S;

  #[inline]
  fn apply(self, source: S) -> S { source }
}

macro_rules! impl_pipe_chain {
  ($head:ident) => {
    impl<S, O, $head> PipeChain<S> for ($head,)
    where
      $head: FnOnce(S) -> O,
    {
      type Output = O;

      #[inline]
      fn apply(self, source: S) -> O { (self.0)(source) }
    }
  };
  ($head:ident, $($tail:ident),+) => {
    impl<S, O, $head, $($tail),+> PipeChain<S> for ($head, $($tail),+)
    where
      $head: FnOnce(S) -> O,
      ($($tail,)+): PipeChain<O>,
    {
      type Output = <($($tail,)+) as PipeChain<O>>::Output;

      #[inline]
      #[allow(non_snake_case)]
      fn apply(self, source: S) -> Self::Output {
        let ($head, $($tail),+) = self;
        ($($tail,)+).apply($head(source))
      }
    }

    impl_pipe_chain!($($tail),+);
  };
}

impl_pipe_chain!(F1, F2, F3, F4, F5, F6, F7, F8);

/// Sources that support `pipe`.
pub trait Pipe: Clone {
  #[inline]
  fn pipe<P: PipeChain<Self>>(&self, chain: P) -> P::Output { chain.apply(self.clone()) }
}
