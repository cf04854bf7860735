//! Operators built on [`Operator`](crate::observable::Operator) and `lift`.
//!
//! Each operator comes in two forms: a struct implementing `Operator`, which
//! can be passed to `lift` directly, and a function returning a step for
//! [`pipe`](crate::observable::Pipe::pipe). The function form keeps the kind
//! of the source, so piping a `Subject` yields an `AnonymousSubject`.

pub mod filter;
pub mod finalize;
pub mod map;
pub mod take;

pub use filter::{filter, Filter};
pub use finalize::{finalize, Finalize};
pub use map::{map, Map};
pub use take::{take, Take};
