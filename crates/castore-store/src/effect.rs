//! Execution contexts for store operations.
//!
//! A backend chooses how its suspending operations run by naming an
//! [`Effect`] as its [`PathStore::Ctx`]. The operation signatures stay the
//! same; only the wrapper around each result changes.
//!
//! [`PathStore::Ctx`]: crate::PathStore::Ctx

use futures::future::BoxFuture;

use crate::error::StoreResult;
use crate::traits::PathStore;

/// Wraps the result of a potentially-failing, potentially-suspending call.
pub trait Effect {
    type Output<'a, T: 'a>;
}

/// Operations run to completion on the calling thread.
#[derive(Debug, Clone, Copy)]
pub enum Blocking {}

impl Effect for Blocking {
    type Output<'a, T: 'a> = StoreResult<T>;
}

/// Operations return a future that does the work when polled.
#[derive(Debug, Clone, Copy)]
pub enum Deferred {}

impl Effect for Deferred {
    type Output<'a, T: 'a> = BoxFuture<'a, StoreResult<T>>;
}

/// The wrapped result of a suspending operation on store `S`.
pub type Ctx<'a, S, T> = <<S as PathStore>::Ctx as Effect>::Output<'a, T>;
