use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::warn;

use castore_types::{Digest, StorePath, SubstitutableInfo};

use crate::effect::{Blocking, Ctx, Deferred};
use crate::error::{StoreError, StoreResult};
use crate::traits::PathStore;

/// Exposes a blocking backend through futures.
///
/// Each suspending operation runs the backend call on tokio's blocking pool
/// and is bounded by an optional timeout. The witness types are the inner
/// backend's, so witnesses move freely between the two views of one store.
/// Must be polled inside a tokio runtime.
pub struct AsyncStore<S> {
    inner: Arc<S>,
    timeout: Option<Duration>,
}

impl<S> AsyncStore<S>
where
    S: PathStore<Ctx = Blocking> + Send + Sync + 'static,
    S::Rooted: Send + Sync,
    S::Valid: Clone + Send + Sync,
{
    pub fn new(inner: Arc<S>, timeout: Option<Duration>) -> Self {
        Self { inner, timeout }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    fn run<'a, T, F>(&'a self, op: &'static str, call: F) -> BoxFuture<'a, StoreResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> StoreResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let limit = self.timeout;
        Box::pin(async move {
            let task = tokio::task::spawn_blocking(move || call(&inner));
            let joined = match limit {
                Some(after) => tokio::time::timeout(after, task).await.map_err(|_| {
                    warn!(op, ?after, "store query timed out");
                    StoreError::Timeout { op, after }
                })?,
                None => task.await,
            };
            joined.map_err(|e| StoreError::TaskFailed(e.to_string()))?
        })
    }
}

impl<S> PathStore for AsyncStore<S>
where
    S: PathStore<Ctx = Blocking> + Send + Sync + 'static,
    S::Rooted: Send + Sync,
    S::Valid: Clone + Send + Sync,
{
    type Rooted = S::Rooted;
    type Valid = S::Valid;
    type Ctx = Deferred;

    fn check_valid(&self, rooted: HashSet<S::Rooted>) -> HashSet<S::Valid> {
        self.inner.check_valid(rooted)
    }

    fn referrers<'a>(&'a self, valid: &'a S::Valid) -> Ctx<'a, Self, HashSet<StorePath>> {
        let valid = valid.clone();
        self.run("referrers", move |s| s.referrers(&valid))
    }

    fn acquire_root(&self, path: StorePath) -> Ctx<'_, Self, S::Rooted> {
        self.run("acquire_root", move |s| s.acquire_root(path))
    }

    fn substitutable_info(
        &self,
        paths: HashSet<StorePath>,
    ) -> Ctx<'_, Self, HashMap<StorePath, SubstitutableInfo>> {
        self.run("substitutable_info", move |s| s.substitutable_info(paths))
    }

    fn valid_derivers(&self, path: StorePath) -> Ctx<'_, Self, HashSet<StorePath>> {
        self.run("valid_derivers", move |s| s.valid_derivers(path))
    }

    fn derivation_outputs<'a>(&'a self, valid: &'a S::Valid) -> Ctx<'a, Self, HashSet<StorePath>> {
        let valid = valid.clone();
        self.run("derivation_outputs", move |s| s.derivation_outputs(&valid))
    }

    fn derivation_output_names<'a>(
        &'a self,
        valid: &'a S::Valid,
    ) -> Ctx<'a, Self, HashSet<String>> {
        let valid = valid.clone();
        self.run("derivation_output_names", move |s| {
            s.derivation_output_names(&valid)
        })
    }

    fn path_from_digest(&self, digest: Digest) -> Ctx<'_, Self, StorePath> {
        self.run("path_from_digest", move |s| s.path_from_digest(digest))
    }
}
