use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use castore_types::{Digest, StorePath, SubstitutableInfo};

use crate::effect::{Ctx, Effect};

/// Proof that a path is registered under a root that lives at least as long
/// as the witness.
///
/// Only [`PathStore::acquire_root`] hands these out.
pub trait RootedPath {
    fn store_path(&self) -> &StorePath;
}

/// Proof that a path is currently valid in the store.
///
/// On backends with real temporary roots the path stays valid for as long as
/// the witness is held. Only [`PathStore::check_valid`] hands these out, and
/// only in exchange for a rooted witness.
pub trait ValidPath {
    type Rooted: RootedPath;

    fn rooted(&self) -> &Self::Rooted;
}

/// The queries a content-addressed store backend must answer.
///
/// Callers move through three states, each a distinct type:
///
/// ```text
/// StorePath ──acquire_root()──▶ Rooted ──check_valid()──▶ Valid
///     ▲                            │                        │
///     └────── project_rooted() ────┘◀──── project_valid() ──┘
/// ```
///
/// Queries that only make sense for an object known to exist (`referrers`,
/// `derivation_outputs`, `derivation_output_names`) accept nothing weaker
/// than [`Self::Valid`]. `substitutable_info` and `valid_derivers` take plain
/// paths, since they are meaningful for objects that are not present.
///
/// Every operation returning [`Ctx`] may fail or suspend, as decided by the
/// backend's [`Effect`]. The projections are free and never fail.
///
/// ```
/// use std::collections::HashSet;
/// use castore_store::{InMemoryStore, PathStore};
/// use castore_types::StorePathName;
///
/// let store = InMemoryStore::new();
/// let name = StorePathName::validate("hello-2.12").unwrap();
/// let path = store.add_text(&name, b"hello", &[]).unwrap();
///
/// let root = store.acquire_root(path.clone()).unwrap();
/// let valid = store.check_valid(HashSet::from([root]));
/// let valid = valid.into_iter().next().unwrap();
///
/// assert_eq!(InMemoryStore::project_rooted(InMemoryStore::project_valid(&valid)), &path);
/// assert!(store.referrers(&valid).unwrap().is_empty());
/// ```
///
/// A rooted witness is not enough for validity-dependent queries:
///
/// ```compile_fail
/// use castore_store::{InMemoryStore, PathStore};
/// use castore_types::StorePathName;
///
/// let store = InMemoryStore::new();
/// let name = StorePathName::validate("hello").unwrap();
/// let path = store.add_text(&name, b"hello", &[]).unwrap();
/// let root = store.acquire_root(path).unwrap();
/// // ERROR: expected `&MemoryValid`, found `&MemoryRoot`
/// let _ = store.referrers(&root);
/// ```
///
/// and a valid witness cannot be built by hand:
///
/// ```compile_fail
/// use castore_store::{InMemoryStore, MemoryValid, PathStore};
/// use castore_types::StorePathName;
///
/// let store = InMemoryStore::new();
/// let name = StorePathName::validate("missing").unwrap();
/// let path = castore_crypto::PathHasher::SOURCE.make_store_path(b"", "/nix/store", &name);
/// let root = store.acquire_root(path).unwrap();
/// // ERROR: field `root` of struct `MemoryValid` is private
/// let forged = MemoryValid { root };
/// let _ = store.derivation_outputs(&forged);
/// ```
pub trait PathStore: Sized {
    /// Witness that a path is rooted.
    type Rooted: RootedPath + Eq + Hash + 'static;
    /// Witness that a path is valid; projects back to [`Self::Rooted`].
    type Valid: ValidPath<Rooted = Self::Rooted> + Eq + Hash + 'static;
    /// How suspending operations are executed.
    type Ctx: Effect;

    /// The path a rooted witness stands for.
    fn project_rooted(rooted: &Self::Rooted) -> &StorePath {
        rooted.store_path()
    }

    /// The rooted witness a valid witness was issued from.
    fn project_valid(valid: &Self::Valid) -> &Self::Rooted {
        valid.rooted()
    }

    /// Keep the witnesses whose paths are currently valid, re-witnessed as
    /// [`Self::Valid`].
    ///
    /// The result is always a subset of the input; witnesses for invalid
    /// paths are dropped. It may be empty.
    fn check_valid(&self, rooted: HashSet<Self::Rooted>) -> HashSet<Self::Valid>;

    /// Valid paths that refer to `valid`.
    fn referrers<'a>(&'a self, valid: &'a Self::Valid) -> Ctx<'a, Self, HashSet<StorePath>>;

    /// Root `path` so that it survives for as long as the witness is held.
    ///
    /// Backends without real roots may issue a witness without pinning
    /// anything. The path does not need to exist yet.
    fn acquire_root(&self, path: StorePath) -> Ctx<'_, Self, Self::Rooted>;

    /// Substitute metadata for each path a substituter can supply. Paths
    /// with no known substitute are absent from the map.
    fn substitutable_info(
        &self,
        paths: HashSet<StorePath>,
    ) -> Ctx<'_, Self, HashMap<StorePath, SubstitutableInfo>>;

    /// Currently-valid derivations known to produce `path`.
    fn valid_derivers(&self, path: StorePath) -> Ctx<'_, Self, HashSet<StorePath>>;

    /// Outputs of the derivation at `valid`; empty if it is not a derivation.
    fn derivation_outputs<'a>(&'a self, valid: &'a Self::Valid)
        -> Ctx<'a, Self, HashSet<StorePath>>;

    /// Output names (`out`, `dev`, ...) of the derivation at `valid`.
    fn derivation_output_names<'a>(&'a self, valid: &'a Self::Valid)
        -> Ctx<'a, Self, HashSet<String>>;

    /// Resolve the full path carrying `digest`. Fails if no valid path has it.
    fn path_from_digest(&self, digest: Digest) -> Ctx<'_, Self, StorePath>;
}
