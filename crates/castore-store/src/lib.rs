//! Capability interface for content-addressed store backends.
//!
//! [`PathStore`] is the contract a backend implements. It is parameterized
//! by two witness types and an execution context:
//!
//! - [`PathStore::Rooted`] -- proof that a path is held by a root
//! - [`PathStore::Valid`] -- proof that a path is currently valid
//! - [`PathStore::Ctx`] -- how suspending operations run ([`Blocking`] or [`Deferred`])
//!
//! Witnesses can only be obtained from the backend, in order: a plain
//! [`StorePath`] is rooted with [`PathStore::acquire_root`], rooted witnesses
//! are exchanged for valid ones by [`PathStore::check_valid`], and only valid
//! witnesses unlock `referrers` and the derivation queries. Skipping a step is
//! a type error, not a runtime check.
//!
//! # Backends
//!
//! - [`InMemoryStore`] -- `HashMap`-based store with real temporary roots
//! - [`AsyncStore`] -- wraps any blocking backend behind futures with a timeout
//!
//! # Design Rules
//!
//! 1. Store paths, names and digests are immutable values, shared freely.
//! 2. Projections (`project_rooted`, `project_valid`) are free and never fail.
//! 3. Batch operations take sets so backends can coalesce round-trips.
//! 4. Witnesses release their roots when dropped.
//!
//! [`StorePath`]: castore_types::StorePath

pub mod config;
pub mod deferred;
pub mod effect;
pub mod error;
pub mod memory;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::StoreConfig;
pub use deferred::AsyncStore;
pub use effect::{Blocking, Ctx, Deferred, Effect};
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryStore, MemoryRoot, MemoryValid, PathRecord};
pub use traits::{PathStore, RootedPath, ValidPath};
