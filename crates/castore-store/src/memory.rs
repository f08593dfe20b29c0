use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info, warn};

use castore_crypto::PathHasher;
use castore_types::{Digest, StorePath, StorePathName, SubstitutableInfo};

use crate::config::StoreConfig;
use crate::effect::{Blocking, Ctx};
use crate::error::{StoreError, StoreResult};
use crate::traits::{PathStore, RootedPath, ValidPath};

/// Metadata for a path registered in an [`InMemoryStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathRecord {
    /// Paths this path refers to. All of them except the path itself must
    /// already be valid when registering.
    pub references: HashSet<StorePath>,
    /// The derivation that produced this path, if known.
    pub deriver: Option<StorePath>,
    /// Serialized (NAR) size in bytes.
    pub nar_size: u64,
    /// For derivations: output name to output path. Empty otherwise.
    pub outputs: BTreeMap<String, StorePath>,
}

/// Reference counts of temporary roots, shared with every witness a store
/// hands out.
#[derive(Default)]
struct RootTable {
    counts: Mutex<HashMap<StorePath, usize>>,
}

impl RootTable {
    fn pin(&self, path: &StorePath) {
        let mut counts = self.counts.lock().expect("lock poisoned");
        *counts.entry(path.clone()).or_insert(0) += 1;
    }

    // Runs from `Drop`, so a poisoned lock must not panic again.
    fn release(&self, path: &StorePath) {
        let Ok(mut counts) = self.counts.lock() else {
            return;
        };
        if let Some(count) = counts.get_mut(path) {
            *count -= 1;
            if *count == 0 {
                counts.remove(path);
                debug!(path = %path, "temporary root released");
            }
        }
    }

    fn is_pinned(&self, path: &StorePath) -> bool {
        self.counts
            .lock()
            .expect("lock poisoned")
            .contains_key(path)
    }
}

/// Rooted witness issued by [`InMemoryStore::acquire_root`].
///
/// While any clone is alive the path cannot be removed from the store
/// (unless the store simulates roots). Dropping the last clone releases the
/// root.
pub struct MemoryRoot {
    path: StorePath,
    table: Arc<RootTable>,
    pinned: bool,
}

impl MemoryRoot {
    fn issue(path: StorePath, table: &Arc<RootTable>, pinned: bool) -> Self {
        if pinned {
            table.pin(&path);
        }
        Self {
            path,
            table: Arc::clone(table),
            pinned,
        }
    }

    fn issued_by(&self, table: &Arc<RootTable>) -> bool {
        Arc::ptr_eq(&self.table, table)
    }
}

impl RootedPath for MemoryRoot {
    fn store_path(&self) -> &StorePath {
        &self.path
    }
}

impl Clone for MemoryRoot {
    fn clone(&self) -> Self {
        Self::issue(self.path.clone(), &self.table, self.pinned)
    }
}

impl Drop for MemoryRoot {
    fn drop(&mut self) {
        if self.pinned {
            self.table.release(&self.path);
        }
    }
}

impl PartialEq for MemoryRoot {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && Arc::ptr_eq(&self.table, &other.table)
    }
}

impl Eq for MemoryRoot {}

impl Hash for MemoryRoot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Debug for MemoryRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRoot")
            .field("path", &self.path)
            .field("pinned", &self.pinned)
            .finish()
    }
}

/// Valid witness issued by [`InMemoryStore::check_valid`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MemoryValid {
    root: MemoryRoot,
}

impl ValidPath for MemoryValid {
    type Rooted = MemoryRoot;

    fn rooted(&self) -> &MemoryRoot {
        &self.root
    }
}

impl fmt::Debug for MemoryValid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryValid({})", self.root.path)
    }
}

#[derive(Default)]
struct Contents {
    paths: HashMap<StorePath, PathRecord>,
    by_digest: HashMap<Digest, StorePath>,
    substitutes: HashMap<StorePath, SubstitutableInfo>,
}

impl Contents {
    fn record(&self, path: &StorePath) -> StoreResult<&PathRecord> {
        self.paths
            .get(path)
            .ok_or_else(|| StoreError::NotFound(path.clone()))
    }
}

/// In-memory store backend with real temporary roots.
///
/// Intended for tests and embedding. Paths and their metadata live in a
/// `HashMap` behind a `RwLock`; roots are reference-counted and released when
/// their witnesses are dropped. All operations complete synchronously
/// ([`Blocking`]).
pub struct InMemoryStore {
    config: StoreConfig,
    contents: RwLock<Contents>,
    roots: Arc<RootTable>,
}

impl InMemoryStore {
    /// Create an empty store with the default configuration.
    pub fn new() -> Self {
        Self::build(StoreConfig::default())
    }

    /// Create an empty store, rejecting an invalid configuration.
    pub fn with_config(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: StoreConfig) -> Self {
        Self {
            config,
            contents: RwLock::new(Contents::default()),
            roots: Arc::new(RootTable::default()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of valid paths.
    pub fn len(&self) -> usize {
        self.contents.read().expect("lock poisoned").paths.len()
    }

    /// Returns `true` if no path is valid.
    pub fn is_empty(&self) -> bool {
        self.contents.read().expect("lock poisoned").paths.is_empty()
    }

    /// Whether any live witness currently roots `path`.
    pub fn is_rooted(&self, path: &StorePath) -> bool {
        self.roots.is_pinned(path)
    }

    /// Make `path` valid with the given metadata.
    ///
    /// Every reference other than `path` itself must already be valid, and no
    /// other valid path may carry the same digest. Registering an
    /// already-valid path is a no-op and returns `false`; paths are
    /// immutable once valid.
    pub fn register(&self, path: StorePath, record: PathRecord) -> StoreResult<bool> {
        let mut contents = self.contents.write().expect("lock poisoned");
        if contents.paths.contains_key(&path) {
            debug!(path = %path, "path already valid");
            return Ok(false);
        }
        if let Some(existing) = contents.by_digest.get(path.digest()) {
            return Err(StoreError::DigestConflict {
                existing: existing.clone(),
                path,
            });
        }
        if let Some(missing) = record
            .references
            .iter()
            .find(|r| **r != path && !contents.paths.contains_key(*r))
        {
            return Err(StoreError::MissingReference {
                path,
                reference: missing.clone(),
            });
        }

        info!(
            path = %path,
            references = record.references.len(),
            outputs = record.outputs.len(),
            "registered path"
        );
        contents.by_digest.insert(*path.digest(), path.clone());
        contents.paths.insert(path, record);
        Ok(true)
    }

    /// Add a literal text object (for example a derivation file) and return
    /// its path.
    ///
    /// The path is derived from the content, the references, the store
    /// directory and `name`, so adding the same text twice yields the same
    /// path.
    pub fn add_text(
        &self,
        name: &StorePathName,
        content: &[u8],
        references: &[StorePath],
    ) -> StoreResult<StorePath> {
        let path = PathHasher::TEXT.make_store_path_with_refs(
            content,
            references,
            &self.config.store_dir,
            name,
        );
        let record = PathRecord {
            references: references.iter().cloned().collect(),
            nar_size: content.len() as u64,
            ..PathRecord::default()
        };
        self.register(path.clone(), record)?;
        Ok(path)
    }

    /// Invalidate `path`.
    ///
    /// Refuses while the path is rooted or while another valid path refers
    /// to it. Returns `false` if the path was not valid.
    pub fn remove(&self, path: &StorePath) -> StoreResult<bool> {
        // Roots are checked under the write lock: a witness validated before
        // we got here is already pinned, one validated after sees the removal.
        let mut contents = self.contents.write().expect("lock poisoned");
        if !contents.paths.contains_key(path) {
            return Ok(false);
        }
        if self.roots.is_pinned(path) {
            return Err(StoreError::StillRooted(path.clone()));
        }
        if let Some(referrer) = contents
            .paths
            .iter()
            .find(|(p, record)| *p != path && record.references.contains(path))
            .map(|(p, _)| p.clone())
        {
            return Err(StoreError::StillReferenced {
                path: path.clone(),
                referrer,
            });
        }

        contents.paths.remove(path);
        if contents.by_digest.get(path.digest()) == Some(path) {
            contents.by_digest.remove(path.digest());
        }
        info!(path = %path, "removed path");
        Ok(true)
    }

    /// The metadata recorded for a valid path.
    pub fn path_info(&self, valid: &MemoryValid) -> StoreResult<PathRecord> {
        self.own(valid)?;
        let contents = self.contents.read().expect("lock poisoned");
        contents.record(&valid.root.path).cloned()
    }

    /// Record that a substituter can supply `path`.
    pub fn add_substitute(&self, path: StorePath, info: SubstitutableInfo) {
        debug!(path = %path, nar_size = info.nar_size, "substitute registered");
        self.contents
            .write()
            .expect("lock poisoned")
            .substitutes
            .insert(path, info);
    }

    fn own(&self, valid: &MemoryValid) -> StoreResult<()> {
        if valid.root.issued_by(&self.roots) {
            Ok(())
        } else {
            Err(StoreError::ForeignWitness(valid.root.path.clone()))
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PathStore for InMemoryStore {
    type Rooted = MemoryRoot;
    type Valid = MemoryValid;
    type Ctx = Blocking;

    fn check_valid(&self, rooted: HashSet<MemoryRoot>) -> HashSet<MemoryValid> {
        let contents = self.contents.read().expect("lock poisoned");
        let requested = rooted.len();
        let valid: HashSet<MemoryValid> = rooted
            .into_iter()
            .filter(|root| {
                if !root.issued_by(&self.roots) {
                    warn!(path = %root.path, "ignoring root issued by another store");
                    return false;
                }
                contents.paths.contains_key(&root.path)
            })
            .map(|root| MemoryValid { root })
            .collect();
        debug!(requested, valid = valid.len(), "validity check");
        valid
    }

    fn referrers<'a>(&'a self, valid: &'a MemoryValid) -> Ctx<'a, Self, HashSet<StorePath>> {
        self.own(valid)?;
        let contents = self.contents.read().expect("lock poisoned");
        let target = &valid.root.path;
        contents.record(target)?;
        Ok(contents
            .paths
            .iter()
            .filter(|(_, record)| record.references.contains(target))
            .map(|(p, _)| p.clone())
            .collect())
    }

    fn acquire_root(&self, path: StorePath) -> Ctx<'_, Self, MemoryRoot> {
        let pinned = self.config.temp_roots;
        debug!(path = %path, pinned, "temporary root acquired");
        Ok(MemoryRoot::issue(path, &self.roots, pinned))
    }

    fn substitutable_info(
        &self,
        paths: HashSet<StorePath>,
    ) -> Ctx<'_, Self, HashMap<StorePath, SubstitutableInfo>> {
        let contents = self.contents.read().expect("lock poisoned");
        Ok(paths
            .into_iter()
            .filter_map(|p| contents.substitutes.get(&p).cloned().map(|info| (p, info)))
            .collect())
    }

    fn valid_derivers(&self, path: StorePath) -> Ctx<'_, Self, HashSet<StorePath>> {
        let contents = self.contents.read().expect("lock poisoned");
        let mut derivers: HashSet<StorePath> = contents
            .paths
            .iter()
            .filter(|(_, record)| record.outputs.values().any(|out| *out == path))
            .map(|(drv, _)| drv.clone())
            .collect();
        // The deriver recorded on the output itself counts once it is valid.
        if let Some(drv) = contents.paths.get(&path).and_then(|r| r.deriver.as_ref()) {
            if contents.paths.contains_key(drv) {
                derivers.insert(drv.clone());
            }
        }
        Ok(derivers)
    }

    fn derivation_outputs<'a>(&'a self, valid: &'a MemoryValid) -> Ctx<'a, Self, HashSet<StorePath>> {
        self.own(valid)?;
        let contents = self.contents.read().expect("lock poisoned");
        let record = contents.record(&valid.root.path)?;
        Ok(record.outputs.values().cloned().collect())
    }

    fn derivation_output_names<'a>(
        &'a self,
        valid: &'a MemoryValid,
    ) -> Ctx<'a, Self, HashSet<String>> {
        self.own(valid)?;
        let contents = self.contents.read().expect("lock poisoned");
        let record = contents.record(&valid.root.path)?;
        Ok(record.outputs.keys().cloned().collect())
    }

    fn path_from_digest(&self, digest: Digest) -> Ctx<'_, Self, StorePath> {
        let contents = self.contents.read().expect("lock poisoned");
        contents
            .by_digest
            .get(&digest)
            .cloned()
            .ok_or(StoreError::DigestNotFound(digest))
    }
}

impl fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("store_dir", &self.config.store_dir)
            .field("path_count", &self.len())
            .finish()
    }
}
