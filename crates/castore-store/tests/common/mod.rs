#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};

use castore_crypto::PathHasher;
use castore_store::{InMemoryStore, PathRecord};
use castore_types::{StorePath, StorePathName};

pub fn name(s: &str) -> StorePathName {
    StorePathName::validate(s).expect("test name should be valid")
}

pub fn source(content: &[u8], n: &str) -> StorePath {
    PathHasher::SOURCE.make_store_path(content, StorePath::DEFAULT_STORE_DIR, &name(n))
}

/// A small closure: `lib <- app`, with `app.drv` producing `app` and `app-doc`.
pub struct Fixture {
    pub store: InMemoryStore,
    pub lib: StorePath,
    pub app: StorePath,
    pub doc: StorePath,
    pub drv: StorePath,
}

pub fn fixture() -> Fixture {
    let store = InMemoryStore::new();
    let lib = source(b"lib", "libfoo-1.0");
    let app = source(b"app", "app-1.0");
    let doc = source(b"doc", "app-1.0-doc");

    store.register(lib.clone(), PathRecord::default()).unwrap();
    store
        .register(
            app.clone(),
            PathRecord {
                references: HashSet::from([lib.clone()]),
                nar_size: 2048,
                ..PathRecord::default()
            },
        )
        .unwrap();
    store.register(doc.clone(), PathRecord::default()).unwrap();

    let drv = PathHasher::TEXT.make_store_path(
        b"Derive([(\"out\",...),(\"doc\",...)])",
        StorePath::DEFAULT_STORE_DIR,
        &name("app-1.0.drv"),
    );
    store
        .register(
            drv.clone(),
            PathRecord {
                outputs: BTreeMap::from([
                    ("out".to_string(), app.clone()),
                    ("doc".to_string(), doc.clone()),
                ]),
                ..PathRecord::default()
            },
        )
        .unwrap();

    Fixture {
        store,
        lib,
        app,
        doc,
        drv,
    }
}
