//! Store path identities.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;

use crate::digest::{Digest, BASE32_LEN};
use crate::error::TypeError;
use crate::name::StorePathName;

/// Keys salting [`StorePath::stable_hash`]. Changing them changes every
/// persisted hash.
const STABLE_HASH_KEYS: (u64, u64) = (0x6361_7374_6f72_6521, 0x7374_6f72_6570_6174);

/// The identity of one content-addressed object: a digest and a name.
///
/// Two paths are equal iff both components are equal. Hashing feeds the raw
/// digest bytes followed by the name, so the result never depends on memory
/// layout or addresses.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorePath {
    digest: Digest,
    name: StorePathName,
}

impl StorePath {
    /// The conventional store directory.
    pub const DEFAULT_STORE_DIR: &'static str = "/nix/store";

    /// Combine an already-valid digest and name.
    pub fn new(digest: Digest, name: StorePathName) -> Self {
        Self { digest, name }
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn name(&self) -> &StorePathName {
        &self.name
    }

    /// `<base32 digest>-<name>`, without any directory prefix.
    pub fn basename(&self) -> String {
        format!("{}-{}", self.digest, self.name)
    }

    /// Parse a `<base32 digest>-<name>` basename.
    pub fn from_basename(basename: &str) -> Result<Self, TypeError> {
        if !basename.is_ascii() {
            return Err(TypeError::InvalidPath(format!(
                "non-ASCII characters in {basename:?}"
            )));
        }
        if basename.len() < BASE32_LEN + 2 {
            return Err(TypeError::InvalidPath(format!("too short: {basename:?}")));
        }
        let (digest_part, rest) = basename.split_at(BASE32_LEN);
        let name_part = rest
            .strip_prefix('-')
            .ok_or_else(|| TypeError::InvalidPath("expected '-' after digest".to_string()))?;

        let digest = Digest::from_base32(digest_part)?;
        let name = name_part.parse::<StorePathName>()?;
        Ok(Self { digest, name })
    }

    /// Render the full path under `store_dir`.
    pub fn to_path_string(&self, store_dir: &str) -> String {
        format!("{}/{}", store_dir, self.basename())
    }

    /// Parse a full path that must live directly under `store_dir`.
    pub fn parse(store_dir: &str, path: &str) -> Result<Self, TypeError> {
        let basename = path
            .strip_prefix(store_dir)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| TypeError::InvalidPath(format!("{path:?} is not in {store_dir}")))?;
        if basename.contains('/') {
            return Err(TypeError::InvalidPath(format!(
                "{path:?} is not a top-level store entry"
            )));
        }
        Self::from_basename(basename)
    }

    /// Salted 64-bit hash that is identical across runs and processes.
    ///
    /// Suitable for persisted cache keys or for sharding work between
    /// processes; in-process maps can keep using the [`Hash`] impl.
    pub fn stable_hash(&self) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(STABLE_HASH_KEYS.0, STABLE_HASH_KEYS.1);
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl Hash for StorePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.digest.hash(state);
        state.write(self.name.contents().as_bytes());
        state.write_u8(0xff);
    }
}

impl fmt::Debug for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorePath({})", self.basename())
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.digest, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::DIGEST_LEN;
    use proptest::prelude::*;
    use std::collections::{HashMap, HashSet};

    fn name(s: &str) -> StorePathName {
        StorePathName::validate(s).unwrap()
    }

    fn path(byte: u8, n: &str) -> StorePath {
        StorePath::new(Digest::from_bytes([byte; DIGEST_LEN]), name(n))
    }

    #[test]
    fn equal_components_are_equal() {
        let a = path(3, "hello-1.0");
        let b = path(3, "hello-1.0");
        assert_eq!(a, b);
        assert_eq!(a.stable_hash(), b.stable_hash());
    }

    #[test]
    fn different_name_is_unequal() {
        assert_ne!(path(3, "hello-1.0"), path(3, "hello-1.1"));
    }

    #[test]
    fn digest_differing_in_one_byte() {
        let a = path(9, "hello");
        let mut bytes = *a.digest().as_bytes();
        bytes[19] ^= 0x80;
        let b = StorePath::new(Digest::from_bytes(bytes), name("hello"));
        assert_ne!(a, b);
        assert_ne!(a.stable_hash(), b.stable_hash());
    }

    #[test]
    fn stable_hash_feeds_digest_then_name() {
        let p = path(0, "a");
        assert_eq!(p.stable_hash(), path(0, "a").stable_hash());
        let mut h = SipHasher13::new_with_keys(STABLE_HASH_KEYS.0, STABLE_HASH_KEYS.1);
        h.write(&[0u8; DIGEST_LEN]);
        h.write(b"a");
        h.write_u8(0xff);
        assert_eq!(p.stable_hash(), h.finish());
    }

    #[test]
    fn usable_as_map_and_set_key() {
        let mut set = HashSet::new();
        set.insert(path(1, "x"));
        set.insert(path(1, "x"));
        set.insert(path(2, "x"));
        assert_eq!(set.len(), 2);

        let mut map = HashMap::new();
        map.insert(path(1, "x"), 10);
        assert_eq!(map.get(&path(1, "x")), Some(&10));
    }

    #[test]
    fn basename_roundtrip() {
        let p = path(0xab, "test-pkg");
        let parsed = StorePath::from_basename(&p.basename()).unwrap();
        assert_eq!(parsed, p);
    }

    #[test]
    fn full_path_roundtrip() {
        let p = path(0x11, "bash-5.2");
        let s = p.to_path_string(StorePath::DEFAULT_STORE_DIR);
        assert!(s.starts_with("/nix/store/"));
        assert_eq!(StorePath::parse(StorePath::DEFAULT_STORE_DIR, &s).unwrap(), p);
    }

    #[test]
    fn parse_rejects_foreign_directory() {
        let p = path(0x11, "bash");
        let s = p.to_path_string("/gnu/store");
        assert!(StorePath::parse(StorePath::DEFAULT_STORE_DIR, &s).is_err());
    }

    #[test]
    fn parse_rejects_nested_entries() {
        let p = path(0x11, "bash");
        let s = format!("{}/bin", p.to_path_string("/nix/store"));
        assert!(StorePath::parse("/nix/store", &s).is_err());
    }

    #[test]
    fn from_basename_rejects_bad_input() {
        let digest = Digest::from_bytes([0; DIGEST_LEN]).to_base32();
        assert!(StorePath::from_basename(&format!("{digest}-")).is_err());
        assert!(StorePath::from_basename(&format!("{digest}_foo")).is_err());
        assert!(StorePath::from_basename(&format!("{digest}-.foo")).is_err());
        assert!(StorePath::from_basename("short-foo").is_err());
        // Multi-byte UTF-8 must not panic on byte slicing.
        let err = StorePath::from_basename(&format!("{}\u{00e9}-foo", &digest[..31])).unwrap_err();
        assert!(err.to_string().contains("non-ASCII"));
    }

    #[test]
    fn serde_roundtrip() {
        let p = path(0x42, "serde-test");
        let json = serde_json::to_string(&p).unwrap();
        let parsed: StorePath = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, p);
    }

    proptest! {
        #[test]
        fn equal_inputs_hash_equal(bytes in proptest::array::uniform20(any::<u8>()),
                                   text in "[a-z0-9][a-z0-9.+-]{0,20}") {
            let a = StorePath::new(Digest::from_bytes(bytes), name(&text));
            let b = StorePath::new(Digest::from_bytes(bytes), name(&text));
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.stable_hash(), b.stable_hash());
        }

        #[test]
        fn unequal_digests_are_unequal(a in proptest::array::uniform20(any::<u8>()),
                                       b in proptest::array::uniform20(any::<u8>())) {
            prop_assume!(a != b);
            let pa = StorePath::new(Digest::from_bytes(a), name("same"));
            let pb = StorePath::new(Digest::from_bytes(b), name("same"));
            prop_assert_ne!(pa, pb);
        }
    }
}
