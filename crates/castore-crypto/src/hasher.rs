use castore_types::{Digest, StorePath, StorePathName, DIGEST_LEN};

/// Fold `hash` into `width` bytes by XOR-ing every input byte into
/// position `i % width`.
///
/// Keeps every input bit in play, unlike plain truncation.
fn compress_hash(hash: &[u8], width: usize) -> Vec<u8> {
    let mut out = vec![0u8; width];
    if width == 0 {
        return out;
    }
    for (i, byte) in hash.iter().enumerate() {
        out[i % width] ^= byte;
    }
    out
}

/// Domain-separated BLAKE3 hasher producing store paths.
///
/// Each hasher carries a domain tag describing how the object entered the
/// store. The tag is part of every fingerprint, so identical bytes added
/// through different routes land at different paths.
pub struct PathHasher {
    domain: &'static str,
}

impl PathHasher {
    /// Hasher for source trees added from outside the store.
    pub const SOURCE: Self = Self { domain: "source" };
    /// Hasher for literal text objects such as derivation files.
    pub const TEXT: Self = Self { domain: "text" };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }


    /// Derive the store path for `content` named `name` under `store_dir`.
    pub fn make_store_path(&self, content: &[u8], store_dir: &str, name: &StorePathName) -> StorePath {
        self.make_store_path_with_refs(content, std::iter::empty(), store_dir, name)
    }

    /// Like [`make_store_path`](Self::make_store_path), but the paths the
    /// content refers to also feed the fingerprint.
    ///
    /// Reference order does not matter.
    pub fn make_store_path_with_refs<'r>(
        &self,
        content: &[u8],
        references: impl IntoIterator<Item = &'r StorePath>,
        store_dir: &str,
        name: &StorePathName,
    ) -> StorePath {
        let mut refs: Vec<String> = references
            .into_iter()
            .map(|r| r.to_path_string(store_dir))
            .collect();
        refs.sort();

        let mut kind = self.domain.to_owned();
        for r in &refs {
            kind.push(':');
            kind.push_str(r);
        }

        let fingerprint = format!(
            "{kind}:blake3:{}:{store_dir}:{name}",
            hex::encode(blake3::hash(content).as_bytes())
        );
        let digest = fold(blake3::hash(fingerprint.as_bytes()).as_bytes());
        StorePath::new(digest, name.clone())
    }
}

fn fold(hash: &[u8; 32]) -> Digest {
    let mut bytes = [0u8; DIGEST_LEN];
    bytes.copy_from_slice(&compress_hash(hash, DIGEST_LEN));
    Digest::from_bytes(bytes)
}
