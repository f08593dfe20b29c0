use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::path::StorePath;

/// What a substituter knows about a path it can supply.
///
/// Built wholesale by a backend query and never mutated afterwards. Sizes are
/// exact byte counts; backends reading signed sizes from an external source
/// go through [`SubstitutableInfo::from_signed_sizes`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutableInfo {
    /// The derivation whose build produced this path, if known.
    pub deriver: Option<StorePath>,
    /// Paths this path refers to.
    pub references: HashSet<StorePath>,
    /// Compressed transfer size in bytes.
    pub download_size: u64,
    /// Uncompressed serialized (NAR) size in bytes.
    pub nar_size: u64,
}

impl SubstitutableInfo {
    pub fn new(
        deriver: Option<StorePath>,
        references: HashSet<StorePath>,
        download_size: u64,
        nar_size: u64,
    ) -> Self {
        Self {
            deriver,
            references,
            download_size,
            nar_size,
        }
    }

    /// Build from sizes reported as signed integers, rejecting negatives.
    pub fn from_signed_sizes(
        deriver: Option<StorePath>,
        references: HashSet<StorePath>,
        download_size: i64,
        nar_size: i64,
    ) -> Result<Self, TypeError> {
        Ok(Self {
            deriver,
            references,
            download_size: non_negative("download size", download_size)?,
            nar_size: non_negative("nar size", nar_size)?,
        })
    }

    /// Parse the substitution-relevant fields of a `.narinfo` manifest.
    ///
    /// Returns the path the manifest describes together with its info.
    /// `StorePath`, `FileSize` and `NarSize` are required; `References` and
    /// `Deriver` are optional, and unknown keys are ignored. A deriver of
    /// `unknown-deriver` is treated as absent.
    pub fn from_narinfo(store_dir: &str, text: &str) -> Result<(StorePath, Self), TypeError> {
        let mut store_path: Option<StorePath> = None;
        let mut file_size: Option<u64> = None;
        let mut nar_size: Option<u64> = None;
        let mut references = HashSet::new();
        let mut deriver: Option<StorePath> = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| TypeError::NarInfoParse(format!("invalid line: {line}")))?;
            let value = value.trim();

            match key {
                "StorePath" => store_path = Some(StorePath::parse(store_dir, value)?),
                "FileSize" => file_size = Some(parse_size("FileSize", value)?),
                "NarSize" => nar_size = Some(parse_size("NarSize", value)?),
                "References" => {
                    for r in value.split_whitespace() {
                        references.insert(StorePath::from_basename(r).map_err(|e| {
                            TypeError::NarInfoParse(format!("invalid reference '{r}': {e}"))
                        })?);
                    }
                }
                "Deriver" if value != "unknown-deriver" => {
                    deriver = Some(StorePath::from_basename(value).map_err(|e| {
                        TypeError::NarInfoParse(format!("invalid deriver '{value}': {e}"))
                    })?);
                }
                _ => {}
            }
        }

        let store_path =
            store_path.ok_or_else(|| TypeError::NarInfoParse("missing StorePath".to_string()))?;
        let info = Self {
            deriver,
            references,
            download_size: file_size
                .ok_or_else(|| TypeError::NarInfoParse("missing FileSize".to_string()))?,
            nar_size: nar_size
                .ok_or_else(|| TypeError::NarInfoParse("missing NarSize".to_string()))?,
        };
        Ok((store_path, info))
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, TypeError> {
    u64::try_from(value).map_err(|_| TypeError::NegativeSize { field, value })
}

fn parse_size(field: &str, value: &str) -> Result<u64, TypeError> {
    let signed: i64 = value
        .parse()
        .map_err(|e| TypeError::NarInfoParse(format!("invalid {field}: {e}")))?;
    u64::try_from(signed).map_err(|_| TypeError::NarInfoParse(format!("negative {field}: {signed}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::{Digest, DIGEST_LEN};
    use crate::name::StorePathName;

    fn path(byte: u8, name: &str) -> StorePath {
        StorePath::new(
            Digest::from_bytes([byte; DIGEST_LEN]),
            StorePathName::validate(name).unwrap(),
        )
    }

    #[test]
    fn signed_sizes_accept_zero_and_positive() {
        let info = SubstitutableInfo::from_signed_sizes(None, HashSet::new(), 0, 4096).unwrap();
        assert_eq!(info.download_size, 0);
        assert_eq!(info.nar_size, 4096);
    }

    #[test]
    fn signed_sizes_reject_negative() {
        let err = SubstitutableInfo::from_signed_sizes(None, HashSet::new(), -1, 10).unwrap_err();
        assert_eq!(
            err,
            TypeError::NegativeSize {
                field: "download size",
                value: -1
            }
        );
        assert!(SubstitutableInfo::from_signed_sizes(None, HashSet::new(), 1, -5).is_err());
    }

    #[test]
    fn parse_narinfo() {
        let target = path(1, "hello-2.12");
        let dep = path(2, "glibc-2.39");
        let drv = path(3, "hello-2.12.drv");
        let text = format!(
            "StorePath: {}\nURL: nar/abc.nar.xz\nCompression: xz\nFileSize: 50264\nNarSize: 226560\nReferences: {} {}\nDeriver: {}\nSig: cache-1:AAAA\n",
            target.to_path_string("/nix/store"),
            dep.basename(),
            target.basename(),
            drv.basename(),
        );

        let (parsed_path, info) = SubstitutableInfo::from_narinfo("/nix/store", &text).unwrap();
        assert_eq!(parsed_path, target);
        assert_eq!(info.download_size, 50264);
        assert_eq!(info.nar_size, 226560);
        assert_eq!(info.deriver, Some(drv));
        assert_eq!(info.references.len(), 2);
        assert!(info.references.contains(&dep));
        assert!(info.references.contains(&target));
    }

    #[test]
    fn parse_narinfo_unknown_deriver_and_no_references() {
        let target = path(4, "source");
        let text = format!(
            "StorePath: {}\nFileSize: 1\nNarSize: 2\nReferences: \nDeriver: unknown-deriver\n",
            target.to_path_string("/nix/store"),
        );
        let (_, info) = SubstitutableInfo::from_narinfo("/nix/store", &text).unwrap();
        assert!(info.deriver.is_none());
        assert!(info.references.is_empty());
    }

    #[test]
    fn parse_narinfo_missing_fields() {
        let target = path(5, "x");
        let text = format!("StorePath: {}\nNarSize: 2\n", target.to_path_string("/nix/store"));
        let err = SubstitutableInfo::from_narinfo("/nix/store", &text).unwrap_err();
        assert_eq!(err, TypeError::NarInfoParse("missing FileSize".into()));

        assert!(SubstitutableInfo::from_narinfo("/nix/store", "FileSize: 1\nNarSize: 1\n").is_err());
    }

    #[test]
    fn parse_narinfo_negative_size() {
        let target = path(6, "x");
        let text = format!(
            "StorePath: {}\nFileSize: -3\nNarSize: 2\n",
            target.to_path_string("/nix/store")
        );
        assert!(matches!(
            SubstitutableInfo::from_narinfo("/nix/store", &text),
            Err(TypeError::NarInfoParse(_))
        ));
    }
}
