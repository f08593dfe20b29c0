//! Identity types for a content-addressed store.
//!
//! Every object in the store is named by a [`StorePath`]: a fixed-width
//! [`Digest`] of its content paired with a human-readable
//! [`StorePathName`]. These are plain immutable values; they can be shared
//! across threads and used as keys without further coordination.
//!
//! # Key Types
//!
//! - [`StorePathName`] -- Validated object label (only constructible via [`StorePathName::validate`])
//! - [`Digest`] -- 160-bit content digest, rendered in Nix base32
//! - [`StorePath`] -- Digest plus name; the identity of one stored object
//! - [`SubstitutableInfo`] -- Provenance and size metadata reported by a substituter

pub mod digest;
pub mod error;
pub mod info;
pub mod name;
pub mod path;

pub use digest::{Digest, BASE32_LEN, DIGEST_LEN};
pub use error::TypeError;
pub use info::SubstitutableInfo;
pub use name::StorePathName;
pub use path::StorePath;
