//! Digest computation for the content-addressed store.
//!
//! Provides domain-separated BLAKE3 hashing, folding of wide hashes down to
//! the 160-bit store digest, and derivation of [`StorePath`]s from content.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.
//!
//! [`StorePath`]: castore_types::StorePath

pub mod hasher;

pub use hasher::PathHasher;
