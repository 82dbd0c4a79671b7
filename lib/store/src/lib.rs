//! # DedupX Store
//!
//! Persistence layer for DeDup identity keys.
//!
//! The store maps canonical [`Fingerprint`]s to stable DeDup IDs so that the
//! same logical entity keeps the same identity across independent runs.
//! Writes are committed with atomic replace semantics; a half-written store
//! file is never observable. Concurrent resolutions of the same fingerprint
//! serialize behind sharded locks so exactly one caller mints an entry.

pub mod fingerprint;
pub mod store;

pub use fingerprint::{Fingerprint, FingerprintRecipe};
pub use store::{DedupEntry, DedupKeyStore, StoreDelta, StoreMetadata};
