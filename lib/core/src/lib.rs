//! # DedupX Core
//!
//! Core library for the DedupX record-matching engine.
//!
//! This crate provides the leaf building blocks the rest of the engine is
//! assembled from:
//!
//! - [`Record`] - one input row plus derived standardized fields
//! - [`normalize`] - pure, total field normalization per [`FieldKind`]
//! - [`BlockingIndex`] - coarse candidate grouping for sub-quadratic matching
//! - [`Error`] - the shared error taxonomy for the whole engine
//!
//! ## Example
//!
//! ```rust
//! use dedupx_core::{field, normalize, BlockingIndex, FieldKind, Record};
//! use dedupx_core::blocking::default_recipes;
//!
//! let record = Record::new()
//!     .with(field::COMPANY_NAME, "Acme, Inc.")
//!     .with(field::ZIP_CODE, "30301")
//!     .with(field::PHONE_NUMBER, "(404) 555-1234");
//!
//! let std = normalize::standardize(&record);
//! assert_eq!(std.get(field::COMPANY_NAME_STD), "acme");
//!
//! let index = BlockingIndex::build(default_recipes(), &[record.clone()]);
//! assert!(index.candidates(0, &record).is_empty());
//! ```

pub mod blocking;
pub mod error;
pub mod normalize;
pub mod record;

pub use blocking::{BlockingIndex, BlockingRecipe};
pub use error::{Error, Result};
pub use normalize::FieldKind;
pub use record::{field, Record, RecordId};
