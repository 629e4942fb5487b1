//! Language tag validation for multilingual metadata.
//!
//! # Architecture
//!
//! - `subtag`: the typed decomposition a validated tag is returned as
//! - `store`: the reference-table lookups validation depends on
//! - `cache`: successfully validated tags, keyed by input string
//! - `validator`: the staged primary/script/region/variant parser
//!
//! # Example
//!
//! ```rust,ignore
//! use multilingual_metadata::i18n::{MemoryStore, TagValidator};
//!
//! let validator = TagValidator::new(MemoryStore::from_registry(&data));
//! let tag = validator.validate("zh-Hant-TW", None)?;
//! assert_eq!(tag.to_string(), "zh-Hant-TW");
//! ```

mod cache;
mod store;
mod subtag;
mod validator;

pub use cache::TagCache;
pub use store::{MemoryStore, StoreError, SubtagRecord, SubtagStore, COLLECTION_SCOPE};
pub use subtag::{Subtag, SubtagKind, ValidatedTag};
pub use validator::{TagValidator, ValidationError, GRANDFATHERED_TAGS};
