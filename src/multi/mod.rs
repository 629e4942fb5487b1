//! Storage encodings for multilingual field values.
//!
//! - `field`: one field's master value plus per-language alternates packed
//!   into a single string
//! - `creator`: servant creator names linked to their master creator through
//!   a header on the last name
//!
//! Both are pure string transforms and never fail. Existing stored data was
//! written with these exact widths and offsets.

mod creator;
mod field;
mod utf16;

pub use creator::{
    mangle, mangle_last_name, parse_servant_lang, strip_mark, Creator, FieldMode, ServantLink,
    StoredCreator,
};
pub use field::{decode, encode, is_packed, MultiField, CORRUPT_MARKER};
