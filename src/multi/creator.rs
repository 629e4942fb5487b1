//! Mangled creator names.
//!
//! A servant creator (a translated or transliterated form of a name) is
//! linked to its master creator by storing a header in front of its last
//! name:
//!
//! ```text
//! '#' masterIndex:3 langLen:2 lang lastName      e.g. "#00105ja-jpTanaka"
//! ```
//!
//! Creators without a servant link carry the empty header `#00000`.

use crate::multi::utf16;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const MAX_MASTER_INDEX: u16 = 999;
const MAX_LANG_LEN: usize = 99;
const HEADER_WIDTH: usize = 6;

static HEADER_REGEX: OnceLock<Regex> = OnceLock::new();

/// Link from a servant creator back to its master creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServantLink {
    master_index: u16,
    lang: String,
}

impl ServantLink {
    /// # Returns
    /// `None` if the index needs more than three digits, or the language tag
    /// is empty or longer than 99 UTF-16 code units.
    pub fn new(master_index: u16, lang: impl Into<String>) -> Option<Self> {
        let lang = lang.into();
        let lang_len = utf16::len(&lang);
        if master_index > MAX_MASTER_INDEX || lang_len == 0 || lang_len > MAX_LANG_LEN {
            return None;
        }
        Some(Self { master_index, lang })
    }

    /// Position of the master creator in the item's creator list.
    pub fn master_index(&self) -> u16 {
        self.master_index
    }

    /// Language tag of the servant name.
    pub fn lang(&self) -> &str {
        &self.lang
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldMode {
    /// Separate first and last name
    #[default]
    TwoField,
    /// Whole name in the last-name field (institutions, mononyms)
    SingleField,
}

/// A creator as edited, with an optional link to its master creator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub first_name: String,
    pub last_name: String,
    pub short_name: String,
    pub field_mode: FieldMode,
    pub birth_year: Option<i32>,
    pub servant: Option<ServantLink>,
}

/// The persisted creator fields, with the servant link folded into the last name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCreator {
    pub first_name: String,
    pub last_name: String,
    pub short_name: String,
    pub field_mode: FieldMode,
    pub birth_year: Option<i32>,
}

impl StoredCreator {
    /// Recover the creator and its servant link from the stored fields.
    pub fn unmangle(&self) -> Creator {
        let (master_index, lang) = parse_servant_lang(&self.last_name);
        Creator {
            first_name: self.first_name.clone(),
            last_name: strip_mark(&self.last_name).to_string(),
            short_name: self.short_name.clone(),
            field_mode: self.field_mode,
            birth_year: self.birth_year,
            servant: ServantLink::new(master_index, lang),
        }
    }
}

/// Fold the creator's servant link into its last name for storage.
pub fn mangle(creator: &Creator) -> StoredCreator {
    StoredCreator {
        first_name: creator.first_name.clone(),
        last_name: mangle_last_name(&creator.last_name, creator.servant.as_ref()),
        short_name: creator.short_name.clone(),
        field_mode: creator.field_mode,
        birth_year: creator.birth_year,
    }
}

/// Prefix a last name with the servant header.
pub fn mangle_last_name(last_name: &str, servant: Option<&ServantLink>) -> String {
    match servant {
        Some(link) => format!(
            "#{:03}{:02}{}{}",
            link.master_index,
            utf16::len(&link.lang),
            link.lang,
            last_name
        ),
        None => format!("#00000{}", last_name),
    }
}

/// Last name with any servant header removed.
pub fn strip_mark(s: &str) -> &str {
    match split_header(s) {
        Some((_, _, rest)) => rest,
        None => s,
    }
}

/// Master creator index and servant language from a mangled last name.
///
/// # Returns
/// `(0, "")` when `s` carries no header.
pub fn parse_servant_lang(s: &str) -> (u16, &str) {
    match split_header(s) {
        Some((master_index, lang, _)) => (master_index, lang),
        None => (0, ""),
    }
}

fn split_header(s: &str) -> Option<(u16, &str, &str)> {
    let caps = header_regex().captures(s)?;
    let master_index: u16 = caps[1].parse().ok()?;
    let lang_len: usize = caps[2].parse().ok()?;

    let (lang, rest) = utf16::split_at(&s[HEADER_WIDTH..], lang_len)?;
    Some((master_index, lang, rest))
}

fn header_regex() -> &'static Regex {
    HEADER_REGEX.get_or_init(|| Regex::new(r"^#([0-9]{3})([0-9]{2})").unwrap())
}
