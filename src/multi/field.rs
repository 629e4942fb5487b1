//! Packed multi-language field values.
//!
//! A field's master value and its per-language alternates share one storage
//! slot. Layout, with every length counted in UTF-16 code units and written
//! as zero-padded decimal:
//!
//! ```text
//! '#' codeLen:4 | baseLen:6 "00" { textLen:6 langLen:2 lang }* | base text*
//!               |<------------- code section ----------------->| text section
//! ```
//!
//! `codeLen` is the length of the code section. The texts follow in the same
//! order as their entries in the code section. Payload text is never escaped.

use crate::multi::utf16;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::warn;

/// Marker placed in front of the base value when a packed string is damaged.
pub const CORRUPT_MARKER: &str = "[corrupt field content: ";

const CODE_SECTION_WIDTH: usize = 4;
const TEXT_LEN_WIDTH: usize = 6;
const LANG_LEN_WIDTH: usize = 2;
// baseLen plus the empty language-length slot of the master entry
const MASTER_ENTRY_WIDTH: usize = TEXT_LEN_WIDTH + LANG_LEN_WIDTH;

static SIGNATURE_REGEX: OnceLock<Regex> = OnceLock::new();
static ENTRY_REGEX: OnceLock<Regex> = OnceLock::new();

/// A field value with optional per-language alternates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiField {
    /// Value in the master language
    pub base: String,

    /// Alternate values keyed by language tag
    pub per_language: BTreeMap<String, String>,
}

impl MultiField {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            per_language: BTreeMap::new(),
        }
    }

    pub fn with_variant(mut self, lang: impl Into<String>, text: impl Into<String>) -> Self {
        self.per_language.insert(lang.into(), text.into());
        self
    }

    pub fn encode(&self) -> String {
        encode(&self.base, &self.per_language)
    }

    pub fn decode(packed: &str) -> Self {
        decode(packed)
    }

    /// Whether the base value carries the corruption marker.
    pub fn is_corrupt(&self) -> bool {
        self.base.starts_with(CORRUPT_MARKER)
    }
}

/// Whether `s` starts with the packed-field signature.
pub fn is_packed(s: &str) -> bool {
    signature_regex().is_match(s)
}

/// Pack a base value and its per-language alternates into one string.
///
/// Alternates whose text or language length overflows its fixed-width
/// field, or that would push the code section past four digits, are
/// dropped with a warning so the rest still decodes. A base value too long
/// for its length field is stored unpacked.
pub fn encode(base: &str, per_language: &BTreeMap<String, String>) -> String {
    let base_len = utf16::len(base);
    if !fits(base_len, TEXT_LEN_WIDTH) {
        warn!(
            "Base value of {} units is too long to pack, storing it without alternates",
            base_len
        );
        return base.to_string();
    }

    let mut codes = format!("{:06}00", base_len);
    let mut codes_len = MASTER_ENTRY_WIDTH;
    let mut texts = String::from(base);

    for (lang, text) in per_language {
        let text_len = utf16::len(text);
        let lang_len = utf16::len(lang);
        let entry_len = MASTER_ENTRY_WIDTH + lang_len;

        if !fits(text_len, TEXT_LEN_WIDTH) || !fits(lang_len, LANG_LEN_WIDTH) {
            warn!(
                "Dropping '{}' alternate: {} text units, {} language units",
                lang, text_len, lang_len
            );
            continue;
        }
        if !fits(codes_len + entry_len, CODE_SECTION_WIDTH) {
            warn!("Dropping '{}' alternate: code section is full", lang);
            continue;
        }

        codes.push_str(&format!("{:06}{:02}{}", text_len, lang_len, lang));
        codes_len += entry_len;
        texts.push_str(text);
    }

    format!("#{:04}{}{}", codes_len, codes, texts)
}

/// Unpack a stored field value.
///
/// Strings without the packed signature are plain values and come back
/// verbatim as the base. Damaged packed strings never fail: whatever could
/// be recovered is returned, with the base prefixed by [`CORRUPT_MARKER`]
/// and any unclaimed text.
pub fn decode(packed: &str) -> MultiField {
    let caps = match signature_regex().captures(packed) {
        Some(caps) => caps,
        None => return MultiField::new(packed),
    };
    let codes_len: usize = caps[1].parse().unwrap_or_default();
    let base_len: usize = caps[2].parse().unwrap_or_default();

    // '#' and the four-digit code section length are ASCII
    let body = &packed[1 + CODE_SECTION_WIDTH..];
    let (codes, texts) = match utf16::split_at(body, codes_len) {
        Some(split) => split,
        None => (body, ""),
    };
    let mut corrupt = codes_len < MASTER_ENTRY_WIDTH || utf16::len(codes) < codes_len;

    let (base, mut texts) = take_text(texts, base_len, &mut corrupt);
    let mut codes = codes.get(MASTER_ENTRY_WIDTH..).unwrap_or_default();
    let mut per_language = BTreeMap::new();

    while !codes.is_empty() {
        let (text_len, lang, rest) = match parse_entry(codes) {
            Some(entry) => entry,
            None => {
                corrupt = true;
                break;
            }
        };
        codes = rest;

        let (text, remaining) = take_text(texts, text_len, &mut corrupt);
        texts = remaining;
        per_language.insert(lang.to_string(), text.to_string());
    }

    let base = if corrupt || !texts.is_empty() {
        warn!("Packed field is corrupt, {} unclaimed characters", utf16::len(texts));
        format!("{}{}] {}", CORRUPT_MARKER, texts, base)
    } else {
        base.to_string()
    };

    MultiField { base, per_language }
}

/// Parse one `textLen:6 langLen:2 lang` entry off the front of `codes`.
fn parse_entry(codes: &str) -> Option<(usize, &str, &str)> {
    let caps = entry_regex().captures(codes)?;
    let text_len: usize = caps[1].parse().ok()?;
    let lang_len: usize = caps[2].parse().ok()?;

    let rest = &codes[MASTER_ENTRY_WIDTH..];
    let (lang, rest) = utf16::split_at(rest, lang_len)?;
    Some((text_len, lang, rest))
}

/// Take `units` from the front of `texts`, flagging a short text section.
fn take_text<'a>(texts: &'a str, units: usize, corrupt: &mut bool) -> (&'a str, &'a str) {
    match utf16::split_at(texts, units) {
        Some(split) => split,
        None => {
            *corrupt = true;
            (texts, "")
        }
    }
}

fn fits(len: usize, width: usize) -> bool {
    len < 10usize.pow(width as u32)
}

fn signature_regex() -> &'static Regex {
    SIGNATURE_REGEX.get_or_init(|| Regex::new(r"^#([0-9]{4})([0-9]{6})00").unwrap())
}

fn entry_regex() -> &'static Regex {
    ENTRY_REGEX.get_or_init(|| Regex::new(r"^([0-9]{6})([0-9]{2})").unwrap())
}
