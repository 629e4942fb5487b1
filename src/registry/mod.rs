//! Upstream reference data for language tag validation.
//!
//! Three sources feed the subtag tables:
//!
//! - `iana`: the IANA Language Subtag Registry (subtags and their types)
//! - `iso639`: the ISO 639-2 code list (legacy three-letter aliases)
//! - `scripts`: Unicode `Scripts.txt` (code point ranges for script sniffing)
//!
//! `fetch` downloads all three and parses them into [`RegistryData`].

mod fetch;
mod iana;
mod iso639;
mod scripts;

pub use fetch::download_registry;
pub use iana::{parse_iana_registry, IanaRegistry, RecordType, RegistryRecord, UnknownRecordType};
pub use iso639::{parse_iso639_2, IsoAlias};
pub use scripts::{parse_unicode_scripts, ScriptRange};

use chrono::NaiveDate;

/// Everything needed to populate a subtag store.
#[derive(Debug, Clone, Default)]
pub struct RegistryData {
    pub file_date: Option<NaiveDate>,
    pub records: Vec<RegistryRecord>,
    pub iso_aliases: Vec<IsoAlias>,
    pub script_ranges: Vec<ScriptRange>,
}

impl RegistryData {
    /// Parse the three upstream source texts.
    pub fn parse(iana_text: &str, iso_text: &str, scripts_text: &str) -> Self {
        let registry = parse_iana_registry(iana_text);
        let iso_aliases = parse_iso639_2(iso_text);
        let script_ranges = parse_unicode_scripts(scripts_text, &registry);

        Self {
            file_date: registry.file_date,
            records: registry.records,
            iso_aliases,
            script_ranges,
        }
    }
}
