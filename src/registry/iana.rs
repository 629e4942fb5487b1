//! Parser for the IANA Language Subtag Registry.
//!
//! The registry is a sequence of records separated by `%%` lines. Each record
//! holds `Field-Name: value` lines; a line starting with a space continues
//! the previous value. The first record only carries the `File-Date`.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// The `Type` of a registry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Language,
    ExtLang,
    Script,
    Region,
    Variant,
    Grandfathered,
    Redundant,
}

impl RecordType {
    /// Spelling used in the registry and in the stored tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Language => "language",
            RecordType::ExtLang => "extlang",
            RecordType::Script => "script",
            RecordType::Region => "region",
            RecordType::Variant => "variant",
            RecordType::Grandfathered => "grandfathered",
            RecordType::Redundant => "redundant",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown registry record type '{0}'")]
pub struct UnknownRecordType(pub String);

impl FromStr for RecordType {
    type Err = UnknownRecordType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "language" => Ok(RecordType::Language),
            "extlang" => Ok(RecordType::ExtLang),
            "script" => Ok(RecordType::Script),
            "region" => Ok(RecordType::Region),
            "variant" => Ok(RecordType::Variant),
            "grandfathered" => Ok(RecordType::Grandfathered),
            "redundant" => Ok(RecordType::Redundant),
            other => Err(UnknownRecordType(other.to_string())),
        }
    }
}

/// One registry record.
///
/// Only the first occurrence of a repeated field is kept, except `Prefix`,
/// which may legitimately appear several times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryRecord {
    pub record_type: RecordType,
    pub subtag: Option<String>,
    /// Full tag, set instead of `subtag` for grandfathered and redundant records
    pub tag: Option<String>,
    pub description: Option<String>,
    pub scope: Option<String>,
    pub suppress_script: Option<String>,
    pub preferred_value: Option<String>,
    pub macrolanguage: Option<String>,
    pub added: Option<String>,
    pub deprecated: Option<String>,
    pub comments: Option<String>,
    pub prefixes: Vec<String>,
}

impl RegistryRecord {
    /// Value the record is looked up by: its subtag, or its full tag.
    pub fn key(&self) -> Option<&str> {
        self.subtag.as_deref().or(self.tag.as_deref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct IanaRegistry {
    pub file_date: Option<NaiveDate>,
    pub records: Vec<RegistryRecord>,
}

impl IanaRegistry {
    pub fn records_of(&self, record_type: RecordType) -> impl Iterator<Item = &RegistryRecord> {
        self.records
            .iter()
            .filter(move |record| record.record_type == record_type)
    }
}

pub fn parse_iana_registry(text: &str) -> IanaRegistry {
    let mut registry = IanaRegistry::default();
    let mut fields: Vec<(String, String)> = Vec::new();

    for line in text.trim_start_matches('\u{feff}').lines() {
        let line = line.trim_end();

        if line == "%%" {
            finish_record(&mut fields, &mut registry);
            continue;
        }

        if line.starts_with(' ') {
            if let Some((_, value)) = fields.last_mut() {
                value.push(' ');
                value.push_str(line.trim_start());
            }
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            if !key.contains(' ') {
                fields.push((normalize_key(key), value.trim().to_string()));
            }
        }
    }
    finish_record(&mut fields, &mut registry);

    registry
}

/// `Suppress-Script` becomes `suppressscript`.
fn normalize_key(key: &str) -> String {
    key.to_lowercase().replace('-', "")
}

fn finish_record(fields: &mut Vec<(String, String)>, registry: &mut IanaRegistry) {
    if fields.is_empty() {
        return;
    }
    let fields = std::mem::take(fields);

    let first = |name: &str| {
        fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    };

    if let Some(date) = first("filedate") {
        match NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
            Ok(date) => registry.file_date = Some(date),
            Err(e) => warn!("Unparseable registry File-Date '{}': {}", date, e),
        }
        return;
    }

    let record_type = match first("type").map(|t| t.parse::<RecordType>()) {
        Some(Ok(record_type)) => record_type,
        Some(Err(e)) => {
            warn!("Skipping registry record: {}", e);
            return;
        }
        None => {
            warn!("Skipping registry record without a Type field");
            return;
        }
    };

    registry.records.push(RegistryRecord {
        record_type,
        subtag: first("subtag"),
        tag: first("tag"),
        description: first("description"),
        scope: first("scope"),
        suppress_script: first("suppressscript"),
        preferred_value: first("preferredvalue"),
        macrolanguage: first("macrolanguage"),
        added: first("added"),
        deprecated: first("deprecated"),
        comments: first("comments"),
        prefixes: fields
            .iter()
            .filter(|(key, _)| key == "prefix")
            .map(|(_, value)| value.clone())
            .collect(),
    });
}
