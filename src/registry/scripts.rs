//! Script detection ranges derived from Unicode `Scripts.txt`.
//!
//! Unicode names scripts in words ("Old_Italic"), the registry by four-letter
//! subtag ("Ital"). Names are matched against registry script descriptions,
//! with a short table of fixups where the two disagree.

use crate::registry::{IanaRegistry, RecordType};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::warn;

/// Code points `from..=to` belong to the script with subtag `script`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRange {
    pub from: u32,
    pub to: u32,
    pub script: String,
}

/// Unicode script names the registry describes differently.
const SCRIPT_NAME_FIXUPS: &[(&str, &str)] = &[
    ("old italic", "Ital"),
    ("georgian", "Geor"),
    ("canadian aboriginal", "Cans"),
    ("phags pa", "Phag"),
    ("meetei mayek", "Mtai"),
    ("cuneiform", "Xsux"),
    ("nko", "Nkoo"),
];

/// Scripts that never identify a writing system on their own.
const SHARED_SCRIPTS: &[&str] = &["Common", "Inherited"];

static RANGE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Lowercased script names mapped to registry subtags.
struct ScriptNames {
    exact: HashMap<String, String>,
    // Description text before any parenthetical, e.g. "han"
    short: HashMap<String, String>,
}

impl ScriptNames {
    fn from_registry(registry: &IanaRegistry) -> Self {
        let mut exact = HashMap::new();
        let mut short = HashMap::new();

        for record in registry.records_of(RecordType::Script) {
            let (subtag, description) = match (&record.subtag, &record.description) {
                (Some(subtag), Some(description)) => (subtag, description.to_lowercase()),
                _ => continue,
            };
            if let Some((head, _)) = description.split_once(" (") {
                short
                    .entry(head.to_string())
                    .or_insert_with(|| subtag.clone());
            }
            exact.entry(description).or_insert_with(|| subtag.clone());
        }

        for (name, subtag) in SCRIPT_NAME_FIXUPS {
            exact.insert(name.to_string(), subtag.to_string());
        }

        Self { exact, short }
    }

    fn resolve(&self, name: &str) -> Option<&String> {
        self.exact.get(name).or_else(|| self.short.get(name))
    }
}

pub fn parse_unicode_scripts(text: &str, registry: &IanaRegistry) -> Vec<ScriptRange> {
    let regex = RANGE_REGEX.get_or_init(|| {
        Regex::new(r"^([A-Fa-f0-9]+)(?:\.\.([A-Fa-f0-9]+))?\s*;\s*(\w+)").unwrap()
    });

    let mut items: Vec<(u32, u32, String)> = text
        .lines()
        .map(|line| line.trim_start_matches('\u{feff}'))
        .filter_map(|line| regex.captures(line))
        .filter_map(|caps| {
            let from = u32::from_str_radix(&caps[1], 16).ok()?;
            let to = match caps.get(2) {
                Some(to) => u32::from_str_radix(to.as_str(), 16).ok()?,
                None => from,
            };
            Some((from, to, caps[3].replace('_', " ")))
        })
        .collect();
    items.sort_by_key(|(from, _, _)| *from);

    let names = ScriptNames::from_registry(registry);
    let mut ranges = Vec::new();

    for (from, to, name) in collapse(items) {
        if SHARED_SCRIPTS.contains(&name.as_str()) {
            continue;
        }
        match names.resolve(&name.to_lowercase()) {
            Some(subtag) => ranges.push(ScriptRange {
                from,
                to,
                script: subtag.clone(),
            }),
            None => warn!("No registry subtag for Unicode script '{}'", name),
        }
    }

    ranges
}

/// Merge neighbouring entries of the same script into one range.
fn collapse(items: Vec<(u32, u32, String)>) -> Vec<(u32, u32, String)> {
    let mut collapsed: Vec<(u32, u32, String)> = Vec::new();

    for (from, to, name) in items {
        if let Some(last) = collapsed.last_mut() {
            if last.2 == name {
                last.1 = to;
                continue;
            }
        }
        collapsed.push((from, to, name));
    }

    collapsed
}
