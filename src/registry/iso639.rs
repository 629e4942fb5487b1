//! Parser for the Library of Congress ISO 639-2 code list.
//!
//! Each line reads `bibliographic|terminologic|alpha-2|English name|French name`.
//! Codes with an alpha-2 equivalent are mapped to it, since the IANA
//! registry only lists the shortest code for a language.

/// Legacy ISO 639-2 code and the IANA subtag that replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoAlias {
    pub iso: String,
    pub iana: String,
}

pub fn parse_iso639_2(text: &str) -> Vec<IsoAlias> {
    let mut aliases = Vec::new();

    for line in text.lines() {
        let line = line.trim_start_matches('\u{feff}');
        let columns: Vec<&str> = line.split('|').collect();
        if columns.len() < 3 {
            continue;
        }

        let iana = columns[2].trim();
        if iana.is_empty() {
            continue;
        }

        for iso in [columns[0], columns[1]] {
            let iso = iso.trim();
            if !iso.is_empty() {
                aliases.push(IsoAlias {
                    iso: iso.to_string(),
                    iana: iana.to_string(),
                });
            }
        }
    }

    aliases
}
