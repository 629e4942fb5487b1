//! Subtag types: the typed pieces a validated language tag decomposes into.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position a subtag occupies in a validated tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtagKind {
    Primary,
    Script,
    Region,
    Variant,
}

impl fmt::Display for SubtagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubtagKind::Primary => "primary",
            SubtagKind::Script => "script",
            SubtagKind::Region => "region",
            SubtagKind::Variant => "variant",
        };
        f.write_str(name)
    }
}

/// A single validated subtag with its registry description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtag {
    /// Subtag value as stored in the registry (e.g., "zh", "Hant", "TW")
    pub value: String,

    /// Position of the subtag within the tag
    pub kind: SubtagKind,

    /// First registry description (e.g., "Chinese", "Han (Traditional variant)")
    pub description: String,
}

impl Subtag {
    pub fn new(value: impl Into<String>, kind: SubtagKind, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind,
            description: description.into(),
        }
    }
}

/// A successfully validated language tag.
///
/// Always holds a primary subtag in first position, followed by at most one
/// script, at most one region and any number of distinct variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedTag {
    subtags: Vec<Subtag>,
}

impl ValidatedTag {
    pub(crate) fn new(subtags: Vec<Subtag>) -> Self {
        Self { subtags }
    }

    /// All subtags in tag order.
    pub fn subtags(&self) -> &[Subtag] {
        &self.subtags
    }

    pub fn primary(&self) -> Option<&Subtag> {
        self.first_of(SubtagKind::Primary)
    }

    pub fn script(&self) -> Option<&Subtag> {
        self.first_of(SubtagKind::Script)
    }

    pub fn region(&self) -> Option<&Subtag> {
        self.first_of(SubtagKind::Region)
    }

    pub fn variants(&self) -> impl Iterator<Item = &Subtag> {
        self.subtags
            .iter()
            .filter(|subtag| subtag.kind == SubtagKind::Variant)
    }

    fn first_of(&self, kind: SubtagKind) -> Option<&Subtag> {
        self.subtags.iter().find(|subtag| subtag.kind == kind)
    }
}

/// Normalized tag: the registry spellings of the subtags joined with `-`.
impl fmt::Display for ValidatedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, subtag) in self.subtags.iter().enumerate() {
            if index > 0 {
                f.write_str("-")?;
            }
            f.write_str(&subtag.value)?;
        }
        Ok(())
    }
}
