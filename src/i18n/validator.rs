//! Language tag validation.
//!
//! A tag is decomposed stage by stage into primary, script, region and
//! variant subtags. Each stage inspects the front of the remaining
//! hyphen-separated elements (the remnant) and consumes it only when the
//! reference tables confirm it.

use crate::i18n::{StoreError, Subtag, SubtagKind, SubtagStore, TagCache, ValidatedTag};
use crate::registry::RecordType;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::debug;

/// Legacy tags accepted verbatim as a primary subtag.
///
/// Matched by prefix in list order; longer tags precede their own prefixes.
pub const GRANDFATHERED_TAGS: &[&str] = &[
    "en-GB-oed",
    "i-ami",
    "i-bnn",
    "i-default",
    "i-enochian",
    "i-hak",
    "i-klingon",
    "i-lux",
    "i-mingo",
    "i-navajo",
    "i-pwn",
    "i-tao",
    "i-tay",
    "i-tsu",
    "sgn-BE-FR",
    "sgn-BE-NL",
    "sgn-CH-DE",
    "art-lojban",
    "cel-gaulish",
    "no-bok",
    "no-nyn",
    "zh-guoyu",
    "zh-hakka",
    "zh-min-nan",
    "zh-min",
    "zh-xiang",
];

/// Script subtags that stand in for "no particular script".
const SCRIPT_PLACEHOLDERS: &[&str] = &["Zyyy", "Zxxx"];

/// Reasons a tag fails validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid primary language tag '{tag}': no conformant subtag in first position")]
    InvalidPrimaryTag { tag: String },

    #[error("invalid primary language tag '{tag}': corrupt grandfathered stub after '{grandfathered}'")]
    MalformedGrandfatheredTag { tag: String, grandfathered: String },

    #[error("repeat use of variant subtag '{variant}' in '{tag}'")]
    DuplicateVariant { tag: String, variant: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ValidationError {
    /// Whether the failure concerns the primary subtag.
    pub fn is_invalid_primary(&self) -> bool {
        matches!(
            self,
            ValidationError::InvalidPrimaryTag { .. }
                | ValidationError::MalformedGrandfatheredTag { .. }
        )
    }
}

/// Working state of a single validation run.
#[derive(Debug, Default)]
struct Decomposition {
    remnant: VecDeque<String>,
    subtags: Vec<Subtag>,
}

impl Decomposition {
    fn consume(&mut self, kind: SubtagKind, value: String, description: String) {
        self.remnant.pop_front();
        self.subtags.push(Subtag {
            value,
            kind,
            description,
        });
    }
}

/// Validator for language tags against a subtag store.
pub struct TagValidator<S> {
    store: S,
    cache: TagCache,
}

impl<S: SubtagStore> TagValidator<S> {
    pub fn new(store: S) -> Self {
        Self::with_cache(store, TagCache::new())
    }

    pub fn with_cache(store: S, cache: TagCache) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &TagCache {
        &self.cache
    }

    /// Validate and normalize a language tag.
    ///
    /// # Arguments
    /// * `tag` - The tag to validate, already trimmed (e.g., "zh-Hant-TW")
    /// * `sample_text` - Optional text in the tagged language, used to sniff
    ///   the script when the tag has none or only a placeholder
    ///
    /// # Returns
    /// The decomposed tag. Successful results are cached by `tag`, so later
    /// calls with the same string return the first result unchanged.
    pub fn validate(
        &self,
        tag: &str,
        sample_text: Option<&str>,
    ) -> Result<ValidatedTag, ValidationError> {
        if let Some(cached) = self.cache.get(tag) {
            debug!("Tag '{}' served from cache", tag);
            return Ok(cached);
        }

        let mut state = Decomposition::default();
        self.resolve_primary(tag, &mut state)?;
        self.resolve_script(sample_text, &mut state)?;
        self.resolve_region(&mut state)?;
        self.resolve_variants(tag, &mut state)?;

        if !state.remnant.is_empty() {
            debug!(
                "Discarding unmatched subtags {:?} from '{}'",
                state.remnant, tag
            );
        }

        let validated = ValidatedTag::new(state.subtags);
        debug!("Validated '{}' as '{}'", tag, validated);
        self.cache.insert(tag, validated.clone());
        Ok(validated)
    }

    /// Validate a tag, folding every failure into `false`.
    pub fn is_valid(&self, tag: &str, sample_text: Option<&str>) -> bool {
        match self.validate(tag, sample_text) {
            Ok(_) => true,
            Err(e) => {
                debug!("Language tag validation failed: {}", e);
                false
            }
        }
    }

    fn resolve_primary(&self, tag: &str, state: &mut Decomposition) -> Result<(), ValidationError> {
        if let Some(grandfathered) = GRANDFATHERED_TAGS.iter().find(|g| tag.starts_with(**g)) {
            let rest = &tag[grandfathered.len()..];
            if !rest.is_empty() {
                let rest = rest.strip_prefix('-').ok_or_else(|| {
                    ValidationError::MalformedGrandfatheredTag {
                        tag: tag.to_string(),
                        grandfathered: grandfathered.to_string(),
                    }
                })?;
                state.remnant = split_subtags(rest);
            }

            let description = self
                .store
                .find_subtag(RecordType::Grandfathered, grandfathered)?
                .map(|record| record.description)
                .unwrap_or_default();
            state.subtags.push(Subtag::new(
                *grandfathered,
                SubtagKind::Primary,
                description,
            ));
            return Ok(());
        }

        state.remnant = split_subtags(tag);

        if let Some(first) = state.remnant.front_mut() {
            if is_iso639_2_candidate(first) {
                if let Some(alias) = self.store.iso639_2_alias(first)? {
                    debug!("Mapped ISO 639-2 code '{}' to '{}'", first, alias);
                    *first = alias;
                }
            }
        }

        for len in [2, 3] {
            if self.try_primary(len, state)? {
                return Ok(());
            }
        }

        Err(ValidationError::InvalidPrimaryTag {
            tag: tag.to_string(),
        })
    }

    /// Match the first remnant element as a primary subtag of exactly `len` characters.
    fn try_primary(&self, len: usize, state: &mut Decomposition) -> Result<bool, ValidationError> {
        let candidate = match state.remnant.front() {
            Some(candidate) => candidate,
            None => return Ok(false),
        };

        if is_three_digits(candidate) || candidate.chars().count() != len {
            return Ok(false);
        }

        match self.store.find_subtag(RecordType::Language, candidate)? {
            Some(record) => {
                state.consume(SubtagKind::Primary, record.subtag, record.description);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn resolve_script(
        &self,
        sample_text: Option<&str>,
        state: &mut Decomposition,
    ) -> Result<(), ValidationError> {
        let needs_sniffing = state
            .remnant
            .front()
            .map_or(true, |first| is_script_placeholder(first));

        if needs_sniffing {
            let text = match sample_text {
                Some(text) => text,
                None => return Ok(()),
            };
            let script = match self.detect_script(text)? {
                Some(script) => script,
                None => return Ok(()),
            };
            match state.remnant.front_mut() {
                Some(first) => *first = script,
                None => state.remnant.push_back(script),
            }
        }

        let candidate = match state.remnant.front() {
            Some(candidate) => candidate,
            None => return Ok(()),
        };
        if let Some(record) = self.store.find_subtag(RecordType::Script, candidate)? {
            state.consume(SubtagKind::Script, record.subtag, record.description);
        }
        Ok(())
    }

    /// First script found among the characters of `text`.
    fn detect_script(&self, text: &str) -> Result<Option<String>, ValidationError> {
        for ch in text.chars() {
            if let Some(script) = self.store.script_for_code_point(ch as u32)? {
                debug!("Detected script '{}' from {:?}", script, ch);
                return Ok(Some(script));
            }
        }
        debug!("No script detected");
        Ok(None)
    }

    fn resolve_region(&self, state: &mut Decomposition) -> Result<(), ValidationError> {
        let candidate = match state.remnant.front() {
            Some(candidate) => candidate,
            None => return Ok(()),
        };
        if let Some(record) = self.store.find_subtag(RecordType::Region, candidate)? {
            state.consume(SubtagKind::Region, record.subtag, record.description);
        }
        Ok(())
    }

    /// Runs once per element present when the stage starts, so unmatched
    /// elements stop the loop instead of being retried forever.
    fn resolve_variants(
        &self,
        tag: &str,
        state: &mut Decomposition,
    ) -> Result<(), ValidationError> {
        let iterations = state.remnant.len();

        for _ in 0..iterations {
            let candidate = match state.remnant.front() {
                Some(candidate) => candidate,
                None => break,
            };

            let repeated = state
                .subtags
                .iter()
                .any(|s| s.kind == SubtagKind::Variant && s.value == *candidate);
            if repeated {
                return Err(ValidationError::DuplicateVariant {
                    tag: tag.to_string(),
                    variant: candidate.clone(),
                });
            }

            if let Some(record) = self.store.find_subtag(RecordType::Variant, candidate)? {
                state.consume(SubtagKind::Variant, record.subtag, record.description);
            }
        }
        Ok(())
    }
}

fn split_subtags(s: &str) -> VecDeque<String> {
    s.split('-').map(str::to_string).collect()
}

fn is_iso639_2_candidate(s: &str) -> bool {
    s.len() == 3 && s.bytes().all(|b| b.is_ascii_alphabetic())
}

fn is_three_digits(s: &str) -> bool {
    s.len() == 3 && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_script_placeholder(s: &str) -> bool {
    s.starts_with('Q') || SCRIPT_PLACEHOLDERS.contains(&s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::MemoryStore;
    use crate::registry::ScriptRange;
    use std::cell::Cell;

    // ==================== Helper Functions ====================

    fn test_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .insert_subtag(RecordType::Language, "en", "English", None)
            .insert_subtag(RecordType::Language, "fr", "French", None)
            .insert_subtag(RecordType::Language, "zh", "Chinese", Some("macrolanguage"))
            .insert_subtag(RecordType::Language, "sl", "Slovenian", None)
            .insert_subtag(RecordType::Language, "ja", "Japanese", None)
            .insert_subtag(RecordType::Language, "yue", "Yue Chinese", None)
            .insert_subtag(
                RecordType::Language,
                "afa",
                "Afro-Asiatic languages",
                Some("collection"),
            )
            .insert_subtag(RecordType::Script, "Hant", "Han (Traditional variant)", None)
            .insert_subtag(RecordType::Script, "Hani", "Han (Hanzi, Kanji, Hanja)", None)
            .insert_subtag(RecordType::Script, "Latn", "Latin", None)
            .insert_subtag(RecordType::Script, "Cyrl", "Cyrillic", None)
            .insert_subtag(RecordType::Script, "Zyyy", "Code for undetermined script", None)
            .insert_subtag(RecordType::Region, "TW", "Taiwan, Province of China", None)
            .insert_subtag(RecordType::Region, "GB", "United Kingdom", None)
            .insert_subtag(RecordType::Region, "IT", "Italy", None)
            .insert_subtag(RecordType::Region, "419", "Latin America and the Caribbean", None)
            .insert_subtag(RecordType::Variant, "rozaj", "Resian", None)
            .insert_subtag(RecordType::Variant, "biske", "The San Giorgio dialect of Resian", None)
            .insert_subtag(RecordType::Variant, "1994", "Standardized Resian orthography", None)
            .insert_subtag(
                RecordType::Grandfathered,
                "en-GB-oed",
                "English, Oxford English Dictionary spelling",
                None,
            )
            .insert_alias("fre", "fr")
            .insert_alias("chi", "zh")
            .insert_script_range(ScriptRange {
                from: 0x0041,
                to: 0x024F,
                script: "Latn".to_string(),
            })
            .insert_script_range(ScriptRange {
                from: 0x0400,
                to: 0x052F,
                script: "Cyrl".to_string(),
            })
            .insert_script_range(ScriptRange {
                from: 0x4E00,
                to: 0x9FFF,
                script: "Hani".to_string(),
            });
        store
    }

    fn values(tag: &ValidatedTag) -> Vec<(SubtagKind, &str)> {
        tag.subtags()
            .iter()
            .map(|s| (s.kind, s.value.as_str()))
            .collect()
    }

    /// Store wrapper counting how many lookups reach the tables.
    struct CountingStore {
        inner: MemoryStore,
        lookups: Cell<usize>,
    }

    impl SubtagStore for CountingStore {
        fn iso639_2_alias(&self, code: &str) -> Result<Option<String>, StoreError> {
            self.lookups.set(self.lookups.get() + 1);
            self.inner.iso639_2_alias(code)
        }

        fn find_subtag(
            &self,
            record_type: RecordType,
            value: &str,
        ) -> Result<Option<crate::i18n::SubtagRecord>, StoreError> {
            self.lookups.set(self.lookups.get() + 1);
            self.inner.find_subtag(record_type, value)
        }

        fn script_for_code_point(&self, code_point: u32) -> Result<Option<String>, StoreError> {
            self.lookups.set(self.lookups.get() + 1);
            self.inner.script_for_code_point(code_point)
        }
    }

    // ==================== Primary Subtag Tests ====================

    #[test]
    fn test_two_letter_primary() {
        let validator = TagValidator::new(test_store());
        let tag = validator.validate("en", None).expect("Should validate");

        assert_eq!(values(&tag), vec![(SubtagKind::Primary, "en")]);
        assert_eq!(tag.subtags()[0].description, "English");
    }

    #[test]
    fn test_three_letter_primary() {
        let validator = TagValidator::new(test_store());
        let tag = validator.validate("yue", None).expect("Should validate");
        assert_eq!(values(&tag), vec![(SubtagKind::Primary, "yue")]);
    }

    #[test]
    fn test_iso639_2_alias_rewrites_primary() {
        let validator = TagValidator::new(test_store());
        let tag = validator.validate("fre", None).expect("Should validate");
        assert_eq!(values(&tag), vec![(SubtagKind::Primary, "fr")]);

        let tag = validator.validate("chi-Hant", None).expect("Should validate");
        assert_eq!(
            values(&tag),
            vec![(SubtagKind::Primary, "zh"), (SubtagKind::Script, "Hant")]
        );
    }

    #[test]
    fn test_unknown_primary_fails() {
        let validator = TagValidator::new(test_store());
        let err = validator.validate("xx-TW", None).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPrimaryTag { .. }));
        assert!(err.is_invalid_primary());
    }

    #[test]
    fn test_collection_primary_fails() {
        let validator = TagValidator::new(test_store());
        let err = validator.validate("afa", None).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPrimaryTag { .. }));
    }

    #[test]
    fn test_three_digit_primary_rejected() {
        let mut store = test_store();
        store.insert_subtag(RecordType::Language, "123", "Not a language", None);
        let validator = TagValidator::new(store);

        assert!(validator.validate("123", None).is_err());
    }

    #[test]
    fn test_wrong_length_primary_rejected() {
        let validator = TagValidator::new(test_store());
        assert!(validator.validate("e", None).is_err());
        assert!(validator.validate("engl", None).is_err());
        assert!(validator.validate("", None).is_err());
    }

    // ==================== Grandfathered Tag Tests ====================

    #[test]
    fn test_grandfathered_tag_is_single_primary() {
        let validator = TagValidator::new(test_store());
        let tag = validator.validate("en-GB-oed", None).expect("Should validate");

        assert_eq!(values(&tag), vec![(SubtagKind::Primary, "en-GB-oed")]);
        assert_eq!(
            tag.subtags()[0].description,
            "English, Oxford English Dictionary spelling"
        );
    }

    #[test]
    fn test_grandfathered_without_registry_entry() {
        let validator = TagValidator::new(test_store());
        let tag = validator.validate("i-klingon", None).expect("Should validate");

        assert_eq!(values(&tag), vec![(SubtagKind::Primary, "i-klingon")]);
        assert_eq!(tag.subtags()[0].description, "");
    }

    #[test]
    fn test_grandfathered_with_trailing_subtags() {
        let validator = TagValidator::new(test_store());
        let tag = validator
            .validate("i-klingon-Latn-GB", None)
            .expect("Should validate");

        assert_eq!(
            values(&tag),
            vec![
                (SubtagKind::Primary, "i-klingon"),
                (SubtagKind::Script, "Latn"),
                (SubtagKind::Region, "GB"),
            ]
        );
    }

    #[test]
    fn test_grandfathered_longest_match_first() {
        let validator = TagValidator::new(test_store());
        let tag = validator.validate("zh-min-nan", None).expect("Should validate");
        assert_eq!(values(&tag), vec![(SubtagKind::Primary, "zh-min-nan")]);

        let tag = validator.validate("zh-min", None).expect("Should validate");
        assert_eq!(values(&tag), vec![(SubtagKind::Primary, "zh-min")]);
    }

    #[test]
    fn test_corrupt_grandfathered_stub() {
        let validator = TagValidator::new(test_store());
        let err = validator.validate("i-klingonx", None).unwrap_err();

        assert!(matches!(
            err,
            ValidationError::MalformedGrandfatheredTag { ref grandfathered, .. } if grandfathered == "i-klingon"
        ));
        assert!(err.is_invalid_primary());
    }

    // ==================== Script / Region Tests ====================

    #[test]
    fn test_full_tag_decomposition() {
        let validator = TagValidator::new(test_store());
        let tag = validator.validate("zh-Hant-TW", None).expect("Should validate");

        assert_eq!(
            values(&tag),
            vec![
                (SubtagKind::Primary, "zh"),
                (SubtagKind::Script, "Hant"),
                (SubtagKind::Region, "TW"),
            ]
        );
        assert_eq!(tag.to_string(), "zh-Hant-TW");
    }

    #[test]
    fn test_region_without_script() {
        let validator = TagValidator::new(test_store());
        let tag = validator.validate("en-GB", None).expect("Should validate");
        assert_eq!(
            values(&tag),
            vec![(SubtagKind::Primary, "en"), (SubtagKind::Region, "GB")]
        );
    }

    #[test]
    fn test_numeric_region() {
        let validator = TagValidator::new(test_store());
        let tag = validator.validate("fr-419", None).expect("Should validate");
        assert_eq!(tag.region().map(|s| s.value.as_str()), Some("419"));
    }

    #[test]
    fn test_unknown_script_and_region_are_skipped() {
        let validator = TagValidator::new(test_store());
        let tag = validator.validate("en-Xxxx-ZZ", None).expect("Should validate");
        assert_eq!(values(&tag), vec![(SubtagKind::Primary, "en")]);
    }

    #[test]
    fn test_script_sniffed_from_sample_text() {
        let validator = TagValidator::new(test_store());
        let tag = validator
            .validate("zh", Some("  123 中文"))
            .expect("Should validate");

        assert_eq!(
            values(&tag),
            vec![(SubtagKind::Primary, "zh"), (SubtagKind::Script, "Hani")]
        );
    }

    #[test]
    fn test_script_placeholder_replaced_by_sniffing() {
        let validator = TagValidator::new(test_store());
        let tag = validator
            .validate("ja-Zyyy-TW", Some("漢字"))
            .expect("Should validate");

        assert_eq!(
            values(&tag),
            vec![
                (SubtagKind::Primary, "ja"),
                (SubtagKind::Script, "Hani"),
                (SubtagKind::Region, "TW"),
            ]
        );
    }

    #[test]
    fn test_unwritten_script_replaced_by_sniffing() {
        let validator = TagValidator::new(test_store());
        let tag = validator
            .validate("ja-Zxxx-TW", Some("漢字"))
            .expect("Should validate");

        assert_eq!(
            values(&tag),
            vec![
                (SubtagKind::Primary, "ja"),
                (SubtagKind::Script, "Hani"),
                (SubtagKind::Region, "TW"),
            ]
        );

        // Without sample text Zxxx is left in place and blocks the region
        let validator = TagValidator::new(test_store());
        let tag = validator.validate("ja-Zxxx-TW", None).expect("Should validate");
        assert_eq!(values(&tag), vec![(SubtagKind::Primary, "ja")]);
    }

    #[test]
    fn test_private_use_script_without_text_is_not_looked_up() {
        let validator = TagValidator::new(test_store());
        let tag = validator.validate("en-Qaaa-GB", None).expect("Should validate");

        // Qaaa stays in front of the region and blocks it
        assert_eq!(values(&tag), vec![(SubtagKind::Primary, "en")]);
    }

    #[test]
    fn test_sniffing_finds_nothing() {
        let validator = TagValidator::new(test_store());
        let tag = validator.validate("en", Some("1234 !?")).expect("Should validate");
        assert_eq!(values(&tag), vec![(SubtagKind::Primary, "en")]);
    }

    #[test]
    fn test_explicit_script_ignores_sample_text() {
        let validator = TagValidator::new(test_store());
        let tag = validator
            .validate("sl-Latn", Some("Привет"))
            .expect("Should validate");
        assert_eq!(tag.script().map(|s| s.value.as_str()), Some("Latn"));
    }

    // ==================== Variant Tests ====================

    #[test]
    fn test_multiple_variants() {
        let validator = TagValidator::new(test_store());
        let tag = validator
            .validate("sl-IT-rozaj-biske-1994", None)
            .expect("Should validate");

        assert_eq!(
            values(&tag),
            vec![
                (SubtagKind::Primary, "sl"),
                (SubtagKind::Region, "IT"),
                (SubtagKind::Variant, "rozaj"),
                (SubtagKind::Variant, "biske"),
                (SubtagKind::Variant, "1994"),
            ]
        );
    }

    #[test]
    fn test_duplicate_variant_fails() {
        let validator = TagValidator::new(test_store());
        let err = validator.validate("sl-rozaj-rozaj", None).unwrap_err();

        assert!(matches!(
            err,
            ValidationError::DuplicateVariant { ref variant, .. } if variant == "rozaj"
        ));
        assert!(!err.is_invalid_primary());
        assert!(!validator.cache().contains("sl-rozaj-rozaj"));
    }

    #[test]
    fn test_unmatched_trailing_elements_dropped() {
        let validator = TagValidator::new(test_store());
        let tag = validator
            .validate("sl-rozaj-garbage-biske", None)
            .expect("Should validate");

        // The loop stalls on "garbage" and never reaches "biske"
        assert_eq!(
            values(&tag),
            vec![(SubtagKind::Primary, "sl"), (SubtagKind::Variant, "rozaj")]
        );
    }

    // ==================== Cache Tests ====================

    #[test]
    fn test_second_validation_served_from_cache() {
        let store = CountingStore {
            inner: test_store(),
            lookups: Cell::new(0),
        };
        let validator = TagValidator::new(store);

        let first = validator.validate("zh-Hant-TW", None).expect("Should validate");
        let lookups_after_first = validator.store().lookups.get();
        assert!(lookups_after_first > 0);

        let second = validator.validate("zh-Hant-TW", None).expect("Should validate");
        assert_eq!(first, second);
        assert_eq!(validator.store().lookups.get(), lookups_after_first);
    }

    #[test]
    fn test_cache_keeps_sniffed_script() {
        let validator = TagValidator::new(test_store());
        validator.validate("zh", Some("中文")).expect("Should validate");

        let cached = validator.validate("zh", None).expect("Should validate");
        assert_eq!(cached.script().map(|s| s.value.as_str()), Some("Hani"));
    }

    #[test]
    fn test_failures_are_not_cached() {
        let validator = TagValidator::new(test_store());
        assert!(!validator.is_valid("xx", None));
        assert!(validator.cache().is_empty());
    }

    #[test]
    fn test_cache_clear_forces_revalidation() {
        let validator = TagValidator::new(test_store());
        assert!(validator.is_valid("en-GB", None));
        assert_eq!(validator.cache().len(), 1);

        validator.cache().clear();
        assert!(validator.cache().is_empty());
        assert!(validator.is_valid("en-GB", None));
    }

    #[test]
    fn test_validator_over_borrowed_store() {
        let store = test_store();
        let validator = TagValidator::new(&store);
        assert!(validator.is_valid("fr", None));
    }
}
