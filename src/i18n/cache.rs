//! Cache of successfully validated tags, keyed by the exact input string.

use crate::i18n::ValidatedTag;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe map from input tag to its validated decomposition.
///
/// Only successful validations are stored. Entries live until they are
/// explicitly cleared or purged.
#[derive(Debug, Default)]
pub struct TagCache {
    entries: Mutex<HashMap<String, ValidatedTag>>,
}

impl TagCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-seeded with tags known to be valid.
    pub fn preloaded(entries: impl IntoIterator<Item = (String, ValidatedTag)>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
        }
    }

    pub fn get(&self, tag: &str) -> Option<ValidatedTag> {
        self.lock().get(tag).cloned()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.lock().contains_key(tag)
    }

    pub fn insert(&self, tag: &str, validated: ValidatedTag) {
        self.lock().insert(tag.to_string(), validated);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Drop every entry whose tag is no longer in use.
    ///
    /// # Returns
    /// The number of entries removed.
    pub fn purge_unused<F>(&self, mut in_use: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|tag, _| in_use(tag));
        before - entries.len()
    }

    // A panic while holding the lock cannot leave a half-written entry
    fn lock(&self) -> MutexGuard<'_, HashMap<String, ValidatedTag>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{Subtag, SubtagKind};

    fn tag(primary: &str) -> ValidatedTag {
        ValidatedTag::new(vec![Subtag::new(primary, SubtagKind::Primary, "")])
    }

    #[test]
    fn test_insert_and_get() {
        let cache = TagCache::new();
        assert!(cache.is_empty());

        cache.insert("en", tag("en"));

        assert!(cache.contains("en"));
        assert_eq!(cache.get("en"), Some(tag("en")));
        assert_eq!(cache.get("EN"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = TagCache::preloaded(vec![
            ("en".to_string(), tag("en")),
            ("fr".to_string(), tag("fr")),
        ]);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_unused_keeps_tags_in_use() {
        let cache = TagCache::new();
        cache.insert("en", tag("en"));
        cache.insert("fr", tag("fr"));
        cache.insert("de", tag("de"));

        let in_use = ["fr"];
        let removed = cache.purge_unused(|t| in_use.contains(&t));

        assert_eq!(removed, 2);
        assert!(cache.contains("fr"));
        assert!(!cache.contains("en"));
        assert!(!cache.contains("de"));
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = std::sync::Arc::new(TagCache::new());
        let handles: Vec<_> = ["en", "fr", "de", "ja"]
            .into_iter()
            .map(|code| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.insert(code, tag(code)))
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread");
        }
        assert_eq!(cache.len(), 4);
    }
}
