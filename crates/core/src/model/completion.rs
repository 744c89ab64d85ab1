use serde_json::Value;
use thiserror::Error;

use crate::model::ids::LessonSlug;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Reasons a persisted completion blob cannot be read back.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    #[error("progress blob is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("progress blob is not a JSON array")]
    NotAnArray,

    #[error("progress entry {index} is not a string")]
    NonStringEntry { index: usize },
}

//
// ─── COMPLETION SET ────────────────────────────────────────────────────────────
//

/// The lessons a learner has marked as done.
///
/// Entries are unique and kept in insertion order so the serialized form is
/// stable across writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionSet {
    slugs: Vec<LessonSlug>,
}

impl CompletionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, slug: &str) -> bool {
        self.slugs.iter().any(|s| s.as_str() == slug)
    }

    /// Adds `slug`, returning `false` when it was already present.
    pub fn insert(&mut self, slug: LessonSlug) -> bool {
        if self.contains(slug.as_str()) {
            return false;
        }
        self.slugs.push(slug);
        true
    }

    /// Removes `slug`, returning `false` when it was not present.
    pub fn remove(&mut self, slug: &str) -> bool {
        let before = self.slugs.len();
        self.slugs.retain(|s| s.as_str() != slug);
        self.slugs.len() != before
    }

    /// Flips membership of `slug`. Returns the new membership.
    pub fn toggle(&mut self, slug: LessonSlug) -> bool {
        if self.remove(slug.as_str()) {
            false
        } else {
            self.slugs.push(slug);
            true
        }
    }

    pub fn clear(&mut self) {
        self.slugs.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LessonSlug> {
        self.slugs.iter()
    }

    /// Serialize to the persisted form, a JSON array of strings.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Malformed` if serialization fails.
    pub fn encode(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(&self.slugs)?)
    }

    /// Strictly parse a persisted blob.
    ///
    /// Duplicate entries are collapsed to their first occurrence.
    ///
    /// # Errors
    ///
    /// Returns `CodecError` if the blob is not a JSON array of strings.
    pub fn try_decode(raw: &str) -> Result<Self, CodecError> {
        let Value::Array(items) = serde_json::from_str::<Value>(raw)? else {
            return Err(CodecError::NotAnArray);
        };

        let mut set = Self::new();
        for (index, item) in items.into_iter().enumerate() {
            let Value::String(slug) = item else {
                return Err(CodecError::NonStringEntry { index });
            };
            set.insert(LessonSlug::from(slug));
        }
        Ok(set)
    }

    /// Lenient decode used when loading progress.
    ///
    /// An absent slot and anything that is not an array of strings both read
    /// as an empty set.
    #[must_use]
    pub fn decode(raw: Option<&str>) -> Self {
        raw.and_then(|raw| Self::try_decode(raw).ok())
            .unwrap_or_default()
    }
}

impl FromIterator<LessonSlug> for CompletionSet {
    fn from_iter<I: IntoIterator<Item = LessonSlug>>(iter: I) -> Self {
        let mut set = Self::new();
        for slug in iter {
            set.insert(slug);
        }
        set
    }
}

impl<'a> IntoIterator for &'a CompletionSet {
    type Item = &'a LessonSlug;
    type IntoIter = std::slice::Iter<'a, LessonSlug>;

    fn into_iter(self) -> Self::IntoIter {
        self.slugs.iter()
    }
}
