use serde::{Deserialize, Serialize};

use crate::i18n::Locale;
use crate::model::ids::LessonSlug;

/// A string available in every supported locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub th: String,
    pub en: String,
}

impl LocalizedText {
    #[must_use]
    pub fn new(th: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            th: th.into(),
            en: en.into(),
        }
    }

    #[must_use]
    pub fn get(&self, locale: Locale) -> &str {
        match locale {
            Locale::Th => &self.th,
            Locale::En => &self.en,
        }
    }
}

/// A single entry of the curriculum.
///
/// Lessons are immutable once the catalog is built; the catalog checks slugs
/// and sections before constructing them.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    slug: LessonSlug,
    order: f64,
    section: String,
    title: LocalizedText,
    summary: LocalizedText,
    starter_code: Option<String>,
}

impl Lesson {
    pub(crate) fn new(
        slug: LessonSlug,
        order: f64,
        section: String,
        title: LocalizedText,
        summary: LocalizedText,
        starter_code: Option<String>,
    ) -> Self {
        Self {
            slug,
            order,
            section,
            title,
            summary,
            starter_code,
        }
    }

    #[must_use]
    pub fn slug(&self) -> &LessonSlug {
        &self.slug
    }

    /// Ordering key; lower comes first.
    #[must_use]
    pub fn order(&self) -> f64 {
        self.order
    }

    #[must_use]
    pub fn section(&self) -> &str {
        &self.section
    }

    #[must_use]
    pub fn title(&self) -> &LocalizedText {
        &self.title
    }

    #[must_use]
    pub fn summary(&self) -> &LocalizedText {
        &self.summary
    }

    /// Code the playground starts with, if the lesson has one.
    #[must_use]
    pub fn starter_code(&self) -> Option<&str> {
        self.starter_code.as_deref()
    }
}
