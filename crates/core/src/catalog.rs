//! The ordered lesson curriculum.
//!
//! The catalog is built once at startup and only read afterwards. Lessons are
//! ordered by their numeric ordering key; lessons sharing a key keep the order
//! in which they were supplied.

use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;

use crate::i18n::Locale;
use crate::model::{Lesson, LessonSlug, LocalizedText};

const BUILTIN_LESSONS: &str = include_str!("../data/lessons.json");

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("lesson slug cannot be empty")]
    EmptySlug,

    #[error("duplicate lesson slug: {0}")]
    DuplicateSlug(String),

    #[error("lesson {0} has no section")]
    EmptySection(String),

    #[error("lesson {0} has a non-finite ordering key")]
    InvalidOrder(String),

    #[error("lesson {slug} references unknown snippet {snippet}")]
    UnknownSnippet { slug: String, snippet: String },

    #[error("lesson data is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Serialized shape of a lesson in the curriculum data.
///
/// `snippet` names one of the starter programs shipped with the course;
/// `starter_code` carries code inline. When both are set, `starter_code` wins.
#[derive(Debug, Clone, Deserialize)]
pub struct LessonRecord {
    pub slug: String,
    pub order: f64,
    pub section: String,
    pub title: LocalizedText,
    pub summary: LocalizedText,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default, rename = "starterCode")]
    pub starter_code: Option<String>,
}

impl LessonRecord {
    fn into_lesson(self) -> Result<Lesson, CatalogError> {
        if self.slug.trim().is_empty() {
            return Err(CatalogError::EmptySlug);
        }
        if self.section.trim().is_empty() {
            return Err(CatalogError::EmptySection(self.slug));
        }
        if !self.order.is_finite() {
            return Err(CatalogError::InvalidOrder(self.slug));
        }

        let starter_code = match (self.starter_code, self.snippet) {
            (Some(code), _) => Some(code),
            (None, Some(name)) => match builtin_snippet(&name) {
                Some(code) => Some(code.to_owned()),
                None => {
                    return Err(CatalogError::UnknownSnippet {
                        slug: self.slug,
                        snippet: name,
                    });
                }
            },
            (None, None) => None,
        };

        Ok(Lesson::new(
            LessonSlug::new(self.slug),
            self.order,
            self.section,
            self.title,
            self.summary,
            starter_code,
        ))
    }
}

/// Starter programs bundled with the course, looked up by name.
#[must_use]
pub fn builtin_snippet(name: &str) -> Option<&'static str> {
    let code = match name {
        "jsx" => include_str!("../data/snippets/jsx.jsx"),
        "component" => include_str!("../data/snippets/component.tsx"),
        "props" => include_str!("../data/snippets/props.tsx"),
        "state" => include_str!("../data/snippets/state.tsx"),
        "events" => include_str!("../data/snippets/events.tsx"),
        "conditional" => include_str!("../data/snippets/conditional.tsx"),
        "list" => include_str!("../data/snippets/list.tsx"),
        "effect" => include_str!("../data/snippets/effect.tsx"),
        "fetch" => include_str!("../data/snippets/fetch.tsx"),
        "form" => include_str!("../data/snippets/form.tsx"),
        "drilling" => include_str!("../data/snippets/drilling.tsx"),
        "routing" => include_str!("../data/snippets/routing.tsx"),
        "dynamic" => include_str!("../data/snippets/dynamic.tsx"),
        "not_found" => include_str!("../data/snippets/not_found.tsx"),
        "organize" => include_str!("../data/snippets/organize.tsx"),
        "mini_layout" => include_str!("../data/snippets/mini_layout.tsx"),
        "mini_routing" => include_str!("../data/snippets/mini_routing.tsx"),
        "deploy" => include_str!("../data/snippets/deploy.tsx"),
        "structure" => include_str!("../data/snippets/structure.tsx"),
        "debugging" => include_str!("../data/snippets/debugging.tsx"),
        _ => return None,
    };
    Some(code)
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Neighbours of a lesson in curriculum order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjacent<'a> {
    pub previous: Option<&'a Lesson>,
    pub next: Option<&'a Lesson>,
}

/// Lessons sharing a section label.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    pub name: &'a str,
    pub lessons: Vec<&'a Lesson>,
}

#[derive(Debug, Clone)]
pub struct LessonCatalog {
    lessons: Vec<Lesson>,
    ordered: Vec<usize>,
}

impl LessonCatalog {
    /// Build a catalog from lesson records.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if a record fails validation or two records
    /// share a slug.
    pub fn from_records(records: Vec<LessonRecord>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut lessons = Vec::with_capacity(records.len());
        for record in records {
            let lesson = record.into_lesson()?;
            if !seen.insert(lesson.slug().clone()) {
                return Err(CatalogError::DuplicateSlug(lesson.slug().to_string()));
            }
            lessons.push(lesson);
        }

        let mut ordered: Vec<usize> = (0..lessons.len()).collect();
        // stable sort keeps input order among equal keys
        ordered.sort_by(|&a, &b| lessons[a].order().total_cmp(&lessons[b].order()));

        Ok(Self { lessons, ordered })
    }

    /// Parse a catalog from its JSON form (an array of lesson records).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Malformed` for invalid JSON, or a validation
    /// error from [`LessonCatalog::from_records`].
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let records: Vec<LessonRecord> = serde_json::from_str(raw)?;
        Self::from_records(records)
    }

    /// The curriculum shipped with the course.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the embedded data is invalid.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_LESSONS)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    #[must_use]
    pub fn get_by_slug(&self, slug: &str) -> Option<&Lesson> {
        self.lessons.iter().find(|lesson| lesson.slug() == slug)
    }

    #[must_use]
    pub fn contains(&self, slug: &str) -> bool {
        self.get_by_slug(slug).is_some()
    }

    /// Lessons in curriculum order.
    pub fn ordered(&self) -> impl Iterator<Item = &Lesson> {
        self.ordered.iter().map(|&idx| &self.lessons[idx])
    }

    /// Slugs in the order the lessons were supplied.
    pub fn slugs(&self) -> impl Iterator<Item = &LessonSlug> {
        self.lessons.iter().map(Lesson::slug)
    }

    /// First lesson in curriculum order.
    #[must_use]
    pub fn first(&self) -> Option<&Lesson> {
        self.ordered.first().map(|&idx| &self.lessons[idx])
    }

    /// Previous and next lessons around `slug`.
    ///
    /// A slug that is not in the catalog has no neighbours.
    #[must_use]
    pub fn adjacent(&self, slug: &str) -> Adjacent<'_> {
        let Some(pos) = self
            .ordered
            .iter()
            .position(|&idx| self.lessons[idx].slug() == slug)
        else {
            return Adjacent {
                previous: None,
                next: None,
            };
        };

        let previous = pos
            .checked_sub(1)
            .map(|prev| &self.lessons[self.ordered[prev]]);
        let next = self.ordered.get(pos + 1).map(|&idx| &self.lessons[idx]);
        Adjacent { previous, next }
    }

    /// Lessons whose slug or localized title contains `query`.
    ///
    /// Matching is case-insensitive on the title and ignores surrounding
    /// whitespace; an empty query matches every lesson. Results are in
    /// curriculum order.
    #[must_use]
    pub fn search(&self, query: &str, locale: Locale) -> Vec<&Lesson> {
        let needle = query.trim().to_lowercase();
        self.ordered()
            .filter(|lesson| {
                needle.is_empty()
                    || lesson.slug().as_str().contains(&needle)
                    || lesson.title().get(locale).to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Every lesson grouped by section, in curriculum order.
    #[must_use]
    pub fn sections(&self) -> Vec<Section<'_>> {
        group_by_section(self.ordered())
    }
}

/// Group lessons by section label, keeping sections in order of first
/// appearance.
pub fn group_by_section<'a>(lessons: impl IntoIterator<Item = &'a Lesson>) -> Vec<Section<'a>> {
    let mut sections: Vec<Section<'a>> = Vec::new();
    for lesson in lessons {
        match sections.iter_mut().find(|s| s.name == lesson.section()) {
            Some(section) => section.lessons.push(lesson),
            None => sections.push(Section {
                name: lesson.section(),
                lessons: vec![lesson],
            }),
        }
    }
    sections
}
