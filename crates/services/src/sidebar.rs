use lesson_core::catalog::{LessonCatalog, group_by_section};
use lesson_core::i18n::Locale;
use lesson_core::model::{CompletionSet, LessonSlug};
use lesson_core::progress::ProgressSummary;
use lesson_core::site::lesson_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarItem {
    pub slug: LessonSlug,
    pub title: String,
    pub path: String,
    pub completed: bool,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarSection {
    pub name: String,
    pub items: Vec<SidebarItem>,
}

/// The lesson navigation: lessons matching the search, grouped by section in
/// curriculum order, plus overall progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarView {
    pub locale: Locale,
    pub sections: Vec<SidebarSection>,
    pub summary: ProgressSummary,
}

impl SidebarView {
    /// `active` is the slug of the lesson currently shown, if any.
    #[must_use]
    pub fn build(
        catalog: &LessonCatalog,
        completion: &CompletionSet,
        locale: Locale,
        query: &str,
        active: Option<&str>,
    ) -> Self {
        let sections = group_by_section(catalog.search(query, locale))
            .into_iter()
            .map(|section| SidebarSection {
                name: section.name.to_owned(),
                items: section
                    .lessons
                    .into_iter()
                    .map(|lesson| SidebarItem {
                        slug: lesson.slug().clone(),
                        title: lesson.title().get(locale).to_owned(),
                        path: lesson_path(locale, lesson.slug()),
                        completed: completion.contains(lesson.slug().as_str()),
                        active: active == Some(lesson.slug().as_str()),
                    })
                    .collect(),
            })
            .collect();

        Self {
            locale,
            sections,
            summary: ProgressSummary::compute(catalog, completion),
        }
    }

    /// Lessons shown, across all sections.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    /// Text of the reset button, e.g. `Completed · 3`.
    #[must_use]
    pub fn completed_label(&self) -> String {
        format!(
            "{} · {}",
            self.locale.messages().completed_count,
            self.summary.completed
        )
    }
}
