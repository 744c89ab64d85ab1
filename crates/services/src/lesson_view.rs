use lesson_core::catalog::LessonCatalog;
use lesson_core::i18n::Locale;
use lesson_core::model::{CompletionSet, Lesson, LessonSlug};
use lesson_core::site::lesson_path;

/// Link to a neighbouring lesson, already localized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonLink {
    pub slug: LessonSlug,
    pub title: String,
    pub path: String,
}

impl LessonLink {
    fn new(lesson: &Lesson, locale: Locale) -> Self {
        Self {
            slug: lesson.slug().clone(),
            title: lesson.title().get(locale).to_owned(),
            path: lesson_path(locale, lesson.slug()),
        }
    }
}

/// Everything a lesson page shows, resolved for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonPage {
    pub slug: LessonSlug,
    pub locale: Locale,
    pub section: String,
    pub title: String,
    pub summary: String,
    pub starter_code: Option<String>,
    pub completed: bool,
    pub previous: Option<LessonLink>,
    pub next: Option<LessonLink>,
}

impl LessonPage {
    /// Build the page for `slug`, or `None` if the catalog has no such lesson.
    #[must_use]
    pub fn build(
        catalog: &LessonCatalog,
        completion: &CompletionSet,
        slug: &str,
        locale: Locale,
    ) -> Option<Self> {
        let lesson = catalog.get_by_slug(slug)?;
        let adjacent = catalog.adjacent(slug);
        Some(Self {
            slug: lesson.slug().clone(),
            locale,
            section: lesson.section().to_owned(),
            title: lesson.title().get(locale).to_owned(),
            summary: lesson.summary().get(locale).to_owned(),
            starter_code: lesson.starter_code().map(str::to_owned),
            completed: completion.contains(slug),
            previous: adjacent.previous.map(|l| LessonLink::new(l, locale)),
            next: adjacent.next.map(|l| LessonLink::new(l, locale)),
        })
    }

    /// Label of the progress button: the completed badge or the call to
    /// action.
    #[must_use]
    pub fn progress_label(&self) -> &'static str {
        let messages = self.locale.messages();
        if self.completed {
            messages.completed
        } else {
            messages.mark_complete
        }
    }

    #[must_use]
    pub fn has_playground(&self) -> bool {
        self.starter_code.is_some()
    }

    #[must_use]
    pub fn path(&self) -> String {
        lesson_path(self.locale, &self.slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> LessonCatalog {
        LessonCatalog::builtin().unwrap()
    }

    #[test]
    fn page_links_neighbours() {
        let catalog = catalog();
        let page = LessonPage::build(&catalog, &CompletionSet::new(), "props", Locale::En).unwrap();

        assert_eq!(page.path(), "/en/lesson/props");
        assert!(!page.completed);
        assert_eq!(page.progress_label(), Locale::En.messages().mark_complete);

        let previous = page.previous.unwrap();
        let next = page.next.unwrap();
        assert_eq!(previous.slug.as_str(), "first-component");
        assert_eq!(previous.path, "/en/lesson/first-component");
        assert_eq!(next.slug.as_str(), "state");
    }

    #[test]
    fn first_lesson_has_no_previous() {
        let catalog = catalog();
        let first = catalog.first().unwrap().slug().as_str().to_owned();
        let page = LessonPage::build(&catalog, &CompletionSet::new(), &first, Locale::Th).unwrap();
        assert!(page.previous.is_none());
        assert!(page.next.is_some());
    }

    #[test]
    fn completed_lesson_shows_badge() {
        let catalog = catalog();
        let completion: CompletionSet = [LessonSlug::new("props")].into_iter().collect();
        let page = LessonPage::build(&catalog, &completion, "props", Locale::Th).unwrap();
        assert!(page.completed);
        assert_eq!(page.progress_label(), Locale::Th.messages().completed);
    }

    #[test]
    fn unknown_slug_has_no_page() {
        assert!(LessonPage::build(&catalog(), &CompletionSet::new(), "nope", Locale::Th).is_none());
    }
}
