use std::sync::Arc;

use lesson_core::catalog::LessonCatalog;
use lesson_core::i18n::Locale;
use lesson_core::progress::ProgressSummary;
use storage::Origin;

use crate::error::AppServicesError;
use crate::lesson_view::LessonPage;
use crate::progress::ProgressStore;
use crate::sidebar::SidebarView;

/// Assembles the lesson catalog and the progress store for one context.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<LessonCatalog>,
    origin: Origin,
    progress: Arc<ProgressStore>,
}

impl AppServices {
    /// Build services whose progress is persisted to `SQLite`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// built-in catalog is invalid.
    pub async fn new_sqlite(db_url: &str) -> Result<Self, AppServicesError> {
        let origin = Origin::sqlite(db_url).await?;
        Self::with_origin(origin)
    }

    /// Build services whose progress lasts for the process only.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the built-in catalog is invalid.
    pub fn in_memory() -> Result<Self, AppServicesError> {
        Self::with_origin(Origin::in_memory())
    }

    /// Build services for a new context of `origin`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the built-in catalog is invalid.
    pub fn with_origin(origin: Origin) -> Result<Self, AppServicesError> {
        let catalog = Arc::new(LessonCatalog::builtin().map_err(lesson_core::Error::from)?);
        let progress = Arc::new(ProgressStore::new(Arc::new(origin.open_context())));
        progress.initialize();
        Ok(Self {
            catalog,
            origin,
            progress,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<LessonCatalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary::compute(&self.catalog, &self.progress.snapshot())
    }

    #[must_use]
    pub fn lesson_page(&self, slug: &str, locale: Locale) -> Option<LessonPage> {
        LessonPage::build(&self.catalog, &self.progress.snapshot(), slug, locale)
    }

    #[must_use]
    pub fn sidebar(&self, locale: Locale, query: &str, active: Option<&str>) -> SidebarView {
        SidebarView::build(&self.catalog, &self.progress.snapshot(), locale, query, active)
    }

    /// Wait until every progress change has been written to durable storage.
    pub async fn shutdown(&self) {
        self.origin.flush().await;
        tracing::debug!("progress flushed");
    }
}
