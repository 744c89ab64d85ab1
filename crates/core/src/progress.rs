use crate::catalog::LessonCatalog;
use crate::model::CompletionSet;

/// Aggregated view of course progress, useful for UI.
///
/// Only lessons present in the catalog count as completed; stale entries for
/// lessons that no longer exist are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSummary {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

impl ProgressSummary {
    #[must_use]
    pub fn compute(catalog: &LessonCatalog, completion: &CompletionSet) -> Self {
        let total = catalog.len();
        let completed = catalog
            .slugs()
            .filter(|slug| completion.contains(slug.as_str()))
            .count();
        Self {
            completed,
            total,
            percent: percent_rounded(completed, total),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

// half-up rounding; completed never exceeds total so the result fits in u8
fn percent_rounded(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let scaled = (completed * 200 + total) / (total * 2);
    u8::try_from(scaled.min(100)).unwrap_or(100)
}
