#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod i18n;
pub mod model;
pub mod progress;
pub mod site;
pub mod speech;

pub use catalog::{Adjacent, CatalogError, LessonCatalog, Section};
pub use error::Error;
pub use i18n::Locale;
pub use model::{CodecError, CompletionSet, Lesson, LessonSlug, LocalizedText};
pub use progress::ProgressSummary;
