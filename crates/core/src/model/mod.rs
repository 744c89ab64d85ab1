mod completion;
mod ids;
mod lesson;

pub use completion::{CodecError, CompletionSet};
pub use ids::LessonSlug;
pub use lesson::{Lesson, LocalizedText};
