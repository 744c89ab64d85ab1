#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod lesson_view;
pub mod progress;
pub mod sidebar;

pub use app_services::AppServices;
pub use error::AppServicesError;
pub use lesson_view::{LessonLink, LessonPage};
pub use progress::{PROGRESS_STORAGE_KEY, ProgressStore, Subscription};
pub use sidebar::{SidebarItem, SidebarSection, SidebarView};
