//! Supported locales and the handful of interface strings the course needs
//! outside of lesson content.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A locale the course is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Th,
    En,
}

impl Locale {
    /// Every supported locale, in navigation order.
    pub const ALL: [Locale; 2] = [Locale::Th, Locale::En];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Locale::Th => "th",
            Locale::En => "en",
        }
    }

    /// Strict lookup: only the exact locale codes are accepted.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "th" => Some(Locale::Th),
            "en" => Some(Locale::En),
            _ => None,
        }
    }

    /// Returns `true` if `value` names a supported locale.
    #[must_use]
    pub fn is_locale(value: &str) -> bool {
        Self::parse(value).is_some()
    }

    /// Resolve a requested locale, falling back to the default for anything
    /// missing or unsupported.
    #[must_use]
    pub fn resolve(requested: Option<&str>) -> Self {
        requested.and_then(Self::parse).unwrap_or_default()
    }

    /// BCP-47 tag used for speech and `hreflang` alternates.
    #[must_use]
    pub const fn language_tag(self) -> &'static str {
        match self {
            Locale::Th => "th-TH",
            Locale::En => "en-US",
        }
    }

    /// Tag in the `ll_CC` form used by Open Graph.
    #[must_use]
    pub const fn open_graph_tag(self) -> &'static str {
        match self {
            Locale::Th => "th_TH",
            Locale::En => "en_US",
        }
    }

    /// Name of the locale as shown in the language switcher.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Locale::Th => "ไทย",
            Locale::En => "English",
        }
    }

    #[must_use]
    pub fn messages(self) -> &'static Messages {
        match self {
            Locale::Th => &TH_MESSAGES,
            Locale::En => &EN_MESSAGES,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for parsing a locale from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLocaleError {
    raw: String,
}

impl fmt::Display for ParseLocaleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported locale: {}", self.raw)
    }
}

impl std::error::Error for ParseLocaleError {}

impl FromStr for Locale {
    type Err = ParseLocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseLocaleError { raw: s.to_string() })
    }
}

/// Rewrite `path` so that it points at the same page in `target`.
///
/// The first path segment is taken to be the locale; the root path maps to
/// the locale's home page.
#[must_use]
pub fn switch_locale_path(path: &str, target: Locale) -> String {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return format!("/{target}");
    }
    segments[0] = target.as_str();
    format!("/{}", segments.join("/"))
}

//
// ─── MESSAGES ──────────────────────────────────────────────────────────────────
//

/// Interface strings for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    pub app_title: &'static str,
    pub search: &'static str,
    pub completed_count: &'static str,
    pub mark_complete: &'static str,
    pub completed: &'static str,
    pub progress: &'static str,
    pub start_learning: &'static str,
    pub previous: &'static str,
    pub next: &'static str,
    pub playground: &'static str,
    pub not_found: &'static str,
}

static TH_MESSAGES: Messages = Messages {
    app_title: "เรียน React ทีละขั้น",
    search: "ค้นหาบทเรียน",
    completed_count: "เรียนจบแล้ว",
    mark_complete: "ทำเครื่องหมายว่าเรียนจบ",
    completed: "เรียนจบแล้ว ✅",
    progress: "ความคืบหน้า",
    start_learning: "เริ่มเรียน",
    previous: "บทก่อนหน้า",
    next: "บทถัดไป",
    playground: "ลองเขียนโค้ด",
    not_found: "ไม่พบบทเรียน",
};

static EN_MESSAGES: Messages = Messages {
    app_title: "Learn React step by step",
    search: "Search lessons",
    completed_count: "Completed",
    mark_complete: "Mark as complete",
    completed: "Completed ✅",
    progress: "Progress",
    start_learning: "Start learning",
    previous: "Previous lesson",
    next: "Next lesson",
    playground: "Playground",
    not_found: "Lesson not found",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_strict() {
        assert_eq!(Locale::parse("th"), Some(Locale::Th));
        assert_eq!(Locale::parse("en"), Some(Locale::En));
        assert_eq!(Locale::parse("EN"), None);
        assert_eq!(Locale::parse("en-US"), None);
        assert!(!Locale::is_locale("fr"));
    }

    #[test]
    fn resolve_falls_back_to_thai() {
        assert_eq!(Locale::resolve(None), Locale::Th);
        assert_eq!(Locale::resolve(Some("de")), Locale::Th);
        assert_eq!(Locale::resolve(Some("en")), Locale::En);
    }

    #[test]
    fn from_str_reports_raw_value() {
        let err = "jp".parse::<Locale>().unwrap_err();
        assert_eq!(err.to_string(), "unsupported locale: jp");
    }

    #[test]
    fn tags() {
        assert_eq!(Locale::Th.language_tag(), "th-TH");
        assert_eq!(Locale::En.language_tag(), "en-US");
        assert_eq!(Locale::Th.open_graph_tag(), "th_TH");
    }

    #[test]
    fn switch_locale_replaces_first_segment() {
        assert_eq!(switch_locale_path("/th/lesson/jsx", Locale::En), "/en/lesson/jsx");
        assert_eq!(switch_locale_path("/en", Locale::Th), "/th");
        assert_eq!(switch_locale_path("/", Locale::En), "/en");
        assert_eq!(switch_locale_path("", Locale::Th), "/th");
    }

    #[test]
    fn locale_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Locale::En).unwrap(), "\"en\"");
    }
}
