//! Site-wide metadata and path helpers.

use url::Url;

use crate::i18n::Locale;
use crate::model::LessonSlug;

pub const FALLBACK_SITE_URL: &str = "https://react-learning-playground.dev";
pub const SITE_NAME: &str = "React Learning Playground";
pub const SITE_DESCRIPTION: &str =
    "Bilingual React learning path with sandbox playground for Thai beginners.";

/// Resolve the public site origin from a configured value.
///
/// A missing or blank value gives the fallback URL. A value that parses as a
/// hierarchical URL is reduced to its origin; anything else is treated as a
/// bare host and served over https.
#[must_use]
pub fn resolve_site_url(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return FALLBACK_SITE_URL.to_owned();
    };

    if let Ok(parsed) = Url::parse(raw) {
        let origin = parsed.origin();
        if origin.is_tuple() {
            return origin.ascii_serialization();
        }
    }

    let host = raw
        .strip_prefix("https://")
        .or_else(|| raw.strip_prefix("http://"))
        .unwrap_or(raw);
    format!("https://{host}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    base_url: Url,
}

impl SiteConfig {
    /// Build the site configuration from the configured URL value.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if the resolved origin is not a valid URL
    /// (for example a bare host containing spaces).
    pub fn from_configured(raw: Option<&str>) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(&resolve_site_url(raw))?;
        Ok(Self { base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of a lesson page.
    #[must_use]
    pub fn lesson_url(&self, locale: Locale, slug: &LessonSlug) -> String {
        match self.base_url.join(&lesson_path(locale, slug)) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", self.base_url, lesson_path(locale, slug)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        SITE_NAME
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        SITE_DESCRIPTION
    }
}

/// `hreflang` tag to path pairs, with the `x-default` entry last.
#[must_use]
pub fn language_alternates() -> Vec<(&'static str, String)> {
    let mut alternates: Vec<(&'static str, String)> = Locale::ALL
        .iter()
        .map(|locale| (locale.language_tag(), format!("/{locale}")))
        .collect();
    alternates.push(("x-default", "/".to_owned()));
    alternates
}

#[must_use]
pub fn lesson_path(locale: Locale, slug: &LessonSlug) -> String {
    format!("/{locale}/lesson/{slug}")
}

/// The lesson slug addressed by `path`, if it is a lesson page.
#[must_use]
pub fn active_lesson_slug(path: &str) -> Option<&str> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let _locale = segments.next()?;
    match (segments.next(), segments.next()) {
        (Some("lesson"), Some(slug)) => Some(slug),
        _ => None,
    }
}
