use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Identifier of a lesson, as it appears in `/lesson/{slug}` paths.
///
/// Any string is a valid slug for progress tracking. The catalog checks its
/// own slugs when it is built, but a completion entry for a slug the catalog
/// does not know is kept as-is and simply never displayed.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonSlug(String);

impl LessonSlug {
    /// Creates a new `LessonSlug`
    #[must_use]
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for LessonSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LessonSlug({:?})", self.0)
    }
}

impl fmt::Display for LessonSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LessonSlug {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for LessonSlug {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LessonSlug {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&LessonSlug> for LessonSlug {
    fn from(value: &LessonSlug) -> Self {
        value.clone()
    }
}

impl AsRef<str> for LessonSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for LessonSlug {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for LessonSlug {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LessonSlug {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_display() {
        let slug = LessonSlug::new("use-effect");
        assert_eq!(slug.to_string(), "use-effect");
    }

    #[test]
    fn test_slug_from_str_accepts_anything() {
        let slug: LessonSlug = "not a catalog lesson".parse().unwrap();
        assert_eq!(slug, "not a catalog lesson");
    }

    #[test]
    fn test_slug_serializes_as_plain_string() {
        let json = serde_json::to_string(&LessonSlug::new("jsx")).unwrap();
        assert_eq!(json, "\"jsx\"");
    }

    #[test]
    fn test_slug_debug() {
        assert_eq!(format!("{:?}", LessonSlug::new("props")), "LessonSlug(\"props\")");
    }
}
