//! Voice selection for reading lesson text aloud.

use crate::i18n::Locale;

/// A voice offered by the platform speech engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: Option<String>,
}

impl Voice {
    #[must_use]
    pub fn new(name: impl Into<String>, lang: Option<&str>) -> Self {
        Self {
            name: name.into(),
            lang: lang.map(str::to_owned),
        }
    }

    fn lang_lower(&self) -> Option<String> {
        self.lang.as_deref().map(str::to_lowercase)
    }
}

/// Pick the voice to read `locale` content with.
///
/// Preference order: a voice whose language starts with the locale code, then
/// one whose language merely contains it, then whatever voice comes first.
#[must_use]
pub fn select_voice(voices: &[Voice], locale: Locale) -> Option<&Voice> {
    let prefix = locale.as_str();
    voices
        .iter()
        .find(|v| v.lang_lower().is_some_and(|lang| lang.starts_with(prefix)))
        .or_else(|| {
            voices
                .iter()
                .find(|v| v.lang_lower().is_some_and(|lang| lang.contains(prefix)))
        })
        .or_else(|| voices.first())
}

/// Everything needed to start reading a text aloud.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
}

impl Utterance {
    /// Plan an utterance for `text`. Blank text yields nothing to read.
    #[must_use]
    pub fn plan(text: &str, voices: &[Voice], locale: Locale) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let voice = select_voice(voices, locale).cloned();
        let lang = voice
            .as_ref()
            .and_then(|v| v.lang.clone())
            .unwrap_or_else(|| locale.language_tag().to_owned());

        Some(Self {
            text: text.to_owned(),
            lang,
            voice,
            rate: 1.0,
            pitch: 1.0,
        })
    }
}

/// Labels for the read-aloud control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechLabels {
    pub listen: &'static str,
    pub stop: &'static str,
    pub unsupported: &'static str,
}

impl SpeechLabels {
    #[must_use]
    pub const fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::Th => Self {
                listen: "ฟังเนื้อหา",
                stop: "หยุดเสียง",
                unsupported: "ไม่รองรับ Text-to-speech",
            },
            Locale::En => Self {
                listen: "Listen",
                stop: "Stop audio",
                unsupported: "Text-to-speech not supported",
            },
        }
    }

    /// Label for the toggle button given whether speech is playing.
    #[must_use]
    pub const fn toggle(&self, speaking: bool) -> &'static str {
        if speaking { self.stop } else { self.listen }
    }
}
