//! Localized text values
//!
//! Titles and descriptions are stored either as a plain string (legacy
//! documents) or as a map from language code to string. Every call site
//! resolves them through [`LocalizedText::resolve`] instead of inspecting
//! the shape itself.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Language used when the requested one has no entry
pub const DEFAULT_LANGUAGE: &str = "en";

/// Interface languages the catalog is authored in
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "fr", "de", "lb"];

/// A text value that is either a single string or a per-language map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    /// Legacy single-language value
    Plain(String),
    /// Language code to text
    Localized(BTreeMap<String, String>),
}

impl Default for LocalizedText {
    fn default() -> Self {
        LocalizedText::Plain(String::new())
    }
}

impl From<&str> for LocalizedText {
    fn from(value: &str) -> Self {
        LocalizedText::Plain(value.to_string())
    }
}

impl From<String> for LocalizedText {
    fn from(value: String) -> Self {
        LocalizedText::Plain(value)
    }
}

impl LocalizedText {
    /// Builds a localized map from `(language, text)` pairs
    pub fn localized<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        LocalizedText::Localized(
            entries
                .into_iter()
                .map(|(lang, text)| (lang.into(), text.into()))
                .collect(),
        )
    }

    /// Resolves the text for `lang`, falling back to the default language
    pub fn resolve(&self, lang: &str) -> &str {
        self.resolve_with(&[lang, DEFAULT_LANGUAGE])
    }

    /// Resolves the text by walking `chain` in order
    ///
    /// Plain values ignore the chain. For maps, the first language in the
    /// chain with a non-empty entry wins; otherwise the first non-empty entry
    /// in key order; otherwise the empty string.
    pub fn resolve_with(&self, chain: &[&str]) -> &str {
        match self {
            LocalizedText::Plain(text) => text,
            LocalizedText::Localized(map) => chain
                .iter()
                .filter_map(|lang| map.get(*lang))
                .chain(map.values())
                .find(|text| !text.is_empty())
                .map(String::as_str)
                .unwrap_or(""),
        }
    }

    /// Returns the explicit entry for `lang`, if any
    ///
    /// Plain values only answer for the default language.
    pub fn get(&self, lang: &str) -> Option<&str> {
        match self {
            LocalizedText::Plain(text) if lang == DEFAULT_LANGUAGE && !text.is_empty() => {
                Some(text.as_str())
            }
            LocalizedText::Plain(_) => None,
            LocalizedText::Localized(map) => {
                map.get(lang).map(String::as_str).filter(|t| !t.is_empty())
            }
        }
    }

    /// Sets the entry for `lang`, turning a plain value into a map
    ///
    /// A non-empty plain value is kept under the default language.
    pub fn set(&mut self, lang: &str, text: impl Into<String>) {
        if let LocalizedText::Plain(existing) = self {
            let mut map = BTreeMap::new();
            if !existing.is_empty() {
                map.insert(DEFAULT_LANGUAGE.to_string(), std::mem::take(existing));
            }
            *self = LocalizedText::Localized(map);
        }
        if let LocalizedText::Localized(map) = self {
            map.insert(lang.to_string(), text.into());
        }
    }

    /// True when no entry carries any non-whitespace text
    pub fn is_blank(&self) -> bool {
        match self {
            LocalizedText::Plain(text) => text.trim().is_empty(),
            LocalizedText::Localized(map) => map.values().all(|t| t.trim().is_empty()),
        }
    }

    /// Case-insensitive substring match on the resolved text
    pub fn contains(&self, lang: &str, needle_lowercase: &str) -> bool {
        self.resolve(lang).to_lowercase().contains(needle_lowercase)
    }
}

/// Deserializes a field that may be missing or `null` into its default
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
