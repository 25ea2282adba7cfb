use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smartclinic_core::{AppError, AppResult, NonEmptyString};

use crate::requirement::AccessRequirement;
use crate::security::AccessGrants;

/// Interface language supported by the clinic front end.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Arabic, the default and fallback language.
    #[default]
    Ar,
    /// English.
    En,
    /// Kurdish (Sorani).
    Ku,
}

impl Language {
    /// Returns the language code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ar => "ar",
            Self::En => "en",
            Self::Ku => "ku",
        }
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ar" => Ok(Self::Ar),
            "en" => Ok(Self::En),
            "ku" => Ok(Self::Ku),
            other => Err(AppError::Validation(format!(
                "unsupported language '{other}'"
            ))),
        }
    }
}

/// Display text keyed by language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText(BTreeMap<Language, String>);

impl LocalizedText {
    /// Creates localized text from `(language, text)` pairs.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = (Language, String)>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// Arabic, English and Kurdish text in one call.
    #[must_use]
    pub fn ar_en_ku(ar: &str, en: &str, ku: &str) -> Self {
        Self::new([
            (Language::Ar, ar.to_owned()),
            (Language::En, en.to_owned()),
            (Language::Ku, ku.to_owned()),
        ])
    }

    /// Resolves text for `language`, falling back to the default language and
    /// then to any available translation.
    #[must_use]
    pub fn resolve(&self, language: Language) -> Option<&str> {
        self.0
            .get(&language)
            .or_else(|| self.0.get(&Language::default()))
            .or_else(|| self.0.values().next())
            .map(String::as_str)
    }
}

/// Static navigation descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationItem {
    key: NonEmptyString,
    title: LocalizedText,
    icon: String,
    to: String,
    order: i32,
    requirement: AccessRequirement,
}

impl NavigationItem {
    /// Creates a validated navigation item.
    pub fn new(
        key: impl Into<String>,
        title: LocalizedText,
        icon: impl Into<String>,
        to: impl Into<String>,
        order: i32,
        requirement: AccessRequirement,
    ) -> AppResult<Self> {
        let to = to.into();
        if !to.starts_with('/') {
            return Err(AppError::Validation(format!(
                "navigation target '{to}' must be an absolute path"
            )));
        }

        Ok(Self {
            key: NonEmptyString::new(key)?,
            title,
            icon: icon.into(),
            to,
            order,
            requirement,
        })
    }

    /// Returns the stable item key.
    #[must_use]
    pub fn key(&self) -> &NonEmptyString {
        &self.key
    }

    /// Returns the localized titles.
    #[must_use]
    pub fn title(&self) -> &LocalizedText {
        &self.title
    }

    /// Returns the icon reference.
    #[must_use]
    pub fn icon(&self) -> &str {
        self.icon.as_str()
    }

    /// Returns the target path.
    #[must_use]
    pub fn to(&self) -> &str {
        self.to.as_str()
    }

    /// Returns the display rank.
    #[must_use]
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Returns the access requirement.
    #[must_use]
    pub fn requirement(&self) -> &AccessRequirement {
        &self.requirement
    }

    /// Returns whether the item is visible for the given grants.
    #[must_use]
    pub fn is_visible_to(&self, grants: &AccessGrants) -> bool {
        self.requirement.is_satisfied_by(grants)
    }

    /// Projects the item to its display shape.
    #[must_use]
    pub fn to_entry(&self, language: Language) -> NavigationEntry {
        NavigationEntry {
            key: self.key.as_str().to_owned(),
            title: self
                .title
                .resolve(language)
                .unwrap_or(self.key.as_str())
                .to_owned(),
            icon: self.icon.clone(),
            to: self.to.clone(),
        }
    }
}

/// Navigation entry ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEntry {
    /// Stable item key.
    pub key: String,
    /// Title in the requested language.
    pub title: String,
    /// Icon reference.
    pub icon: String,
    /// Target path.
    pub to: String,
}

/// Returns the items visible for `grants`, stably sorted by order and
/// projected for `language`.
#[must_use]
pub fn filter_navigation(
    items: &[NavigationItem],
    grants: &AccessGrants,
    language: Language,
) -> Vec<NavigationEntry> {
    let mut visible: Vec<&NavigationItem> = items
        .iter()
        .filter(|item| item.is_visible_to(grants))
        .collect();
    visible.sort_by_key(|item| item.order());

    visible
        .into_iter()
        .map(|item| item.to_entry(language))
        .collect()
}

/// Same as [`filter_navigation`] but keeps the descriptors.
#[must_use]
pub fn visible_navigation_items(
    items: &[NavigationItem],
    grants: &AccessGrants,
) -> Vec<NavigationItem> {
    let mut visible: Vec<NavigationItem> = items
        .iter()
        .filter(|item| item.is_visible_to(grants))
        .cloned()
        .collect();
    visible.sort_by_key(NavigationItem::order);
    visible
}
