//! Declarative visibility bindings for interactive controls.
//!
//! A binding names the tokens, keywords or roles a control depends on plus
//! the modifiers that change how they combine and how a denial is rendered.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smartclinic_core::AppError;

use crate::security::{AccessGrants, Role};

/// What the binding values are matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingTarget {
    /// Exact permission tokens, or keywords with the `keyword` modifier.
    #[default]
    Permissions,
    /// Permission keywords regardless of modifiers.
    Keywords,
    /// Role names.
    Roles,
}

/// Modifiers accepted by a binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingModifiers {
    /// Require every value instead of any.
    #[serde(default)]
    pub all: bool,
    /// Substring matching instead of exact matching.
    #[serde(default)]
    pub keyword: bool,
    /// Keep the layout slot on denial.
    #[serde(default)]
    pub hide: bool,
}

impl FromStr for BindingModifiers {
    type Err = AppError;

    /// Parses dotted modifiers such as `"keyword.all.hide"`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Self::default();
        for modifier in value.split('.').map(str::trim).filter(|m| !m.is_empty()) {
            match modifier {
                "any" => modifiers.all = false,
                "all" => modifiers.all = true,
                "keyword" => modifiers.keyword = true,
                "hide" => modifiers.hide = true,
                other => {
                    return Err(AppError::Validation(format!(
                        "unknown visibility modifier '{other}'"
                    )));
                }
            }
        }

        Ok(modifiers)
    }
}

/// Rendering state of a bound control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementVisibility {
    /// Shown and interactive.
    Visible,
    /// Removed from layout flow, disabled and hidden from assistive technology.
    Removed,
    /// Invisible but keeps its layout slot, disabled and hidden from
    /// assistive technology.
    Concealed,
}

impl ElementVisibility {
    /// Returns whether access was granted.
    #[must_use]
    pub fn is_granted(self) -> bool {
        self == Self::Visible
    }

    /// Returns whether the control accepts input.
    #[must_use]
    pub fn is_interactive(self) -> bool {
        self.is_granted()
    }

    /// Returns whether the control still takes space in the layout.
    #[must_use]
    pub fn occupies_layout(self) -> bool {
        self != Self::Removed
    }

    /// Returns whether the control is hidden from assistive technology.
    #[must_use]
    pub fn is_aria_hidden(self) -> bool {
        !self.is_granted()
    }
}

/// Visibility binding attached to a control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityBinding {
    target: BindingTarget,
    values: Option<Vec<String>>,
    modifiers: BindingModifiers,
}

impl VisibilityBinding {
    /// Binding with no value; always granted.
    #[must_use]
    pub fn unbound() -> Self {
        Self::default()
    }

    /// Permission binding: exact tokens unless the `keyword` modifier is set.
    #[must_use]
    pub fn permission<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::with_target(BindingTarget::Permissions, values)
    }

    /// Keyword binding.
    #[must_use]
    pub fn keyword<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::with_target(BindingTarget::Keywords, values)
    }

    /// Role binding.
    #[must_use]
    pub fn role<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::with_target(BindingTarget::Roles, values)
    }

    fn with_target<I>(target: BindingTarget, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();

        Self {
            target,
            values: (!values.is_empty()).then_some(values),
            modifiers: BindingModifiers::default(),
        }
    }

    /// Replaces the modifiers.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: BindingModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Sets the `all` modifier.
    #[must_use]
    pub fn all(mut self) -> Self {
        self.modifiers.all = true;
        self
    }

    /// Sets the `keyword` modifier.
    #[must_use]
    pub fn by_keyword(mut self) -> Self {
        self.modifiers.keyword = true;
        self
    }

    /// Sets the `hide` modifier.
    #[must_use]
    pub fn hide(mut self) -> Self {
        self.modifiers.hide = true;
        self
    }

    /// Returns the modifiers.
    #[must_use]
    pub fn modifiers(&self) -> BindingModifiers {
        self.modifiers
    }

    /// Returns whether the grants satisfy the binding.
    #[must_use]
    pub fn is_granted(&self, grants: &AccessGrants) -> bool {
        let Some(values) = self.values.as_deref() else {
            return true;
        };

        match self.target {
            BindingTarget::Roles => {
                let roles: Vec<Role> = values.iter().map(|value| Role::from(value.as_str())).collect();
                grants.has_any_role(&roles)
            }
            BindingTarget::Keywords => self.match_keywords(grants, values),
            BindingTarget::Permissions if self.modifiers.keyword => {
                self.match_keywords(grants, values)
            }
            BindingTarget::Permissions if self.modifiers.all => grants.has_all_exact(values),
            BindingTarget::Permissions => grants.has_any_exact(values),
        }
    }

    fn match_keywords(&self, grants: &AccessGrants, keywords: &[String]) -> bool {
        if self.modifiers.all {
            grants.has_all_keyword(keywords)
        } else {
            grants.has_any_keyword(keywords)
        }
    }

    /// Evaluates the binding to a rendering state.
    #[must_use]
    pub fn evaluate(&self, grants: &AccessGrants) -> ElementVisibility {
        if self.is_granted(grants) {
            ElementVisibility::Visible
        } else if self.modifiers.hide {
            ElementVisibility::Concealed
        } else {
            ElementVisibility::Removed
        }
    }
}
