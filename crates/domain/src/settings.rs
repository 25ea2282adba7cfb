//! Clinic settings as grouped by the settings endpoint.
//!
//! The backend returns `{ <category>: { settings: [{ setting_key,
//! setting_value, .. }] } }`. Values are loosely typed JSON; the typed
//! accessors below treat `null`, `false`, `0` and `""` as unset and fall back
//! to the clinic defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One configured setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingEntry {
    /// Setting key, unique inside its category.
    pub setting_key: String,
    /// Raw setting value.
    #[serde(default)]
    pub setting_value: Value,
    /// Declared value type (`string`, `boolean`, `integer`, `json`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting_type: Option<String>,
    /// Optional human description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Settings of one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsCategory {
    /// Entries in backend order.
    #[serde(default)]
    pub settings: Vec<SettingEntry>,
}

/// Social media links shown on printed cards and the public profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    /// Facebook page.
    pub facebook: String,
    /// Instagram account.
    pub instagram: String,
    /// Twitter account.
    pub twitter: String,
    /// WhatsApp number.
    pub whatsapp: String,
}

/// Color offered when charting a tooth condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToothConditionColor {
    /// Identifier.
    #[serde(default)]
    pub id: i64,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// CSS color.
    #[serde(default)]
    pub color: String,
    /// Hex code, usually equal to `color`.
    #[serde(default)]
    pub hex_code: String,
}

/// Status a tooth can be charted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToothStatus {
    /// Identifier.
    #[serde(default)]
    pub id: i64,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// CSS color.
    #[serde(default)]
    pub color: String,
    /// Chart glyph.
    #[serde(default)]
    pub icon: String,
    /// Inactive statuses are hidden from the chart.
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

/// Clinic settings grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClinicSettings(BTreeMap<String, SettingsCategory>);

impl ClinicSettings {
    /// Creates settings from `(category, entries)` pairs.
    #[must_use]
    pub fn new<K: Into<String>>(
        categories: impl IntoIterator<Item = (K, Vec<SettingEntry>)>,
    ) -> Self {
        Self(
            categories
                .into_iter()
                .map(|(name, settings)| (name.into(), SettingsCategory { settings }))
                .collect(),
        )
    }

    /// Returns category names in sorted order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the raw value of `key` inside `category`.
    #[must_use]
    pub fn setting(&self, category: &str, key: &str) -> Option<&Value> {
        self.0
            .get(category)?
            .settings
            .iter()
            .find(|entry| entry.setting_key == key)
            .map(|entry| &entry.setting_value)
    }

    /// Flattens one category to a `key -> value` object.
    #[must_use]
    pub fn category_settings(&self, category: &str) -> Map<String, Value> {
        self.0
            .get(category)
            .map(|category| {
                category
                    .settings
                    .iter()
                    .map(|entry| (entry.setting_key.clone(), entry.setting_value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn set_value(&self, category: &str, key: &str) -> Option<&Value> {
        self.setting(category, key).filter(|value| is_set(value))
    }

    fn text(&self, category: &str, key: &str, default: &str) -> String {
        match self.set_value(category, key) {
            Some(Value::String(value)) => value.clone(),
            Some(other) => other.to_string(),
            None => default.to_owned(),
        }
    }

    fn integer(&self, category: &str, key: &str, default: i64) -> i64 {
        self.set_value(category, key)
            .and_then(|value| match value {
                Value::Number(number) => number.as_i64(),
                Value::String(text) => text.trim().parse().ok(),
                _ => None,
            })
            .filter(|value| *value != 0)
            .unwrap_or(default)
    }

    fn decimal(&self, category: &str, key: &str, default: f64) -> f64 {
        self.set_value(category, key)
            .and_then(|value| match value {
                Value::Number(number) => number.as_f64(),
                Value::String(text) => text.trim().parse().ok(),
                _ => None,
            })
            .unwrap_or(default)
    }

    fn flag(&self, category: &str, key: &str) -> bool {
        match self.set_value(category, key) {
            Some(Value::Bool(value)) => *value,
            Some(Value::String(text)) => matches!(text.trim(), "1" | "true" | "yes"),
            Some(Value::Number(number)) => number.as_f64().is_some_and(|value| value != 0.0),
            _ => false,
        }
    }

    /// Clinic display name.
    #[must_use]
    pub fn clinic_name(&self) -> String {
        self.text("general", "clinic_name", "")
    }

    /// Clinic phone number.
    #[must_use]
    pub fn clinic_phone(&self) -> String {
        self.text("general", "phone", "")
    }

    /// Clinic email.
    #[must_use]
    pub fn clinic_email(&self) -> String {
        self.text("general", "email", "")
    }

    /// Clinic postal address.
    #[must_use]
    pub fn clinic_address(&self) -> String {
        self.text("general", "address", "")
    }

    /// Clinic website.
    #[must_use]
    pub fn clinic_website(&self) -> String {
        self.text("general", "website", "")
    }

    /// Clinic logo URL.
    #[must_use]
    pub fn clinic_logo(&self) -> String {
        self.text("general", "logo", "")
    }

    /// Appointment slot length in minutes.
    #[must_use]
    pub fn appointment_duration(&self) -> i64 {
        self.integer("appointment", "appointment_duration", 30)
    }

    /// Whether patients may book online.
    #[must_use]
    pub fn online_booking_enabled(&self) -> bool {
        self.flag("appointment", "enable_online_booking")
    }

    /// Minutes kept free between bookings.
    #[must_use]
    pub fn booking_buffer(&self) -> i64 {
        self.integer("appointment", "booking_buffer", 15)
    }

    /// Maximum appointments per day.
    #[must_use]
    pub fn max_daily_appointments(&self) -> i64 {
        self.integer("appointment", "max_daily_appointments", 20)
    }

    /// Working hours object as configured, or an empty object.
    #[must_use]
    pub fn working_hours(&self) -> Value {
        self.set_value("appointment", "working_hours")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Billing currency code.
    #[must_use]
    pub fn currency(&self) -> String {
        self.text("financial", "currency", "IQD")
    }

    /// Tax rate in percent.
    #[must_use]
    pub fn tax_rate(&self) -> f64 {
        self.decimal("financial", "tax_rate", 0.0)
    }

    /// Primary theme color.
    #[must_use]
    pub fn theme_color(&self) -> String {
        self.text("display", "theme_color", "#1976D2")
    }

    /// Interface language code.
    #[must_use]
    pub fn language(&self) -> String {
        self.text("display", "language", "ar")
    }

    /// Date display format.
    #[must_use]
    pub fn date_format(&self) -> String {
        self.text("display", "date_format", "DD/MM/YYYY")
    }

    /// Time display format.
    #[must_use]
    pub fn time_format(&self) -> String {
        self.text("display", "time_format", "12h")
    }

    /// Whether SMS reminders are sent.
    #[must_use]
    pub fn sms_enabled(&self) -> bool {
        self.flag("notification", "enable_sms")
    }

    /// Whether email reminders are sent.
    #[must_use]
    pub fn email_enabled(&self) -> bool {
        self.flag("notification", "enable_email")
    }

    /// Whether WhatsApp reminders are sent.
    #[must_use]
    pub fn whatsapp_enabled(&self) -> bool {
        self.flag("notification", "enable_whatsapp")
    }

    /// Hours before an appointment that reminders go out.
    #[must_use]
    pub fn reminder_hours(&self) -> i64 {
        self.integer("notification", "reminder_hours", 24)
    }

    /// Tooth condition palette, or the built-in six colors when the setting
    /// is missing or not a list.
    #[must_use]
    pub fn tooth_condition_colors(&self) -> Vec<ToothConditionColor> {
        match self.set_value("medical", "tooth_condition_colors") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect(),
            _ => default_tooth_condition_colors(),
        }
    }

    /// Active tooth statuses, or the built-in eight when the setting is
    /// missing or not a list.
    #[must_use]
    pub fn tooth_statuses(&self) -> Vec<ToothStatus> {
        match self.set_value("medical", "tooth_statuses") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| serde_json::from_value::<ToothStatus>(item.clone()).ok())
                .filter(|status| status.is_active)
                .collect(),
            _ => default_tooth_statuses(),
        }
    }

    /// Social media links.
    #[must_use]
    pub fn social_links(&self) -> SocialLinks {
        SocialLinks {
            facebook: self.text("social", "facebook", ""),
            instagram: self.text("social", "instagram", ""),
            twitter: self.text("social", "twitter", ""),
            whatsapp: self.text("social", "whatsapp", ""),
        }
    }
}

fn default_tooth_condition_colors() -> Vec<ToothConditionColor> {
    [
        (1, "Red", "#FF5252"),
        (2, "Blue", "#2196F3"),
        (3, "Green", "#4CAF50"),
        (4, "Yellow", "#FFEB3B"),
        (5, "Orange", "#FF9800"),
        (6, "Purple", "#9C27B0"),
    ]
    .into_iter()
    .map(|(id, name, color)| ToothConditionColor {
        id,
        name: name.to_owned(),
        color: color.to_owned(),
        hex_code: color.to_owned(),
    })
    .collect()
}

fn default_tooth_statuses() -> Vec<ToothStatus> {
    [
        (1, "Healthy", "#22C55E", "\u{2713}"),
        (2, "Cavity", "#EF4444", "\u{26a0}"),
        (3, "Filled", "#3B82F6", "\u{25a0}"),
        (4, "Missing", "#6B7280", "\u{2717}"),
        (5, "Crown", "#F59E0B", "\u{2654}"),
        (6, "Root Canal", "#8B5CF6", "\u{2295}"),
        (7, "Implant", "#14B8A6", "\u{229b}"),
        (8, "Bridge", "#EC4899", "\u{229e}"),
    ]
    .into_iter()
    .map(|(id, name, color, icon)| ToothStatus {
        id,
        name: name.to_owned(),
        color: color.to_owned(),
        icon: icon.to_owned(),
        is_active: true,
    })
    .collect()
}

fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(value) => *value,
        Value::Number(number) => number.as_f64().is_some_and(|value| value != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ClinicSettings;

    fn settings() -> ClinicSettings {
        serde_json::from_value(json!({
            "general": {
                "label": "General",
                "settings": [
                    {"setting_key": "clinic_name", "setting_value": "Smile Dental", "setting_type": "string"},
                    {"setting_key": "phone", "setting_value": ""}
                ]
            },
            "appointment": {
                "settings": [
                    {"setting_key": "appointment_duration", "setting_value": "45"},
                    {"setting_key": "booking_buffer", "setting_value": 0},
                    {"setting_key": "enable_online_booking", "setting_value": true}
                ]
            },
            "financial": {
                "settings": [{"setting_key": "tax_rate", "setting_value": 2.5}]
            }
        }))
        .unwrap_or_default()
    }

    #[test]
    fn looks_up_values_by_category_and_key() {
        let settings = settings();
        assert_eq!(settings.setting("general", "clinic_name"), Some(&json!("Smile Dental")));
        assert_eq!(settings.setting("general", "missing"), None);
        assert_eq!(settings.setting("missing", "clinic_name"), None);
        assert_eq!(settings.categories().count(), 3);
    }

    #[test]
    fn flattens_a_category() {
        let general = settings().category_settings("general");
        assert_eq!(general.get("phone"), Some(&json!("")));
        assert!(settings().category_settings("social").is_empty());
    }

    #[test]
    fn typed_accessors_fall_back_on_unset_values() {
        let settings = settings();
        assert_eq!(settings.clinic_name(), "Smile Dental");
        assert_eq!(settings.clinic_phone(), "");
        assert_eq!(settings.appointment_duration(), 45);
        assert_eq!(settings.booking_buffer(), 15);
        assert!(settings.online_booking_enabled());
        assert_eq!(settings.max_daily_appointments(), 20);
        assert_eq!(settings.currency(), "IQD");
        assert!((settings.tax_rate() - 2.5).abs() < f64::EPSILON);
        assert_eq!(settings.language(), "ar");
        assert!(!settings.whatsapp_enabled());
        assert_eq!(settings.working_hours(), json!({}));
    }

    #[test]
    fn tooth_palettes_default_when_unset() {
        let settings = settings();
        let colors = settings.tooth_condition_colors();
        assert_eq!(colors.len(), 6);
        assert_eq!(colors[0].hex_code, "#FF5252");

        let statuses = settings.tooth_statuses();
        assert_eq!(statuses.len(), 8);
        assert_eq!(statuses[7].name, "Bridge");
        assert!(statuses.iter().all(|status| status.is_active));
    }

    #[test]
    fn configured_tooth_statuses_drop_inactive_entries() {
        let settings: ClinicSettings = serde_json::from_value(json!({
            "medical": {
                "settings": [
                    {"setting_key": "tooth_statuses", "setting_value": [
                        {"id": 1, "name": "Healthy", "color": "#22C55E"},
                        {"id": 2, "name": "Veneer", "color": "#0EA5E9", "is_active": false}
                    ]},
                    {"setting_key": "tooth_condition_colors", "setting_value": "red"}
                ]
            }
        }))
        .unwrap_or_default();

        let statuses = settings.tooth_statuses();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].name, "Healthy");
        assert_eq!(settings.tooth_condition_colors().len(), 6);
    }
}
