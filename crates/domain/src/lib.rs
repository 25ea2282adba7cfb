//! Domain types and access policy.

#![forbid(unsafe_code)]

mod catalog;
mod dashboard;
mod feature;
mod navigation;
mod requirement;
mod route;
mod security;
mod settings;
mod visibility;

pub use catalog::ClinicCatalog;
pub use dashboard::DateRange;
pub use feature::{FeatureCatalog, FeatureRequirement};
pub use navigation::{
    Language, LocalizedText, NavigationEntry, NavigationItem, filter_navigation,
    visible_navigation_items,
};
pub use requirement::{AccessRequirement, MatchMode};
pub use route::{
    ACCESS_DENIED_ROUTE, DEFAULT_DOCUMENT_TITLE, LANDING_ROUTE, LOGIN_ROUTE, RouteDefinition,
    RouteFlags, RouteResolution, RouteTable, RouteTableBuilder,
};
pub use security::{AccessGrants, PermissionDiff, Role, compare_permissions};
pub use settings::{
    ClinicSettings, SettingEntry, SettingsCategory, SocialLinks, ToothConditionColor, ToothStatus,
};
pub use visibility::{BindingModifiers, BindingTarget, ElementVisibility, VisibilityBinding};
