//! Built-in clinic navigation, route and feature configuration.

use smartclinic_core::AppResult;

use crate::feature::{FeatureCatalog, FeatureRequirement};
use crate::navigation::{LocalizedText, NavigationItem};
use crate::requirement::AccessRequirement;
use crate::route::{RouteDefinition, RouteFlags, RouteTable};
use crate::security::Role;

const CLINIC_MANAGERS: [Role; 2] = [Role::SuperAdmin, Role::ClinicSuperDoctor];

/// Static access-control configuration of the clinic front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClinicCatalog {
    /// Sidebar navigation.
    pub navigation: Vec<NavigationItem>,
    /// Mobile bottom navigation.
    pub bottom_navigation: Vec<NavigationItem>,
    /// Router table.
    pub routes: RouteTable,
    /// UI feature gates.
    pub features: FeatureCatalog,
}

impl ClinicCatalog {
    /// Builds the default clinic configuration.
    pub fn standard() -> AppResult<Self> {
        Ok(Self {
            navigation: standard_navigation()?,
            bottom_navigation: standard_bottom_navigation()?,
            routes: standard_routes()?,
            features: standard_features(),
        })
    }
}

fn managers_or(keywords: &[&str]) -> AccessRequirement {
    AccessRequirement::restricted(CLINIC_MANAGERS, keywords.iter().copied())
}

fn standard_navigation() -> AppResult<Vec<NavigationItem>> {
    Ok(vec![
        NavigationItem::new(
            "dashboard",
            LocalizedText::ar_en_ku("الرئيسية", "Dashboard", "سەرەکی"),
            "mdi-view-dashboard",
            "/",
            1,
            AccessRequirement::Always,
        )?,
        NavigationItem::new(
            "patients",
            LocalizedText::ar_en_ku("المراجعين", "Patients", "نەخۆشەکان"),
            "mdi-account-group",
            "/patients",
            2,
            AccessRequirement::keywords(["patient"]),
        )?,
        NavigationItem::new(
            "doctors",
            LocalizedText::ar_en_ku("الأطباء", "Doctors", "دکتۆرەکان"),
            "mdi-doctor",
            "/doctors",
            3,
            managers_or(&["doctor", "user"]),
        )?,
        NavigationItem::new(
            "secretaries",
            LocalizedText::ar_en_ku("السكرتارية", "Secretaries", "سکرتێرەکان"),
            "mdi-account-tie",
            "/secretaries",
            4,
            managers_or(&["secretary", "user"]),
        )?,
        NavigationItem::new(
            "reservations",
            LocalizedText::ar_en_ku("المواعيد", "Appointments", "مەوعیدەکان"),
            "mdi-calendar-clock",
            "/reservations",
            5,
            AccessRequirement::keywords(["reservation"]),
        )?,
        NavigationItem::new(
            "waiting-list",
            LocalizedText::ar_en_ku("قائمة الانتظار", "Waiting List", "لیستی چاوەڕوانی"),
            "mdi-clipboard-list",
            "/waiting-list",
            6,
            AccessRequirement::keywords(["reservation", "waiting"]),
        )?,
        NavigationItem::new(
            "cases",
            LocalizedText::ar_en_ku("الحالات", "Cases", "کەیسەکان"),
            "mdi-file-document",
            "/cases",
            7,
            AccessRequirement::keywords(["case"]),
        )?,
        NavigationItem::new(
            "bills",
            LocalizedText::ar_en_ku("الفواتير", "Bills", "پسوڵەکان"),
            "mdi-receipt",
            "/bills",
            8,
            AccessRequirement::keywords(["bill"]),
        )?,
        NavigationItem::new(
            "recipes",
            LocalizedText::ar_en_ku("الوصفات الطبية", "Prescriptions", "داواکاریەکان"),
            "mdi-pill",
            "/recipes",
            9,
            AccessRequirement::keywords(["recipe", "prescription"]),
        )?,
        NavigationItem::new(
            "expenses",
            LocalizedText::ar_en_ku("المصروفات", "Expenses", "خەرجییەکان"),
            "mdi-cash-multiple",
            "/expenses",
            10,
            managers_or(&["expense", "bill"]),
        )?,
        NavigationItem::new(
            "settings",
            LocalizedText::ar_en_ku("الإعدادات", "Settings", "ڕێکخستنەکان"),
            "mdi-cog",
            "/settings",
            10,
            AccessRequirement::Always,
        )?,
    ])
}

fn standard_bottom_navigation() -> AppResult<Vec<NavigationItem>> {
    Ok(vec![
        NavigationItem::new(
            "dashboard",
            LocalizedText::ar_en_ku("الرئيسية", "Home", "سەرەکی"),
            "mdi-home",
            "/",
            0,
            AccessRequirement::Always,
        )?,
        NavigationItem::new(
            "patients",
            LocalizedText::ar_en_ku("المراجعين", "Patients", "نەخۆشەکان"),
            "mdi-account-group",
            "/patients",
            0,
            AccessRequirement::keywords(["patient"]),
        )?,
        NavigationItem::new(
            "reservations",
            LocalizedText::ar_en_ku("المواعيد", "Appointments", "مەوعیدەکان"),
            "mdi-calendar-clock",
            "/reservations",
            0,
            AccessRequirement::keywords(["reservation"]),
        )?,
        NavigationItem::new(
            "settings",
            LocalizedText::ar_en_ku("الإعدادات", "Settings", "ڕێکخستنەکان"),
            "mdi-cog",
            "/settings",
            0,
            AccessRequirement::Always,
        )?,
    ])
}

fn standard_routes() -> AppResult<RouteTable> {
    let page = |name: &str, path: &str, title: &str, requirement: AccessRequirement| {
        RouteDefinition::new(name, path)
            .map(|route| route.with_title(title).with_requirement(requirement))
    };

    RouteTable::builder()
        .route(RouteDefinition::new("PublicPatientProfile", "/public/patient/:token")?.public())
        .route(RouteDefinition::new("Login", "/login")?.guest())
        .route(RouteDefinition::new("Register", "/register")?.guest())
        .layout(
            RouteFlags::authenticated(),
            vec![
                RouteDefinition::new("Dashboard", "/")?.with_requirement(AccessRequirement::Always),
                RouteDefinition::new("DashboardAlt", "/dashboard")?
                    .with_requirement(AccessRequirement::Always),
                page(
                    "Analytics",
                    "/analytics",
                    "Analytics Dashboard",
                    managers_or(&["report", "analytics"]),
                )?,
                page(
                    "Patients",
                    "/patients",
                    "Patients Management",
                    AccessRequirement::keywords(["patient"]),
                )?,
                page(
                    "PatientDetail",
                    "/patients/:id",
                    "Patient Details",
                    AccessRequirement::keywords(["patient"]),
                )?,
                page(
                    "Doctors",
                    "/doctors",
                    "Doctors Management",
                    managers_or(&["doctor", "user"]),
                )?,
                page(
                    "Cases",
                    "/cases",
                    "Cases Management",
                    AccessRequirement::keywords(["case"]),
                )?,
                page(
                    "CaseDetail",
                    "/cases/:id",
                    "Case Details",
                    AccessRequirement::keywords(["case"]),
                )?,
                page(
                    "Reservations",
                    "/reservations",
                    "Appointments Calendar",
                    AccessRequirement::keywords(["reservation"]),
                )?,
                page(
                    "WaitingList",
                    "/waiting-list",
                    "Waiting List",
                    AccessRequirement::keywords(["reservation", "waiting"]),
                )?,
                page(
                    "Bills",
                    "/bills",
                    "Bills Management",
                    AccessRequirement::keywords(["bill"]),
                )?,
                page(
                    "Recipes",
                    "/recipes",
                    "Prescriptions Management",
                    AccessRequirement::keywords(["recipe", "prescription"]),
                )?,
                page("Settings", "/settings", "Settings", AccessRequirement::Always)?,
                page(
                    "Expenses",
                    "/expenses",
                    "Expenses Management",
                    managers_or(&["expense", "bill"]),
                )?,
                page(
                    "Secretaries",
                    "/secretaries",
                    "Secretaries Management",
                    managers_or(&["secretary", "user"]),
                )?,
                page(
                    "AccessDenied",
                    "/access-denied",
                    "Access Denied",
                    AccessRequirement::Always,
                )?,
            ],
        )
        .fallback("/")
        .build()
}

fn standard_features() -> FeatureCatalog {
    FeatureCatalog::new([
        ("CREATE_PATIENT", FeatureRequirement::any_of(["create-patient"])),
        ("EDIT_PATIENT", FeatureRequirement::any_of(["edit-patient"])),
        ("DELETE_PATIENT", FeatureRequirement::any_of(["delete-patient"])),
        (
            "SEARCH_PATIENT",
            FeatureRequirement::any_of(["search-patient", "patient"]),
        ),
        (
            "CREATE_RESERVATION",
            FeatureRequirement::any_of(["create-reservation"]),
        ),
        ("EDIT_RESERVATION", FeatureRequirement::any_of(["edit-reservation"])),
        (
            "DELETE_RESERVATION",
            FeatureRequirement::any_of(["delete-reservation"]),
        ),
        ("CREATE_CASE", FeatureRequirement::any_of(["create-case"])),
        ("EDIT_CASE", FeatureRequirement::any_of(["edit-case"])),
        ("DELETE_CASE", FeatureRequirement::any_of(["delete-case"])),
        ("CREATE_BILL", FeatureRequirement::any_of(["create-bill"])),
        ("EDIT_BILL", FeatureRequirement::any_of(["edit-bill"])),
        ("DELETE_BILL", FeatureRequirement::any_of(["delete-bill"])),
        (
            "MARK_BILL_PAID",
            FeatureRequirement::any_of(["mark-bill-paid", "bill"]),
        ),
        ("CREATE_USER", FeatureRequirement::any_of(["create-user"])),
        ("EDIT_USER", FeatureRequirement::any_of(["edit-user"])),
        ("DELETE_USER", FeatureRequirement::any_of(["delete-user"])),
    ])
}
