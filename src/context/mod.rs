use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// IDENTITY CONTEXT
//
// Everything the attribute builder and the variant resolver read about the
// caller. Passed explicitly into every call and never mutated.

#[derive(Debug, Clone)]
pub struct Environment {
    pub current_user: Option<User>,
    pub config: Option<AppConfig>,
    pub device: Device,
    pub main_bundle: Bundle,
    pub apple_pay_device: bool,
    pub environment_type: EnvironmentType,
    pub language: Language,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
    pub facebook_connected: Option<bool>,
    #[serde(default)]
    pub stats: UserStats,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserStats {
    pub backed_projects_count: Option<i64>,
    pub created_projects_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Device {
    pub system_version: String,
    pub device_format: String,
    pub identifier_for_vendor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bundle {
    pub short_version_string: String,
    #[serde(default)]
    pub is_release: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentType {
    Production,
    Staging,
    #[default]
    Local,
}

impl FromStr for EnvironmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "local" => Ok(Self::Local),
            other => Err(format!("unknown environment type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    De,
    #[default]
    En,
    Es,
    Fr,
    Ja,
}

impl Language {
    pub fn raw_value(&self) -> &'static str {
        match self {
            Language::De => "de",
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::Ja => "ja",
        }
    }
}

// PROJECT

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub slug: String,
    pub category: Category,
    pub location: Location,
    #[serde(default)]
    pub personalization: Personalization,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub parent_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Personalization {
    pub is_starred: Option<bool>,
}

// REF TAGS

/// Attribution token recording how a user arrived at a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTag {
    Activity,
    Category,
    Discovery,
    Search,
    Social,
    Thanks,
    Recommended,
    Dashboard,
    Push,
    Custom(String),
}

impl RefTag {
    pub fn string_tag(&self) -> &str {
        match self {
            RefTag::Activity => "activity",
            RefTag::Category => "category",
            RefTag::Discovery => "discovery",
            RefTag::Search => "search",
            RefTag::Social => "social",
            RefTag::Thanks => "thanks",
            RefTag::Recommended => "recommended",
            RefTag::Dashboard => "dashboard",
            RefTag::Push => "push",
            RefTag::Custom(tag) => tag,
        }
    }
}

impl From<&str> for RefTag {
    fn from(tag: &str) -> Self {
        match tag {
            "activity" => RefTag::Activity,
            "category" => RefTag::Category,
            "discovery" => RefTag::Discovery,
            "search" => RefTag::Search,
            "social" => RefTag::Social,
            "thanks" => RefTag::Thanks,
            "recommended" => RefTag::Recommended,
            "dashboard" => RefTag::Dashboard,
            "push" => RefTag::Push,
            other => RefTag::Custom(other.to_string()),
        }
    }
}

/// Identifier used for bucketing and for `user_distinct_id`.
///
/// Prefers the vendor identifier reported by the device, which stays stable for
/// the whole session. Without one a fresh UUID is minted, so two calls with the
/// same context can land in different buckets.
pub fn device_identifier(env: &Environment) -> String {
    env.device
        .identifier_for_vendor
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
