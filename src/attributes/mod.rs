use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::context::{device_identifier, Environment, EnvironmentType, Project, RefTag};
use crate::cookies::RefTagLookup;

/// Scalar value attached to an attribute or event tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    String(String),
}

#[cfg(test)]
impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

/// Flat key/value map sent along with activation and tracking calls.
/// Holds no absent values; see [`compact`].
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Build a map from optional entries, dropping the ones that are `None`.
pub fn compact<const N: usize>(entries: [(&'static str, Option<AttributeValue>); N]) -> Attributes {
    entries
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
        .collect()
}

/// User and session attributes used for experiment targeting.
pub fn user_attributes(
    env: &Environment,
    cookies: &dyn RefTagLookup,
    project: Option<&Project>,
    ref_tag: Option<&RefTag>,
) -> Attributes {
    let user = env.current_user.as_ref();

    let country = user
        .and_then(|u| u.location.as_ref())
        .map(|l| l.country.as_str())
        .or_else(|| env.config.as_ref().and_then(|c| c.country_code.as_deref()))
        .map(|c| c.to_lowercase());

    let mut attributes = compact([
        ("user_distinct_id", debug_admin_device_identifier(env).map(Into::into)),
        (
            "user_backed_projects_count",
            user.and_then(|u| u.stats.backed_projects_count).map(Into::into),
        ),
        (
            "user_launched_projects_count",
            user.and_then(|u| u.stats.created_projects_count).map(Into::into),
        ),
        ("user_country", country.map(Into::into)),
        (
            "user_facebook_account",
            user.and_then(|u| u.facebook_connected).map(Into::into),
        ),
        ("user_display_language", Some(env.language.raw_value().into())),
        ("session_os_version", Some(env.device.system_version.as_str().into())),
        ("session_user_is_logged_in", Some(user.is_some().into())),
        (
            "session_app_release_version",
            Some(env.main_bundle.short_version_string.as_str().into()),
        ),
        ("session_apple_pay_device", Some(env.apple_pay_device.into())),
        ("session_device_format", Some(env.device.device_format.as_str().into())),
    ]);

    attributes.extend(session_ref_tag_attributes(cookies, project, ref_tag));
    attributes
}

/// Attributes plus the project-derived event tags used for `track` calls.
pub fn tracking_attributes_and_event_tags(
    env: &Environment,
    cookies: &dyn RefTagLookup,
    project: Option<&Project>,
    ref_tag: Option<&RefTag>,
) -> (Attributes, Attributes) {
    let attributes = user_attributes(env, cookies, project, ref_tag);

    let event_tags = compact([
        ("project_subcategory", project.map(|p| p.category.name.as_str().into())),
        (
            "project_category",
            project
                .and_then(|p| p.category.parent_name.as_deref())
                .map(Into::into),
        ),
        (
            "project_country",
            project.map(|p| p.location.country.to_lowercase().into()),
        ),
        (
            "project_user_has_watched",
            project
                .and_then(|p| p.personalization.is_starred)
                .map(Into::into),
        ),
    ]);

    (attributes, event_tags)
}

// Referrer credit goes to the cookie tag first; session_ref_tag only ever
// reflects the tag passed in.
fn session_ref_tag_attributes(
    cookies: &dyn RefTagLookup,
    project: Option<&Project>,
    ref_tag: Option<&RefTag>,
) -> Attributes {
    let referrer_credit = project
        .and_then(|p| cookies.ref_tag_for(p))
        .or_else(|| ref_tag.cloned());

    compact([
        (
            "session_referrer_credit",
            referrer_credit.map(|t| t.string_tag().into()),
        ),
        ("session_ref_tag", ref_tag.map(|t| t.string_tag().into())),
    ])
}

fn debug_admin_device_identifier(env: &Environment) -> Option<String> {
    if env.environment_type == EnvironmentType::Production || env.main_bundle.is_release {
        return None;
    }

    Some(device_identifier(env))
}
