use axum_extra::extract::CookieJar;

use crate::context::{Project, RefTag};

/// Source of referral tags previously recorded for a project.
pub trait RefTagLookup {
    fn ref_tag_for(&self, project: &Project) -> Option<RefTag>;
}

/// Name of the cookie that carries the referral tag for `project`.
pub fn cookie_name(project: &Project) -> String {
    format!("ref_{}", project.id)
}

impl RefTagLookup for CookieJar {
    fn ref_tag_for(&self, project: &Project) -> Option<RefTag> {
        let cookie = self.get(&cookie_name(project))?;
        let value = cookie.value_trimmed();
        if value.is_empty() {
            return None;
        }
        Some(RefTag::from(value))
    }
}

/// Lookup that never finds a tag.
#[cfg(test)]
pub struct NoCookies;

#[cfg(test)]
impl RefTagLookup for NoCookies {
    fn ref_tag_for(&self, _project: &Project) -> Option<RefTag> {
        None
    }
}

/// Jar holding the cookies of a raw `Cookie` header.
#[cfg(test)]
pub fn jar_from_header(header: &str) -> CookieJar {
    let mut headers = axum::http::HeaderMap::new();
    headers.insert(
        axum::http::header::COOKIE,
        axum::http::HeaderValue::from_str(header).unwrap(),
    );
    CookieJar::from_headers(&headers)
}
