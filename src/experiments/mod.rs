use serde::{Deserialize, Serialize};
use std::fmt;

use crate::attributes::{tracking_attributes_and_event_tags, user_attributes, Attributes};
use crate::context::{device_identifier, Environment, Project, RefTag};
use crate::cookies::RefTagLookup;
use crate::error::ClientError;

/// Identifier of an experiment as known to the experiment client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentKey(pub String);

impl ExperimentKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ExperimentKey {
    fn from(key: &str) -> Self {
        ExperimentKey(key.to_string())
    }
}

impl fmt::Display for ExperimentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variant {
    #[serde(rename = "control")]
    Control,
    #[serde(rename = "variant-1")]
    Variant1,
    #[serde(rename = "variant-2")]
    Variant2,
}

impl Variant {
    pub fn from_raw(raw: &str) -> Option<Variant> {
        match raw {
            "control" => Some(Variant::Control),
            "variant-1" => Some(Variant::Variant1),
            "variant-2" => Some(Variant::Variant2),
            _ => None,
        }
    }

    pub fn raw_value(&self) -> &'static str {
        match self {
            Variant::Control => "control",
            Variant::Variant1 => "variant-1",
            Variant::Variant2 => "variant-2",
        }
    }
}

/// Capability surface of an A/B testing client.
pub trait ExperimentClient: Send + Sync {
    /// Bucket the user and record an impression.
    fn activate(
        &self,
        experiment_key: &str,
        user_id: &str,
        attributes: &Attributes,
    ) -> Result<String, ClientError>;

    /// Bucket the user without recording anything.
    fn get_variation_key(
        &self,
        experiment_key: &str,
        user_id: &str,
        attributes: &Attributes,
    ) -> Result<String, ClientError>;

    fn track(
        &self,
        event_key: &str,
        user_id: &str,
        attributes: &Attributes,
        event_tags: &Attributes,
    ) -> Result<(), ClientError>;
}

/// Why a resolution ended up on the control experience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    ClientError(ClientError),
    UnknownVariation(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::ClientError(e) => write!(f, "{}", e),
            FallbackReason::UnknownVariation(raw) => write!(f, "unknown variation '{}'", raw),
        }
    }
}

/// Outcome of resolving a variant.
///
/// `Assigned(Variant::Control)` means the client explicitly chose control;
/// `Fallback` means control was served because no usable answer came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Assigned(Variant),
    Fallback(FallbackReason),
}

impl Resolution {
    pub fn variant(&self) -> Variant {
        match self {
            Resolution::Assigned(variant) => *variant,
            Resolution::Fallback(_) => Variant::Control,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, Resolution::Assigned(_))
    }
}

/// Resolve the variant of `experiment` for the session described by `env`.
///
/// Admins are previewed through `get_variation_key` so they never count as an
/// impression; everyone else goes through `activate`. Client failures are
/// never returned to the caller.
pub fn resolve_variant(
    client: &dyn ExperimentClient,
    env: &Environment,
    experiment: &ExperimentKey,
    attributes: &Attributes,
) -> Resolution {
    let user_id = device_identifier(env);
    let is_admin = env
        .current_user
        .as_ref()
        .map(|u| u.is_admin)
        .unwrap_or(false);

    let variation = if is_admin {
        client.get_variation_key(experiment.as_str(), &user_id, attributes)
    } else {
        client.activate(experiment.as_str(), &user_id, attributes)
    };

    let resolution = match variation {
        Ok(raw) => match Variant::from_raw(&raw) {
            Some(variant) => Resolution::Assigned(variant),
            None => Resolution::Fallback(FallbackReason::UnknownVariation(raw)),
        },
        Err(e) => Resolution::Fallback(FallbackReason::ClientError(e)),
    };

    match &resolution {
        Resolution::Assigned(variant) => {
            tracing::debug!(
                %experiment,
                variant = variant.raw_value(),
                is_admin,
                "variant resolved"
            );
        }
        Resolution::Fallback(reason) => {
            tracing::warn!(%experiment, %reason, "falling back to control");
        }
    }

    resolution
}

/// Resolve a variant, building the user attributes from `env` when none are given.
pub fn variant(
    client: &dyn ExperimentClient,
    env: &Environment,
    cookies: &dyn RefTagLookup,
    experiment: &ExperimentKey,
    attributes: Option<&Attributes>,
) -> Resolution {
    match attributes {
        Some(attributes) => resolve_variant(client, env, experiment, attributes),
        None => {
            let attributes = user_attributes(env, cookies, None, None);
            resolve_variant(client, env, experiment, &attributes)
        }
    }
}

/// Send a conversion event with the tracking attributes and event tags for
/// `project`. Unlike resolution, client errors are returned.
///
/// The user id comes from [`device_identifier`]. When the device reports no
/// vendor identifier it is a fresh UUID, so the conversion carries a different
/// user id than the activation it follows and cannot be attributed to it.
pub fn track_event(
    client: &dyn ExperimentClient,
    env: &Environment,
    cookies: &dyn RefTagLookup,
    event_key: &str,
    project: Option<&Project>,
    ref_tag: Option<&RefTag>,
) -> Result<(), ClientError> {
    let (attributes, event_tags) =
        tracking_attributes_and_event_tags(env, cookies, project, ref_tag);
    let user_id = device_identifier(env);

    client.track(event_key, &user_id, &attributes, &event_tags)?;
    tracing::debug!(event_key, tags = event_tags.len(), "event tracked");
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::mock::{Call, MockClient};
    use super::*;
    use crate::context::fixtures;
    use crate::cookies::NoCookies;

    fn key() -> ExperimentKey {
        ExperimentKey::from("pledge_cta_copy")
    }

    #[test]
    fn test_non_admin_activates() {
        let client = MockClient::returning("variant-1");
        let mut env = fixtures::environment();
        env.current_user = Some(fixtures::user());

        let resolution = resolve_variant(&client, &env, &key(), &Attributes::new());
        assert_eq!(resolution, Resolution::Assigned(Variant::Variant1));
        assert_eq!(client.calls(), vec![Call::Activate("pledge_cta_copy".to_string())]);
    }

    #[test]
    fn test_logged_out_user_activates() {
        let client = MockClient::returning("control");
        let env = fixtures::environment();

        resolve_variant(&client, &env, &key(), &Attributes::new());
        assert_eq!(client.calls(), vec![Call::Activate("pledge_cta_copy".to_string())]);
    }

    #[test]
    fn test_admin_previews_without_activating() {
        let client = MockClient::returning("variant-2");
        let mut env = fixtures::environment();
        let mut user = fixtures::user();
        user.is_admin = true;
        env.current_user = Some(user);

        let resolution = resolve_variant(&client, &env, &key(), &Attributes::new());
        assert_eq!(resolution.variant(), Variant::Variant2);
        assert_eq!(
            client.calls(),
            vec![Call::GetVariationKey("pledge_cta_copy".to_string())]
        );
    }

    #[test]
    fn test_client_failure_falls_back_to_control() {
        let client = MockClient::failing(ClientError::UnknownExperiment("pledge_cta_copy".into()));
        let env = fixtures::environment();

        let resolution = resolve_variant(&client, &env, &key(), &Attributes::new());
        assert_eq!(resolution.variant(), Variant::Control);
        assert!(!resolution.is_assigned());
        assert!(matches!(
            resolution,
            Resolution::Fallback(FallbackReason::ClientError(ClientError::UnknownExperiment(_)))
        ));
    }

    #[test]
    fn test_unknown_variation_falls_back_to_control() {
        let client = MockClient::returning("variant-9");
        let env = fixtures::environment();

        let resolution = resolve_variant(&client, &env, &key(), &Attributes::new());
        assert_eq!(
            resolution,
            Resolution::Fallback(FallbackReason::UnknownVariation("variant-9".to_string()))
        );
        assert_eq!(resolution.variant(), Variant::Control);
    }

    #[test]
    fn test_explicit_control_is_distinguishable_from_fallback() {
        let client = MockClient::returning("control");
        let env = fixtures::environment();

        let resolution = resolve_variant(&client, &env, &key(), &Attributes::new());
        assert_eq!(resolution, Resolution::Assigned(Variant::Control));
        assert!(resolution.is_assigned());
    }

    #[test]
    fn test_variant_builds_default_attributes() {
        let client = MockClient::returning("variant-1");
        let env = fixtures::environment();

        let resolution = variant(&client, &env, &NoCookies, &key(), None);
        assert_eq!(resolution, Resolution::Assigned(Variant::Variant1));

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0], user_attributes(&env, &NoCookies, None, None));
    }

    #[test]
    fn test_variant_uses_given_attributes() {
        let client = MockClient::returning("variant-2");
        let env = fixtures::environment();
        let attributes = Attributes::from([("user_country".to_string(), "ca".into())]);

        let resolution = variant(&client, &env, &NoCookies, &key(), Some(&attributes));
        assert_eq!(resolution.variant(), Variant::Variant2);
        assert_eq!(client.seen.lock().unwrap()[0], attributes);
    }

    #[test]
    fn test_track_event_sends_event_tags() {
        let client = MockClient::returning("ok");
        let env = fixtures::environment();
        let project = fixtures::project();

        track_event(
            &client,
            &env,
            &NoCookies,
            "pledge_tapped",
            Some(&project),
            Some(&RefTag::Discovery),
        )
        .unwrap();

        assert_eq!(client.calls(), vec![Call::Track("pledge_tapped".to_string())]);
        let tracked = client.tracked.lock().unwrap();
        let (attributes, event_tags) = &tracked[0];
        assert!(attributes.contains_key("session_ref_tag"));
        assert_eq!(event_tags.len(), 4);
    }

    #[test]
    fn test_track_event_propagates_errors() {
        let client = MockClient::failing(ClientError::UnknownEvent("nope".into()));
        let env = fixtures::environment();

        let result = track_event(&client, &env, &NoCookies, "nope", None, None);
        assert_eq!(result, Err(ClientError::UnknownEvent("nope".into())));
    }
}
