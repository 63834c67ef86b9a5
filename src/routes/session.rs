use serde::Deserialize;

use crate::context::{
    AppConfig, Bundle, Device, Environment, EnvironmentType, Language, Project, RefTag, User,
};

/// Identity context reported by the app. The environment type is not part of
/// it; that belongs to the deployment.
#[derive(Debug, Deserialize)]
pub struct SessionContext {
    pub current_user: Option<User>,
    pub config: Option<AppConfig>,
    #[serde(default)]
    pub device: Device,
    #[serde(default)]
    pub main_bundle: Bundle,
    #[serde(default)]
    pub apple_pay_device: bool,
    #[serde(default)]
    pub language: Language,
}

impl SessionContext {
    pub fn into_environment(self, environment_type: EnvironmentType) -> Environment {
        Environment {
            current_user: self.current_user,
            config: self.config,
            device: self.device,
            main_bundle: self.main_bundle,
            apple_pay_device: self.apple_pay_device,
            environment_type,
            language: self.language,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub context: SessionContext,
    pub project: Option<Project>,
    pub ref_tag: Option<String>,
}

impl SessionRequest {
    pub fn ref_tag(&self) -> Option<RefTag> {
        self.ref_tag.as_deref().map(RefTag::from)
    }
}
