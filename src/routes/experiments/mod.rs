pub mod routes;

use serde::Serialize;

use crate::attributes::Attributes;
use crate::experiments::{ExperimentKey, Resolution, Variant};

#[derive(Debug, Serialize)]
pub struct AttributesResponse {
    pub attributes: Attributes,
    pub event_tags: Attributes,
}

#[derive(Debug, Serialize)]
pub struct VariantResponse {
    pub experiment: ExperimentKey,
    pub variant: Variant,
    pub assigned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl VariantResponse {
    pub fn new(experiment: ExperimentKey, resolution: &Resolution) -> Self {
        let reason = match resolution {
            Resolution::Assigned(_) => None,
            Resolution::Fallback(reason) => Some(reason.to_string()),
        };

        Self {
            experiment,
            variant: resolution.variant(),
            assigned: resolution.is_assigned(),
            reason,
        }
    }
}
