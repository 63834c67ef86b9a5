use std::sync::Arc;

use crate::context::EnvironmentType;
use crate::evaluation::DatafileClient;
use crate::experiments::ExperimentClient;

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn ExperimentClient>,
    // Same client as above; exposes the recent dispatch buffer
    pub events: Arc<DatafileClient>,
    pub environment_type: EnvironmentType,
}
