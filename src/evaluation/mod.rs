use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Mutex;

use crate::attributes::{AttributeValue, Attributes};
use crate::error::{ClientError, DatafileError};
use crate::experiments::ExperimentClient;

/// Size of the bucketing space; traffic ranges are expressed against it.
pub const MAX_TRAFFIC_VALUE: u32 = 10_000;

/// Number of dispatched events kept in memory; older ones are dropped.
pub const DISPATCH_BUFFER_SIZE: usize = 1_000;

// Datafile describing every experiment and event the client knows about
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Datafile {
    #[serde(default)]
    pub experiments: Vec<ExperimentData>,
    #[serde(default)]
    pub events: Vec<EventData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentData {
    pub key: String,
    pub status: ExperimentStatus,
    #[serde(default)]
    pub audience: Vec<AudienceCondition>,
    #[serde(default)]
    pub whitelist: HashMap<String, String>,
    pub traffic_allocation: Vec<TrafficRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    Running,
    Paused,
}

// Attribute must equal value for the user to enter the experiment
#[derive(Debug, Clone, Deserialize)]
pub struct AudienceCondition {
    pub attribute: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrafficRange {
    pub variation_key: String,
    pub end_of_range: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub key: String,
}

impl Datafile {
    pub fn from_json(json: &str) -> Result<Self, DatafileError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, DatafileError> {
        let json = std::fs::read_to_string(path).map_err(|source| DatafileError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    fn experiment(&self, key: &str) -> Option<&ExperimentData> {
        self.experiments.iter().find(|e| e.key == key)
    }
}

// Events handed off by the client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchedEvent {
    Impression {
        experiment_key: String,
        variation_key: String,
        user_id: String,
        timestamp: DateTime<Utc>,
    },
    Conversion {
        event_key: String,
        user_id: String,
        event_tags: Attributes,
        timestamp: DateTime<Utc>,
    },
}

/// In-process experiment client backed by a [`Datafile`].
///
/// Dispatched events are logged and kept in a bounded buffer holding the
/// most recent ones.
pub struct DatafileClient {
    datafile: Datafile,
    capacity: usize,
    dispatched: Mutex<VecDeque<DispatchedEvent>>,
}

impl DatafileClient {
    pub fn new(datafile: Datafile) -> Self {
        Self::with_capacity(datafile, DISPATCH_BUFFER_SIZE)
    }

    pub fn with_capacity(datafile: Datafile, capacity: usize) -> Self {
        Self {
            datafile,
            capacity,
            dispatched: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Most recent events, oldest first.
    pub fn dispatched(&self) -> Vec<DispatchedEvent> {
        self.dispatched
            .lock()
            .map(|events| events.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn dispatch(&self, event: DispatchedEvent) -> Result<(), ClientError> {
        let mut events = self
            .dispatched
            .lock()
            .map_err(|_| ClientError::Unavailable("event queue poisoned".to_string()))?;
        if self.capacity == 0 {
            return Ok(());
        }
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
        Ok(())
    }
}

impl ExperimentClient for DatafileClient {
    fn activate(
        &self,
        experiment_key: &str,
        user_id: &str,
        attributes: &Attributes,
    ) -> Result<String, ClientError> {
        let variation = evaluate_experiment(&self.datafile, experiment_key, user_id, attributes)?;

        tracing::info!(experiment_key, variation = %variation, "impression recorded");
        self.dispatch(DispatchedEvent::Impression {
            experiment_key: experiment_key.to_string(),
            variation_key: variation.clone(),
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
        })?;

        Ok(variation)
    }

    fn get_variation_key(
        &self,
        experiment_key: &str,
        user_id: &str,
        attributes: &Attributes,
    ) -> Result<String, ClientError> {
        evaluate_experiment(&self.datafile, experiment_key, user_id, attributes)
    }

    fn track(
        &self,
        event_key: &str,
        user_id: &str,
        _attributes: &Attributes,
        event_tags: &Attributes,
    ) -> Result<(), ClientError> {
        if !self.datafile.events.iter().any(|e| e.key == event_key) {
            return Err(ClientError::UnknownEvent(event_key.to_string()));
        }

        tracing::info!(event_key, "conversion recorded");
        self.dispatch(DispatchedEvent::Conversion {
            event_key: event_key.to_string(),
            user_id: user_id.to_string(),
            event_tags: event_tags.clone(),
            timestamp: Utc::now(),
        })
    }
}

/// Decide the variation of an experiment for a user
pub fn evaluate_experiment(
    datafile: &Datafile,
    experiment_key: &str,
    user_id: &str,
    attributes: &Attributes,
) -> Result<String, ClientError> {
    let experiment = datafile
        .experiment(experiment_key)
        .ok_or_else(|| ClientError::UnknownExperiment(experiment_key.to_string()))?;

    // Step 1: Paused experiments serve nothing
    if experiment.status != ExperimentStatus::Running {
        return Err(ClientError::ExperimentNotRunning(experiment_key.to_string()));
    }

    // Step 2: Forced variations skip audience and bucketing
    if let Some(variation) = experiment.whitelist.get(user_id) {
        return Ok(variation.clone());
    }

    // Step 3: Every audience condition has to match
    let in_audience = experiment
        .audience
        .iter()
        .all(|c| attributes.get(&c.attribute) == Some(&c.value));
    if !in_audience {
        return Err(ClientError::AudienceMismatch(experiment_key.to_string()));
    }

    // Step 4: Bucket into the traffic ranges
    let bucket = bucket_for(experiment_key, user_id);
    experiment
        .traffic_allocation
        .iter()
        .find(|range| bucket < range.end_of_range)
        .map(|range| range.variation_key.clone())
        .ok_or_else(|| ClientError::NoTrafficAllocated {
            experiment: experiment_key.to_string(),
            bucket,
        })
}

/// Consistent hashing into the bucketing space
/// Ensures the same user always lands in the same bucket for a given experiment
fn bucket_for(experiment_key: &str, user_id: &str) -> u32 {
    let mut hasher = DefaultHasher::new();
    format!("{}:{}", experiment_key, user_id).hash(&mut hasher);
    let hash = hasher.finish();

    (hash % MAX_TRAFFIC_VALUE as u64) as u32
}
