pub mod buf;
pub mod codec;
pub mod config;
pub mod cycle;
pub mod exporter;
pub mod publisher;
pub mod record;
pub mod sampler;
pub mod units;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Maximum number of data points the backend accepts in one bulk write.
pub const BATCH_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    pub value: String,
}
impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StandardUnit {
    Percent,
    Bytes,
    #[serde(rename = "Bytes/Second")]
    BytesPerSecond,
    #[default]
    None,
}

/// A metric value handed to the publisher, before it is stamped.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub metric: String,
    pub value: f64,
    pub unit: Option<StandardUnit>,
    pub dimensions: Vec<Dimension>,
}

/// A queued metric value, stamped with the time it was published.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricObservation {
    pub metric: String,
    pub value: f64,
    pub unit: StandardUnit,
    pub dimensions: Vec<Dimension>,
    pub timestamp: DateTime<Utc>,
}
impl MetricObservation {
    pub fn stamp(observation: Observation, timestamp: DateTime<Utc>) -> Self {
        Self {
            metric: observation.metric,
            value: observation.value,
            unit: observation.unit.unwrap_or_default(),
            dimensions: observation.dimensions,
            timestamp,
        }
    }
}
