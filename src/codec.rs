use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Dimension, MetricObservation, StandardUnit, BATCH_LIMIT};

/// Body of one bulk write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutMetricData {
    pub namespace: String,
    pub metric_data: Vec<MetricDatum>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricDatum {
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub timestamp: DateTime<Utc>,
    pub unit: StandardUnit,
    pub value: f64,
}
impl From<MetricObservation> for MetricDatum {
    fn from(observation: MetricObservation) -> Self {
        Self {
            metric_name: observation.metric,
            dimensions: observation.dimensions,
            timestamp: observation.timestamp,
            unit: observation.unit,
            value: observation.value,
        }
    }
}

/// Splits `observations` into requests of at most [`BATCH_LIMIT`] data points, keeping order.
pub fn chunk_requests(namespace: &str, observations: Vec<MetricObservation>) -> Vec<PutMetricData> {
    let mut requests = Vec::with_capacity(observations.len().div_ceil(BATCH_LIMIT));
    let mut data = observations.into_iter().map(MetricDatum::from).peekable();
    while data.peek().is_some() {
        let metric_data: Vec<MetricDatum> = data.by_ref().take(BATCH_LIMIT).collect();
        requests.push(PutMetricData {
            namespace: namespace.to_string(),
            metric_data,
        });
    }
    requests
}

pub fn encode_request(request: &PutMetricData) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(request)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn observation(value: f64) -> MetricObservation {
        MetricObservation {
            metric: "MemUsed".into(),
            value,
            unit: StandardUnit::Bytes,
            dimensions: vec![Dimension::new("Stack", "prod")],
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn chunk_sizes() {
        let cases = [(0, vec![]), (1, vec![1]), (20, vec![20]), (45, vec![20, 20, 5])];
        for (total, expected) in cases {
            let observations = (0..total).map(|i| observation(i as f64)).collect();
            let requests = chunk_requests("ns", observations);
            let sizes: Vec<usize> = requests.iter().map(|r| r.metric_data.len()).collect();
            assert_eq!(sizes, expected, "{total}");
        }
    }

    #[test]
    fn chunks_concatenate_to_input() {
        let requests = chunk_requests("ns", (0..41).map(|i| observation(i as f64)).collect());
        let values: Vec<f64> = requests
            .iter()
            .flat_map(|r| r.metric_data.iter().map(|d| d.value))
            .collect();
        let expected: Vec<f64> = (0..41).map(|i| i as f64).collect();
        assert_eq!(values, expected);
        assert!(requests.iter().all(|r| r.namespace == "ns"));
    }

    #[test]
    fn wire_shape() {
        let request = PutMetricData {
            namespace: "Containers".into(),
            metric_data: vec![observation(42.0).into()],
        };
        let body: serde_json::Value =
            serde_json::from_slice(&encode_request(&request).unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "Namespace": "Containers",
                "MetricData": [{
                    "MetricName": "MemUsed",
                    "Dimensions": [{"Name": "Stack", "Value": "prod"}],
                    "Timestamp": "2024-05-01T12:00:00Z",
                    "Unit": "Bytes",
                    "Value": 42.0
                }]
            })
        );
    }

    #[test]
    fn unit_names() {
        let names: Vec<String> = [
            StandardUnit::Percent,
            StandardUnit::Bytes,
            StandardUnit::BytesPerSecond,
            StandardUnit::None,
        ]
        .iter()
        .map(|unit| serde_json::to_value(unit).unwrap().as_str().unwrap().to_string())
        .collect();
        assert_eq!(names, vec!["Percent", "Bytes", "Bytes/Second", "None"]);
    }
}
