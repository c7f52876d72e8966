use anyhow::Context;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudwatch::{primitives::DateTime as AwsDateTime, types as cw};
use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::{
    codec::{encode_request, MetricDatum, PutMetricData},
    StandardUnit,
};

/// Destination of bulk metric writes.
pub trait MetricBackend: core::fmt::Debug + Send + Sync {
    /// Blocking I/O
    fn put_metric_data(&self, request: &PutMetricData) -> anyhow::Result<()>;
}

/// Posts each request as a JSON body to a metrics gateway.
#[derive(Debug)]
pub struct HttpExporter {
    client: ureq::Agent,
    url: String,
    region: String,
}
impl HttpExporter {
    pub fn new(url: String, region: String) -> Self {
        let client = ureq::Agent::new();
        Self {
            client,
            url,
            region,
        }
    }
}
impl MetricBackend for HttpExporter {
    fn put_metric_data(&self, request: &PutMetricData) -> anyhow::Result<()> {
        let body = encode_request(request)?;
        let _resp = self
            .client
            .post(&self.url)
            .set("content-type", "application/json")
            .set("x-region", &self.region)
            .send_bytes(&body)?;
        Ok(())
    }
}

/// Writes through the CloudWatch `PutMetricData` API with the ambient AWS credentials.
#[derive(Debug, Clone)]
pub struct CloudWatchBackend {
    client: aws_sdk_cloudwatch::Client,
    runtime: Handle,
}
impl CloudWatchBackend {
    pub fn new(client: aws_sdk_cloudwatch::Client, runtime: Handle) -> Self {
        Self { client, runtime }
    }
    /// Resolves credentials from the environment, profile or instance role for `region`.
    ///
    /// `endpoint` overrides the service URL, e.g. for a local emulator.
    pub async fn load(region: String, endpoint: Option<String>) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region));
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        Self::new(aws_sdk_cloudwatch::Client::new(&sdk_config), Handle::current())
    }
}
impl MetricBackend for CloudWatchBackend {
    fn put_metric_data(&self, request: &PutMetricData) -> anyhow::Result<()> {
        let metric_data = request
            .metric_data
            .iter()
            .map(cloudwatch_datum)
            .collect::<anyhow::Result<Vec<_>>>()?;
        let put = self
            .client
            .put_metric_data()
            .namespace(&request.namespace)
            .set_metric_data(Some(metric_data));
        self.runtime
            .block_on(put.send())
            .with_context(|| format!("PutMetricData to {} failed", request.namespace))?;
        Ok(())
    }
}

pub fn cloudwatch_datum(datum: &MetricDatum) -> anyhow::Result<cw::MetricDatum> {
    let dimensions = datum
        .dimensions
        .iter()
        .map(|d| cw::Dimension::builder().name(&d.name).value(&d.value).build())
        .collect::<Vec<_>>();
    let unit = match datum.unit {
        StandardUnit::Percent => cw::StandardUnit::Percent,
        StandardUnit::Bytes => cw::StandardUnit::Bytes,
        StandardUnit::BytesPerSecond => cw::StandardUnit::BytesSecond,
        StandardUnit::None => cw::StandardUnit::None,
    };
    Ok(cw::MetricDatum::builder()
        .metric_name(&datum.metric_name)
        .set_dimensions(Some(dimensions))
        .timestamp(AwsDateTime::from_millis(datum.timestamp.timestamp_millis()))
        .unit(unit)
        .value(datum.value)
        .build())
}

type Reject = Box<dyn Fn(&PutMetricData) -> bool + Send + Sync>;

/// Keeps every accepted request in memory.
#[derive(Default)]
pub struct InMemBackend {
    accepted: Mutex<Vec<PutMetricData>>,
    reject: Option<Reject>,
}
impl InMemBackend {
    pub fn new() -> Self {
        Self::default()
    }
    /// Fails every request for which `reject` returns `true`.
    pub fn rejecting(reject: Reject) -> Self {
        Self {
            accepted: Mutex::new(vec![]),
            reject: Some(reject),
        }
    }

    pub fn accepted(&self) -> Vec<PutMetricData> {
        self.accepted.lock().clone()
    }
    pub fn request_count(&self) -> usize {
        self.accepted.lock().len()
    }
}
impl MetricBackend for InMemBackend {
    fn put_metric_data(&self, request: &PutMetricData) -> anyhow::Result<()> {
        if let Some(reject) = &self.reject {
            if reject(request) {
                anyhow::bail!(
                    "rejected {} data points for {}",
                    request.metric_data.len(),
                    request.namespace
                );
            }
        }
        self.accepted.lock().push(request.clone());
        Ok(())
    }
}
impl core::fmt::Debug for InMemBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemBackend")
            .field("accepted", &self.accepted.lock().len())
            .field("rejecting", &self.reject.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::Dimension;

    fn request(namespace: &str) -> PutMetricData {
        PutMetricData {
            namespace: namespace.into(),
            metric_data: vec![],
        }
    }

    #[test]
    fn in_mem_records_accepted_requests() {
        let backend = InMemBackend::new();
        backend.put_metric_data(&request("a")).unwrap();
        backend.put_metric_data(&request("b")).unwrap();
        let namespaces: Vec<String> =
            backend.accepted().into_iter().map(|r| r.namespace).collect();
        assert_eq!(namespaces, vec!["a", "b"]);
    }

    #[test]
    fn in_mem_rejects() {
        let backend =
            InMemBackend::rejecting(Box::new(|r: &PutMetricData| r.namespace == "bad"));
        assert!(backend.put_metric_data(&request("bad")).is_err());
        backend.put_metric_data(&request("good")).unwrap();
        assert_eq!(backend.request_count(), 1);
    }

    #[test]
    fn maps_datum_to_cloudwatch() {
        let datum = MetricDatum {
            metric_name: "NetworkRx".into(),
            dimensions: vec![
                Dimension::new("Stack", "prod"),
                Dimension::new("TaskID", "web.1"),
            ],
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            unit: StandardUnit::BytesPerSecond,
            value: 2048.0,
        };
        let mapped = cloudwatch_datum(&datum).unwrap();
        assert_eq!(mapped.metric_name(), Some("NetworkRx"));
        assert_eq!(mapped.unit(), Some(&cw::StandardUnit::BytesSecond));
        assert_eq!(mapped.value(), Some(2048.0));
        assert_eq!(
            mapped.timestamp().map(|t| t.secs()),
            Some(datum.timestamp.timestamp())
        );
        let dimensions: Vec<(&str, &str)> = mapped
            .dimensions()
            .iter()
            .map(|d| (d.name().unwrap(), d.value().unwrap()))
            .collect();
        assert_eq!(dimensions, vec![("Stack", "prod"), ("TaskID", "web.1")]);
    }
}
