use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    buf::MetricBuf, codec::chunk_requests, exporter::MetricBackend, MetricObservation,
    Observation,
};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("invalid observation: {0}")]
    InvalidObservation(&'static str),
    #[error("backend write failed: {0:#}")]
    Backend(anyhow::Error),
    #[error("backend write task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What one send put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushReport {
    pub chunks: usize,
    pub data_points: usize,
}

/// Queues observations and writes them to the backend in bounded chunks.
#[derive(Debug)]
pub struct MetricPublisher {
    backend: Arc<dyn MetricBackend>,
    namespace: String,
    buf: MetricBuf,
    disabled: bool,
}
impl MetricPublisher {
    pub fn new(backend: Arc<dyn MetricBackend>, namespace: String) -> Self {
        Self {
            backend,
            namespace,
            buf: MetricBuf::new(),
            disabled: false,
        }
    }
    /// A disabled publisher accepts everything and never contacts the backend.
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
    pub fn queued(&self) -> usize {
        self.buf.len()
    }

    /// Stamps `observation` with the current time and queues it for the next [`Self::flush`].
    ///
    /// With `immediate` the observation skips the queue and is sent on its own.
    pub async fn publish(
        &self,
        observation: Observation,
        immediate: bool,
    ) -> Result<FlushReport, PublishError> {
        validate(&observation)?;
        let observation = MetricObservation::stamp(observation, Utc::now());
        if !immediate {
            self.buf.push(observation);
            return Ok(FlushReport::default());
        }
        self.send(vec![observation]).await
    }

    /// Sends everything queued so far.
    ///
    /// All chunks are in flight at once and all of them settle before this returns.
    /// The first failed chunk fails the flush; chunks that were accepted stay accepted.
    pub async fn flush(&self) -> Result<FlushReport, PublishError> {
        let observations = self.buf.drain();
        self.send(observations).await
    }

    async fn send(
        &self,
        observations: Vec<MetricObservation>,
    ) -> Result<FlushReport, PublishError> {
        if self.disabled || observations.is_empty() {
            return Ok(FlushReport::default());
        }
        let data_points = observations.len();
        let requests = chunk_requests(&self.namespace, observations);
        let chunks = requests.len();
        debug!(chunks, data_points, namespace = %self.namespace, "sending metric data");

        let tasks: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let backend = Arc::clone(&self.backend);
                tokio::task::spawn_blocking(move || backend.put_metric_data(&request))
            })
            .collect();
        let mut first_error = None;
        for (chunk, task) in tasks.into_iter().enumerate() {
            let error = match task.await {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => PublishError::Backend(e),
                Err(e) => PublishError::Join(e),
            };
            warn!(chunk, error = %error, "metric chunk not delivered");
            first_error.get_or_insert(error);
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(FlushReport {
                chunks,
                data_points,
            }),
        }
    }
}

fn validate(observation: &Observation) -> Result<(), PublishError> {
    if observation.metric.is_empty() {
        return Err(PublishError::InvalidObservation("metric name is empty"));
    }
    if !observation.value.is_finite() {
        return Err(PublishError::InvalidObservation("value is not a finite number"));
    }
    Ok(())
}
