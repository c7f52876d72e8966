use std::time::Duration;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
/// Gateway URL for [`Backend::Http`] when `ENDPOINT` is unset.
pub const DEFAULT_HTTP_ENDPOINT: &str = "http://127.0.0.1:4318/put-metric-data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// CloudWatch `PutMetricData` with the ambient AWS credentials.
    #[default]
    CloudWatch,
    /// JSON bodies posted to a metrics gateway.
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub region: String,
    pub namespace: String,
    pub stack_name: String,
    pub interval: Duration,
    pub backend: Backend,
    /// Service URL override for either backend.
    pub endpoint: Option<String>,
    pub disabled: bool,
    pub docker: String,
}
impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let optional = |name: &'static str| lookup(name).filter(|value| !value.is_empty());

        let interval = match optional("INTERVAL") {
            Some(value) => parse_interval(&value).ok_or(ConfigError::Invalid {
                name: "INTERVAL",
                value,
            })?,
            None => DEFAULT_INTERVAL,
        };
        let disabled = match optional("DISABLED") {
            Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                name: "DISABLED",
                value,
            })?,
            None => false,
        };
        let backend = match optional("BACKEND") {
            Some(value) => parse_backend(&value).ok_or(ConfigError::Invalid {
                name: "BACKEND",
                value,
            })?,
            None => Backend::default(),
        };
        Ok(Self {
            region: required("REGION")?,
            namespace: required("NAMESPACE")?,
            stack_name: required("STACK_NAME")?,
            interval,
            backend,
            endpoint: optional("ENDPOINT"),
            disabled,
            docker: optional("DOCKER").unwrap_or_else(|| "docker".to_string()),
        })
    }

    /// Where [`Backend::Http`] posts, falling back to [`DEFAULT_HTTP_ENDPOINT`].
    pub fn http_endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_HTTP_ENDPOINT)
    }
}

/// Whole seconds (`"15"`) or a human-readable duration (`"1m 30s"`).
fn parse_interval(value: &str) -> Option<Duration> {
    let interval = match value.trim().parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(value.trim()).ok()?,
    };
    (!interval.is_zero()).then_some(interval)
}

fn parse_backend(value: &str) -> Option<Backend> {
    match value.trim().to_ascii_lowercase().as_str() {
        "cloudwatch" => Some(Backend::CloudWatch),
        "http" => Some(Backend::Http),
        _ => None,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
