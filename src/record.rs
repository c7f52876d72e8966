use crate::{
    units::{parse_binary_bytes, parse_decimal_bytes, parse_percent, ratio_percent},
    Dimension, Observation, StandardUnit,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected 6 tab-separated fields, found {found}")]
    FieldCount { found: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    CpuUsage,
    MemUsed,
    MemLimit,
    MemPercent,
    NetworkRx,
    NetworkTx,
    BlockIoRead,
    BlockIoWrite,
}
impl MetricName {
    pub const ALL: [MetricName; 8] = [
        Self::CpuUsage,
        Self::MemUsed,
        Self::MemLimit,
        Self::MemPercent,
        Self::NetworkRx,
        Self::NetworkTx,
        Self::BlockIoRead,
        Self::BlockIoWrite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CpuUsage => "CPUUsage",
            Self::MemUsed => "MemUsed",
            Self::MemLimit => "MemLimit",
            Self::MemPercent => "MemPercent",
            Self::NetworkRx => "NetworkRx",
            Self::NetworkTx => "NetworkTx",
            Self::BlockIoRead => "BlockIORead",
            Self::BlockIoWrite => "BlockIOWrite",
        }
    }

    pub fn unit(&self) -> StandardUnit {
        match self {
            Self::CpuUsage | Self::MemPercent => StandardUnit::Percent,
            Self::MemUsed | Self::MemLimit => StandardUnit::Bytes,
            Self::NetworkRx | Self::NetworkTx | Self::BlockIoRead | Self::BlockIoWrite => {
                StandardUnit::BytesPerSecond
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricValues {
    pub cpu_usage: f64,
    pub mem_used: u64,
    pub mem_limit: u64,
    pub mem_percent: f64,
    pub network_rx: u64,
    pub network_tx: u64,
    pub block_io_read: u64,
    pub block_io_write: u64,
}
impl MetricValues {
    pub fn get(&self, name: MetricName) -> f64 {
        match name {
            MetricName::CpuUsage => self.cpu_usage,
            MetricName::MemUsed => self.mem_used as f64,
            MetricName::MemLimit => self.mem_limit as f64,
            MetricName::MemPercent => self.mem_percent,
            MetricName::NetworkRx => self.network_rx as f64,
            MetricName::NetworkTx => self.network_tx as f64,
            MetricName::BlockIoRead => self.block_io_read as f64,
            MetricName::BlockIoWrite => self.block_io_write as f64,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricName, f64)> + '_ {
        MetricName::ALL
            .into_iter()
            .map(move |name| (name, self.get(name)))
    }
}

/// Resource usage of one task at one sampling instant.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub task_name: String,
    pub service_name: String,
    pub values: MetricValues,
}

/// Parses one line of `id \t name \t cpu \t mem \t net \t block`.
///
/// Numeric fields that do not parse become `0`. Only a wrong number of fields is an error.
pub fn parse_line(line: &str) -> Result<MetricRecord, ParseError> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    let &[_id, name, cpu, mem, net, block] = fields.as_slice() else {
        return Err(ParseError::FieldCount {
            found: fields.len(),
        });
    };

    let (mem_used, mem_limit) = pair(mem, parse_binary_bytes);
    // The first network figure is published as Tx.
    let (network_tx, network_rx) = pair(net, parse_decimal_bytes);
    let (block_io_read, block_io_write) = pair(block, parse_decimal_bytes);

    let values = MetricValues {
        cpu_usage: parse_percent(cpu),
        mem_used,
        mem_limit,
        mem_percent: ratio_percent(mem_used, mem_limit),
        network_rx,
        network_tx,
        block_io_read,
        block_io_write,
    };
    Ok(MetricRecord {
        task_name: name.to_string(),
        service_name: service_name(name).to_string(),
        values,
    })
}

/// `web.1.abcdef` -> `web`.
pub fn service_name(task_name: &str) -> &str {
    task_name.split('.').next().unwrap_or(task_name)
}

fn pair(text: &str, parse: fn(&str) -> u64) -> (u64, u64) {
    let mut sides = text.split('/').map(str::trim);
    let first = sides.next().map(parse).unwrap_or(0);
    let second = sides.next().map(parse).unwrap_or(0);
    (first, second)
}

/// Which attribute of a record the per-record dimension is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionKey {
    Service,
    TaskId,
}
impl DimensionKey {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Service => "Service",
            Self::TaskId => "TaskID",
        }
    }

    fn value<'a>(&self, record: &'a MetricRecord) -> &'a str {
        match self {
            Self::Service => &record.service_name,
            Self::TaskId => &record.task_name,
        }
    }
}

/// Turns one record into one observation per metric and per dimension key.
#[derive(Debug, Clone)]
pub struct DimensionExpander {
    base: Vec<Dimension>,
    keys: Vec<DimensionKey>,
}
impl DimensionExpander {
    pub fn new(base: Vec<Dimension>, keys: Vec<DimensionKey>) -> Self {
        Self { base, keys }
    }
    /// `Stack=<stack_name>` plus one of `Service` or `TaskID`.
    pub fn for_stack(stack_name: impl Into<String>) -> Self {
        Self::new(
            vec![Dimension::new("Stack", stack_name)],
            vec![DimensionKey::Service, DimensionKey::TaskId],
        )
    }

    pub fn expand(&self, record: &MetricRecord) -> Vec<Observation> {
        let mut observations = Vec::with_capacity(MetricName::ALL.len() * self.keys.len());
        for (name, value) in record.values.iter() {
            for key in &self.keys {
                let mut dimensions = self.base.clone();
                dimensions.push(Dimension::new(key.name(), key.value(record)));
                observations.push(Observation {
                    metric: name.as_str().to_string(),
                    value,
                    unit: Some(name.unit()),
                    dimensions,
                });
            }
        }
        observations
    }
}
