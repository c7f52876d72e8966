use parking_lot::Mutex;

use crate::MetricObservation;

/// Observations waiting for the next flush, in insertion order.
///
/// Unbounded: nothing pushes back on producers if flushes stall.
#[derive(Debug)]
pub struct MetricBuf {
    buf: Mutex<Vec<MetricObservation>>,
}
impl MetricBuf {
    pub fn new() -> Self {
        Self {
            buf: Mutex::new(vec![]),
        }
    }

    pub fn push(&self, observation: MetricObservation) {
        self.buf.lock().push(observation);
    }
    /// Takes everything queued so far and leaves the buffer empty, in one step.
    pub fn drain(&self) -> Vec<MetricObservation> {
        core::mem::take(&mut *self.buf.lock())
    }

    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }
    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }
}
impl Default for MetricBuf {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Utc;

    use super::*;
    use crate::StandardUnit;

    fn observation(value: f64) -> MetricObservation {
        MetricObservation {
            metric: "CPUUsage".into(),
            value,
            unit: StandardUnit::Percent,
            dimensions: vec![],
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn drain_keeps_order_and_empties() {
        let buf = MetricBuf::new();
        for i in 0..5 {
            buf.push(observation(i as f64));
        }
        assert_eq!(buf.len(), 5);
        let drained = buf.drain();
        let values: Vec<f64> = drained.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert!(buf.is_empty());
        assert!(buf.drain().is_empty());
    }

    #[test]
    fn concurrent_pushes_and_drains_lose_nothing() {
        const WRITERS: usize = 4;
        const PER_WRITER: usize = 1000;
        let buf = MetricBuf::new();
        let mut drained = vec![];
        std::thread::scope(|s| {
            for w in 0..WRITERS {
                let buf = &buf;
                s.spawn(move || {
                    for i in 0..PER_WRITER {
                        buf.push(observation((w * PER_WRITER + i) as f64));
                    }
                });
            }
            for _ in 0..100 {
                drained.extend(buf.drain());
                std::thread::yield_now();
            }
        });
        drained.extend(buf.drain());

        assert_eq!(drained.len(), WRITERS * PER_WRITER);
        let unique: HashSet<u64> = drained.iter().map(|o| o.value as u64).collect();
        assert_eq!(unique.len(), WRITERS * PER_WRITER);
    }
}
