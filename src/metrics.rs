//! Metrics sink
//!
//! The sampler reports named numeric samples tagged with the dimensions known
//! at collection time. Where they end up is up to the embedding process:
//! [`LogMetricsSink`] writes them to the log, [`MemoryMetricsSink`] keeps them
//! for later inspection.

use crate::sampler::{PowerMode, ProcessKind, Visibility};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// CPU seconds consumed since the previous report
pub const CPU_TIME_SECONDS: &str = "cpu.time_seconds";
/// CPU seconds attributed to a visibility or power mode transition
pub const CPU_TIME_SECONDS_DETAILED: &str = "cpu.time_seconds.detailed";
/// CPU time divided by wall time over the load report interval
pub const AVERAGE_LOAD: &str = "cpu.average_load";

/// Dimensions a sample is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Kind of process the sample describes
    pub process_kind: ProcessKind,
    /// Last known visibility
    pub visibility: Option<Visibility>,
    /// Last known power mode
    pub power_mode: Option<PowerMode>,
}

impl Dimensions {
    /// Dimensions with only the process kind known
    pub fn for_kind(process_kind: ProcessKind) -> Self {
        Self {
            process_kind,
            visibility: None,
            power_mode: None,
        }
    }
}

/// Destination for metric samples
pub trait MetricsSink: Send {
    /// Record one sample
    fn record(&mut self, name: &str, value: f64, dims: &Dimensions);
}

/// One recorded sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    /// Metric name
    pub name: String,
    /// Sample value
    pub value: f64,
    /// Dimensions at record time
    pub dimensions: Dimensions,
    /// Wall-clock time of recording
    pub recorded_at: DateTime<Utc>,
}

/// Sink that logs every sample at `info` level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMetricsSink;

impl MetricsSink for LogMetricsSink {
    fn record(&mut self, name: &str, value: f64, dims: &Dimensions) {
        info!(
            "{} = {:.6} [kind={:?} visibility={:?} power_mode={:?}]",
            name, value, dims.process_kind, dims.visibility, dims.power_mode
        );
    }
}

/// Sink that keeps samples in memory.
///
/// Clones share storage, so one clone can be handed to the background
/// collector while another reads the samples back.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetricsSink {
    samples: Arc<Mutex<Vec<MetricSample>>>,
}

impl MemoryMetricsSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every sample recorded so far
    pub fn samples(&self) -> Vec<MetricSample> {
        self.samples
            .lock()
            .map(|samples| samples.clone())
            .unwrap_or_default()
    }

    /// Samples recorded under `name`
    pub fn samples_named(&self, name: &str) -> Vec<MetricSample> {
        self.samples()
            .into_iter()
            .filter(|sample| sample.name == name)
            .collect()
    }

    /// Remove and return every sample recorded so far
    pub fn drain(&self) -> Vec<MetricSample> {
        self.samples
            .lock()
            .map(|mut samples| std::mem::take(&mut *samples))
            .unwrap_or_default()
    }
}

impl MetricsSink for MemoryMetricsSink {
    fn record(&mut self, name: &str, value: f64, dims: &Dimensions) {
        if let Ok(mut samples) = self.samples.lock() {
            samples.push(MetricSample {
                name: name.to_string(),
                value,
                dimensions: *dims,
                recorded_at: Utc::now(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_shared_between_clones() {
        let reader = MemoryMetricsSink::new();
        let mut writer = reader.clone();
        writer.record(AVERAGE_LOAD, 0.25, &Dimensions::for_kind(ProcessKind::Renderer));
        writer.record(CPU_TIME_SECONDS, 1.5, &Dimensions::for_kind(ProcessKind::Renderer));

        assert_eq!(reader.samples().len(), 2);
        let loads = reader.samples_named(AVERAGE_LOAD);
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].value, 0.25);
        assert_eq!(loads[0].dimensions.process_kind, ProcessKind::Renderer);

        assert_eq!(reader.drain().len(), 2);
        assert!(reader.samples().is_empty());
    }

    #[test]
    fn test_sample_serializes_to_json() {
        let mut sink = MemoryMetricsSink::new();
        let dims = Dimensions {
            process_kind: ProcessKind::Browser,
            visibility: Some(Visibility::Hidden),
            power_mode: Some(PowerMode::Audible),
        };
        sink.record(CPU_TIME_SECONDS_DETAILED, 0.5, &dims);

        let json = serde_json::to_string(&sink.samples()[0]).unwrap();
        assert!(json.contains("\"name\":\"cpu.time_seconds.detailed\""));
        assert!(json.contains("Hidden"));
    }
}
