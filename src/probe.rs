//! System-wide CPU pressure probe
//!
//! Combines per-core tick counters from `/proc/stat` with cpufreq clock
//! speeds into one sample: how busy the cores were since the previous
//! sample, and how fast they are clocked relative to their range.
//!
//! # Example
//!
//! ```no_run
//! use cputrack::config::ProbeConfig;
//! use cputrack::probe::SystemCpuProbe;
//!
//! let config = ProbeConfig::default();
//! let mut probe = SystemCpuProbe::new(&config);
//! probe.update(); // establishes the baseline
//! std::thread::sleep(config.sample_interval());
//! if let Some(sample) = probe.update() {
//!     println!("utilization {:.1}%", sample.cpu_utilization * 100.0);
//! }
//! ```

use crate::config::ProbeConfig;
use crate::core::cpu::CoreTimes;
use crate::core::frequency::CoreFrequencySample;
use crate::platform::linux::{read_core_frequencies, ProcStatParser};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One core's contribution to a pressure sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreSample {
    /// Core index
    pub core: usize,
    /// Active fraction since the previous sample, if any ticks elapsed
    pub utilization: Option<f64>,
    /// Normalized clock speed, if the core has a valid frequency sample
    pub speed: Option<f64>,
}

/// Aggregated pressure over all cores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureSample {
    /// Mean utilization over cores with a valid interval, in `[0, 1]`
    pub cpu_utilization: f64,
    /// Mean normalized speed over cores with valid frequency data
    pub cpu_speed: Option<f64>,
    /// Per-core breakdown
    pub cores: Vec<CoreSample>,
}

/// Periodic probe over all cores
#[derive(Debug)]
pub struct SystemCpuProbe {
    parser: ProcStatParser,
    cpufreq_root: PathBuf,
    baseline: Option<Vec<CoreTimes>>,
}

impl SystemCpuProbe {
    /// Create a probe reading the sources named in `config`
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            parser: ProcStatParser::new(&config.stat_path),
            cpufreq_root: config.cpufreq_root.clone(),
            baseline: None,
        }
    }

    /// Latest per-core counters
    pub fn core_times(&self) -> &[CoreTimes] {
        self.parser.core_times()
    }

    /// Take a sample.
    ///
    /// The first successful call only records a baseline and returns `None`.
    /// A failed counter read also returns `None` and keeps the old baseline.
    pub fn update(&mut self) -> Option<PressureSample> {
        if !self.parser.update() {
            warn!("Could not read {}", self.parser.path().display());
            return None;
        }

        let frequencies = read_core_frequencies(&self.cpufreq_root, self.parser.core_times().len());
        let current = self.parser.core_times().to_vec();
        let sample = self
            .baseline
            .as_deref()
            .and_then(|baseline| aggregate(baseline, &current, &frequencies));
        self.baseline = Some(current);
        sample
    }
}

fn aggregate(
    baseline: &[CoreTimes],
    current: &[CoreTimes],
    frequencies: &[Option<CoreFrequencySample>],
) -> Option<PressureSample> {
    let cores: Vec<CoreSample> = current
        .iter()
        .enumerate()
        .map(|(core, times)| {
            // A core first seen in this read has no baseline yet.
            let utilization = baseline
                .get(core)
                .and_then(|previous| times.time_utilization(previous));
            let speed = frequencies
                .get(core)
                .copied()
                .flatten()
                .filter(CoreFrequencySample::is_valid)
                .map(|sample| sample.normalized_speed());
            CoreSample {
                core,
                utilization,
                speed,
            }
        })
        .collect();

    let cpu_utilization = mean(cores.iter().filter_map(|c| c.utilization))?;
    let cpu_speed = mean(cores.iter().filter_map(|c| c.speed));

    Some(PressureSample {
        cpu_utilization,
        cpu_speed,
        cores,
    })
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
