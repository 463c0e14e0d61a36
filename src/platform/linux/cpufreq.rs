//! Linux cpufreq sysfs reader
//!
//! Builds [`CoreFrequencySample`]s from
//! `/sys/devices/system/cpu/cpuN/cpufreq/`. The kernel reports kHz; samples
//! are in Hz.

use crate::core::frequency::CoreFrequencySample;
use crate::error::Result;
use crate::platform::common::read_file_u64;
use log::trace;
use std::path::Path;

/// Default root of the per-core sysfs tree
pub const CPUFREQ_ROOT: &str = "/sys/devices/system/cpu";

fn khz_to_hz(khz: u64) -> i64 {
    i64::try_from(khz.saturating_mul(1000)).unwrap_or(i64::MAX)
}

/// Read the frequency description of core `core` below `root`.
///
/// `base_frequency` is only exposed by some drivers (intel_pstate); when it
/// is missing the sample has no base.
pub fn read_core_frequency<P: AsRef<Path>>(root: P, core: usize) -> Result<CoreFrequencySample> {
    let cpufreq_dir = root.as_ref().join(format!("cpu{}", core)).join("cpufreq");

    let min = read_file_u64(cpufreq_dir.join("cpuinfo_min_freq"))?;
    let max = read_file_u64(cpufreq_dir.join("cpuinfo_max_freq"))?;
    let current = read_file_u64(cpufreq_dir.join("scaling_cur_freq"))?;
    let base = read_file_u64(cpufreq_dir.join("base_frequency")).ok();

    Ok(CoreFrequencySample::new(
        khz_to_hz(min),
        khz_to_hz(max),
        base.map(khz_to_hz),
        khz_to_hz(current),
    ))
}

/// Read frequency samples for cores `0..count`; unreadable cores yield `None`.
pub fn read_core_frequencies<P: AsRef<Path>>(
    root: P,
    count: usize,
) -> Vec<Option<CoreFrequencySample>> {
    (0..count)
        .map(|core| match read_core_frequency(root.as_ref(), core) {
            Ok(sample) => Some(sample),
            Err(e) => {
                trace!("No cpufreq data for cpu{}: {}", core, e);
                None
            }
        })
        .collect()
}
