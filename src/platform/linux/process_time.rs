//! Per-process cumulative CPU time from `/proc/<pid>/stat`

use crate::error::{CpuTrackError, Result};
use crate::platform::common::clock_ticks_per_second;
use crate::sampler::CpuTimeSource;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Reads user + system time of one process
#[derive(Debug, Clone)]
pub struct ProcfsCpuTimeSource {
    stat_path: PathBuf,
    ticks_per_second: u64,
}

impl ProcfsCpuTimeSource {
    /// Source for the calling process
    pub fn current_process() -> Self {
        Self::from_path("/proc/self/stat")
    }

    /// Source for process `pid`
    pub fn for_pid(pid: u32) -> Self {
        Self::from_path(format!("/proc/{}/stat", pid))
    }

    /// Source reading an arbitrary `stat`-formatted file
    pub fn from_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            stat_path: path.into(),
            ticks_per_second: clock_ticks_per_second(),
        }
    }
}

impl CpuTimeSource for ProcfsCpuTimeSource {
    fn cumulative_cpu_time(&mut self) -> Result<Duration> {
        let content = fs::read_to_string(&self.stat_path)?;
        let ticks = parse_process_cpu_ticks(&content)?;
        let micros = u128::from(ticks) * 1_000_000 / u128::from(self.ticks_per_second.max(1));
        Ok(Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX)))
    }
}

/// Sum of `utime` and `stime` (fields 14 and 15) of a `/proc/<pid>/stat` line.
///
/// The command name (field 2) may contain spaces and parentheses, so fields
/// are counted from the last `)`.
fn parse_process_cpu_ticks(content: &str) -> Result<u64> {
    let after_comm = content
        .rfind(')')
        .map(|pos| &content[pos + 1..])
        .ok_or_else(|| CpuTrackError::Parse("missing command name in stat".to_string()))?;

    // Fields after the command start at field 3 (state).
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    let field = |n: usize| -> Result<u64> {
        fields
            .get(n - 3)
            .ok_or_else(|| CpuTrackError::Parse(format!("stat has no field {}", n)))?
            .parse::<u64>()
            .map_err(|e| CpuTrackError::Parse(format!("bad stat field {}: {}", n, e)))
    };

    Ok(field(14)?.saturating_add(field(15)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "1234 (my (odd) proc) S 1 1234 1234 0 -1 4194560 100 0 0 0 250 50 0 0 20 0 1 0 100 1000 10";

    #[test]
    fn test_parse_process_cpu_ticks() {
        assert_eq!(parse_process_cpu_ticks(STAT).unwrap(), 300);
    }

    #[test]
    fn test_parse_truncated_stat() {
        assert!(parse_process_cpu_ticks("1234 (x) S 1 2").is_err());
        assert!(parse_process_cpu_ticks("garbage").is_err());
    }

    #[test]
    fn test_source_reads_file() {
        let path = std::env::temp_dir().join(format!("cputrack_pid_stat_{}", std::process::id()));
        fs::write(&path, STAT).unwrap();
        let mut source = ProcfsCpuTimeSource::from_path(&path);
        source.ticks_per_second = 100;
        assert_eq!(source.cumulative_cpu_time().unwrap(), Duration::from_secs(3));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_process_fails() {
        let mut source = ProcfsCpuTimeSource::from_path("/proc/cputrack-no-such-pid/stat");
        assert!(source.cumulative_cpu_time().is_err());
    }

    #[test]
    fn test_current_process_is_readable() {
        let mut source = ProcfsCpuTimeSource::current_process();
        assert!(source.cumulative_cpu_time().is_ok());
    }
}
