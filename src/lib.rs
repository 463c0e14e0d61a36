//! # cputrack
//!
//! CPU time accounting building blocks for a long-running process:
//!
//! - **Core counters**: an incremental `/proc/stat` parser that keeps one
//!   monotonic tick snapshot per core and tolerates truncated, extended or
//!   regressing lines.
//! - **Core speed**: normalization of a core's clock frequency into `[0, 1]`,
//!   optionally centered on its sustained base frequency.
//! - **System pressure**: a probe averaging per-core utilization and speed
//!   between samples.
//! - **Process sampling**: a task-counting sampler that decides when to
//!   snapshot the process's own CPU time, with the expensive read done on a
//!   dedicated background thread.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cputrack::config::SamplerConfig;
//! use cputrack::metrics::LogMetricsSink;
//! use cputrack::platform::linux::ProcfsCpuTimeSource;
//! use cputrack::sampler::{ProcessCpuSampler, ProcessKind};
//!
//! # fn main() -> cputrack::Result<()> {
//! let (mut sampler, _collector) = ProcessCpuSampler::start(
//!     ProcessKind::Renderer,
//!     &SamplerConfig::default(),
//!     ProcfsCpuTimeSource::current_process(),
//!     LogMetricsSink,
//! )?;
//!
//! // From the main loop:
//! sampler.will_process_task();
//! // ... run the task ...
//! sampler.did_process_task();
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - the `cputrack` command-line tool

pub mod config; // Configuration management with TOML persistence
pub mod core;
pub mod error;
pub mod metrics; // Metric sinks for sampler output
pub mod platform;
#[cfg(target_os = "linux")]
pub mod probe; // System-wide utilization and speed
pub mod sampler; // Process CPU time sampling policy

// Re-export main types
pub use crate::core::{CoreFrequencySample, CoreTimes};
pub use config::{Config, ProbeConfig, SamplerConfig};
pub use error::{CpuTrackError, Result};
pub use metrics::{Dimensions, LogMetricsSink, MemoryMetricsSink, MetricSample, MetricsSink};
pub use sampler::{
    CpuTimeCollector, CpuTimeSource, PowerMode, ProcessCpuSampler, ProcessKind, SamplerEvent,
    Visibility,
};

#[cfg(target_os = "linux")]
pub use platform::linux::{ProcStatParser, ProcfsCpuTimeSource};
#[cfg(target_os = "linux")]
pub use probe::{PressureSample, SystemCpuProbe};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
