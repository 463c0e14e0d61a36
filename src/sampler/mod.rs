//! Process CPU time sampling
//!
//! Taking a CPU time snapshot of a process is cheap but not free, so it is
//! done every N tasks rather than on every task. The split is:
//!
//! - [`ProcessCpuSampler`] lives on the process's main sequence. It counts
//!   finished tasks and turns visibility and power mode notifications into
//!   collection requests. It never touches the OS.
//! - [`CpuTimeCollector`] lives on one dedicated background thread. It owns
//!   the [`CpuTimeSource`], the [`MetricsSink`](crate::metrics::MetricsSink)
//!   and all timestamp/duration bookkeeping.
//!
//! The two halves only talk through [`CollectorMessage`]s on a channel, so
//! every piece of state has a single writer.
//!
//! Short-lived processes are sampled more eagerly than persistent ones: CPU
//! time consumed after the last collection is lost when a process exits.

mod collector;
mod observer;

pub use collector::{CpuTimeAccount, CpuTimeCollector};
pub use observer::{ProcessCpuSampler, SamplerEvent, SamplerState};

use crate::config::SamplerConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Source of a process's cumulative CPU time
pub trait CpuTimeSource: Send {
    /// Total user + system CPU time consumed so far
    fn cumulative_cpu_time(&mut self) -> Result<Duration>;
}

/// Kind of process being sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessKind {
    /// Main browser process
    Browser,
    /// Page renderer
    Renderer,
    /// GPU process
    Gpu,
    /// Short-lived utility process
    Utility,
    /// Anything else
    Other,
}

impl ProcessKind {
    /// Persistent processes live as long as the application does
    pub fn is_persistent(self) -> bool {
        matches!(self, ProcessKind::Browser | ProcessKind::Gpu)
    }

    /// Number of tasks between periodic collections
    pub fn reporting_interval(self, config: &SamplerConfig) -> u64 {
        if self.is_persistent() {
            config.persistent_reporting_interval
        } else {
            config.other_reporting_interval
        }
    }
}

impl std::fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessKind::Browser => write!(f, "browser"),
            ProcessKind::Renderer => write!(f, "renderer"),
            ProcessKind::Gpu => write!(f, "gpu"),
            ProcessKind::Utility => write!(f, "utility"),
            ProcessKind::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for ProcessKind {
    type Err = crate::error::CpuTrackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "browser" => Ok(ProcessKind::Browser),
            "renderer" => Ok(ProcessKind::Renderer),
            "gpu" => Ok(ProcessKind::Gpu),
            "utility" => Ok(ProcessKind::Utility),
            "other" => Ok(ProcessKind::Other),
            _ => Err(crate::error::CpuTrackError::InvalidValue(format!(
                "Unknown process kind: {}",
                s
            ))),
        }
    }
}

/// Whether the process currently shows anything to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl From<bool> for Visibility {
    fn from(visible: bool) -> Self {
        if visible {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }
}

/// Coarse classification of the work a process is doing, as decided by an
/// external arbiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerMode {
    Idle,
    Audible,
    VideoPlayback,
    Animation,
    ScriptExecution,
    Loading,
    Background,
    Charging,
}

/// Why a collection was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionTrigger {
    /// The task counter reached the reporting interval
    Periodic,
    /// The main sequence went idle after running tasks
    Idle,
    /// The process became visible or hidden
    VisibilityChanged(Visibility),
    /// The power mode arbiter moved the process between modes
    PowerModeChanged { old: Option<PowerMode>, new: PowerMode },
}

impl CollectionTrigger {
    /// Event-driven triggers also record a per-dimension breakdown
    pub fn is_detailed(&self) -> bool {
        matches!(
            self,
            CollectionTrigger::VisibilityChanged(_) | CollectionTrigger::PowerModeChanged { .. }
        )
    }
}

/// Message posted from the main sequence to the background collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorMessage {
    /// Take a CPU time snapshot and report it
    Collect(CollectionTrigger),
}
