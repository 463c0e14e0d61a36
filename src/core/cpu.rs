//! Per-core CPU time counters

use serde::{Deserialize, Serialize};

/// Number of counters tracked per core
pub const CORE_TIME_FIELDS: usize = 10;

/// Cumulative tick counters for one core, as exposed by `/proc/stat`
///
/// Counters only ever grow: updates go through [`CoreTimes::record`], which
/// keeps the larger of the stored and the new value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreTimes {
    /// Time spent in user mode
    pub user: u64,
    /// Time spent in user mode with low priority (nice)
    pub nice: u64,
    /// Time spent in system mode
    pub system: u64,
    /// Time spent idle
    pub idle: u64,
    /// Time waiting for I/O
    pub iowait: u64,
    /// Time servicing hardware interrupts
    pub irq: u64,
    /// Time servicing software interrupts
    pub softirq: u64,
    /// Time stolen by the hypervisor
    pub steal: u64,
    /// Time spent running guests (already included in `user`)
    pub guest: u64,
    /// Time spent running niced guests (already included in `nice`)
    pub guest_nice: u64,
}

impl CoreTimes {
    /// Build a snapshot from counters in `/proc/stat` column order
    pub fn from_fields(fields: [u64; CORE_TIME_FIELDS]) -> Self {
        let mut times = Self::default();
        for (index, value) in fields.into_iter().enumerate() {
            times.record(index, value);
        }
        times
    }

    /// Store `value` at column `index` unless it would make the counter go
    /// backwards. Out-of-range columns are ignored.
    pub fn record(&mut self, index: usize, value: u64) {
        let slot = match index {
            0 => &mut self.user,
            1 => &mut self.nice,
            2 => &mut self.system,
            3 => &mut self.idle,
            4 => &mut self.iowait,
            5 => &mut self.irq,
            6 => &mut self.softirq,
            7 => &mut self.steal,
            8 => &mut self.guest,
            9 => &mut self.guest_nice,
            _ => return,
        };
        *slot = (*slot).max(value);
    }

    /// Ticks spent doing work
    pub fn active(&self) -> u64 {
        self.user
            .saturating_add(self.nice)
            .saturating_add(self.system)
            .saturating_add(self.irq)
            .saturating_add(self.softirq)
            .saturating_add(self.steal)
    }

    /// Ticks spent idle, including I/O wait
    pub fn idle_total(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }

    /// Fraction of the interval since `baseline` the core spent active.
    ///
    /// Returns `None` when no ticks elapsed between the two snapshots.
    pub fn time_utilization(&self, baseline: &CoreTimes) -> Option<f64> {
        let active_delta = self.active().saturating_sub(baseline.active());
        let idle_delta = self.idle_total().saturating_sub(baseline.idle_total());
        let total_delta = active_delta + idle_delta;
        if total_delta == 0 {
            return None;
        }
        Some(active_delta as f64 / total_delta as f64)
    }
}
