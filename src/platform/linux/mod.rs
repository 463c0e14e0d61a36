//! Linux platform implementation

pub mod cpufreq;
pub mod proc_stat;
pub mod process_time;

pub use cpufreq::{read_core_frequencies, read_core_frequency, CPUFREQ_ROOT};
pub use proc_stat::{ProcStatParser, PROC_STAT_PATH};
pub use process_time::ProcfsCpuTimeSource;
