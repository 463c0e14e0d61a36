//! Incremental `/proc/stat` per-core counter parser
//!
//! Each [`ProcStatParser::update`] reads the whole counter file and merges
//! every `cpuN` line into the snapshot for core `N`. Counters never move
//! backwards: a value lower than the stored one is treated as a read glitch
//! and dropped. Lines that do not look like per-core lines, or that carry
//! fewer than [`CORE_TIME_FIELDS`] columns, are skipped. Extra trailing
//! columns added by newer kernels are ignored.
//!
//! The snapshot table is owned by the caller of `update`; the parser does no
//! internal synchronization.

use crate::core::cpu::{CoreTimes, CORE_TIME_FIELDS};
use log::{debug, trace};
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the kernel's CPU accounting file
pub const PROC_STAT_PATH: &str = "/proc/stat";

/// Core ids above this are treated as corrupt input rather than grown into.
const MAX_CORE_ID: usize = 1 << 16;

/// Per-core counters parsed from one line; `None` marks a column whose token
/// was not a number.
type CoreLineFields = [Option<u64>; CORE_TIME_FIELDS];

/// Parser that keeps one [`CoreTimes`] per core across reads
#[derive(Debug, Clone)]
pub struct ProcStatParser {
    path: PathBuf,
    core_times: Vec<CoreTimes>,
}

impl Default for ProcStatParser {
    fn default() -> Self {
        Self::new(PROC_STAT_PATH)
    }
}

impl ProcStatParser {
    /// Create a parser reading from `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            core_times: Vec::new(),
        }
    }

    /// Path the parser reads from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshots indexed by core id. Cores never seen are zeroed.
    pub fn core_times(&self) -> &[CoreTimes] {
        &self.core_times
    }

    /// Re-read the counter file and merge it into the stored snapshots.
    ///
    /// Returns `false`, leaving every snapshot untouched, when the file
    /// cannot be read. Returns `true` otherwise, even if no line matched.
    pub fn update(&mut self) -> bool {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                self.update_from_str(&content);
                true
            }
            Err(e) => {
                debug!("Failed to read {}: {}", self.path.display(), e);
                false
            }
        }
    }

    /// Merge already-read counter text into the stored snapshots
    pub fn update_from_str(&mut self, content: &str) {
        for line in content.lines() {
            let Some((core_id, fields)) = parse_core_line(line) else {
                continue;
            };

            if core_id >= self.core_times.len() {
                self.core_times.resize(core_id + 1, CoreTimes::default());
            }
            let times = &mut self.core_times[core_id];
            for (index, value) in fields.into_iter().enumerate() {
                if let Some(value) = value {
                    times.record(index, value);
                }
            }
        }
    }
}

/// Extract the core id from a `cpuN ...` line, returning it with the rest of
/// the line after the separating space.
fn parse_core_id(line: &str) -> Option<(usize, &str)> {
    let rest = line.strip_prefix("cpu")?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let remainder = rest[digits..].strip_prefix(' ')?;
    let core_id = rest[..digits].parse::<usize>().ok()?;
    if core_id > MAX_CORE_ID {
        return None;
    }
    Some((core_id, remainder))
}

/// Parse a per-core line.
///
/// This is the skip path: `None` means the line is not a per-core line or has
/// too few columns, and the caller must leave every snapshot unchanged.
fn parse_core_line(line: &str) -> Option<(usize, CoreLineFields)> {
    let (core_id, remainder) = parse_core_id(line)?;

    // Empty tokens from doubled or trailing spaces are not columns.
    let tokens: Vec<&str> = remainder.split(' ').filter(|t| !t.is_empty()).collect();
    if tokens.len() < CORE_TIME_FIELDS {
        trace!("Skipping short line for cpu{}: {} columns", core_id, tokens.len());
        return None;
    }

    let mut fields = [None; CORE_TIME_FIELDS];
    for (slot, token) in fields.iter_mut().zip(&tokens) {
        *slot = token.parse::<u64>().ok();
    }
    Some((core_id, fields))
}
