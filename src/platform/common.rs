//! Common platform utilities

use crate::error::{CpuTrackError, Result};
use std::fs;
use std::path::Path;

/// Read file contents as string, trimming whitespace
pub fn read_file_string<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(fs::read_to_string(path)?.trim().to_string())
}

/// Read file and parse as integer
pub fn read_file_u64<P: AsRef<Path>>(path: P) -> Result<u64> {
    let path = path.as_ref();
    let content = read_file_string(path)?;
    content.parse().map_err(|e| {
        CpuTrackError::Parse(format!("Failed to parse u64 from {}: {}", path.display(), e))
    })
}

/// Kernel accounting ticks per second (`USER_HZ`)
#[cfg(unix)]
pub fn clock_ticks_per_second() -> u64 {
    // SAFETY: sysconf has no memory-safety preconditions.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as u64
    } else {
        100
    }
}

#[cfg(not(unix))]
pub fn clock_ticks_per_second() -> u64 {
    100
}
