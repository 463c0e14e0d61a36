//! Platform-specific implementations

#[cfg(target_os = "linux")]
pub mod linux;

// Common utilities
pub mod common;
