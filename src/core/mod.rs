//! Core data types shared by the parsers, the probe and the sampler

pub mod cpu;
pub mod frequency;

pub use cpu::{CoreTimes, CORE_TIME_FIELDS};
pub use frequency::CoreFrequencySample;
