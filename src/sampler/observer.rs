//! Main-sequence half of the process CPU time sampler

use super::{
    CollectionTrigger, CollectorMessage, CpuTimeCollector, CpuTimeSource, PowerMode, ProcessKind,
    Visibility,
};
use crate::config::SamplerConfig;
use crate::error::{CpuTrackError, Result};
use crate::metrics::MetricsSink;
use log::debug;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

/// Sampler lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    /// No task observed yet
    Uninitialized,
    /// Counting tasks toward the next collection
    Sampling,
}

/// Notification delivered to the sampler on the main sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerEvent {
    WillProcessTask,
    DidProcessTask,
    VisibilityChanged(bool),
    PowerModeChanged {
        old: Option<PowerMode>,
        new: PowerMode,
    },
    Idle,
}

/// Decides when the background collector takes a CPU time snapshot.
///
/// Every method is O(1) and only does counter arithmetic plus, at most, one
/// channel send.
#[derive(Debug)]
pub struct ProcessCpuSampler {
    kind: ProcessKind,
    reporting_interval: u64,
    task_counter: u64,
    state: SamplerState,
    sender: Sender<CollectorMessage>,
}

impl ProcessCpuSampler {
    /// Create a sampler posting collection requests to `sender`
    pub fn new(kind: ProcessKind, config: &SamplerConfig, sender: Sender<CollectorMessage>) -> Self {
        Self {
            kind,
            reporting_interval: kind.reporting_interval(config).max(1),
            task_counter: 0,
            state: SamplerState::Uninitialized,
            sender,
        }
    }

    /// Create a sampler together with its background collector thread.
    ///
    /// Dropping the sampler stops the collector; CPU time consumed after the
    /// last collection is not reported.
    pub fn start<S, M>(
        kind: ProcessKind,
        config: &SamplerConfig,
        source: S,
        sink: M,
    ) -> Result<(Self, JoinHandle<()>)>
    where
        S: CpuTimeSource + 'static,
        M: MetricsSink + 'static,
    {
        config.validate()?;
        let (sender, receiver) = mpsc::channel();
        let collector = CpuTimeCollector::new(kind, source, sink, config);
        let handle = collector.spawn(receiver).map_err(|e| {
            CpuTrackError::Other(format!("Failed to start CPU time collector: {}", e))
        })?;
        Ok((Self::new(kind, config, sender), handle))
    }

    /// Kind of process being sampled
    pub fn kind(&self) -> ProcessKind {
        self.kind
    }

    /// Tasks between periodic collections
    pub fn reporting_interval(&self) -> u64 {
        self.reporting_interval
    }

    /// Tasks counted since the last periodic collection
    pub fn task_counter(&self) -> u64 {
        self.task_counter
    }

    /// Current lifecycle state
    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Dispatch a queued notification
    pub fn handle_event(&mut self, event: SamplerEvent) {
        match event {
            SamplerEvent::WillProcessTask => self.will_process_task(),
            SamplerEvent::DidProcessTask => self.did_process_task(),
            SamplerEvent::VisibilityChanged(visible) => self.on_visibility_changed(visible),
            SamplerEvent::PowerModeChanged { old, new } => self.on_power_mode_changed(old, new),
            SamplerEvent::Idle => self.on_idle(),
        }
    }

    /// A task is about to run on the main sequence
    pub fn will_process_task(&mut self) {
        self.state = SamplerState::Sampling;
    }

    /// A task finished on the main sequence
    pub fn did_process_task(&mut self) {
        self.state = SamplerState::Sampling;
        self.task_counter += 1;
        if self.task_counter >= self.reporting_interval {
            self.task_counter = 0;
            self.post(CollectionTrigger::Periodic);
        }
    }

    /// The process was shown or hidden. Does not affect the task counter.
    pub fn on_visibility_changed(&mut self, visible: bool) {
        self.post(CollectionTrigger::VisibilityChanged(Visibility::from(visible)));
    }

    /// The power mode arbiter moved the process. Does not affect the task
    /// counter.
    pub fn on_power_mode_changed(&mut self, old: Option<PowerMode>, new: PowerMode) {
        self.post(CollectionTrigger::PowerModeChanged { old, new });
    }

    /// The main sequence ran out of work. Collects what the tasks counted
    /// since the last collection consumed, so a process going quiet does not
    /// sit on unreported CPU time.
    pub fn on_idle(&mut self) {
        if self.task_counter == 0 {
            return;
        }
        self.task_counter = 0;
        self.post(CollectionTrigger::Idle);
    }

    fn post(&self, trigger: CollectionTrigger) {
        if self.sender.send(CollectorMessage::Collect(trigger)).is_err() {
            debug!("CPU time collector for {} is gone, dropping {:?}", self.kind, trigger);
        }
    }
}
