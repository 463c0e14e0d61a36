//! Background half of the process CPU time sampler

use super::{CollectionTrigger, CollectorMessage, CpuTimeSource, PowerMode, ProcessKind, Visibility};
use crate::config::SamplerConfig;
use crate::metrics::{
    Dimensions, MetricsSink, AVERAGE_LOAD, CPU_TIME_SECONDS, CPU_TIME_SECONDS_DETAILED,
};
use log::{debug, trace};
use std::io;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Process-wide CPU time bookkeeping, written only by the collector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuTimeAccount {
    /// Cumulative CPU time covered by reported samples
    pub reported_cpu_time: Duration,
    /// Cumulative CPU time at the last average load report
    pub cpu_time_at_last_load_report: Duration,
    /// When the last average load report happened
    pub load_report_timestamp: Option<Instant>,
    /// Last known visibility
    pub visibility: Option<Visibility>,
    /// Last known power mode
    pub power_mode: Option<PowerMode>,
}

/// Takes CPU time snapshots on request and reports them
pub struct CpuTimeCollector<S, M> {
    kind: ProcessKind,
    source: S,
    sink: M,
    account: CpuTimeAccount,
    avg_load_interval: Duration,
    idle_load_interval: Duration,
}

impl<S: CpuTimeSource, M: MetricsSink> CpuTimeCollector<S, M> {
    /// Create a collector for a process of `kind`
    pub fn new(kind: ProcessKind, source: S, sink: M, config: &SamplerConfig) -> Self {
        Self {
            kind,
            source,
            sink,
            account: CpuTimeAccount::default(),
            avg_load_interval: config.avg_load_report_interval(),
            idle_load_interval: config.idle_load_report_interval(),
        }
    }

    /// Current bookkeeping
    pub fn account(&self) -> &CpuTimeAccount {
        &self.account
    }

    /// Handle one message from the main sequence
    pub fn handle(&mut self, message: CollectorMessage) {
        self.handle_at(message, Instant::now());
    }

    /// Process messages until every sender is dropped
    pub fn run(mut self, receiver: Receiver<CollectorMessage>) {
        for message in receiver {
            self.handle(message);
        }
        trace!("CPU time collector for {} stopped", self.kind);
    }

    /// Run the collector on its own thread
    pub fn spawn(self, receiver: Receiver<CollectorMessage>) -> io::Result<JoinHandle<()>>
    where
        S: 'static,
        M: 'static,
    {
        thread::Builder::new()
            .name(format!("cputrack-{}", self.kind))
            .spawn(move || self.run(receiver))
    }

    fn handle_at(&mut self, message: CollectorMessage, now: Instant) {
        match message {
            CollectorMessage::Collect(trigger) => self.collect(trigger, now),
        }
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions {
            visibility: self.account.visibility,
            power_mode: self.account.power_mode,
            ..Dimensions::for_kind(self.kind)
        }
    }

    fn collect(&mut self, trigger: CollectionTrigger, now: Instant) {
        // Time up to now was spent in the old state; switch dimensions after
        // reporting it.
        self.report(trigger, now);

        match trigger {
            CollectionTrigger::VisibilityChanged(visibility) => {
                self.account.visibility = Some(visibility);
            }
            CollectionTrigger::PowerModeChanged { new, .. } => {
                self.account.power_mode = Some(new);
            }
            CollectionTrigger::Periodic | CollectionTrigger::Idle => {}
        }
    }

    fn report(&mut self, trigger: CollectionTrigger, now: Instant) {
        let cumulative = match self.source.cumulative_cpu_time() {
            Ok(cumulative) => cumulative,
            Err(e) => {
                debug!("Skipping CPU time collection for {}: {}", self.kind, e);
                return;
            }
        };

        let dims = self.dimensions();
        if let Some(delta) = cumulative.checked_sub(self.account.reported_cpu_time) {
            if !delta.is_zero() {
                self.sink.record(CPU_TIME_SECONDS, delta.as_secs_f64(), &dims);
                if trigger.is_detailed() {
                    let mut detailed = dims;
                    if let CollectionTrigger::PowerModeChanged { old, .. } = trigger {
                        detailed.power_mode = old;
                    }
                    self.sink
                        .record(CPU_TIME_SECONDS_DETAILED, delta.as_secs_f64(), &detailed);
                }
            }
        }
        self.account.reported_cpu_time = cumulative;

        self.report_average_load(trigger, cumulative, now, &dims);
    }

    fn report_average_load(
        &mut self,
        trigger: CollectionTrigger,
        cumulative: Duration,
        now: Instant,
        dims: &Dimensions,
    ) {
        let Some(last_report) = self.account.load_report_timestamp else {
            self.account.load_report_timestamp = Some(now);
            self.account.cpu_time_at_last_load_report = cumulative;
            return;
        };

        let interval = if trigger == CollectionTrigger::Idle {
            self.idle_load_interval
        } else {
            self.avg_load_interval
        };
        let elapsed = now.saturating_duration_since(last_report);
        if elapsed < interval || elapsed.is_zero() {
            return;
        }

        let cpu_delta = cumulative.saturating_sub(self.account.cpu_time_at_last_load_report);
        self.sink
            .record(AVERAGE_LOAD, cpu_delta.as_secs_f64() / elapsed.as_secs_f64(), dims);
        self.account.load_report_timestamp = Some(now);
        self.account.cpu_time_at_last_load_report = cumulative;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CpuTrackError, Result};
    use crate::metrics::MemoryMetricsSink;
    use crate::sampler::ProcessCpuSampler;
    use std::sync::{Arc, Mutex};

    /// CPU time source driven by the test; `None` simulates a failed read.
    #[derive(Clone, Default)]
    struct FakeSource {
        cpu_time: Arc<Mutex<Option<Duration>>>,
    }

    impl FakeSource {
        fn set(&self, cpu_time: Option<Duration>) {
            *self.cpu_time.lock().unwrap() = cpu_time;
        }
    }

    impl CpuTimeSource for FakeSource {
        fn cumulative_cpu_time(&mut self) -> Result<Duration> {
            self.cpu_time
                .lock()
                .unwrap()
                .ok_or_else(|| CpuTrackError::Other("process gone".to_string()))
        }
    }

    fn collector() -> (CpuTimeCollector<FakeSource, MemoryMetricsSink>, FakeSource, MemoryMetricsSink) {
        let source = FakeSource::default();
        let sink = MemoryMetricsSink::new();
        let collector = CpuTimeCollector::new(
            ProcessKind::Renderer,
            source.clone(),
            sink.clone(),
            &SamplerConfig::default(),
        );
        (collector, source, sink)
    }

    fn collect(trigger: CollectionTrigger) -> CollectorMessage {
        CollectorMessage::Collect(trigger)
    }

    #[test]
    fn test_reports_cpu_time_delta() {
        let (mut collector, source, sink) = collector();
        let start = Instant::now();

        source.set(Some(Duration::from_millis(500)));
        collector.handle_at(collect(CollectionTrigger::Periodic), start);
        source.set(Some(Duration::from_millis(1250)));
        collector.handle_at(collect(CollectionTrigger::Periodic), start + Duration::from_secs(1));

        let samples = sink.samples_named(CPU_TIME_SECONDS);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, 0.5);
        assert_eq!(samples[1].value, 0.75);
        assert_eq!(collector.account().reported_cpu_time, Duration::from_millis(1250));
    }

    #[test]
    fn test_no_sample_without_new_cpu_time() {
        let (mut collector, source, sink) = collector();
        source.set(Some(Duration::ZERO));
        collector.handle(collect(CollectionTrigger::Periodic));
        assert!(sink.samples_named(CPU_TIME_SECONDS).is_empty());
    }

    #[test]
    fn test_average_load_after_interval() {
        let (mut collector, source, sink) = collector();
        let start = Instant::now();

        source.set(Some(Duration::from_secs(1)));
        collector.handle_at(collect(CollectionTrigger::Periodic), start);
        assert!(sink.samples_named(AVERAGE_LOAD).is_empty());

        source.set(Some(Duration::from_secs(4)));
        collector.handle_at(collect(CollectionTrigger::Periodic), start + Duration::from_secs(10));
        assert!(sink.samples_named(AVERAGE_LOAD).is_empty());

        source.set(Some(Duration::from_secs(16)));
        collector.handle_at(collect(CollectionTrigger::Periodic), start + Duration::from_secs(30));
        let loads = sink.samples_named(AVERAGE_LOAD);
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].value, 0.5);
        assert_eq!(
            collector.account().load_report_timestamp,
            Some(start + Duration::from_secs(30))
        );
        assert_eq!(collector.account().cpu_time_at_last_load_report, Duration::from_secs(16));
    }

    #[test]
    fn test_idle_trigger_uses_shorter_load_interval() {
        let (mut collector, source, sink) = collector();
        let start = Instant::now();

        source.set(Some(Duration::from_secs(1)));
        collector.handle_at(collect(CollectionTrigger::Periodic), start);

        source.set(Some(Duration::from_secs(2)));
        collector.handle_at(collect(CollectionTrigger::Periodic), start + Duration::from_secs(5));
        assert!(sink.samples_named(AVERAGE_LOAD).is_empty());

        collector.handle_at(collect(CollectionTrigger::Idle), start + Duration::from_secs(8));
        let loads = sink.samples_named(AVERAGE_LOAD);
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].value, 1.0 / 8.0);
    }

    #[test]
    fn test_failed_read_is_a_no_op() {
        let (mut collector, source, sink) = collector();
        let start = Instant::now();

        source.set(Some(Duration::from_secs(1)));
        collector.handle_at(collect(CollectionTrigger::Periodic), start);
        let before = collector.account().clone();

        source.set(None);
        collector.handle_at(collect(CollectionTrigger::Periodic), start + Duration::from_secs(60));
        assert_eq!(collector.account(), &before);
        assert_eq!(sink.samples().len(), 1);

        source.set(Some(Duration::from_secs(31)));
        collector.handle_at(collect(CollectionTrigger::Periodic), start + Duration::from_secs(60));
        assert_eq!(sink.samples_named(AVERAGE_LOAD)[0].value, 0.5);
    }

    #[test]
    fn test_visibility_change_attributes_time_to_previous_state() {
        let (mut collector, source, sink) = collector();

        source.set(Some(Duration::from_secs(1)));
        collector.handle(collect(CollectionTrigger::VisibilityChanged(Visibility::Visible)));
        assert_eq!(collector.account().visibility, Some(Visibility::Visible));

        source.set(Some(Duration::from_secs(3)));
        collector.handle(collect(CollectionTrigger::VisibilityChanged(Visibility::Hidden)));
        assert_eq!(collector.account().visibility, Some(Visibility::Hidden));

        let detailed = sink.samples_named(CPU_TIME_SECONDS_DETAILED);
        assert_eq!(detailed.len(), 2);
        assert_eq!(detailed[0].dimensions.visibility, None);
        assert_eq!(detailed[1].dimensions.visibility, Some(Visibility::Visible));
        assert_eq!(detailed[1].value, 2.0);

        source.set(Some(Duration::from_secs(4)));
        collector.handle(collect(CollectionTrigger::Periodic));
        let plain = sink.samples_named(CPU_TIME_SECONDS);
        assert_eq!(
            plain[0].dimensions,
            Dimensions::for_kind(ProcessKind::Renderer)
        );
        assert_eq!(plain.last().unwrap().dimensions.visibility, Some(Visibility::Hidden));
        assert_eq!(sink.samples_named(CPU_TIME_SECONDS_DETAILED).len(), 2);
    }

    #[test]
    fn test_power_mode_breakdown_uses_old_mode() {
        let (mut collector, source, sink) = collector();
        source.set(Some(Duration::from_secs(2)));
        collector.handle(collect(CollectionTrigger::PowerModeChanged {
            old: Some(PowerMode::Animation),
            new: PowerMode::Idle,
        }));

        let detailed = sink.samples_named(CPU_TIME_SECONDS_DETAILED);
        assert_eq!(detailed[0].dimensions.power_mode, Some(PowerMode::Animation));
        assert_eq!(collector.account().power_mode, Some(PowerMode::Idle));
    }

    #[test]
    fn test_sampler_and_collector_end_to_end() {
        let source = FakeSource::default();
        source.set(Some(Duration::from_millis(200)));
        let sink = MemoryMetricsSink::new();
        let config = SamplerConfig {
            other_reporting_interval: 5,
            ..SamplerConfig::default()
        };

        let (mut sampler, handle) =
            ProcessCpuSampler::start(ProcessKind::Utility, &config, source, sink.clone()).unwrap();
        for _ in 0..5 {
            sampler.will_process_task();
            sampler.did_process_task();
        }
        sampler.on_visibility_changed(false);
        drop(sampler);
        handle.join().unwrap();

        let samples = sink.samples_named(CPU_TIME_SECONDS);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 0.2);
        assert_eq!(samples[0].dimensions.process_kind, ProcessKind::Utility);
    }
}
