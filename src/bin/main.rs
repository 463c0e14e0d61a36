//! CLI tool for cputrack

#[cfg(all(feature = "cli", target_os = "linux"))]
use clap::{Parser, Subcommand};
#[cfg(all(feature = "cli", target_os = "linux"))]
use std::path::PathBuf;
#[cfg(all(feature = "cli", target_os = "linux"))]
use std::time::Duration;

#[cfg(all(feature = "cli", target_os = "linux"))]
#[derive(Parser)]
#[command(name = "cputrack")]
#[command(about = "CPU time accounting: per-core utilization, core speed, and process CPU time sampling", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Update interval in seconds
    #[arg(short, long, default_value = "1.0", global = true)]
    interval: f64,

    /// Output format (json or text)
    #[arg(short, long, default_value = "text", global = true)]
    format: String,

    /// Configuration file (defaults to ~/.config/cputrack/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[cfg(all(feature = "cli", target_os = "linux"))]
#[derive(Subcommand)]
enum Commands {
    /// Print system pressure samples (utilization and speed) - default
    Probe {
        /// Number of samples to print (0 = forever)
        #[arg(short = 'n', long, default_value = "0")]
        count: u64,
    },
    /// Show per-core utilization between two counter reads
    Cores,
    /// Show per-core normalized clock speed
    Freq,
    /// Sample a process's CPU time and print the reported metrics
    Process {
        /// Process ID to sample (defaults to this process)
        #[arg(short, long)]
        pid: Option<u32>,
        /// Process kind: browser, renderer, gpu, utility, other
        #[arg(short, long, default_value = "other")]
        kind: String,
        /// Ticks between periodic collections (overrides the config)
        #[arg(short, long, default_value = "1")]
        tasks: u64,
        /// Number of ticks to run (0 = forever)
        #[arg(short = 'n', long, default_value = "0")]
        count: u64,
    },
    /// Write the default configuration file
    InitConfig,
}

#[cfg(all(feature = "cli", target_os = "linux"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cputrack::Config;

    let cli = Cli::parse();

    env_logger::init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let interval = Duration::from_secs_f64(cli.interval.max(0.01));
    let json = cli.format == "json";

    match cli.command.unwrap_or(Commands::Probe { count: 0 }) {
        Commands::Probe { count } => run_probe(&config, interval, count, json)?,
        Commands::Cores => run_cores(&config, interval, json)?,
        Commands::Freq => run_freq(&config, json)?,
        Commands::Process {
            pid,
            kind,
            tasks,
            count,
        } => run_process(&config, pid, &kind, tasks, interval, count, json)?,
        Commands::InitConfig => {
            config.save()?;
            println!("Wrote {}", Config::default_path()?.join("config.toml").display());
        }
    }

    Ok(())
}

#[cfg(all(feature = "cli", target_os = "linux"))]
fn run_probe(
    config: &cputrack::Config,
    interval: Duration,
    count: u64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    use cputrack::SystemCpuProbe;

    let mut probe = SystemCpuProbe::new(&config.probe);
    probe.update();

    let mut printed = 0;
    while count == 0 || printed < count {
        std::thread::sleep(interval);
        let Some(sample) = probe.update() else {
            continue;
        };
        if json {
            println!("{}", serde_json::to_string(&sample)?);
        } else {
            let speed = sample
                .cpu_speed
                .map(|s| format!("{:5.1}%", s * 100.0))
                .unwrap_or_else(|| "  N/A".to_string());
            println!(
                "utilization {:5.1}%  speed {}  ({} cores)",
                sample.cpu_utilization * 100.0,
                speed,
                sample.cores.len()
            );
        }
        printed += 1;
    }
    Ok(())
}

#[cfg(all(feature = "cli", target_os = "linux"))]
fn run_cores(
    config: &cputrack::Config,
    interval: Duration,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    use cputrack::ProcStatParser;

    let mut parser = ProcStatParser::new(&config.probe.stat_path);
    if !parser.update() {
        return Err(format!("cannot read {}", config.probe.stat_path.display()).into());
    }
    let baseline = parser.core_times().to_vec();
    std::thread::sleep(interval);
    parser.update();

    let utilization: Vec<Option<f64>> = parser
        .core_times()
        .iter()
        .enumerate()
        .map(|(core, times)| baseline.get(core).and_then(|b| times.time_utilization(b)))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&utilization)?);
    } else {
        println!("{} logical CPUs", num_cpus::get());
        for (core, value) in utilization.iter().enumerate() {
            match value {
                Some(u) => println!("cpu{:<3} {:5.1}%", core, u * 100.0),
                None => println!("cpu{:<3}   N/A", core),
            }
        }
    }
    Ok(())
}

#[cfg(all(feature = "cli", target_os = "linux"))]
fn run_freq(config: &cputrack::Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    use cputrack::platform::linux::read_core_frequencies;

    let samples = read_core_frequencies(&config.probe.cpufreq_root, num_cpus::get());
    if json {
        println!("{}", serde_json::to_string_pretty(&samples)?);
        return Ok(());
    }

    for (core, sample) in samples.iter().enumerate() {
        match sample {
            Some(s) if s.is_valid() => println!(
                "cpu{:<3} {:>5} MHz  range {}-{} MHz  speed {:.3}",
                core,
                s.current_frequency / 1_000_000,
                s.min_frequency / 1_000_000,
                s.max_frequency / 1_000_000,
                s.normalized_speed()
            ),
            Some(_) => println!("cpu{:<3} invalid frequency range", core),
            None => println!("cpu{:<3} no cpufreq data", core),
        }
    }
    Ok(())
}

#[cfg(all(feature = "cli", target_os = "linux"))]
fn run_process(
    config: &cputrack::Config,
    pid: Option<u32>,
    kind: &str,
    tasks: u64,
    interval: Duration,
    count: u64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    use cputrack::{MemoryMetricsSink, ProcessCpuSampler, ProcessKind, ProcfsCpuTimeSource};

    let kind: ProcessKind = kind.parse()?;
    let source = match pid {
        Some(pid) => ProcfsCpuTimeSource::for_pid(pid),
        None => ProcfsCpuTimeSource::current_process(),
    };

    let mut sampler_config = config.sampler.clone();
    sampler_config.persistent_reporting_interval = tasks;
    sampler_config.other_reporting_interval = tasks;

    let sink = MemoryMetricsSink::new();
    let (mut sampler, collector) =
        ProcessCpuSampler::start(kind, &sampler_config, source, sink.clone())?;

    let mut ticks = 0;
    while count == 0 || ticks < count {
        std::thread::sleep(interval);
        // Each tick stands in for one finished task of the sampled process.
        sampler.will_process_task();
        sampler.did_process_task();
        ticks += 1;

        for sample in sink.drain() {
            if json {
                println!("{}", serde_json::to_string(&sample)?);
            } else {
                println!(
                    "{} {:<28} {:.6}",
                    sample.recorded_at.format("%H:%M:%S"),
                    sample.name,
                    sample.value
                );
            }
        }
    }

    drop(sampler);
    collector
        .join()
        .map_err(|_| "CPU time collector thread panicked")?;
    Ok(())
}

#[cfg(not(all(feature = "cli", target_os = "linux")))]
fn main() {
    eprintln!("CLI features not enabled. Please compile with --features cli on Linux");
    std::process::exit(1);
}
