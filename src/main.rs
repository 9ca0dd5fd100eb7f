use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use traffic_watch::{
    analyze, evaluate, read_stat_file, write_breach_report, write_daily_totals,
    write_intrusion_report, write_stats_file, EventLog, Simulation, TrafficConfig,
};

/// Simulates traffic on a single road, derives statistical profiles
/// and flags anomalous days against a baseline.
#[derive(Parser)]
#[command(name = "traffic-watch", version)]
struct Args {
    /// Vehicle type definition file.
    vehicles: PathBuf,
    /// Road and per-type statistics file.
    stats: PathBuf,
    /// Number of days to simulate.
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    days: u32,
    /// Directory the log and report files are written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// Seed for the random source; drawn from entropy when absent.
    #[arg(long)]
    seed: Option<u64>,
    /// Baseline statistics file. When given, the run writes live
    /// statistics and is evaluated against this baseline.
    #[arg(long)]
    baseline: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if let Err(err) = run(&args) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> traffic_watch::Result<()> {
    let config = TrafficConfig::load(&args.vehicles, &args.stats)?;
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut sim = Simulation::new(config, rng);

    let event_log = sim.run(args.days);
    event_log.write_to(&args.out_dir.join("log.txt"))?;

    let event_log = EventLog::read_from(&args.out_dir.join("log.txt"))?;
    let config = sim.config();
    let report = analyze(&event_log, config);

    let stats_name = if args.baseline.is_some() {
        "liveStats.txt"
    } else {
        "baselineStats.txt"
    };
    write_stats_file(&report.profiles, &config.road, &args.out_dir.join(stats_name))?;
    write_breach_report(&report.breaches, &args.out_dir.join("breachedVehicles.txt"))?;
    write_daily_totals(&report.daily_totals, &args.out_dir.join("dailyTotals.txt"))?;

    if let Some(baseline_path) = &args.baseline {
        let (_, baseline) = read_stat_file(baseline_path, &config.types)?;
        let alerts = evaluate(&report.daily_totals, &baseline, &config.types);
        write_intrusion_report(&alerts, &args.out_dir.join("intrusions.txt"))?;
        log::info!("{} intrusion(s) detected", alerts.len());
    }
    Ok(())
}
