use anyhow::{Context, Result, ensure};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use vicsek_core::spatial::SpatialIndex;
use vicsek_core::{NeighborBackend, ResultEntry, ResultLog, SimConfig, World};

const WARMUP_STEPS: usize = 10;
const BENCHMARK_STEPS: usize = 100;
const BENCHMARK_SEED: u64 = 42;

#[derive(Parser)]
#[command(name = "vicsek")]
#[command(about = "Vicsek flocking simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation from a config file and print its summary
    Run {
        /// Path to config file (JSON)
        #[arg(long)]
        config: PathBuf,

        /// Number of simulation steps to run
        #[arg(long, default_value_t = 1000)]
        steps: usize,

        /// Record metrics every N steps
        #[arg(long, default_value_t = 100)]
        sample_every: usize,
    },
    /// Sweep the noise level and print one averaged steady-state row per level
    Sweep {
        #[arg(long, default_value_t = 0.0)]
        eta_min: f64,
        #[arg(long, default_value_t = 6.0)]
        eta_max: f64,
        /// Number of noise levels, including both ends
        #[arg(long, default_value_t = 13)]
        eta_steps: usize,
        #[arg(long, default_value_t = 400)]
        agents: usize,
        #[arg(long, default_value_t = 32.0)]
        width: f64,
        #[arg(long, default_value_t = 32.0)]
        height: f64,
        #[arg(long, default_value_t = 1.0)]
        radius: f64,
        #[arg(long, default_value_t = 0.1)]
        speed: f64,
        #[arg(long)]
        seed: Option<u64>,
        /// Steps per recorded row
        #[arg(long, default_value_t = 50)]
        block: usize,
        /// Rows compared when testing for a steady state
        #[arg(long, default_value_t = 5)]
        window: usize,
        /// Allowed change of the mean order parameter between windows
        #[arg(long, default_value_t = 0.02)]
        tolerance: f64,
        /// Give up waiting for a steady state after this many steps
        #[arg(long, default_value_t = 20_000)]
        max_steps: usize,
        #[arg(long, value_enum, default_value_t = Backend::QuadTree)]
        backend: Backend,
    },
    /// Time each neighbor backend over a range of population sizes
    Benchmark,
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Backend {
    BruteForce,
    QuadTree,
    RTree,
}

impl From<Backend> for NeighborBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::BruteForce => NeighborBackend::BruteForce,
            Backend::QuadTree => NeighborBackend::QuadTree,
            Backend::RTree => NeighborBackend::RTree,
        }
    }
}

struct SweepPlan {
    base: SimConfig,
    etas: Vec<f64>,
    block: usize,
    window: usize,
    tolerance: f64,
    max_steps: usize,
}

fn eta_levels(min: f64, max: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![min],
        _ => (0..count)
            .map(|i| min + (max - min) * i as f64 / (count - 1) as f64)
            .collect(),
    }
}

/// Run in blocks until the order parameter settles, then report the
/// average of the last window of rows.
fn sweep_level(plan: &SweepPlan, world: &mut World) -> Result<ResultEntry> {
    let mut log = ResultLog::new();
    let mut steps_done = 0;
    while steps_done < plan.max_steps {
        let start = Instant::now();
        let mut order_sum = 0.0;
        for _ in 0..plan.block {
            world.step();
            order_sum += world.order_parameter();
        }
        steps_done += plan.block;
        let elapsed = start.elapsed().as_secs_f64();
        let config = world.config();
        log.add_entry(ResultEntry {
            steps_per_second: if elapsed > 0.0 {
                plan.block as f64 / elapsed
            } else {
                0.0
            },
            width: config.width,
            height: config.height,
            density: config.density(),
            num_agents: world.num_agents(),
            steps: plan.block,
            avg_normalized_velocity: order_sum / plan.block as f64,
            speed: config.speed,
            eta: config.eta,
            radius: config.radius,
        });
        if log.is_stable(plan.window, plan.tolerance) {
            debug!(eta = world.eta(), steps_done, "steady state reached");
            break;
        }
    }
    if !log.is_stable(plan.window, plan.tolerance) {
        warn!(eta = world.eta(), steps_done, "no steady state within max_steps");
    }
    log.avg_last_n(plan.window)
        .context("sweep produced no rows")
}

fn run_sweep(plan: &SweepPlan) -> Result<()> {
    ensure!(plan.block > 0, "block must be positive");
    ensure!(plan.window > 0, "window must be positive");
    let mut world = World::new(plan.base.clone()).context("invalid sweep configuration")?;
    info!(seed = world.seed(), levels = plan.etas.len(), "starting noise sweep");
    for &eta in &plan.etas {
        world
            .set_eta(eta)
            .with_context(|| format!("invalid noise level {eta}"))?;
        world.reset();
        let row = sweep_level(plan, &mut world)?;
        println!("{}", serde_json::to_string(&row)?);
    }
    Ok(())
}

fn run_benchmark(num_agents: usize, backend: NeighborBackend) -> Result<()> {
    let config = SimConfig {
        seed: Some(BENCHMARK_SEED),
        width: (num_agents as f64).sqrt() * 2.0,
        height: (num_agents as f64).sqrt() * 2.0,
        num_agents,
        radius: 1.0,
        speed: 0.1,
        neighbor_backend: backend,
        ..SimConfig::default()
    };
    let mut world = World::new(config).context("Benchmark config validation error")?;

    for _ in 0..WARMUP_STEPS {
        world.step();
    }

    let mut total_index = 0u64;
    let mut total_sensing = 0u64;
    let mut total_integrate = 0u64;
    let mut total_time = 0u64;
    for _ in 0..BENCHMARK_STEPS {
        let timings = world.step();
        total_index += timings.index_build_us;
        total_sensing += timings.sensing_us;
        total_integrate += timings.integrate_us;
        total_time += timings.total_us;
    }

    let avg_step_us = total_time as f64 / BENCHMARK_STEPS as f64;
    let steps_per_sec = if avg_step_us > 0.0 {
        1_000_000.0 / avg_step_us
    } else {
        f64::INFINITY
    };
    println!("--- {num_agents} agents, {backend:?} ---");
    println!("  Avg step:      {avg_step_us:.0} us ({steps_per_sec:.1} steps/sec)");
    println!(
        "  Breakdown:     index={:.0} us, sensing={:.0} us, integrate={:.0} us",
        total_index as f64 / BENCHMARK_STEPS as f64,
        total_sensing as f64 / BENCHMARK_STEPS as f64,
        total_integrate as f64 / BENCHMARK_STEPS as f64,
    );
    if let SpatialIndex::QuadTree(tree) = world.index() {
        println!(
            "  Quadtree:      {} items, {} knots, depth {}",
            tree.size(),
            tree.knots(),
            tree.depth()
        );
    }
    println!("  Order:         {:.3}", world.order_parameter());
    println!();
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = SimConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Benchmark => {
            if cfg!(debug_assertions) {
                warn!("running in debug mode, results are not representative");
            }
            println!("=== Vicsek neighbor backend benchmark ===");
            println!("Warmup: {WARMUP_STEPS} steps, Benchmark: {BENCHMARK_STEPS} steps");
            println!();
            for num_agents in [500, 2_000, 8_000] {
                for backend in [
                    NeighborBackend::BruteForce,
                    NeighborBackend::QuadTree,
                    NeighborBackend::RTree,
                ] {
                    run_benchmark(num_agents, backend)?;
                }
            }
        }
        Commands::Run {
            config,
            steps,
            sample_every,
        } => {
            let file = File::open(&config).context("failed to open config file")?;
            let reader = BufReader::new(file);
            let sim_config: SimConfig =
                serde_json::from_reader(reader).context("failed to parse config")?;
            sim_config.validate().context("Config validation error")?;

            info!(config = %config.display(), steps, "simulating");
            let mut world = World::new(sim_config).context("failed to initialize world")?;
            let summary = world
                .run_experiment(steps, sample_every)
                .context("invalid experiment parameters")?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Sweep {
            eta_min,
            eta_max,
            eta_steps,
            agents,
            width,
            height,
            radius,
            speed,
            seed,
            block,
            window,
            tolerance,
            max_steps,
            backend,
        } => {
            let plan = SweepPlan {
                base: SimConfig {
                    seed,
                    width,
                    height,
                    num_agents: agents,
                    radius,
                    speed,
                    eta: eta_min,
                    neighbor_backend: backend.into(),
                    ..SimConfig::default()
                },
                etas: eta_levels(eta_min, eta_max, eta_steps),
                block,
                window,
                tolerance,
                max_steps,
            };
            run_sweep(&plan)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_levels_include_both_ends() {
        assert_eq!(eta_levels(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        assert_eq!(eta_levels(2.0, 5.0, 1), vec![2.0]);
        assert!(eta_levels(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn cli_parses_sweep_arguments() {
        let cli = Cli::try_parse_from([
            "vicsek",
            "sweep",
            "--eta-max",
            "3.0",
            "--backend",
            "r-tree",
            "--seed",
            "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Sweep {
                eta_max,
                backend,
                seed,
                ..
            } => {
                assert_eq!(eta_max, 3.0);
                assert_eq!(NeighborBackend::from(backend), NeighborBackend::RTree);
                assert_eq!(seed, Some(5));
            }
            _ => panic!("expected sweep"),
        }
    }

    #[test]
    fn sweep_level_reports_an_averaged_row() {
        let plan = SweepPlan {
            base: SimConfig {
                seed: Some(3),
                width: 10.0,
                height: 10.0,
                num_agents: 50,
                radius: 1.5,
                eta: 0.2,
                speed: 0.2,
                ..SimConfig::default()
            },
            etas: vec![0.2],
            block: 5,
            window: 2,
            tolerance: 1.0,
            max_steps: 100,
        };
        let mut world = World::new(plan.base.clone()).unwrap();
        let row = sweep_level(&plan, &mut world).unwrap();
        // A tolerance of 1.0 settles as soon as two windows exist.
        assert_eq!(world.step_index(), 20);
        assert_eq!(row.steps, 10);
        assert_eq!(row.num_agents, 50);
        assert!((row.eta - 0.2).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&row.avg_normalized_velocity));
    }
}
