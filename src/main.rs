//! Blit readback checker CLI.
//!
//! Runs the named subtests against the configured device backend. The
//! process exits with 0 when every selected subtest passed or was skipped,
//! 77 when the whole run is skipped, 1 on an environment failure, and
//! aborts on the first data mismatch.

use clap::Parser;
use std::fmt::Display;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::{error, info};

use blit_readback::common::constants::EXIT_SKIP;
use blit_readback::common::ScenarioError;
use blit_readback::config::Config;
use blit_readback::device::{self, Session};
use blit_readback::harness::{env, stress, SignalHelper, SubtestFilter};
use blit_readback::scenario::{Geometry, Sources};
use blit_readback::selector::{self, RunPlan, Variant};

/// Command-line arguments for the blit readback checker.
#[derive(Parser, Debug)]
#[command(author, version, about = "GPU blit to CPU readback coherency checker")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run only the named subtest.
    #[arg(long)]
    run_subtest: Option<String>,

    /// Print the subtest names and exit.
    #[arg(long)]
    list_subtests: bool,

    /// Override the repeat count of interruptible subtests.
    #[arg(long)]
    loops: Option<u32>,

    /// Print run statistics at the end.
    #[arg(long)]
    stats: bool,

    /// Print run statistics as JSON at the end.
    #[arg(long)]
    json: bool,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

fn fatal(context: &str, err: impl Display) -> ! {
    error!("{}: {}", context, err);
    eprintln!("\n[!] FATAL: {}: {}", context, err);
    process::exit(1);
}

fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Main entry point.
///
/// # Behavior
///
/// 1. **Configuration**: Parses arguments, loads and validates the TOML file.
/// 2. **Selection**: Checks the requested subtest name and the simulation skip.
/// 3. **Setup**: Opens the device and creates the two pattern sources.
/// 4. **Run**: Executes every selected subtest; a mismatch aborts the process.
/// 5. **Teardown**: Releases the sources and prints statistics if requested.
fn main() {
    let args = Args::parse();
    init_tracing(args.debug);

    let names = Variant::names();
    if args.list_subtests {
        for name in &names {
            println!("{}", name);
        }
        return;
    }

    let mut config = match &args.config {
        Some(path) => Config::load(path).unwrap_or_else(|e| fatal("configuration", e)),
        None => Config::default(),
    };
    if let Some(loops) = args.loops {
        config.scenario.stress_loops = loops;
    }
    if let Err(e) = config.validate() {
        fatal("configuration", e);
    }

    let filter = SubtestFilter::from_arg(args.run_subtest.as_deref());
    if let Err(e) = filter.check(&names) {
        fatal("subtest selection", e);
    }

    if env::running_on_simulation() {
        println!("[Harness] {} set, skipping", env::SIMULATION_VAR);
        process::exit(EXIT_SKIP);
    }

    let geometry = Geometry::from(&config.scenario);
    let device = device::open(&config.device).unwrap_or_else(|e| fatal("device open", e));
    let mut session = Session::new(device);
    let sources = Sources::create(&mut session, &geometry, config.scenario.starts())
        .unwrap_or_else(|e| fatal("source setup", e));

    println!("Run Configuration");
    println!("--------------------");
    println!("  Backend:            {}", session.device_name());
    println!("  Buffer Size:        {} KiB", geometry.size() / 1024);
    println!("  Surface:            {}x{}", geometry.width, geometry.height);
    println!("  Page Size:          {}", geometry.page_size);
    println!("  Stress Loops:       {}", config.scenario.stress_loops);
    println!("  Seeds:              {:#x}, {:#x}", sources.start()[0], sources.start()[1]);
    println!("  Subtests:           {}", filter);
    println!("--------------------");

    let plan = RunPlan {
        filter,
        geometry,
        stress_loops: config.scenario.stress_loops,
    };
    let mut interrupter =
        SignalHelper::new(Duration::from_micros(config.stress.signal_interval_us));

    match selector::run_selected(&mut session, &sources, &plan, &mut interrupter) {
        Ok(results) => info!(subtests = results.len(), "run finished"),
        Err(ScenarioError::Mismatch(mismatch)) => {
            error!(%mismatch, "verification failed");
            eprintln!("{}", mismatch);
            process::abort();
        }
        Err(ScenarioError::Device(e)) => fatal("device", e),
    }

    if let Err(e) = sources.release(&mut session) {
        fatal("source release", e);
    }
    if session.outstanding_buffers() != 0 {
        error!(
            outstanding = session.outstanding_buffers(),
            "buffers leaked by the run"
        );
    }

    session.stats_mut().signals_received = stress::signals_received();
    if args.stats {
        session.stats().print();
    }
    if args.json {
        match session.stats().to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => fatal("statistics", e),
        }
    }
}
