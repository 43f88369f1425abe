use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use burst_http::{
    store, BucketResult, CancelHandle, DispatchEngine, HttpSender, PlanBuilder, RateSpec, RunReport,
};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "burst-http",
    version,
    about = "Generates Poisson-distributed bursts of HTTP GET requests for a given URL, \
             with random numbers appended at the end of the URL"
)]
struct Args {
    /// URL of your service. A random integer is appended as the last path segment
    url: String,

    /// Average number of requests to send over the timespan
    requests_num: u64,

    /// Timespan in seconds during which the requests have to be sent
    timespan: u64,

    /// Lower limit (inclusive) of the integers appended to the URL [default: 0]
    #[arg(short, long, alias = "lower_limit")]
    lower_limit: Option<u64>,

    /// Upper limit (exclusive) of the integers appended to the URL [default: 1000000]
    #[arg(short, long, alias = "upper_limit")]
    upper_limit: Option<u64>,

    #[arg(short, long, value_enum, default_value_t = Mode::GenerateAndRun)]
    mode: Mode,

    /// File the generated requests are saved to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// File the requests are loaded from
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Seed for reproducible plans
    #[arg(long)]
    seed: Option<u64>,

    /// Per-request timeout, e.g. `2s` or `500ms`
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Cap on concurrent requests within one bucket (unbounded by default)
    #[arg(long)]
    max_in_flight: Option<NonZeroUsize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Print each bucket's targets
    #[value(alias = "g")]
    Generate,
    /// Write the plan to --output
    #[value(alias = "gs")]
    GenerateAndSave,
    /// Dispatch buckets as they are generated
    #[value(alias = "gr")]
    GenerateAndRun,
    /// Dispatch a plan read from --input
    #[value(alias = "lr")]
    LoadAndRun,
}

#[derive(Debug, PartialEq)]
enum Command {
    /// Lazy producer, one bucket printed at a time.
    Generate,
    /// Eager plan, written in one go.
    GenerateAndSave { output: PathBuf },
    /// Lazy producer interleaved with dispatch.
    GenerateAndRun,
    LoadAndRun { input: PathBuf },
}

/// Everything a run needs, resolved once from the command line.
#[derive(Debug)]
struct RunConfig {
    command: Command,
    spec: RateSpec,
    seed: Option<u64>,
    timeout: Option<Duration>,
    max_in_flight: Option<NonZeroUsize>,
}

impl TryFrom<Args> for RunConfig {
    type Error = &'static str;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let command = match args.mode {
            Mode::Generate => Command::Generate,
            Mode::GenerateAndSave => Command::GenerateAndSave {
                output: args
                    .output
                    .ok_or("Filepath is required in order to save the requests")?,
            },
            Mode::GenerateAndRun => Command::GenerateAndRun,
            Mode::LoadAndRun => Command::LoadAndRun {
                input: args
                    .input
                    .ok_or("Filepath is required in order to load the requests")?,
            },
        };

        let spec = RateSpec::builder()
            .base_url(args.url)
            .mean_requests(args.requests_num)
            .duration_secs(args.timespan)
            .lower_bound(args.lower_limit.unwrap_or(burst_http::DEFAULT_LOWER_BOUND))
            .upper_bound(args.upper_limit.unwrap_or(burst_http::DEFAULT_UPPER_BOUND))
            .build();

        Ok(Self {
            command,
            spec,
            seed: args.seed,
            timeout: args.timeout,
            max_in_flight: args.max_in_flight,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match RunConfig::try_from(Args::parse()) {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::from(1);
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            // stays visible with RUST_LOG=off
            let _ = report_error(&e, &mut std::io::stderr());
            ExitCode::FAILURE
        }
    }
}

async fn run(config: RunConfig) -> burst_http::Result<()> {
    match config.command {
        Command::Generate => {
            for bucket in PlanBuilder::from_seed(config.spec, config.seed)?.buckets()? {
                println!("{:?}", bucket.targets);
            }
        }
        Command::GenerateAndSave { ref output } => {
            let plan = PlanBuilder::from_seed(config.spec.clone(), config.seed)?.build()?;
            store::save(&plan, output)?;
        }
        Command::GenerateAndRun => {
            let buckets = PlanBuilder::from_seed(config.spec.clone(), config.seed)?.buckets()?;
            dispatch(&config, buckets).await;
        }
        Command::LoadAndRun { ref input } => {
            let plan = store::load(input)?;
            dispatch(&config, plan).await;
        }
    }
    Ok(())
}

async fn dispatch(config: &RunConfig, buckets: impl IntoIterator<Item = burst_http::Bucket>) {
    let sender = HttpSender::builder().timeout(config.timeout).build();
    let engine = DispatchEngine::builder()
        .sender(Arc::new(sender))
        .max_in_flight(config.max_in_flight)
        .build();

    tokio::spawn(watch_interrupts(engine.cancel_handle()));

    let agg = engine.run(buckets, print_bucket).await;
    let report = RunReport::from(agg);
    println!("{report:#?}");
}

/// First Ctrl-C stops the run after the current bucket, a second one
/// exits at once even if a request is hung.
async fn watch_interrupts(cancel: CancelHandle) {
    while tokio::signal::ctrl_c().await.is_ok() {
        if should_exit_on_interrupt(&cancel) {
            eprintln!("Interrupted again, exiting");
            std::process::exit(130);
        }
    }
}

fn should_exit_on_interrupt(cancel: &CancelHandle) -> bool {
    if cancel.is_cancelled() {
        return true;
    }
    tracing::warn!("Interrupted, stopping after the current bucket (Ctrl-C again to exit)...");
    cancel.cancel();
    false
}

fn report_error(e: &burst_http::Error, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "error: {e}")
}

fn print_bucket(result: BucketResult) {
    for outcome in &result.outcomes {
        match &outcome.result {
            Ok(body) => println!("{body}"),
            Err(e) => println!("error: {}: {e}", outcome.target),
        }
    }
    println!("time taken: {:.6}", result.elapsed.as_secs_f64());
    println!("{}", "-".repeat(20));
}
