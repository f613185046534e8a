//! rmtr - continuous per-hop ICMP traceroute and ping.
//!
//! This is the command-line interface for the rmtr library.

use anyhow::{Context, Result};
use clap::Parser;
use rmtr::config::{DEFAULT_PING_SIZE, DEFAULT_PROBE_TIMEOUT_MS};
use rmtr::socket::utils::{is_root, privilege_hint};
use rmtr::{
    report, resolve_target, AddressFamily, HickoryNameResolver, NameResolver, RawIcmpFactory,
    TraceError, TraceOptions, TraceSession,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Get the version string for rmtr
fn get_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(env!("CARGO_PKG_VERSION"), "-UNRELEASED")
    } else {
        env!("CARGO_PKG_VERSION")
    }
}

/// Command-line arguments for the trace tool.
#[derive(Parser, Debug)]
#[clap(author, version = get_version(), about = "Continuous per-hop ICMP traceroute and ping", long_about = None)]
struct Args {
    /// Target hostname or IP address
    host: String,

    /// Seconds between two probes of the same hop
    #[clap(short, long, default_value_t = 1.0)]
    interval: f64,

    /// Echo payload size in bytes
    #[clap(short, long, default_value_t = DEFAULT_PING_SIZE)]
    size: usize,

    /// Show numeric addresses only (no reverse DNS)
    #[clap(short, long)]
    numeric: bool,

    /// Timeout for individual probes in milliseconds
    #[clap(long, default_value_t = DEFAULT_PROBE_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Stop after this many probe intervals instead of waiting for Ctrl-C
    #[clap(short, long)]
    cycles: Option<u32>,

    /// Report format printed when the trace ends
    #[clap(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,

    /// Only trace IPv4 addresses
    #[clap(short = '4', long, conflicts_with = "ipv6")]
    ipv4: bool,

    /// Only trace IPv6 addresses
    #[clap(short = '6', long)]
    ipv6: bool,

    /// Enable verbose logging to stderr (repeat for more)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum ReportFormat {
    Text,
    Html,
    Json,
}

fn main() {
    let args = Args::parse();
    configure_logging(args.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: Failed to create Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(async_main(args)) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn configure_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn options_from_args(args: &Args) -> Result<TraceOptions> {
    let interval = Duration::try_from_secs_f64(args.interval)
        .map_err(|_| TraceError::ConfigError(format!("invalid interval: {}", args.interval)))?;
    let options = TraceOptions::builder()
        .ping_size(args.size)
        .interval(interval)
        .probe_timeout(Duration::from_millis(args.timeout_ms))
        .use_dns(!args.numeric)
        .build()?;
    Ok(options)
}

async fn async_main(args: Args) -> Result<()> {
    let options = options_from_args(&args)?;

    let family = if args.ipv4 {
        AddressFamily::V4
    } else if args.ipv6 {
        AddressFamily::V6
    } else {
        AddressFamily::Any
    };
    let target = resolve_target(&args.host, family, None).await?;

    let resolver: Option<Arc<dyn NameResolver>> = if options.use_dns {
        Some(Arc::new(HickoryNameResolver::new()))
    } else {
        None
    };
    let session = TraceSession::with_parts(
        Arc::new(options.clone()),
        Arc::new(RawIcmpFactory::new()),
        resolver,
    );

    match session.start(target) {
        Ok(()) => {}
        Err(e @ TraceError::TransportInit(_)) if !is_root() => {
            return Err(anyhow::Error::new(e).context(format!(
                "Insufficient permissions: {}",
                privilege_hint()
            )));
        }
        Err(e) => return Err(e.into()),
    }

    info!(host = %args.host, %target, "Tracing");
    match args.cycles {
        Some(cycles) => {
            tokio::select! {
                _ = tokio::time::sleep(options.interval.saturating_mul(cycles)) => {}
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Failed to listen for Ctrl-C")?;
                }
            }
        }
        None => {
            eprintln!("Tracing {} ({}), press Ctrl-C to stop", args.host, target);
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
        }
    }

    session.stop_and_wait().await;
    let hops = session.table().snapshot();

    match args.report {
        ReportFormat::Text => print!("{}", report::render_text(&hops)),
        ReportFormat::Html => print!("{}", report::render_html(&args.host, &hops)),
        ReportFormat::Json => println!("{}", report::render_json(&args.host, &hops)?),
    }
    Ok(())
}
