use clap::{Args, Parser, Subcommand};
use devstart::adapters;
use devstart::logging::init_logging_for;
use devstart::{DevstartOptions, DevstartResult, Orchestrator, StartOutcome, StartupArgs};
use std::path::PathBuf;
use std::process::ExitCode;

/// devstart: local development VM
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create, start and provision the VM.
    Start(StartArgs),
    /// Stop the VM and remove everything the session created.
    Stop,
}

#[derive(Args, Debug)]
struct StartArgs {
    /// Dependency archive to use instead of the cached download.
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,
    /// Docker registries to trust without TLS, `host:port,host2:port2`.
    #[arg(short = 'r', long = "registries", default_value = "")]
    registries: String,
    #[arg(short = 'c', long = "cpus", default_value_t = devstart::constants::DEFAULT_CPUS)]
    cpus: u32,
    /// VM memory in MB (0 = size from the dependency metadata).
    #[arg(short = 'm', long = "memory", default_value_t = 0)]
    memory: u64,
    /// Services to deploy: comma-separated names, `all` or `none`.
    #[arg(short = 's', long = "services")]
    services: Option<String>,
    #[arg(short = 'n', long = "no-provision", hide = true)]
    no_provision: bool,
    #[arg(long = "efi", hide = true)]
    efi: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (label, result) = match cli.command {
        Cmd::Start(args) => ("start", start(args).await),
        Cmd::Stop => ("stop", stop().await),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("devstart {} failed: {}", label, e);
            eprintln!("devstart {label}: {e}");
            ExitCode::FAILURE
        }
    }
}

fn setup() -> DevstartResult<DevstartOptions> {
    let options = DevstartOptions::load()?;
    init_logging_for(&options.layout())?;
    Ok(options)
}

async fn start(cli: StartArgs) -> DevstartResult<()> {
    let options = setup()?;
    let layout = options.layout();

    let mut args = StartupArgs::new(cli.efi.unwrap_or_else(|| layout.efi_iso_path()));
    args.registries = cli.registries;
    args.deploy_single_service = cli.services;
    args.deps_path = cli.file;
    args.no_provision = cli.no_provision;
    args.cpus = cli.cpus;
    args.memory_mb = cli.memory;

    let ports = adapters::collaborators(&options)?;
    // No daemon is supervised from this process yet, so nothing takes a
    // failure notifier; the watchdog only waits for the exit signal here.
    let (signals, listener) = devstart::watchdog_channel();
    let orchestrator = Orchestrator::new(options, ports, listener);

    let report = orchestrator.execute(args).await?;
    if report.outcome == StartOutcome::Completed {
        println!("devstart is now running.");
    }

    signals.exit();
    if let Err(e) = report.watchdog.await {
        tracing::warn!("Watchdog task ended abnormally: {}", e);
    }
    Ok(())
}

async fn stop() -> DevstartResult<()> {
    let options = setup()?;
    let ports = adapters::collaborators(&options)?;
    ports.teardown.run().await?;
    println!("devstart has been stopped.");
    Ok(())
}
