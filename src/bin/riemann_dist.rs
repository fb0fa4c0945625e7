//! Distributed trapezoidal integration across cooperating processes
//!
//! Without `--rank` this process launches the whole group locally and acts as
//! rank 0; with `--rank` it joins a group started elsewhere.

use anyhow::{Context, Result};
use riemann::config::cli::{parse_cli, DistributedCli};
use riemann::config::cli_convert::parse_bounds;
use riemann::config::toml::{load_config, merge_distributed_args};
use riemann::config::validator::validate_config;
use riemann::config::Config;
use riemann::distributed::{DistributedCoordinator, NodeOutcome, NodeService, RankGroup};
use riemann::output::json::{write_json_report, RunReport, Variant};
use riemann::output::text::{print_failure, print_results};
use riemann::util::logging::init_logging;
use riemann::IntegrationRequest;
use std::ffi::OsString;
use std::process::ExitCode;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Listener used in launch mode unless `--listen` is given
const LAUNCH_LISTEN: &str = "127.0.0.1:0";

/// How long launched ranks get to exit after rank 0 finishes
const RANK_EXIT_GRACE: Duration = Duration::from_secs(5);

fn main() -> ExitCode {
    let cli: DistributedCli = match parse_cli() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            print_failure(&e, "riemann-dist", "<a> <b>");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: DistributedCli) -> Result<ExitCode> {
    cli.validate()?;
    let config = merge_distributed_args(&cli, load_config(&cli.common)?);
    init_logging(config.output.verbosity)?;
    validate_config(&config)?;

    let runtime = Runtime::new().context("Failed to create tokio runtime")?;

    match cli.rank {
        None => run_launcher(&runtime, &cli, &config),
        Some(0) => {
            let np = cli.np.context("--np is required when --rank is given")?;
            runtime.block_on(async {
                let coordinator =
                    DistributedCoordinator::bind(&config.distributed.listen, np).await?;
                let addr = coordinator.local_addr()?;
                tracing::info!(%addr, np, "coordinator listening");
                run_coordinator(&cli, &config, coordinator).await
            })?;
            Ok(ExitCode::SUCCESS)
        }
        Some(rank) => run_node(&runtime, &cli, &config, rank),
    }
}

/// Launch mode: rank 0 in this process, ranks 1..np-1 as children
fn run_launcher(runtime: &Runtime, cli: &DistributedCli, config: &Config) -> Result<ExitCode> {
    let np = cli.np.unwrap_or_else(num_cpus::get);
    let listen = cli.listen.as_deref().unwrap_or(LAUNCH_LISTEN);

    let coordinator = runtime.block_on(DistributedCoordinator::bind(listen, np))?;
    let addr = coordinator.local_addr()?;

    let forwarded: Vec<OsString> = std::env::args_os().skip(1).collect();
    let mut group = RankGroup::spawn(np, addr, &forwarded)?;
    tracing::info!(%addr, np, spawned = group.spawned(), "rank group launched");

    let result = runtime.block_on(async {
        tokio::select! {
            biased;
            outcome = run_coordinator(cli, config, coordinator) => outcome,
            failure = group.first_failure() => {
                let (rank, status) = failure?;
                Err(anyhow::anyhow!("rank {} exited early ({})", rank, status))
            }
        }
    });

    let clean = group.cleanup(RANK_EXIT_GRACE)?;
    result?;

    if !clean {
        anyhow::bail!("one or more ranks did not exit cleanly");
    }
    Ok(ExitCode::SUCCESS)
}

/// Rank 0: validate `<a> <b>`, run the group, print the result
async fn run_coordinator(
    cli: &DistributedCli,
    config: &Config,
    coordinator: DistributedCoordinator,
) -> Result<()> {
    let integrand = config.integration.integrand;
    let input = parse_bounds(cli.a.as_deref(), cli.b.as_deref()).and_then(|(a, b)| {
        IntegrationRequest::new(a, b, config.integration.subdivisions, coordinator.world_size())
    });

    let outcome = coordinator.run(input, integrand).await?;
    let request = outcome.request;

    print_results(
        request.subdivisions,
        request.a,
        request.b,
        outcome.result.value,
        outcome.elapsed,
    );

    if let Some(ref path) = config.output.json_output {
        let report = RunReport::new(
            Variant::Distributed,
            integrand,
            request.a,
            request.b,
            request.subdivisions,
            None,
            outcome.result.value,
            outcome.elapsed,
            &outcome.partials,
        );
        write_json_report(path, &report)?;
    }

    Ok(())
}

/// Rank > 0: compute one slice; exits 1 when rank 0 aborts the run
fn run_node(
    runtime: &Runtime,
    cli: &DistributedCli,
    config: &Config,
    rank: usize,
) -> Result<ExitCode> {
    let np = cli.np.context("--np is required when --rank is given")?;
    let coordinator = cli
        .coordinator
        .clone()
        .with_context(|| format!("--coordinator is required for rank {}", rank))?;

    let service = NodeService::new(
        rank,
        np,
        coordinator,
        Duration::from_millis(config.distributed.connect_timeout_ms),
    )?;

    match runtime.block_on(service.run())? {
        NodeOutcome::Completed(_) => Ok(ExitCode::SUCCESS),
        NodeOutcome::Aborted(_) => Ok(ExitCode::FAILURE),
    }
}
