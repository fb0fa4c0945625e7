//! Shared-memory parallel trapezoidal integration

use anyhow::Result;
use riemann::config::cli::{parse_cli, ThreadsCli};
use riemann::config::cli_convert::{parse_real, parse_worker_count};
use riemann::config::toml::{load_config, merge_threads_args};
use riemann::config::validator::{validate_config, validate_shared_memory_request};
use riemann::coordinator::LocalCoordinator;
use riemann::output::json::{write_json_report, RunReport, Variant};
use riemann::output::text::{print_failure, print_results};
use riemann::util::logging::init_logging;
use riemann::IntegrationError;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli: ThreadsCli = match parse_cli() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_failure(&e, "riemann-threads", "<a> <b> <threadCount>");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: ThreadsCli) -> Result<()> {
    let config = merge_threads_args(&cli, load_config(&cli.common)?);
    init_logging(config.output.verbosity)?;
    validate_config(&config)?;

    // Bounds, then thread count, then divisibility; nothing is spawned until all pass
    let (a, b, threads) = match (cli.a.as_deref(), cli.b.as_deref(), cli.threads.as_deref()) {
        (Some(a), Some(b), Some(threads)) => (
            parse_real(a, "first")?,
            parse_real(b, "second")?,
            parse_worker_count(threads)?,
        ),
        (a, b, threads) => {
            return Err(IntegrationError::InsufficientArguments {
                received: [a, b, threads].iter().flatten().count(),
                expected: 3,
            }
            .into())
        }
    };

    let request = validate_shared_memory_request(a, b, &config, threads)?;
    let coordinator =
        LocalCoordinator::new(request, config.workers.executor, config.workers.reducer)?
            .with_stack_size(config.workers.stack_size);
    let integrand = config.integration.integrand;

    let outcome = coordinator.run(&integrand)?;

    print_results(request.subdivisions, a, b, outcome.result.value, outcome.elapsed);

    if let Some(ref path) = config.output.json_output {
        let report = RunReport::new(
            Variant::Threads,
            integrand,
            a,
            b,
            request.subdivisions,
            Some(config.workers.reducer),
            outcome.result.value,
            outcome.elapsed,
            &outcome.partials,
        );
        write_json_report(path, &report)?;
    }

    Ok(())
}
