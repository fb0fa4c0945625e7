//! Sequential trapezoidal integration

use anyhow::Result;
use riemann::config::cli::{parse_cli, SequentialCli};
use riemann::config::cli_convert::parse_bounds;
use riemann::config::toml::load_config;
use riemann::config::validator::validate_config;
use riemann::coordinator::run_sequential;
use riemann::output::json::{write_json_report, RunReport, Variant};
use riemann::output::text::{print_failure, print_results};
use riemann::util::logging::init_logging;
use riemann::IntegrationRequest;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli: SequentialCli = match parse_cli() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_failure(&e, "riemann", "<a> <b>");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: SequentialCli) -> Result<()> {
    let config = load_config(&cli.common)?;
    init_logging(config.output.verbosity)?;
    validate_config(&config)?;

    let (a, b) = parse_bounds(cli.a.as_deref(), cli.b.as_deref())?;
    let request = IntegrationRequest::new(a, b, config.integration.subdivisions, 1)?;
    let integrand = config.integration.integrand;

    tracing::info!(
        a,
        b,
        subdivisions = request.subdivisions,
        %integrand,
        "starting sequential run"
    );
    let outcome = run_sequential(&request, &integrand)?;

    print_results(request.subdivisions, a, b, outcome.result.value, outcome.elapsed);

    if let Some(ref path) = config.output.json_output {
        let report = RunReport::new(
            Variant::Sequential,
            integrand,
            a,
            b,
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
