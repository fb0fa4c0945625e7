//! TOML configuration file parsing

use super::*;
use crate::config::cli::{CommonArgs, DistributedCli, ThreadsCli};
use crate::config::cli_convert::{convert_executor, convert_integrand, convert_reducer};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Load the config file named by `--config` (or defaults) and apply common CLI overrides
pub fn load_config(common: &CommonArgs) -> Result<Config> {
    let config = match common.config {
        Some(ref path) => parse_toml_file(path)?,
        None => Config::default(),
    };

    Ok(merge_common_args(common, config))
}

/// Merge options every executable shares (CLI takes precedence)
pub fn merge_common_args(common: &CommonArgs, mut config: Config) -> Config {
    if let Some(n) = common.subdivisions {
        config.integration.subdivisions = n;
    }
    if let Some(choice) = common.integrand {
        config.integration.integrand = convert_integrand(choice);
    }
    if let Some(ref path) = common.json_output {
        config.output.json_output = Some(path.clone());
    }
    if common.verbose > 0 {
        config.output.verbosity = common.verbose;
    }

    config
}

/// Merge shared-memory specific options
pub fn merge_threads_args(cli: &ThreadsCli, mut config: Config) -> Config {
    if let Some(choice) = cli.reducer {
        config.workers.reducer = convert_reducer(choice);
    }
    if let Some(choice) = cli.executor {
        config.workers.executor = convert_executor(choice);
    }

    config
}

/// Merge distributed specific options
pub fn merge_distributed_args(cli: &DistributedCli, mut config: Config) -> Config {
    if let Some(ref listen) = cli.listen {
        config.distributed.listen = listen.clone();
    }
    if let Some(ms) = cli.connect_timeout_ms {
        config.distributed.connect_timeout_ms = ms;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cli::{IntegrandChoice, ReducerChoice};
    use std::io::Write;

    #[test]
    fn test_parse_toml_basic() {
        let toml = r#"
[integration]
subdivisions = 1000
integrand = "sine"

[workers]
reducer = "locked"
executor = "rayon"
stack_size = 1048576

[distributed]
connect_timeout_ms = 500

[output]
json_output = "/tmp/riemann.json"
verbosity = 2
"#;

        let config = parse_toml_string(toml).unwrap();
        assert_eq!(config.integration.subdivisions, 1000);
        assert_eq!(config.integration.integrand, BuiltinIntegrand::Sine);
        assert_eq!(config.workers.reducer, ReducerKind::Locked);
        assert_eq!(config.workers.executor, ExecutorKind::Rayon);
        assert_eq!(config.workers.stack_size, Some(1_048_576));
        assert_eq!(config.distributed.connect_timeout_ms, 500);
        assert_eq!(config.distributed.listen, "0.0.0.0:9999");
        assert_eq!(config.output.json_output, Some(PathBuf::from("/tmp/riemann.json")));
        assert_eq!(config.output.verbosity, 2);
    }

    #[test]
    fn test_parse_toml_empty_uses_defaults() {
        let config = parse_toml_string("").unwrap();
        assert_eq!(config.integration.subdivisions, DEFAULT_SUBDIVISIONS);
        assert_eq!(config.workers.reducer, ReducerKind::Ordered);
    }

    #[test]
    fn test_parse_toml_rejects_unknown_integrand() {
        let toml = r#"
[integration]
integrand = "cosh"
"#;
        assert!(parse_toml_string(toml).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[integration]\nsubdivisions = 1000\nintegrand = \"sine\"").unwrap();

        let common = CommonArgs {
            config: Some(file.path().to_path_buf()),
            subdivisions: Some(4000),
            integrand: Some(IntegrandChoice::Square),
            ..Default::default()
        };

        let config = load_config(&common).unwrap();
        assert_eq!(config.integration.subdivisions, 4000);
        assert_eq!(config.integration.integrand, BuiltinIntegrand::Square);
    }

    #[test]
    fn test_missing_config_file() {
        let common = CommonArgs {
            config: Some(PathBuf::from("/nonexistent/riemann.toml")),
            ..Default::default()
        };
        assert!(load_config(&common).is_err());
    }

    #[test]
    fn test_merge_threads_args() {
        let cli = ThreadsCli {
            a: None,
            b: None,
            threads: None,
            extra: Vec::new(),
            reducer: Some(ReducerChoice::Locked),
            executor: None,
            common: CommonArgs::default(),
        };
        let config = merge_threads_args(&cli, Config::default());
        assert_eq!(config.workers.reducer, ReducerKind::Locked);
        assert_eq!(config.workers.executor, ExecutorKind::Threads);
    }
}
