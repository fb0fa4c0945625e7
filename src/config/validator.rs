//! Configuration validation

use super::*;
use anyhow::Result;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_integration(&config.integration)?;
    validate_distributed(&config.distributed)?;

    Ok(())
}

/// Validate integration settings
pub fn validate_integration(integration: &IntegrationConfig) -> Result<()> {
    if integration.subdivisions == 0 {
        return Err(IntegrationError::ZeroSubdivisions.into());
    }

    Ok(())
}

/// Validate distributed settings
pub fn validate_distributed(distributed: &DistributedConfig) -> Result<()> {
    if distributed.connect_timeout_ms == 0 {
        anyhow::bail!("connect_timeout_ms must be at least 1");
    }
    if distributed.listen.trim().is_empty() {
        anyhow::bail!("listen address must not be empty");
    }

    Ok(())
}

/// Build the shared-memory request: `W` threads must evenly divide `N`
///
/// Runs before any thread exists, so a bad thread count never starts work.
pub fn validate_shared_memory_request(
    a: f64,
    b: f64,
    config: &Config,
    threads: usize,
) -> Result<IntegrationRequest, IntegrationError> {
    let request = IntegrationRequest::new(a, b, config.integration.subdivisions, threads)?;
    request.require_even_split()?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_subdivisions_is_domain_error() {
        let mut config = Config::default();
        config.integration.subdivisions = 0;
        let err = validate_config(&config).unwrap_err();
        assert_eq!(
            err.downcast_ref::<IntegrationError>(),
            Some(&IntegrationError::ZeroSubdivisions)
        );
    }

    #[test]
    fn test_zero_connect_timeout() {
        let mut config = Config::default();
        config.distributed.connect_timeout_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_shared_memory_divisibility() {
        let config = Config::default();
        assert!(validate_shared_memory_request(0.0, 1.0, &config, 16).is_ok());
        assert_eq!(
            validate_shared_memory_request(0.0, 1.0, &config, 3),
            Err(IntegrationError::IndivisibleWorkload {
                subdivisions: DEFAULT_SUBDIVISIONS,
                workers: 3,
            })
        );
    }
}
