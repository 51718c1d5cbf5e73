use tracing_subscriber::EnvFilter;

use super::schema::Config;

/// Validate configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Some(attempts) = config.rank_pass_attempts {
        if attempts == 0 {
            errors.push("rank_pass_attempts: must be at least 1".to_string());
        }
    }

    if let Some(ref path) = config.store_path {
        if path.trim().is_empty() {
            errors.push("store_path: must not be empty".to_string());
        }
    }

    if let Some(ref level) = config.log_level {
        if let Err(e) = EnvFilter::try_new(level) {
            errors.push(format!("log_level: invalid filter '{}' - {}", level, e));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = Config {
            rank_pass_attempts: Some(3),
            store_path: Some("/tmp/rankings.json".to_string()),
            log_level: Some("dance_rank=debug".to_string()),
            ..Config::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_attempts() {
        let config = Config {
            rank_pass_attempts: Some(0),
            ..Config::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].contains("rank_pass_attempts"));
    }

    #[test]
    fn test_reports_all_errors() {
        let config = Config {
            rank_pass_attempts: Some(0),
            store_path: Some("  ".to_string()),
            log_level: Some("dance_rank=loudest".to_string()),
            ..Config::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[1].contains("store_path"));
        assert!(errors[2].contains("log_level"));
    }
}
