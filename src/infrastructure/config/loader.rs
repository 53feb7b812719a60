use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use super::Config;
use crate::infrastructure::logging::LogFormat;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_agents: {0}. Must be between 1 and 100")]
    InvalidMaxAgents(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid budget threshold ordering: caution ({0}) < warning ({1}) < critical ({2}) must hold")]
    InvalidBudgetThresholds(f64, f64, f64),

    #[error("Invalid vcs command_timeout_secs: {0}. Must be positive")]
    InvalidVcsTimeout(u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("failed to extract configuration: {0}")]
    Extract(#[from] figment::Error),
}

type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .forge/config.yaml (project config)
    /// 3. .forge/local.yaml (project local overrides, optional)
    /// 4. Environment variables (FORGE_* prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.forge/) so multiple
    /// engine runs on one machine can carry independent project state.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".forge/config.yaml"))
            .merge(Yaml::file(".forge/local.yaml"))
            .merge(Env::prefixed("FORGE_").split("__"))
            .extract()?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<()> {
        if config.max_agents == 0 || config.max_agents > 100 {
            return Err(ConfigError::InvalidMaxAgents(config.max_agents));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let budget = &config.budget;
        if !(budget.caution_threshold_pct < budget.warning_threshold_pct
            && budget.warning_threshold_pct < budget.critical_threshold_pct)
        {
            return Err(ConfigError::InvalidBudgetThresholds(
                budget.caution_threshold_pct,
                budget.warning_threshold_pct,
                budget.critical_threshold_pct,
            ));
        }

        if config.vcs.command_timeout_secs == 0 {
            return Err(ConfigError::InvalidVcsTimeout(config.vcs.command_timeout_secs));
        }

        if let Some(command) = &config.vcs.test_command {
            if command.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "vcs.test_command cannot be a blank string; omit it instead".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::{BudgetConfig, DatabaseConfig, VcsConfig};
    use crate::infrastructure::logging::LogConfig;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_agents, 8);
        assert_eq!(config.database.path, ".forge/forge.db");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
max_agents: 20
database:
  path: /custom/path.db
  max_connections: 5
logging:
  level: debug
  format: pretty
  retention_days: 7
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.max_agents, 20);
        assert_eq!(config.database.path, "/custom/path.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.level, "debug");
        assert!(matches!(config.logging.format, LogFormat::Pretty));
        assert_eq!(config.logging.retention_days, 7);

        ConfigLoader::validate(&config).expect("parsed config should be valid");
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config {
            max_agents: 10,
            max_worktrees: 4,
            database: DatabaseConfig { path: ".forge/forge.db".to_string(), max_connections: 10 },
            logging: LogConfig::default(),
            budget: BudgetConfig::default(),
            vcs: VcsConfig::default(),
        };
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_agents() {
        let config = Config { max_agents: 0, ..Default::default() };
        let result = ConfigLoader::validate(&config);
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidMaxAgents(0)));
    }

    #[test]
    fn test_validate_too_many_agents() {
        let config = Config { max_agents: 101, ..Default::default() };
        let result = ConfigLoader::validate(&config);
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidMaxAgents(101)));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();
        let result = ConfigLoader::validate(&config);
        match result.unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("expected InvalidLogLevel, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_empty_database_path() {
        let mut config = Config::default();
        config.database.path = String::new();
        let result = ConfigLoader::validate(&config);
        assert!(matches!(result.unwrap_err(), ConfigError::EmptyDatabasePath));
    }

    #[test]
    fn test_validate_zero_max_connections() {
        let mut config = Config::default();
        config.database.max_connections = 0;
        let result = ConfigLoader::validate(&config);
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidMaxConnections(0)));
    }

    #[test]
    fn test_validate_out_of_order_budget_thresholds() {
        let mut config = Config::default();
        config.budget.warning_threshold_pct = 0.5;
        config.budget.caution_threshold_pct = 0.6;
        let result = ConfigLoader::validate(&config);
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidBudgetThresholds(..)));
    }

    #[test]
    fn test_validate_blank_test_command_rejected() {
        let mut config = Config::default();
        config.vcs.test_command = Some("   ".to_string());
        let result = ConfigLoader::validate(&config);
        assert!(matches!(result.unwrap_err(), ConfigError::ValidationFailed(_)));
    }

    #[test]
    #[allow(unsafe_code)]
    fn test_env_override() {
        unsafe {
            env::set_var("FORGE_MAX_AGENTS", "25");
            env::set_var("FORGE_LOGGING__LEVEL", "debug");
        }

        assert_eq!(env::var("FORGE_MAX_AGENTS").unwrap(), "25");
        assert_eq!(env::var("FORGE_LOGGING__LEVEL").unwrap(), "debug");

        unsafe {
            env::remove_var("FORGE_MAX_AGENTS");
            env::remove_var("FORGE_LOGGING__LEVEL");
        }
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(base_file, "max_agents: 5\nlogging:\n  level: info\n  format: json").unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "max_agents: 15\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.max_agents, 15, "override should win");
        assert_eq!(config.logging.level, "debug", "override should win for nested fields");
        assert!(matches!(config.logging.format, LogFormat::Json), "base value should persist when not overridden");
    }
}
