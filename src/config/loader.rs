//! Configuration Loader
//!
//! Environment-aware configuration loading: YAML file discovery, environment
//! detection, environment-section merging, and env-var overrides.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yaml::Value as YamlValue;
use tracing::debug;

use super::{ConfigError, ReviewFlowConfig};

const CONFIG_FILE_NAMES: [&str; 2] = ["reviewflow-config.yaml", "reviewflow-config.yml"];
const ENVIRONMENT_SECTIONS: [&str; 3] = ["development", "test", "production"];

/// Loaded configuration plus the environment it was resolved for.
pub struct ConfigManager {
    config: ReviewFlowConfig,
    environment: String,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection.
    ///
    /// Looks for `reviewflow-config.yaml` in `./config`; absent files are not
    /// an error, the defaults plus env-var overrides apply instead.
    pub fn load() -> Result<Arc<ConfigManager>, ConfigError> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory.
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> Result<Arc<ConfigManager>, ConfigError> {
        let environment = Self::detect_environment();
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        let config = match Self::find_config_file(&config_directory) {
            Some(path) => Self::load_file(&path, &environment)?,
            None => {
                debug!(
                    directory = %config_directory.display(),
                    "No configuration file found, using defaults"
                );
                ReviewFlowConfig::default()
            }
        };

        Self::finish(config, environment)
    }

    /// Load configuration from an explicit file path.
    ///
    /// Unlike directory discovery, a missing explicit path is an error.
    pub fn load_from_file(path: &Path) -> Result<Arc<ConfigManager>, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let environment = Self::detect_environment();
        let config = Self::load_file(path, &environment)?;
        Self::finish(config, environment)
    }

    fn finish(
        mut config: ReviewFlowConfig,
        environment: String,
    ) -> Result<Arc<ConfigManager>, ConfigError> {
        config.apply_env_overrides();
        config.validate()?;

        debug!(environment = %environment, "Configuration loaded successfully");
        Ok(Arc::new(ConfigManager {
            config,
            environment,
        }))
    }

    /// Detect the runtime environment from environment variables.
    pub fn detect_environment() -> String {
        env::var("REVIEWFLOW_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    pub fn config(&self) -> &ReviewFlowConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    fn find_config_file(config_directory: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| config_directory.join(name))
            .find(|candidate| candidate.exists())
    }

    /// Parse a YAML file and merge its environment-specific section, if any,
    /// over the base values.
    fn load_file(path: &Path, environment: &str) -> Result<ReviewFlowConfig, ConfigError> {
        let yaml_content = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidYaml {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut yaml_data: YamlValue =
            serde_yaml::from_str(&yaml_content).map_err(|e| ConfigError::InvalidYaml {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        if let Some(env_overrides) = yaml_data.get(environment).cloned() {
            debug!(environment = %environment, "Applying environment-specific overrides");
            Self::merge_yaml_values(&mut yaml_data, env_overrides);
        }

        // Remove environment sections so they do not land in unknown fields
        if let YamlValue::Mapping(ref mut map) = yaml_data {
            for section in ENVIRONMENT_SECTIONS {
                map.remove(YamlValue::String(section.to_string()));
            }
        }

        serde_yaml::from_value(yaml_data).map_err(|e| ConfigError::InvalidYaml {
            path: path.display().to_string(),
            message: format!("Failed to deserialize configuration: {e}"),
        })
    }

    /// Recursively merge override values into the base mapping.
    fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) {
        match (base, override_value) {
            (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
                for (key, value) in override_map {
                    match base_map.get_mut(&key) {
                        Some(existing) => Self::merge_yaml_values(existing, value),
                        None => {
                            base_map.insert(key, value);
                        }
                    }
                }
            }
            (base_slot, override_value) => *base_slot = override_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("reviewflow-config.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_missing_directory_falls_back_to_defaults() {
        let manager =
            ConfigManager::load_from_directory(Some(PathBuf::from("/nonexistent/config/dir")))
                .unwrap();
        assert_eq!(manager.config().pipeline.batch_size, 100);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = ConfigManager::load_from_file(Path::new("/nonexistent/reviewflow.yaml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loads_yaml_with_environment_section_merge() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            "pipeline:\n  batch_size: 50\ndevelopment:\n  pipeline:\n    batch_size: 10\n",
        );

        let manager = ConfigManager::load_from_directory(Some(dir.path().to_path_buf())).unwrap();
        // Default environment is development, so the section override wins
        assert_eq!(manager.config().pipeline.batch_size, 10);
    }

    #[test]
    fn test_invalid_yaml_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "pipeline: [not, a, mapping\n");

        let result = ConfigManager::load_from_directory(Some(dir.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::InvalidYaml { .. })));
    }
}
