//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `RouterBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("relay.toml")).unwrap();
//! println!("Repository: {}", blueprint.repository.base_url);
//! ```

mod parser;
mod validator;

pub use contracts::RouterBlueprint;
pub use parser::ConfigFormat;
pub use validator::warnings;

use contracts::RouterError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<RouterBlueprint, RouterError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RouterBlueprint, RouterError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate a blueprint built or modified in code (e.g. after CLI overrides)
    pub fn validate(blueprint: &RouterBlueprint) -> Result<(), RouterError> {
        validator::validate(blueprint)
    }

    /// Serialize RouterBlueprint to TOML string
    pub fn to_toml(blueprint: &RouterBlueprint) -> Result<String, RouterError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| RouterError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize RouterBlueprint to JSON string
    pub fn to_json(blueprint: &RouterBlueprint) -> Result<String, RouterError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| RouterError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, RouterError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            RouterError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            RouterError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, RouterError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RouterBlueprint, RouterError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::RouteId;

    const FULL_TOML: &str = r#"
[repository]
base_url = "http://localhost:8080/rest"

[defaults]
max_redeliveries = 5
excluded_containers = ["/audit"]

[indexing]
indexing_is_unconditional = true

[[indexing.destinations]]
name = "update-index"
sink_type = "log"

[[indexing.destinations]]
name = "delete-index"
sink_type = "log"

[forwarding]
http_base_url = "http://consumer.example/events"
http_auth_username = "fedoraAdmin"
http_auth_password = "secret"

[serialization]
enabled = false

[fixity]
fixity_delay_ms = 0
concurrent_consumers = 2

[[fixity.destinations]]
name = "fixity-success"
sink_type = "log"

[[fixity.destinations]]
name = "fixity-failure"
sink_type = "file"
params = { base_path = "/var/log/relay/fixity" }
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(FULL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(
            bp.enabled_routes(),
            vec![RouteId::Indexing, RouteId::Forwarding, RouteId::Fixity]
        );
        assert_eq!(
            bp.effective_settings(RouteId::Fixity)
                .unwrap()
                .concurrent_consumers,
            2
        );
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(FULL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.repository.base_url, bp2.repository.base_url);
        assert_eq!(bp.enabled_routes(), bp2.enabled_routes());
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(FULL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp.defaults.max_redeliveries, bp2.defaults.max_redeliveries);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[repository]
base_url = "http://localhost:8080/rest"

[indexing]

[[indexing.destinations]]
name = "update-index"
sink_type = "log"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("delete-index"));
    }
}
