//! Command implementations.

mod info;
mod reindex;
mod run;
mod validate;

use std::path::Path;

use contracts::RouterBlueprint;
use tracing::info;

use crate::error::CliError;

pub use info::run_info;
pub use reindex::run_reindex;
pub use run::run_router;
pub use validate::run_validate;

/// Load, apply the base-URL override, and re-validate
fn load_blueprint(path: &Path, repository_url: Option<&str>) -> Result<RouterBlueprint, CliError> {
    if !path.exists() {
        return Err(CliError::config_not_found(path));
    }

    let mut blueprint =
        config_loader::ConfigLoader::load_from_path(path).map_err(|e| CliError::config(path, e))?;

    if let Some(url) = repository_url {
        info!(url = %url, "Overriding repository base URL from CLI");
        blueprint.repository.base_url = url.to_string();
        config_loader::ConfigLoader::validate(&blueprint).map_err(|e| CliError::config(path, e))?;
    }
    Ok(blueprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"
[repository]
base_url = "http://localhost:8080/rest"

[forwarding]
http_base_url = "http://localhost:9999/events"
"#;

    fn config_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file() {
        let err = load_blueprint(Path::new("/nonexistent/relay.toml"), None).unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_override_is_revalidated() {
        let file = config_file();
        let blueprint = load_blueprint(file.path(), Some("https://repo.example/rest")).unwrap();
        assert_eq!(blueprint.repository.base_url, "https://repo.example/rest");

        let err = load_blueprint(file.path(), Some("ftp://repo")).unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }
}
