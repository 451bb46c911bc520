use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variable prefix for overrides (`FAZREPORT_APPLIANCE__PASSWORD=...`)
pub const ENV_PREFIX: &str = "FAZREPORT_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID: &str = r#"
[appliance]
url = "https://faz.local/jsonrpc"
user = "api"
password = "secret"
adom = "root"
device = "All_FortiGates"
report_name = "User Activity"

[directory]
host = "dc01.corp.local"
base_dn = "DC=corp,DC=local"
bind_user = "svc-reports@corp.local"
bind_password = "hunter2"
"#;

    #[test]
    fn test_load_config_from_str_valid() {
        let config = load_config_from_str(VALID).unwrap();
        assert_eq!(config.appliance.adom, "root");
        assert_eq!(config.directory.host, "dc01.corp.local");
    }

    #[test]
    fn test_load_config_from_str_missing_appliance() {
        let toml = r#"
[directory]
host = "dc01.corp.local"
base_dn = "DC=corp,DC=local"
bind_user = "svc"
bind_password = "x"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"{VALID}
[output]
results_dir = "/srv/reports"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.output.results_dir.to_str(), Some("/srv/reports"));
        assert_eq!(config.appliance.report_name, "User Activity");
    }
}
