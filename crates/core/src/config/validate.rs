use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Endpoint URLs and required names are non-empty
/// - Polling delays are positive and fit in the wait budget
/// - The directory exclusion prefix is non-empty
/// - The resolution text fits inside the quoted ticketing call parameters
/// - Store table/column names are plain SQL identifiers
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let appliance = &config.appliance;
    require_non_empty("appliance.url", &appliance.url)?;
    require_non_empty("appliance.adom", &appliance.adom)?;
    require_non_empty("appliance.report_name", &appliance.report_name)?;
    for (idx, ds) in appliance.datasets.iter().enumerate() {
        require_non_empty(&format!("appliance.datasets[{idx}].name"), &ds.name)?;
    }

    let polling = &appliance.polling;
    if polling.initial_delay_secs == 0
        || polling.pending_delay_secs == 0
        || polling.running_delay_secs == 0
    {
        return Err(ConfigError::ValidationError(
            "appliance.polling delays must be greater than 0".to_string(),
        ));
    }
    if polling.max_wait_secs < polling.initial_delay_secs {
        return Err(ConfigError::ValidationError(
            "appliance.polling.max_wait_secs cannot be less than initial_delay_secs".to_string(),
        ));
    }

    // Directory validation
    require_non_empty("directory.host", &config.directory.host)?;
    if config.directory.port == 0 {
        return Err(ConfigError::ValidationError(
            "directory.port cannot be 0".to_string(),
        ));
    }
    require_non_empty(
        "directory.exclusion_prefix",
        &config.directory.exclusion_prefix,
    )?;

    if let Some(ticketing) = &config.ticketing {
        require_non_empty("ticketing.base_url", &ticketing.base_url)?;
        require_non_empty("ticketing.access_key", &ticketing.access_key)?;
        require_non_empty("ticketing.resolution_text", &ticketing.resolution_text)?;
        // Sent as '<ticket>','<text>',user
        if ticketing.resolution_text.contains('\'') {
            return Err(ConfigError::ValidationError(
                "ticketing.resolution_text cannot contain a single quote (')".to_string(),
            ));
        }
    }

    let db = &config.database;
    for (field, value) in [
        ("database.table", &db.table),
        ("database.value_column", &db.value_column),
        ("database.processed_column", &db.processed_column),
        ("database.processed_date_column", &db.processed_date_column),
    ] {
        if !is_identifier(value) {
            return Err(ConfigError::ValidationError(format!(
                "{field} must contain only letters, digits and '_', got '{value}'"
            )));
        }
    }

    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{field} cannot be empty"
        )));
    }
    Ok(())
}

fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with(|c: char| c.is_ascii_digit())
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn valid_config() -> Config {
        load_config_from_str(
            r#"
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
bind_user = "svc"
bind_password = "x"

[ticketing]
base_url = "https://sd.local"
access_key = "k"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_empty_url_fails() {
        let mut config = valid_config();
        config.appliance.url = " ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("appliance.url"));
    }

    #[test]
    fn test_validate_zero_delay_fails() {
        let mut config = valid_config();
        config.appliance.polling.running_delay_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_exclusion_prefix_fails() {
        let mut config = valid_config();
        config.directory.exclusion_prefix = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_sql_identifier() {
        let mut config = valid_config();
        config.database.table = "Data; DROP TABLE Data".to_string();
        assert!(validate_config(&config).is_err());

        config.database.table = "Data_2024".to_string();
        assert!(validate_config(&config).is_ok());

        config.database.processed_column = "1st".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_resolution_text_quote_fails() {
        let mut config = valid_config();
        if let Some(t) = config.ticketing.as_mut() {
            t.resolution_text = "Done, see the user's report".to_string();
        }
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("ticketing.resolution_text"));

        if let Some(t) = config.ticketing.as_mut() {
            t.resolution_text = "Done, see the attached report".to_string();
        }
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_access_key_fails() {
        let mut config = valid_config();
        if let Some(t) = config.ticketing.as_mut() {
            t.access_key = String::new();
        }
        assert!(validate_config(&config).is_err());
    }
}
