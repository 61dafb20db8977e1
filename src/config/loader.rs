//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::TablesnapConfig;
use crate::domain::errors::BackupError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into TablesnapConfig
/// 4. Applies environment variable overrides (TABLESNAP_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
pub fn load_config(path: impl AsRef<Path>) -> Result<TablesnapConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(BackupError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        BackupError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    // Perform environment variable substitution
    let contents = substitute_env_vars(&contents)?;

    // Parse TOML
    let mut config: TablesnapConfig = toml::from_str(&contents)
        .map_err(|e| BackupError::Configuration(format!("Failed to parse TOML: {e}")))?;

    // Apply environment variable overrides
    apply_env_overrides(&mut config);

    // Validate configuration
    config
        .validate()
        .map_err(|e| BackupError::Configuration(format!("Configuration validation failed: {e}")))?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    // Process line by line to skip comments
    for line in input.lines() {
        let trimmed = line.trim_start();

        // Skip comment lines - don't process env vars in comments
        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(BackupError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using TABLESNAP_* prefix
///
/// Environment variables follow the pattern: TABLESNAP_<SECTION>_<KEY>
/// For example: TABLESNAP_SCAN_SOURCE_PROJECTS, TABLESNAP_PUBSUB_TOPIC_ID
fn apply_env_overrides(config: &mut TablesnapConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("TABLESNAP_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Scan overrides; source projects are comma-separated
    if let Ok(val) = std::env::var("TABLESNAP_SCAN_SOURCE_PROJECTS") {
        config.scan.source_projects = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Ok(val) = std::env::var("TABLESNAP_SCAN_REGION") {
        config.scan.region = val;
    }
    if let Ok(val) = std::env::var("TABLESNAP_SCAN_MAX_IN_FLIGHT_MESSAGES") {
        if let Ok(limit) = val.parse() {
            config.scan.max_in_flight_messages = limit;
        }
    }
    if let Ok(val) = std::env::var("TABLESNAP_SCAN_MAX_IN_FLIGHT_BYTES") {
        if let Ok(limit) = val.parse() {
            config.scan.max_in_flight_bytes = limit;
        }
    }
    if let Ok(val) = std::env::var("TABLESNAP_SCAN_DRAIN_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.parse() {
            config.scan.drain_timeout_seconds = Some(timeout);
        }
    }

    // Backup overrides
    if let Ok(val) = std::env::var("TABLESNAP_BACKUP_PROJECT_ID") {
        config.backup.project_id = val;
    }
    if let Ok(val) = std::env::var("TABLESNAP_BACKUP_LOCATION") {
        config.backup.location = val;
    }

    // Pub/Sub overrides
    if let Ok(val) = std::env::var("TABLESNAP_PUBSUB_PROJECT_ID") {
        config.pubsub.project_id = val;
    }
    if let Ok(val) = std::env::var("TABLESNAP_PUBSUB_TOPIC_ID") {
        config.pubsub.topic_id = val;
    }
    if let Ok(val) = std::env::var("TABLESNAP_PUBSUB_ENDPOINT") {
        config.pubsub.endpoint = Some(val);
    }

    // BigQuery overrides
    if let Ok(val) = std::env::var("TABLESNAP_BIGQUERY_ENDPOINT") {
        config.bigquery.endpoint = Some(val);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("TABLESNAP_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("TABLESNAP_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
