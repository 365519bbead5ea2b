use std::path::Path;
use std::str::FromStr;

use crate::config::schema::Config;
use crate::error::ConfigError;

/// Prefix for environment overrides, e.g. `CVPARSE_MAX_ATTEMPTS=5`.
pub const ENV_PREFIX: &str = "CVPARSE_";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Defaults, then the optional JSON file, then `CVPARSE_*` environment variables.
pub fn resolve_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    override_from_env("MAX_CONCURRENT_EXTRACTIONS", &mut config.max_concurrent_extractions)?;
    override_from_env("MAX_FILES_PER_UPLOAD", &mut config.max_files_per_upload)?;
    override_from_env("BULK_PROCESSING_THRESHOLD", &mut config.bulk_processing_threshold)?;
    override_from_env("MAX_MEMORY_MB", &mut config.max_memory_mb)?;
    override_from_env("MAX_CPU_PERCENT", &mut config.max_cpu_percent)?;
    override_from_env("MONITOR_INTERVAL_SECS", &mut config.monitor_interval_secs)?;
    override_from_env("JOB_TIMEOUT_SECS", &mut config.job_timeout_secs)?;
    override_from_env("MAX_ATTEMPTS", &mut config.max_attempts)?;
    override_from_env("POLL_INTERVAL_MS", &mut config.poll_interval_ms)?;
    override_from_env("DEMOTION_BACKOFF_MS", &mut config.demotion_backoff_ms)?;
    override_from_env("JOB_TTL_HOURS", &mut config.job_ttl_hours)?;
    override_from_env("MIN_PDF_TEXT_CHARS", &mut config.min_pdf_text_chars)?;

    let mut queue_size = None;
    override_optional_from_env("MAX_QUEUE_SIZE", &mut queue_size)?;
    if queue_size.is_some() {
        config.max_queue_size = queue_size;
    }

    Ok(())
}

fn override_from_env<T: FromStr>(suffix: &str, target: &mut T) -> Result<(), ConfigError> {
    let mut value = None;
    override_optional_from_env(suffix, &mut value)?;
    if let Some(value) = value {
        *target = value;
    }
    Ok(())
}

fn override_optional_from_env<T: FromStr>(
    suffix: &str,
    target: &mut Option<T>,
) -> Result<(), ConfigError> {
    let name = format!("{}{}", ENV_PREFIX, suffix);
    let Ok(raw) = std::env::var(&name) else {
        return Ok(());
    };

    let parsed = raw
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidEnv {
            name: name.clone(),
            value: raw.clone(),
        })?;
    *target = Some(parsed);
    Ok(())
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.max_concurrent_extractions == 0 {
        return Err(validation("max_concurrent_extractions must be > 0"));
    }

    if config.max_files_per_upload == 0 {
        return Err(validation("max_files_per_upload must be > 0"));
    }

    if config.queue_capacity() == 0 {
        return Err(validation("max_queue_size must be > 0"));
    }

    if config.max_attempts == 0 {
        return Err(validation("max_attempts must be > 0"));
    }

    if !(config.max_cpu_percent > 0.0 && config.max_cpu_percent <= 100.0) {
        return Err(validation(&format!(
            "max_cpu_percent must be in (0, 100], got {}",
            config.max_cpu_percent
        )));
    }

    if config.max_memory_mb == 0 {
        return Err(validation("max_memory_mb must be > 0"));
    }

    if config.monitor_interval_secs == 0 {
        return Err(validation("monitor_interval_secs must be > 0"));
    }

    if config.poll_interval_ms == 0 {
        return Err(validation("poll_interval_ms must be > 0"));
    }

    Ok(())
}

fn validation(message: &str) -> ConfigError {
    ConfigError::Validation {
        message: message.to_string(),
    }
}
