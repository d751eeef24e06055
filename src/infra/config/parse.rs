use crate::domain::model::LogFormat;

use super::ConfigError;

pub(crate) fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid(format!(
            "invalid {var} '{other}', expected true|false"
        ))),
    }
}

pub(crate) fn parse_port(var: &str, raw: &str) -> Result<u16, ConfigError> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(ConfigError::Invalid(format!(
            "invalid {var} '{}', expected a port between 1 and 65535",
            raw.trim()
        ))),
        Ok(p) => Ok(p),
    }
}

/// Unsigned integer with a lower bound.
pub(crate) fn parse_at_least<T>(var: &str, raw: &str, min: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
{
    let value = raw.trim().parse::<T>().map_err(|_| {
        ConfigError::Invalid(format!(
            "invalid {var} '{}', expected a non-negative integer",
            raw.trim()
        ))
    })?;
    if value < min {
        return Err(ConfigError::Invalid(format!(
            "{var} must be at least {min}, got {value}"
        )));
    }
    Ok(value)
}

pub(crate) fn parse_log_format(var: &str, raw: &str) -> Result<LogFormat, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "text" | "" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(ConfigError::Invalid(format!(
            "invalid {var} '{other}', expected 'text' or 'json'"
        ))),
    }
}
