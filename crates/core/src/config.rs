//! Helpers shared by the services' `*Config::from_lookup` loaders.

use std::str::FromStr;

use crate::error::CoreError;

/// Split a comma-separated variable, dropping blank entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `raw` as the value of `key`, naming the variable on failure.
pub fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T, CoreError> {
    raw.trim()
        .parse()
        .map_err(|_| CoreError::Config(format!("{key} has an invalid value: '{raw}'")))
}
