//! Environment variable helpers

use std::str::FromStr;
use thiserror::Error;

/// An environment variable was set but could not be parsed
#[derive(Debug, Error)]
#[error("Invalid value '{value}' for {name}: {reason}")]
pub struct EnvError {
    pub name: String,
    pub value: String,
    pub reason: String,
}

/// Read a variable, treating unset and blank values alike
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read and parse a variable
///
/// Returns `Ok(None)` when the variable is unset or blank.
pub fn env_parse<T>(name: &str) -> Result<Option<T>, EnvError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        None => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(|e| EnvError {
            name: name.to_string(),
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_variable_is_none() {
        assert!(env_var("STARTUP_EVAL_TEST_SURELY_UNSET").is_none());
        let parsed: Option<u64> = env_parse("STARTUP_EVAL_TEST_SURELY_UNSET").unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_error_names_variable() {
        let err = EnvError {
            name: "STARTUP_EVAL_X".into(),
            value: "abc".into(),
            reason: "invalid digit".into(),
        };
        assert!(err.to_string().contains("STARTUP_EVAL_X"));
    }
}
