use std::env::VarError;

use thiserror::Error;

/// Errors produced while reading configuration from the process environment.
#[derive(Debug, Error)]
pub enum EnvError {
    /// An environment variable required by the application is not set.
    #[error("Missing environment variable: {0}")]
    Missing(String),

    /// The variable is set but its value isn't valid unicode.
    #[error("Environment variable {0} is not valid unicode")]
    NotUnicode(String),
}

/// Reads an environment variable, returning a structured error if it's missing.
///
/// This is a thin wrapper around `std::env::var` that provides a more
/// ergonomic and specific error type for missing variables.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, EnvError> {
    get_env_var_opt(name)?.ok_or_else(|| EnvError::Missing(name.to_string()))
}

/// Like [`get_env_var`], but an unset (or empty) variable is `Ok(None)`.
pub fn get_env_var_opt(name: &str) -> Result<Option<String>, EnvError> {
    match std::env::var(name) {
        Ok(v) if v.trim().is_empty() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(EnvError::NotUnicode(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // SAFETY (tests): env mutation is serialized with `#[serial]`.
    fn set(name: &str, value: &str) {
        unsafe { std::env::set_var(name, value) }
    }
    fn unset(name: &str) {
        unsafe { std::env::remove_var(name) }
    }

    #[test]
    #[serial]
    fn missing_var_is_structured_error() {
        unset("SHARED_UTILS_TEST_MISSING");
        let err = get_env_var("SHARED_UTILS_TEST_MISSING").unwrap_err();
        assert!(matches!(err, EnvError::Missing(ref n) if n == "SHARED_UTILS_TEST_MISSING"));
        assert!(get_env_var_opt("SHARED_UTILS_TEST_MISSING").unwrap().is_none());
    }

    #[test]
    #[serial]
    fn blank_var_counts_as_unset() {
        set("SHARED_UTILS_TEST_BLANK", "   ");
        assert!(get_env_var_opt("SHARED_UTILS_TEST_BLANK").unwrap().is_none());
        unset("SHARED_UTILS_TEST_BLANK");
    }
}
