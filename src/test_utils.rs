//! Test utilities for PWICE
//!
//! Temporary files, assertion helpers, and ready-made configuration and
//! catalog values shared by the unit tests.

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::Result;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory for testing
///
/// Cleaned up when the returned value is dropped.
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content, returning its path
///
/// # Panics
///
/// Panics if writing the file fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that a result is an error whose message contains `expected`
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = format!("{:#}", e);
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Default configuration with a test credential and a short reply timeout
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.gateway.api_key = Some("test-key".to_string());
    config.chat.reply_timeout_seconds = 5;
    config
}

/// A configuration file exercising every section
pub fn test_config_yaml() -> String {
    r#"
gateway:
  api_base: http://localhost:8089
  model: gemini-2.5-flash
  temperature: 0.7
  top_k: 40
  top_p: 0.9
  request_timeout_seconds: 30
access:
  passcode: "4321"
  passcode_length: 4
  error_display_ms: 500
chat:
  opening_line: "Speak."
  reply_timeout_seconds: 10
  interrupted_notice: "Line dropped."
"#
    .to_string()
}

/// The catalog compiled into the binary
pub fn test_catalog() -> Catalog {
    Catalog::embedded().expect("embedded catalog must parse")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "a.txt", "hello");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }

    #[test]
    fn test_test_config_yaml_is_valid() {
        let config: Config = serde_yaml::from_str(&test_config_yaml()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.access.passcode, "4321");
    }

    #[test]
    fn test_assert_error_contains_matches() {
        let result: Result<()> = Err(crate::error::PwiceError::Config("bad passcode".into()).into());
        assert_error_contains(result, "bad passcode");
    }
}
