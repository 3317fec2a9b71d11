//! Connection settings for the Odoo proxy.

use std::env;
use std::fmt;

use crate::error::ConfigError;

/// Environment variable holding the proxy endpoint root.
pub const ENDPOINT_ENV: &str = "ODOO_RELAY_ENDPOINT";
/// Environment variable holding the proxy API key.
pub const API_KEY_ENV: &str = "ODOO_RELAY_API_KEY";

/// Validated, immutable proxy connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    endpoint_root: String,
    credential: String,
}

impl ConnectionSettings {
    /// Validates both values, trims whitespace around the endpoint and strips
    /// one trailing slash from it.
    pub fn new(
        endpoint_root: impl Into<String>,
        credential: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let endpoint_root = endpoint_root.into();
        let credential = credential.into();

        let endpoint_root = endpoint_root.trim();
        if endpoint_root.is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        if credential.is_empty() {
            return Err(ConfigError::EmptyCredential);
        }

        let endpoint_root = endpoint_root
            .strip_suffix('/')
            .unwrap_or(endpoint_root)
            .to_string();

        Ok(Self {
            endpoint_root,
            credential,
        })
    }

    /// Reads [`ENDPOINT_ENV`] and [`API_KEY_ENV`] from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| env::var(key))
    }

    /// Like [`from_env`](Self::from_env) with an explicit variable lookup.
    /// Unset variables are treated as empty.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let endpoint = lookup(ENDPOINT_ENV).unwrap_or_default();
        let credential = lookup(API_KEY_ENV).unwrap_or_default();
        Self::new(endpoint, credential)
    }

    pub fn endpoint_root(&self) -> &str {
        &self.endpoint_root
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// Credential with everything but its edges hidden, for logs.
    pub fn masked_credential(&self) -> String {
        mask(&self.credential)
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("endpoint_root", &self.endpoint_root)
            .field("credential", &self.masked_credential())
            .finish()
    }
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}*********{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_strips_one_trailing_slash() {
        let settings = ConnectionSettings::new("http://h/", "key").unwrap();
        assert_eq!(settings.endpoint_root(), "http://h");

        let settings = ConnectionSettings::new("http://h//", "key").unwrap();
        assert_eq!(settings.endpoint_root(), "http://h/");
    }

    #[test]
    fn test_new_trims_surrounding_whitespace() {
        let settings = ConnectionSettings::new("http://h/ ", "key").unwrap();
        assert_eq!(settings.endpoint_root(), "http://h");

        let settings = ConnectionSettings::new("  http://h\n", "key").unwrap();
        assert_eq!(settings.endpoint_root(), "http://h");
    }

    #[test]
    fn test_new_keeps_endpoint_without_slash() {
        let settings = ConnectionSettings::new("http://h", "key").unwrap();
        assert_eq!(settings.endpoint_root(), "http://h");
        assert_eq!(settings.credential(), "key");
    }

    #[test]
    fn test_new_rejects_empty_values() {
        assert_eq!(
            ConnectionSettings::new("", "key"),
            Err(ConfigError::EmptyEndpoint)
        );
        assert_eq!(
            ConnectionSettings::new("   ", "key"),
            Err(ConfigError::EmptyEndpoint)
        );
        assert_eq!(
            ConnectionSettings::new("http://h", ""),
            Err(ConfigError::EmptyCredential)
        );
    }

    #[test]
    fn test_from_env_with() {
        let settings = ConnectionSettings::from_env_with(|key| match key {
            ENDPOINT_ENV => Ok("https://proxy.example.com/".to_string()),
            API_KEY_ENV => Ok("abc".to_string()),
            _ => Err(env::VarError::NotPresent),
        })
        .unwrap();

        assert_eq!(settings.endpoint_root(), "https://proxy.example.com");
        assert_eq!(settings.credential(), "abc");
    }

    #[test]
    fn test_from_env_with_missing_key() {
        let result = ConnectionSettings::from_env_with(|key| match key {
            ENDPOINT_ENV => Ok("https://proxy.example.com".to_string()),
            _ => Err(env::VarError::NotPresent),
        });
        assert_eq!(result, Err(ConfigError::EmptyCredential));
    }

    #[test]
    fn test_debug_masks_credential() {
        let settings = ConnectionSettings::new("http://h", "supersecretkey99").unwrap();
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("supersecretkey99"));
        assert!(debug.contains("supe*********99"));

        let short = ConnectionSettings::new("http://h", "abc").unwrap();
        assert_eq!(short.masked_credential(), "***");
    }
}
