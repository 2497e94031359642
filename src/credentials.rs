//! Credential providers.
//!
//! A connection asks its configured provider for an access key / secret key
//! pair exactly once per open; nothing is cached across handles. Providers
//! are selected by identifier from the connection configuration:
//!
//! - `env`: `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`, or
//!   `<PREFIX>_ACCESS_KEY_ID` / `<PREFIX>_SECRET_ACCESS_KEY` when the provider
//!   arguments name a prefix.
//! - `properties-file`: a Java-style properties file whose path is given as
//!   the provider arguments.
//! - `static`: `ACCESS_KEY:SECRET_KEY` given inline as the provider arguments.

use crate::error::{ProbeError, Result};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Provider identifier for environment-variable credentials.
pub const ENV_PROVIDER: &str = "env";

/// Provider identifier for properties-file credentials.
pub const PROPERTIES_FILE_PROVIDER: &str = "properties-file";

/// Provider identifier for inline credentials.
pub const STATIC_PROVIDER: &str = "static";

/// Access key / secret key pair handed to a driver.
pub struct Credentials {
    access_key: String,
    secret_key: SecretString,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: SecretString::from(secret_key.into()),
        }
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn secret_key(&self) -> &SecretString {
        &self.secret_key
    }
}

impl Clone for Credentials {
    fn clone(&self) -> Self {
        Self::new(self.access_key.clone(), self.secret_key.expose_secret())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Capability that produces credentials for a connection.
pub trait CredentialProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Resolves credentials. Called once per connection open.
    fn resolve(&self) -> Result<Credentials>;
}

/// Creates the credential provider named by `id`, configured with `args`.
pub fn provider_for(id: &str, args: &str) -> Result<Box<dyn CredentialProvider>> {
    match id {
        ENV_PROVIDER => Ok(Box::new(EnvironmentProvider::new(args))),
        PROPERTIES_FILE_PROVIDER => {
            if args.trim().is_empty() {
                return Err(ProbeError::credential(
                    "properties-file provider requires a file path argument",
                ));
            }
            Ok(Box::new(PropertiesFileProvider::new(args.trim())))
        }
        STATIC_PROVIDER => Ok(Box::new(StaticProvider::parse(args)?)),
        other => Err(ProbeError::credential(format!(
            "Unknown credential provider '{other}'. Expected: {ENV_PROVIDER}, {PROPERTIES_FILE_PROVIDER}, or {STATIC_PROVIDER}"
        ))),
    }
}

/// Reads credentials from environment variables.
#[derive(Debug, Clone)]
pub struct EnvironmentProvider {
    prefix: String,
}

impl EnvironmentProvider {
    /// Uses `<prefix>_ACCESS_KEY_ID` / `<prefix>_SECRET_ACCESS_KEY`; an empty
    /// prefix means `AWS`.
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim().trim_end_matches('_');
        Self {
            prefix: if prefix.is_empty() {
                "AWS".to_string()
            } else {
                prefix.to_uppercase()
            },
        }
    }

    fn access_var(&self) -> String {
        format!("{}_ACCESS_KEY_ID", self.prefix)
    }

    fn secret_var(&self) -> String {
        format!("{}_SECRET_ACCESS_KEY", self.prefix)
    }
}

impl CredentialProvider for EnvironmentProvider {
    fn name(&self) -> &str {
        ENV_PROVIDER
    }

    fn resolve(&self) -> Result<Credentials> {
        let read = |var: String| {
            std::env::var(&var)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ProbeError::credential(format!("{var} is not set")))
        };
        Ok(Credentials::new(
            read(self.access_var())?,
            read(self.secret_var())?,
        ))
    }
}

/// Reads credentials from a Java-style properties file.
///
/// Recognized keys: `accessKey` / `secretKey`, or `aws_access_key_id` /
/// `aws_secret_access_key`. Lines starting with `#` or `!` are comments;
/// keys and values are separated by `=` or `:`.
#[derive(Debug, Clone)]
pub struct PropertiesFileProvider {
    path: PathBuf,
}

impl PropertiesFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(content: &str) -> HashMap<String, String> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
            .filter_map(|line| {
                let split = line.find(|c: char| c == '=' || c == ':')?;
                let (key, value) = line.split_at(split);
                Some((key.trim().to_string(), value[1..].trim().to_string()))
            })
            .collect()
    }
}

impl CredentialProvider for PropertiesFileProvider {
    fn name(&self) -> &str {
        PROPERTIES_FILE_PROVIDER
    }

    fn resolve(&self) -> Result<Credentials> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            ProbeError::credential(format!(
                "Cannot read credentials file {}: {e}",
                self.path.display()
            ))
        })?;
        let props = Self::parse(&content);

        let lookup = |keys: [&str; 2]| {
            keys.iter()
                .find_map(|k| props.get(*k))
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| {
                    ProbeError::credential(format!(
                        "{} is missing '{}'",
                        self.path.display(),
                        keys[0]
                    ))
                })
        };

        Ok(Credentials::new(
            lookup(["accessKey", "aws_access_key_id"])?,
            lookup(["secretKey", "aws_secret_access_key"])?,
        ))
    }
}

/// Inline credentials, mostly for local engines and tests.
#[derive(Clone)]
pub struct StaticProvider {
    credentials: Credentials,
}

impl StaticProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Parses `ACCESS_KEY:SECRET_KEY`.
    pub fn parse(args: &str) -> Result<Self> {
        match args.split_once(':') {
            Some((access, secret)) if !access.is_empty() && !secret.is_empty() => {
                Ok(Self::new(Credentials::new(access, secret)))
            }
            _ => Err(ProbeError::credential(
                "static provider expects arguments of the form ACCESS_KEY:SECRET_KEY",
            )),
        }
    }
}

impl CredentialProvider for StaticProvider {
    fn name(&self) -> &str {
        STATIC_PROVIDER
    }

    fn resolve(&self) -> Result<Credentials> {
        Ok(self.credentials.clone())
    }
}
