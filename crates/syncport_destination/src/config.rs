//! Destination selection and secret resolution.

use crate::destination::Destination;
use crate::error::{DestinationError, DestinationResult};
use crate::memory::InMemoryDestination;
use crate::postgres::{PostgresConfig, PostgresDestination};
use crate::rest::{RestConfig, RestDestination};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Environment variable overriding the REST base URL.
pub const CRM_BASE_URL_ENV: &str = "SYNCPORT_CRM_BASE_URL";

/// Where a credential comes from.
///
/// Environment sources are read each time the secret is needed, so a rotated
/// key is picked up without a restart.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Read from this environment variable at call time.
    Env(String),
    /// A fixed value.
    Value(String),
}

impl SecretSource {
    /// Returns the secret.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::Config`] if the variable is unset or empty.
    pub fn resolve(&self) -> DestinationResult<String> {
        match self {
            SecretSource::Env(var) => std::env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| DestinationError::Config(format!("{var} is not set"))),
            SecretSource::Value(value) => Ok(value.clone()),
        }
    }
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::Env(var) => f.debug_tuple("Env").field(var).finish(),
            SecretSource::Value(_) => f.write_str("Value(<redacted>)"),
        }
    }
}

/// Backend kinds a connector can be started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// [`InMemoryDestination`].
    Memory,
    /// [`RestDestination`].
    Rest,
    /// [`PostgresDestination`].
    Postgres,
}

impl BackendKind {
    /// Returns the name used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Rest => "rest",
            BackendKind::Postgres => "postgres",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = DestinationError;

    fn from_str(s: &str) -> DestinationResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "rest" | "crm" => Ok(BackendKind::Rest),
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            other => Err(DestinationError::Config(format!(
                "unknown backend: {other} (expected memory, rest or postgres)"
            ))),
        }
    }
}

/// Which destination to build, with its settings.
#[derive(Debug, Clone)]
pub enum DestinationConfig {
    /// The in-memory sample store.
    Memory,
    /// A REST CRM.
    Rest(RestConfig),
    /// A Postgres database.
    Postgres(PostgresConfig),
}

impl DestinationConfig {
    /// Builds the configuration for `kind` from the environment.
    ///
    /// Only non-secret settings are read here; credentials stay as
    /// [`SecretSource::Env`] and are resolved when used.
    pub fn from_env(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Memory => DestinationConfig::Memory,
            BackendKind::Rest => {
                let mut config = RestConfig::new();
                if let Ok(base_url) = std::env::var(CRM_BASE_URL_ENV) {
                    config = config.with_base_url(base_url);
                }
                DestinationConfig::Rest(config)
            }
            BackendKind::Postgres => DestinationConfig::Postgres(PostgresConfig::new()),
        }
    }

    /// The backend kind.
    pub fn kind(&self) -> BackendKind {
        match self {
            DestinationConfig::Memory => BackendKind::Memory,
            DestinationConfig::Rest(_) => BackendKind::Rest,
            DestinationConfig::Postgres(_) => BackendKind::Postgres,
        }
    }

    /// Builds the destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be constructed.
    pub fn build(self) -> DestinationResult<Arc<dyn Destination>> {
        let destination: Arc<dyn Destination> = match self {
            DestinationConfig::Memory => Arc::new(InMemoryDestination::sample()),
            DestinationConfig::Rest(config) => Arc::new(RestDestination::with_crm_objects(config)?),
            DestinationConfig::Postgres(config) => Arc::new(PostgresDestination::new(config)),
        };
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backend_kind() {
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!("Postgres".parse::<BackendKind>().unwrap(), BackendKind::Postgres);
        assert_eq!("crm".parse::<BackendKind>().unwrap(), BackendKind::Rest);
        assert!("mysql".parse::<BackendKind>().is_err());
    }

    #[test]
    fn fixed_secret_resolves_and_is_redacted() {
        let secret = SecretSource::Value("hunter2".into());
        assert_eq!(secret.resolve().unwrap(), "hunter2");
        assert!(!format!("{secret:?}").contains("hunter2"));
    }

    #[test]
    fn missing_env_secret_is_config_error() {
        let secret = SecretSource::Env("SYNCPORT_TEST_SURELY_UNSET_VARIABLE".into());
        let err = secret.resolve().unwrap_err();
        assert!(matches!(err, DestinationError::Config(_)));
        assert!(err.to_string().contains("SYNCPORT_TEST_SURELY_UNSET_VARIABLE"));
    }

    #[test]
    fn build_each_kind() {
        for kind in [BackendKind::Memory, BackendKind::Postgres] {
            let destination = DestinationConfig::from_env(kind).build().unwrap();
            assert_eq!(destination.kind(), kind.as_str());
        }
        let rest = DestinationConfig::Rest(RestConfig::new()).build().unwrap();
        assert_eq!(rest.kind(), "rest");
    }
}
