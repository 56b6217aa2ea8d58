//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use axum::http::HeaderValue;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default listening port
pub const DEFAULT_PORT: u16 = 3000;

/// Default listening host (all interfaces)
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Allowed cross-origin value for HTTP and WebSocket clients
    pub cors_origin: CorsOrigin,
    /// Shared secret required from every connection (None = no auth)
    pub auth_token: Option<String>,
    /// Prometheus exporter address (None = exporter disabled)
    pub metrics_bind: Option<SocketAddr>,
}

/// Allowed cross-origin value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigin {
    /// `*`: any origin, without credentials
    Any,
    /// A single origin, with credentials
    Exact(HeaderValue),
}

impl CorsOrigin {
    /// Whether browsers may send credentials to this origin
    pub fn allows_credentials(&self) -> bool {
        matches!(self, CorsOrigin::Exact(_))
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but invalid
    pub fn from_env(bind_override: Option<SocketAddr>) -> Result<Self, ConfigError> {
        Self::from_source(bind_override, |key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_source<F>(bind_override: Option<SocketAddr>, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = match bind_override {
            Some(bind) => bind,
            None => {
                let host: IpAddr = parse_var(&var, "HOST")?.unwrap_or(DEFAULT_HOST);
                let port: u16 = parse_var(&var, "PORT")?.unwrap_or(DEFAULT_PORT);
                SocketAddr::new(host, port)
            }
        };

        let cors_origin = match non_empty(&var, "CORS_ORIGIN") {
            None => CorsOrigin::Any,
            Some(origin) if origin == "*" => CorsOrigin::Any,
            Some(origin) => {
                let value = HeaderValue::from_str(&origin).map_err(|_| ConfigError::Invalid {
                    var: "CORS_ORIGIN".to_string(),
                    reason: format!("{origin:?} is not a valid header value"),
                })?;
                CorsOrigin::Exact(value)
            }
        };

        // An empty token disables auth rather than requiring an empty secret
        let auth_token = non_empty(&var, "AUTH_TOKEN");

        let metrics_bind = parse_var(&var, "METRICS_BIND")?;

        Ok(ServerConfig {
            bind,
            cors_origin,
            auth_token,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server bind address ({})", self.bind),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn non_empty<F>(var: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Helper to parse an optional variable, rejecting unparseable values
fn parse_var<F, T>(var: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    non_empty(var, key)
        .map(|value| {
            value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("{value:?}: {e}"),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_source(None, |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.bind, SocketAddr::new(DEFAULT_HOST, DEFAULT_PORT));
        assert_eq!(config.cors_origin, CorsOrigin::Any);
        assert!(!config.cors_origin.allows_credentials());
        assert!(config.auth_token.is_none());
        assert!(config.metrics_bind.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_port_and_host() {
        let config = load(&[("HOST", "127.0.0.1"), ("PORT", "8080")]).unwrap();
        assert_eq!(config.bind, "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_bind_override_wins() {
        let config = ServerConfig::from_source(Some("10.0.0.1:9000".parse().unwrap()), |key| {
            (key == "PORT").then(|| "1234".to_string())
        })
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
    }

    #[test]
    fn test_exact_cors_origin_allows_credentials() {
        let config = load(&[("CORS_ORIGIN", "https://lights.example.com")]).unwrap();
        assert_eq!(
            config.cors_origin,
            CorsOrigin::Exact(HeaderValue::from_static("https://lights.example.com"))
        );
        assert!(config.cors_origin.allows_credentials());

        let config = load(&[("CORS_ORIGIN", "*")]).unwrap();
        assert_eq!(config.cors_origin, CorsOrigin::Any);
    }

    #[test]
    fn test_empty_auth_token_disables_auth() {
        let config = load(&[("AUTH_TOKEN", "")]).unwrap();
        assert!(config.auth_token.is_none());

        let config = load(&[("AUTH_TOKEN", "s3cret")]).unwrap();
        assert_eq!(config.auth_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_metrics_bind_must_differ() {
        let config = load(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "3000"),
            ("METRICS_BIND", "127.0.0.1:3000"),
        ])
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
