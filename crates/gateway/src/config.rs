//! Gateway configuration loaded from environment variables.

use std::time::Duration;

/// Gateway configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `8000`)
/// - `AUTH_SERVICE_URL` — auth collaborator base URL
/// - `ORDERS_SERVICE_URL` — order store base URL
/// - `INVOICE_FUNCTION_URL` — invoice compute function URL
/// - `VERIFY_TIMEOUT_SECS` — token verification deadline (default: 5)
/// - `UPSTREAM_TIMEOUT_SECS` — backend forwarding deadline (default: 30)
/// - `INVOICE_TIMEOUT_SECS` — invoice generation deadline (default: 60)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub auth_service_url: String,
    pub orders_service_url: String,
    pub invoice_function_url: String,
    pub verify_timeout: Duration,
    pub upstream_timeout: Duration,
    pub invoice_timeout: Duration,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: u64) -> Duration {
    let secs = std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            auth_service_url: env_or("AUTH_SERVICE_URL", "http://auth:8000"),
            orders_service_url: env_or("ORDERS_SERVICE_URL", "http://orders:8000"),
            invoice_function_url: env_or("INVOICE_FUNCTION_URL", "http://invoice:9000"),
            verify_timeout: env_secs("VERIFY_TIMEOUT_SECS", 5),
            upstream_timeout: env_secs("UPSTREAM_TIMEOUT_SECS", 30),
            invoice_timeout: env_secs("INVOICE_TIMEOUT_SECS", 60),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            auth_service_url: "http://auth:8000".to_string(),
            orders_service_url: "http://orders:8000".to_string(),
            invoice_function_url: "http://invoice:9000".to_string(),
            verify_timeout: Duration::from_secs(5),
            upstream_timeout: Duration::from_secs(30),
            invoice_timeout: Duration::from_secs(60),
        }
    }
}
