use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::time::Duration;
use tokio_postgres::config::SslMode;

/// Session settings applied to every loader connection through the startup options.
///
/// Dates travel as ISO strings in UTC so that silver and gold values do not depend on the
/// server defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub application_name: &'static str,
    /// Milliseconds, `0` disables the timeout.
    pub statement_timeout_ms: u32,
    pub lock_timeout_ms: u32,
    pub idle_in_transaction_timeout_ms: u32,
}

impl SessionSettings {
    /// Settings of the connections streaming bronze rows and writing table loads.
    ///
    /// Statements are unbounded since a table load is one long transaction.
    pub const LOAD: SessionSettings = SessionSettings {
        application_name: "dwh_loader",
        statement_timeout_ms: 0,
        lock_timeout_ms: 30_000,
        idle_in_transaction_timeout_ms: 0,
    };

    /// Settings of the connection running the warehouse migrations.
    pub const MIGRATION: SessionSettings = SessionSettings {
        application_name: "dwh_loader_migrations",
        statement_timeout_ms: 300_000,
        lock_timeout_ms: 10_000,
        idle_in_transaction_timeout_ms: 60_000,
    };

    /// Runtime parameters as `(name, value)` pairs.
    pub fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![
            ("datestyle", "ISO".to_string()),
            ("intervalstyle", "postgres".to_string()),
            ("client_encoding", "UTF8".to_string()),
            ("timezone", "UTC".to_string()),
            ("statement_timeout", self.statement_timeout_ms.to_string()),
            ("lock_timeout", self.lock_timeout_ms.to_string()),
            (
                "idle_in_transaction_session_timeout",
                self.idle_in_transaction_timeout_ms.to_string(),
            ),
            ("application_name", self.application_name.to_string()),
        ]
    }

    /// Parameters rendered as a libpq `options` string, e.g. `-c timezone=UTC`.
    pub fn to_options_string(&self) -> String {
        self.parameters()
            .iter()
            .map(|(name, value)| format!("-c {name}={value}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Connection to one Postgres database, the source or the warehouse.
#[derive(Debug, Clone, Deserialize)]
pub struct PgConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Database name.
    pub name: String,
    pub username: String,
    pub password: Option<SecretString>,
    pub tls: TlsConfig,
    /// Disabled when absent.
    #[serde(default)]
    pub keepalive: Option<TcpKeepaliveConfig>,
}

impl PgConnectionConfig {
    /// Options for a sqlx pool on this database.
    pub fn sqlx_options(&self, session: &SessionSettings) -> PgConnectOptions {
        let mut options = PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .database(&self.name)
            .options(session.parameters());

        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }

        if self.tls.enabled {
            options = options
                .ssl_mode(PgSslMode::VerifyFull)
                .ssl_root_cert_from_pem(self.tls.trusted_root_certs.as_bytes().to_vec());
        } else {
            options = options.ssl_mode(PgSslMode::Prefer);
        }

        options
    }

    /// Configuration of a tokio-postgres client on this database.
    ///
    /// TLS itself is negotiated by the caller, this only selects whether it is required.
    pub fn tokio_config(&self, session: &SessionSettings) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.username)
            .dbname(&self.name)
            .options(&session.to_options_string())
            .ssl_mode(if self.tls.enabled {
                SslMode::Require
            } else {
                SslMode::Prefer
            });

        if let Some(password) = &self.password {
            config.password(password.expose_secret());
        }

        if let Some(keepalive) = &self.keepalive {
            config
                .keepalives(true)
                .keepalives_idle(Duration::from_secs(keepalive.idle_secs))
                .keepalives_interval(Duration::from_secs(keepalive.interval_secs))
                .keepalives_retries(keepalive.retries);
        }

        config
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// PEM encoded root certificates the server certificate is verified against.
    pub trusted_root_certs: String,
    pub enabled: bool,
}

impl TlsConfig {
    pub fn disabled() -> Self {
        Self {
            trusted_root_certs: String::new(),
            enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpKeepaliveConfig {
    pub idle_secs: u64,
    pub interval_secs: u64,
    pub retries: u32,
}

impl Default for TcpKeepaliveConfig {
    fn default() -> Self {
        Self {
            idle_secs: 30,
            interval_secs: 30,
            retries: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> PgConnectionConfig {
        PgConnectionConfig {
            host: "db.internal".to_string(),
            port: 5433,
            name: "dwh".to_string(),
            username: "loader".to_string(),
            password: Some(SecretString::new("secret".to_string())),
            tls: TlsConfig::disabled(),
            keepalive: Some(TcpKeepaliveConfig::default()),
        }
    }

    #[test]
    fn load_session_renders_options_string() {
        assert_eq!(
            SessionSettings::LOAD.to_options_string(),
            "-c datestyle=ISO -c intervalstyle=postgres -c client_encoding=UTF8 -c timezone=UTC -c statement_timeout=0 -c lock_timeout=30000 -c idle_in_transaction_session_timeout=0 -c application_name=dwh_loader"
        );
    }

    #[test]
    fn tokio_config_targets_database() {
        let config = connection().tokio_config(&SessionSettings::MIGRATION);

        assert_eq!(config.get_dbname(), Some("dwh"));
        assert_eq!(config.get_user(), Some("loader"));
        assert_eq!(config.get_ports(), &[5433]);
        assert_eq!(config.get_ssl_mode(), SslMode::Prefer);
        assert!(config.get_keepalives());
        assert!(
            config
                .get_options()
                .is_some_and(|options| options.contains("statement_timeout=300000"))
        );
    }
}
