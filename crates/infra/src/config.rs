//! Process configuration loaded from the environment (and `.env`, if present).

use std::fmt;
use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use gatehouse_auth::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_BCRYPT_COST, DEFAULT_REFRESH_TTL_SECS};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4001";
const DEV_ACCESS_SECRET: &str = "gatehouse-dev-access-secret";
const DEV_REFRESH_SECRET: &str = "gatehouse-dev-refresh-secret";
/// Upper bound for either token lifetime.
const MAX_TTL_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not valid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("access and refresh secrets must differ")]
    SharedSecret,

    #[error("{0} uses the development default in production")]
    InsecureDefaultSecret(&'static str),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub bcrypt_cost: u32,
    pub database_url: Option<String>,
    pub cors_origins: Vec<String>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("environment", &self.environment)
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

impl AppConfig {
    /// Read `.env` (if any) then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = match get("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("development") | Some("dev") | Some("test") | None => Environment::Development,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "APP_ENV",
                    reason: format!("unknown environment '{other}'"),
                });
            }
        };

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let access_secret = secret(
            environment,
            "JWT_ACCESS_SECRET",
            get("JWT_ACCESS_SECRET").or_else(|| get("JWT_SECRET")),
            DEV_ACCESS_SECRET,
        )?;
        let refresh_secret = secret(
            environment,
            "JWT_REFRESH_SECRET",
            get("JWT_REFRESH_SECRET"),
            DEV_REFRESH_SECRET,
        )?;
        if access_secret == refresh_secret {
            return Err(ConfigError::SharedSecret);
        }

        let access_ttl = ttl("ACCESS_TOKEN_TTL_SECS", get("ACCESS_TOKEN_TTL_SECS"), DEFAULT_ACCESS_TTL_SECS)?;
        let refresh_ttl = ttl("REFRESH_TOKEN_TTL_SECS", get("REFRESH_TOKEN_TTL_SECS"), DEFAULT_REFRESH_TTL_SECS)?;
        let bcrypt_cost = number("BCRYPT_COST", get("BCRYPT_COST"), DEFAULT_BCRYPT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                reason: "must be between 4 and 31".to_string(),
            });
        }

        let cors_origins = get("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr,
            environment,
            access_secret,
            refresh_secret,
            access_ttl,
            refresh_ttl,
            bcrypt_cost,
            database_url: get("DATABASE_URL"),
            cors_origins,
        })
    }

    /// Local config with dev secrets, in-memory stores and an ephemeral port.
    pub fn development() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            environment: Environment::Development,
            access_secret: DEV_ACCESS_SECRET.to_string(),
            refresh_secret: DEV_REFRESH_SECRET.to_string(),
            access_ttl: Duration::seconds(DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl: Duration::seconds(DEFAULT_REFRESH_TTL_SECS),
            bcrypt_cost: 4,
            database_url: None,
            cors_origins: Vec::new(),
        }
    }
}

fn secret(
    environment: Environment,
    name: &'static str,
    value: Option<String>,
    dev_default: &str,
) -> Result<String, ConfigError> {
    match value {
        Some(v) if environment.is_production() && v == dev_default => Err(ConfigError::InsecureDefaultSecret(name)),
        Some(v) => Ok(v),
        None if environment.is_production() => Err(ConfigError::Missing(name)),
        None => {
            tracing::warn!(variable = name, "secret not set; using insecure dev default");
            Ok(dev_default.to_string())
        }
    }
}

fn ttl(name: &'static str, value: Option<String>, default: i64) -> Result<Duration, ConfigError> {
    let secs = number(name, value, default)?;
    if secs > MAX_TTL_SECS {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("must not exceed {MAX_TTL_SECS} seconds"),
        });
    }
    Ok(Duration::seconds(secs))
}

fn number<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: fmt::Display,
{
    let Some(raw) = value else {
        return Ok(default);
    };
    let parsed = raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    if parsed <= T::default() {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be positive".to_string(),
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_in_development() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.environment, Environment::Development);
        assert_eq!(cfg.bind_addr, "0.0.0.0:4001".parse().unwrap());
        assert_eq!(cfg.access_ttl, Duration::seconds(900));
        assert_eq!(cfg.refresh_ttl, Duration::seconds(604_800));
        assert_ne!(cfg.access_secret, cfg.refresh_secret);
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn jwt_secret_is_access_fallback() {
        let cfg = load(&[("JWT_SECRET", "a"), ("JWT_REFRESH_SECRET", "b")]).unwrap();
        assert_eq!(cfg.access_secret, "a");

        let cfg = load(&[("JWT_SECRET", "a"), ("JWT_ACCESS_SECRET", "c"), ("JWT_REFRESH_SECRET", "b")]).unwrap();
        assert_eq!(cfg.access_secret, "c");
    }

    #[test]
    fn shared_secret_is_rejected() {
        let err = load(&[("JWT_ACCESS_SECRET", "same"), ("JWT_REFRESH_SECRET", "same")]).unwrap_err();
        assert_eq!(err, ConfigError::SharedSecret);
    }

    #[test]
    fn production_requires_real_secrets() {
        assert_eq!(
            load(&[("APP_ENV", "production")]).unwrap_err(),
            ConfigError::Missing("JWT_ACCESS_SECRET")
        );
        assert_eq!(
            load(&[
                ("APP_ENV", "production"),
                ("JWT_ACCESS_SECRET", DEV_ACCESS_SECRET),
                ("JWT_REFRESH_SECRET", "r"),
            ])
            .unwrap_err(),
            ConfigError::InsecureDefaultSecret("JWT_ACCESS_SECRET")
        );
        let cfg = load(&[
            ("APP_ENV", "production"),
            ("JWT_ACCESS_SECRET", "a"),
            ("JWT_REFRESH_SECRET", "r"),
        ])
        .unwrap();
        assert!(cfg.environment.is_production());
    }

    #[test]
    fn numbers_and_lists_parse() {
        let cfg = load(&[
            ("ACCESS_TOKEN_TTL_SECS", "60"),
            ("BCRYPT_COST", "6"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("DATABASE_URL", "postgres://localhost/db"),
        ])
        .unwrap();
        assert_eq!(cfg.access_ttl, Duration::seconds(60));
        assert_eq!(cfg.bcrypt_cost, 6);
        assert_eq!(cfg.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/db"));
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(matches!(
            load(&[("ACCESS_TOKEN_TTL_SECS", "soon")]),
            Err(ConfigError::Invalid { name: "ACCESS_TOKEN_TTL_SECS", .. })
        ));
        assert!(matches!(
            load(&[("REFRESH_TOKEN_TTL_SECS", "0")]),
            Err(ConfigError::Invalid { name: "REFRESH_TOKEN_TTL_SECS", .. })
        ));
        assert!(matches!(load(&[("BCRYPT_COST", "2")]), Err(ConfigError::Invalid { name: "BCRYPT_COST", .. })));
        assert!(matches!(load(&[("APP_ENV", "staging")]), Err(ConfigError::Invalid { name: "APP_ENV", .. })));
    }

    #[test]
    fn oversized_ttls_are_rejected() {
        for huge in ["9223372036854775807", "9000000000000000", "31536001"] {
            assert!(matches!(
                load(&[("REFRESH_TOKEN_TTL_SECS", huge)]),
                Err(ConfigError::Invalid { name: "REFRESH_TOKEN_TTL_SECS", .. })
            ));
            assert!(matches!(
                load(&[("ACCESS_TOKEN_TTL_SECS", huge)]),
                Err(ConfigError::Invalid { name: "ACCESS_TOKEN_TTL_SECS", .. })
            ));
        }

        let cfg = load(&[("REFRESH_TOKEN_TTL_SECS", "31536000")]).unwrap();
        assert_eq!(cfg.refresh_ttl, Duration::days(365));
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = AppConfig::development();
        let printed = format!("{cfg:?}");
        assert!(!printed.contains(DEV_ACCESS_SECRET));
        assert!(!printed.contains(DEV_REFRESH_SECRET));
    }
}
