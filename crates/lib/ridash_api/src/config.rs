//! API server configuration.

use std::time::Duration;

use ridash_core::auth::AuthConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {message}")]
    Invalid { var: &'static str, message: String },
}

/// Attributes applied to every cookie we set.
#[derive(Clone, Debug, Default)]
pub struct CookieConfig {
    pub domain: Option<String>,
    pub secure: bool,
}

/// Google OAuth client registration.
#[derive(Clone, Debug)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

/// Location of the document manager.
#[derive(Clone, Debug)]
pub struct DocManagerConfig {
    pub base_url: String,
    pub api_token: Option<String>,
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// Machine ID embedded in generated IDs.
    pub machine_id: u16,
    pub auth: AuthConfig,
    pub cookies: CookieConfig,
    /// `None` disables Google sign-in.
    pub google: Option<GoogleConfig>,
    /// `None` disables content fetches and editing sessions.
    pub doc_manager: Option<DocManagerConfig>,
    /// Bound on every outbound HTTP call.
    pub outbound_timeout: Duration,
    /// Take the client IP from `X-Forwarded-For` / `X-Real-IP`. Only safe
    /// behind a reverse proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                   | Default                           |
    /// |----------------------------|-----------------------------------|
    /// | `BIND_ADDR`                | `127.0.0.1:8080`                  |
    /// | `DATABASE_URL`             | `postgres://localhost:5432/ridash`|
    /// | `APP_NAME`                 | `ridash`                          |
    /// | `APP_MACHINE_ID`           | `1`                               |
    /// | `JWT_SECRET_KEY`           | required                          |
    /// | `ACCESS_TOKEN_EXPIRES_AT`  | `900` seconds                     |
    /// | `REFRESH_TOKEN_EXPIRES_AT` | `31536000` seconds                |
    /// | `OAUTH_STATE_EXPIRES_AT`   | `600` seconds                     |
    /// | `COOKIE_DOMAIN`            | unset                             |
    /// | `COOKIE_SECURE`            | `false`                           |
    /// | `GOOGLE_CLIENT_ID` etc.    | unset (Google disabled)           |
    /// | `DOC_MANAGER_BASE_URL`     | unset (manager disabled)          |
    /// | `DOC_MANAGER_API_TOKEN`    | unset                             |
    /// | `OUTBOUND_TIMEOUT_SECS`    | `10`                              |
    /// | `TRUST_PROXY_HEADERS`      | `false`                           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let signing_key = get("JWT_SECRET_KEY").ok_or(ConfigError::Missing("JWT_SECRET_KEY"))?;
        let mut auth = AuthConfig::new(
            get("APP_NAME").unwrap_or_else(|| "ridash".into()),
            signing_key.into_bytes(),
        );
        auth.access_ttl = chrono::Duration::seconds(parse_or(
            &get,
            "ACCESS_TOKEN_EXPIRES_AT",
            auth.access_ttl.num_seconds(),
        )?);
        auth.refresh_ttl = chrono::Duration::seconds(parse_or(
            &get,
            "REFRESH_TOKEN_EXPIRES_AT",
            auth.refresh_ttl.num_seconds(),
        )?);
        auth.oauth_state_ttl = chrono::Duration::seconds(parse_or(
            &get,
            "OAUTH_STATE_EXPIRES_AT",
            auth.oauth_state_ttl.num_seconds(),
        )?);
        for (var, ttl) in [
            ("ACCESS_TOKEN_EXPIRES_AT", auth.access_ttl),
            ("REFRESH_TOKEN_EXPIRES_AT", auth.refresh_ttl),
            ("OAUTH_STATE_EXPIRES_AT", auth.oauth_state_ttl),
        ] {
            if ttl <= chrono::Duration::zero() {
                return Err(ConfigError::Invalid {
                    var,
                    message: "must be positive".into(),
                });
            }
        }

        let machine_id: u16 = parse_or(&get, "APP_MACHINE_ID", 1)?;
        if machine_id > 1023 {
            return Err(ConfigError::Invalid {
                var: "APP_MACHINE_ID",
                message: "must be between 0 and 1023".into(),
            });
        }

        let google = match (
            get("GOOGLE_CLIENT_ID"),
            get("GOOGLE_CLIENT_SECRET"),
            get("GOOGLE_REDIRECT_URL"),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_url)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_url,
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    var: "GOOGLE_CLIENT_ID",
                    message: "GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and GOOGLE_REDIRECT_URL \
                              must be set together"
                        .into(),
                });
            }
        };

        let doc_manager = get("DOC_MANAGER_BASE_URL").map(|base_url| DocManagerConfig {
            base_url,
            api_token: get("DOC_MANAGER_API_TOKEN"),
        });

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".into()),
            pg_connection_url: get("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost:5432/ridash".into()),
            machine_id,
            auth,
            cookies: CookieConfig {
                domain: get("COOKIE_DOMAIN"),
                secure: parse_or(&get, "COOKIE_SECURE", false)?,
            },
            google,
            doc_manager,
            outbound_timeout: Duration::from_secs(parse_or(&get, "OUTBOUND_TIMEOUT_SECS", 10)?),
            trust_proxy_headers: parse_or(&get, "TRUST_PROXY_HEADERS", false)?,
        })
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_with_only_secret() {
        let config = ApiConfig::from_lookup(lookup(&[("JWT_SECRET_KEY", "s3cret")])).unwrap();
        assert_eq!(config.auth.app_name, "ridash");
        assert_eq!(config.auth.access_ttl.num_seconds(), 900);
        assert_eq!(config.auth.refresh_ttl.num_seconds(), 31_536_000);
        assert_eq!(config.auth.oauth_state_ttl.num_seconds(), 600);
        assert_eq!(config.machine_id, 1);
        assert_eq!(config.outbound_timeout, Duration::from_secs(10));
        assert!(!config.cookies.secure);
        assert!(!config.trust_proxy_headers);
        assert!(config.google.is_none());
        assert!(config.doc_manager.is_none());
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = ApiConfig::from_lookup(lookup(&[("JWT_SECRET_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET_KEY")));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("JWT_SECRET_KEY", "k"),
            ("APP_NAME", "ridash-staging"),
            ("ACCESS_TOKEN_EXPIRES_AT", "60"),
            ("APP_MACHINE_ID", "1023"),
            ("COOKIE_SECURE", "true"),
            ("COOKIE_DOMAIN", "ridash.dev"),
            ("TRUST_PROXY_HEADERS", "true"),
            ("DOC_MANAGER_BASE_URL", "http://docs:9000"),
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
            ("GOOGLE_REDIRECT_URL", "http://localhost/auth/oauth/google/callback"),
        ]))
        .unwrap();
        assert_eq!(config.auth.app_name, "ridash-staging");
        assert_eq!(config.auth.access_ttl.num_seconds(), 60);
        assert_eq!(config.machine_id, 1023);
        assert!(config.cookies.secure);
        assert_eq!(config.cookies.domain.as_deref(), Some("ridash.dev"));
        assert!(config.trust_proxy_headers);
        assert_eq!(config.doc_manager.unwrap().base_url, "http://docs:9000");
        assert_eq!(config.google.unwrap().client_id, "id");
    }

    #[test]
    fn rejects_bad_values() {
        for pairs in [
            vec![("JWT_SECRET_KEY", "k"), ("APP_MACHINE_ID", "1024")],
            vec![("JWT_SECRET_KEY", "k"), ("ACCESS_TOKEN_EXPIRES_AT", "soon")],
            vec![("JWT_SECRET_KEY", "k"), ("REFRESH_TOKEN_EXPIRES_AT", "0")],
            vec![("JWT_SECRET_KEY", "k"), ("GOOGLE_CLIENT_ID", "only-id")],
        ] {
            assert!(
                matches!(
                    ApiConfig::from_lookup(lookup(&pairs)),
                    Err(ConfigError::Invalid { .. })
                ),
                "{pairs:?} should be rejected"
            );
        }
    }
}
