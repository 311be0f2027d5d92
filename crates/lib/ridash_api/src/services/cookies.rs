//! Cookie helpers for the refresh token and the OAuth session.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::config::CookieConfig;

/// Cookie holding the opaque refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";
/// Cookie holding the signed OAuth state between the two OAuth legs.
pub const OAUTH_SESSION_COOKIE: &str = "oauth_session";

fn http_only_cookie(
    config: &CookieConfig,
    name: &'static str,
    value: String,
    max_age: Duration,
) -> Cookie<'static> {
    let mut builder = Cookie::build((name, value))
        .http_only(true)
        .secure(config.secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age);
    if let Some(domain) = &config.domain {
        builder = builder.domain(domain.clone());
    }
    builder.build()
}

fn seconds(ttl: chrono::Duration) -> Duration {
    Duration::seconds(ttl.num_seconds())
}

pub fn refresh_cookie(
    config: &CookieConfig,
    token: &str,
    ttl: chrono::Duration,
) -> Cookie<'static> {
    http_only_cookie(config, REFRESH_COOKIE, token.to_string(), seconds(ttl))
}

pub fn clear_refresh_cookie(config: &CookieConfig) -> Cookie<'static> {
    http_only_cookie(config, REFRESH_COOKIE, String::new(), Duration::ZERO)
}

pub fn oauth_session_cookie(
    config: &CookieConfig,
    state: &str,
    ttl: chrono::Duration,
) -> Cookie<'static> {
    http_only_cookie(config, OAUTH_SESSION_COOKIE, state.to_string(), seconds(ttl))
}

pub fn clear_oauth_session_cookie(config: &CookieConfig) -> Cookie<'static> {
    http_only_cookie(config, OAUTH_SESSION_COOKIE, String::new(), Duration::ZERO)
}
