//! Session cookie helpers.
//!
//! The session token travels in an httpOnly cookie named `token`. Browsers
//! send it back automatically; API clients may use a Bearer header instead.

use axum::http::{
    HeaderMap,
    header::{AUTHORIZATION, COOKIE},
};

pub const SESSION_COOKIE: &str = "token";

/// Builds the `Set-Cookie` value that installs a session token.
pub fn session_cookie(token: &str, max_age_seconds: u64, production: bool) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; {}",
        SESSION_COOKIE,
        token,
        max_age_seconds,
        same_site(production)
    )
}

/// Builds the `Set-Cookie` value that removes the session token.
pub fn cleared_session_cookie(production: bool) -> String {
    format!(
        "{}=; HttpOnly; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; {}",
        SESSION_COOKIE,
        same_site(production)
    )
}

fn same_site(production: bool) -> &'static str {
    if production {
        "SameSite=None; Secure"
    } else {
        "SameSite=Strict"
    }
}

/// Returns the value of cookie `name` from the request headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Extracts the session token: the `token` cookie first, then a Bearer header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    read_cookie(headers, SESSION_COOKIE).or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}
