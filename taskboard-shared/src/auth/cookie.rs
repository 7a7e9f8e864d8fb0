/// Session and sign-in cookies
///
/// Two cookies are used:
///
/// - `taskboard.session-token`: the signed session token (HttpOnly,
///   SameSite=Lax, Secure in production)
/// - `taskboard.oauth-state`: the CSRF `state` of an in-flight OAuth
///   sign-in, valid for ten minutes

use axum::http::{header, HeaderMap};
use rand::RngCore;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "taskboard.session-token";

/// Name of the OAuth state cookie
pub const OAUTH_STATE_COOKIE: &str = "taskboard.oauth-state";

/// Lifetime of the OAuth state cookie in seconds
pub const OAUTH_STATE_MAX_AGE: i64 = 600;

/// Reads a cookie value from the request headers
///
/// Every `Cookie` header is searched; the first matching pair wins.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

/// Extracts a `Bearer` token from the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Session token carried by a request
///
/// An explicit bearer token takes precedence over the cookie.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    bearer_token(headers).or_else(|| cookie_value(headers, SESSION_COOKIE))
}

/// `Set-Cookie` value that stores a cookie
pub fn set_cookie(name: &str, value: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        name, value, max_age_seconds
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes a cookie
pub fn clear_cookie(name: &str, secure: bool) -> String {
    set_cookie(name, "", 0, secure)
}

/// Random CSRF state for an OAuth sign-in (32 hex characters)
pub fn generate_oauth_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
