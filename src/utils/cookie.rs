use crate::config::env_flag;
use axum::http::{header, HeaderMap};
use std::{env, sync::OnceLock};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

#[derive(Debug, Clone)]
struct CookieConfig {
    secure: bool,
    same_site: &'static str,
    domain: Option<String>,
}

impl CookieConfig {
    fn from_env() -> Self {
        let same_site = match env::var("AUTH_COOKIE_SAMESITE")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "strict" => "Strict",
            "none" => "None",
            _ => "Lax",
        };
        let domain = env::var("AUTH_COOKIE_DOMAIN")
            .ok()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Self {
            // Browsers drop SameSite=None cookies that are not Secure.
            secure: same_site == "None" || env_flag("AUTH_COOKIE_SECURE", false),
            same_site,
            domain,
        }
    }

    fn attributes(&self) -> String {
        let mut attrs = format!("Path=/; HttpOnly; SameSite={}", self.same_site);
        if self.secure {
            attrs.push_str("; Secure");
        }
        if let Some(domain) = &self.domain {
            attrs.push_str("; Domain=");
            attrs.push_str(domain);
        }
        attrs
    }
}

fn cookie_config() -> &'static CookieConfig {
    static CONFIG: OnceLock<CookieConfig> = OnceLock::new();
    CONFIG.get_or_init(CookieConfig::from_env)
}

pub fn build_session_cookie(token: &str, max_age_seconds: u64) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Max-Age={max_age_seconds}; {}",
        cookie_config().attributes()
    )
}

pub fn build_clear_cookie() -> String {
    format!(
        "{SESSION_COOKIE}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; {}",
        cookie_config().attributes()
    )
}

pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookie_header| cookie_header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Session token from `Authorization: Bearer` or, failing that, the session cookie.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| extract_cookie(headers, SESSION_COOKIE))
}
