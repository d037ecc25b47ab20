use super::env_or;
use std::env;

#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_address: String,
}

impl EmailConfig {
    /// Returns None when SMTP is not configured.
    pub fn from_env() -> Option<Self> {
        let smtp_host = env::var("SMTP_HOST").ok()?;
        let smtp_username = env::var("SMTP_USERNAME").ok()?;
        let smtp_password = env::var("SMTP_PASSWORD").ok()?;
        let from_address =
            env::var("SMTP_FROM").unwrap_or_else(|_| format!("Q&A <{}>", smtp_username));

        Some(Self {
            smtp_host,
            smtp_port: env_or("SMTP_PORT", 587),
            smtp_username,
            smtp_password,
            from_address,
        })
    }
}
