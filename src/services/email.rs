use crate::config::email::EmailConfig;
use anyhow::Result;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

#[derive(Clone)]
pub struct EmailService {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: Option<String>,
}

impl EmailService {
    /// Without SMTP settings the service is inert and sending is skipped.
    pub fn from_env() -> Self {
        let Some(cfg) = EmailConfig::from_env() else {
            return Self::disabled();
        };

        let creds = Credentials::new(cfg.smtp_username.clone(), cfg.smtp_password.clone());
        match AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host) {
            Ok(builder) => Self {
                transport: Some(builder.port(cfg.smtp_port).credentials(creds).build()),
                from_address: Some(cfg.from_address),
            },
            Err(e) => {
                tracing::warn!("Failed to build SMTP transport: {e}");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self {
            transport: None,
            from_address: None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    pub async fn send_reset_code(&self, to: &str, code: &str, ttl_minutes: i64) -> Result<()> {
        let body = reset_code_body(code, ttl_minutes);
        self.send_html(to, "Your password reset code", body).await
    }

    async fn send_html(&self, to: &str, subject: &str, body: String) -> Result<()> {
        let (Some(transport), Some(from_address)) = (&self.transport, &self.from_address) else {
            tracing::warn!("SMTP not configured, skipping email to {to}");
            return Ok(());
        };

        let from_mailbox: Mailbox =
            from_address
                .parse()
                .map_err(|e: lettre::address::AddressError| {
                    anyhow::anyhow!("Invalid from address '{}': {}", from_address, e)
                })?;
        let to_mailbox: Mailbox = to.parse().map_err(|e: lettre::address::AddressError| {
            anyhow::anyhow!("Invalid to address '{}': {}", to, e)
        })?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)?;

        transport.send(email).await?;
        tracing::info!("Email sent to {to}: {subject}");
        Ok(())
    }
}

fn reset_code_body(code: &str, ttl_minutes: i64) -> String {
    format!(
        "<!DOCTYPE html>\
         <html><body style=\"font-family: sans-serif\">\
         <h2>Password reset</h2>\
         <p>Use the code below to reset your password.</p>\
         <p style=\"font-size: 28px; letter-spacing: 6px\"><strong>{code}</strong></p>\
         <p>The code expires in {ttl_minutes} minutes. If you did not ask for it, ignore this email.</p>\
         </body></html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_contains_code_and_expiry() {
        let body = reset_code_body("123456", 3);
        assert!(body.contains("<strong>123456</strong>"));
        assert!(body.contains("3 minutes"));
    }

    #[tokio::test]
    async fn disabled_service_skips_sending() {
        let service = EmailService::disabled();
        assert!(!service.is_configured());
        service
            .send_reset_code("someone@example.com", "123456", 3)
            .await
            .unwrap();
    }
}
