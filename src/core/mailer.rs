//! Verification email over SMTP.

use crate::config::AppConfig;
use crate::core::traits::Mailer;
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::{error, info};

pub struct SmtpMailer {
    config: Ref<AppConfig>,
}

#[injectable(Mailer)]
impl SmtpMailer {
    #[inject]
    pub fn create(config: Ref<AppConfig>) -> SmtpMailer {
        SmtpMailer { config }
    }
}

pub fn verification_body(username: &str, code: &str) -> String {
    format!(
        r#"<html>
<body>
    <h2>Welcome to Krishi Mitra!</h2>
    <p>Hello {username},</p>
    <p>Your verification code is: <strong>{code}</strong></p>
    <p>Enter this code in the verification page to complete registration.</p>
</body>
</html>"#,
        username = escape_html(username),
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl SmtpMailer {
    async fn deliver(&self, email: &str, username: &str, code: &str) -> anyhow::Result<()> {
        let smtp = &self.config.smtp;
        let (Some(address), Some(password)) = (smtp.address.as_deref(), smtp.password.as_deref())
        else {
            anyhow::bail!("EMAIL_ADDRESS/EMAIL_PASSWORD are not configured");
        };

        let message = Message::builder()
            .from(address.parse()?)
            .to(email.parse()?)
            .subject("Verify Your Email - Krishi Mitra")
            .header(ContentType::TEXT_HTML)
            .body(verification_body(username, code))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.server)?
            .port(smtp.port)
            .credentials(Credentials::new(address.to_owned(), password.to_owned()))
            .build();

        transport.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification(&self, email: &str, username: &str, code: &str) -> bool {
        match self.deliver(email, username, code).await {
            Ok(()) => {
                info!("verification email sent to {email}");
                true
            }
            Err(e) => {
                error!("failed to send verification email: {e}");
                false
            }
        }
    }
}
