//! Outgoing email
//!
//! Verification, password-reset and feedback notifications. The [`Mailer`]
//! trait is what handlers depend on; [`SmtpMailer`] delivers through SMTP and
//! logs and skips every send when SMTP is not configured.

use anyhow::{Context, Result};
use async_trait::async_trait;
use common::config::EmailConfig;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::{info, warn};

/// A feedback submission forwarded to the operators
#[derive(Debug, Clone)]
pub struct FeedbackMail {
    pub user_name: String,
    pub content: String,
    pub contact: String,
    pub image_urls: Vec<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Whether mail is actually delivered
    fn is_configured(&self) -> bool;

    async fn send_verification(&self, to: &str, token: &str) -> Result<()>;

    async fn send_password_reset(&self, to: &str, token: &str) -> Result<()>;

    async fn send_feedback(&self, feedback: &FeedbackMail) -> Result<()>;
}

/// SMTP mailer backed by `lettre`
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
    feedback_email: String,
    frontend_url: String,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig, frontend_url: &str) -> Result<Self> {
        let transport = if config.is_configured() {
            let builder = if config.smtp_port == 465 {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            };

            Some(
                builder
                    .port(config.smtp_port)
                    .credentials(Credentials::new(
                        config.smtp_user.clone(),
                        config.smtp_pass.clone(),
                    ))
                    .build(),
            )
        } else {
            warn!("SMTP is not configured, outgoing email will be skipped");
            None
        };

        let feedback_email = if config.feedback_email.is_empty() {
            config.smtp_user.clone()
        } else {
            config.feedback_email.clone()
        };

        Ok(Self {
            transport,
            from: config.smtp_user.clone(),
            feedback_email,
            frontend_url: frontend_url.to_string(),
        })
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> Result<()> {
        let Some(transport) = &self.transport else {
            return Ok(());
        };

        let from: Mailbox = format!("PicShare <{}>", self.from)
            .parse()
            .context("Invalid sender address")?;
        let message = Message::builder()
            .from(from)
            .to(to.parse().context("Invalid recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)?;

        transport
            .send(message)
            .await
            .with_context(|| format!("Failed to send email to {}", to))?;

        info!("Sent \"{}\" to {}", subject, to);
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    async fn send_verification(&self, to: &str, token: &str) -> Result<()> {
        if !self.is_configured() {
            info!("SMTP not configured, skipping verification email for {}", to);
            return Ok(());
        }

        let link = format!("{}/verify-email?token={}", self.frontend_url, token);
        self.send(to, "PicShare - Verify your email", verification_html(&link))
            .await
    }

    async fn send_password_reset(&self, to: &str, token: &str) -> Result<()> {
        if !self.is_configured() {
            info!("SMTP not configured, skipping password reset email for {}", to);
            return Ok(());
        }

        let link = format!("{}/reset-password?token={}", self.frontend_url, token);
        self.send(to, "PicShare - Reset your password", reset_html(&link))
            .await
    }

    async fn send_feedback(&self, feedback: &FeedbackMail) -> Result<()> {
        if !self.is_configured() {
            info!("SMTP not configured, skipping feedback email");
            return Ok(());
        }

        self.send(&self.feedback_email, "PicShare - User feedback", feedback_html(feedback))
            .await
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn verification_html(link: &str) -> String {
    format!(
        r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
<h2>Welcome to PicShare</h2>
<p>Please confirm your email address by clicking the link below. The link is valid for 24 hours.</p>
<p><a href="{link}">Verify email</a></p>
<p>If you did not create an account, you can ignore this message.</p>
</div>"#
    )
}

fn reset_html(link: &str) -> String {
    format!(
        r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
<h2>Reset your password</h2>
<p>Click the link below to choose a new password. The link is valid for 1 hour.</p>
<p><a href="{link}">Reset password</a></p>
<p>If you did not request a reset, you can ignore this message.</p>
</div>"#
    )
}

fn feedback_html(feedback: &FeedbackMail) -> String {
    let images: String = feedback
        .image_urls
        .iter()
        .map(|url| format!(r#"<p><a href="{0}"><img src="{0}" style="max-width: 300px;"></a></p>"#, escape_html(url)))
        .collect();

    let contact = if feedback.contact.is_empty() {
        "not provided".to_string()
    } else {
        escape_html(&feedback.contact)
    };

    format!(
        r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
<h2>New feedback</h2>
<p><strong>From:</strong> {}</p>
<p><strong>Contact:</strong> {}</p>
<p style="white-space: pre-wrap;">{}</p>
{}
</div>"#,
        escape_html(&feedback.user_name),
        contact,
        escape_html(&feedback.content),
        images
    )
}
