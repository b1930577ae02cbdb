use crate::validators::is_valid_email;
use serde::Serialize;

/// Notifier for outbound account email.
///
/// Fire-and-forget from the caller's point of view: delivery failure is the
/// caller's to log, never to roll back on.
#[derive(Clone)]
pub struct EmailClient {
    http_client: reqwest::Client,
    service_url: String,
    sender: SenderEmail,
    reset_base_url: String,
}

/// A validated sender address
#[derive(Clone)]
pub struct SenderEmail(String);

impl SenderEmail {
    pub fn parse(s: String) -> Result<Self, String> {
        let email = is_valid_email(&s).map_err(|e| format!("{:?}", e))?;
        Ok(Self(email))
    }

    pub fn inner(&self) -> &str {
        &self.0
    }
}

#[derive(Serialize)]
pub struct SendEmailRequest {
    from: String,
    to: String,
    #[serde(rename = "Html")]
    html: String,
    #[serde(rename = "Subject")]
    subject: String,
}

impl EmailClient {
    pub fn new(
        service_url: String,
        sender: SenderEmail,
        reset_base_url: String,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            http_client,
            service_url,
            sender,
            reset_base_url,
        }
    }

    /// Send a password-reset link to `recipient`
    ///
    /// # Errors
    /// Returns error if the email service call fails
    pub async fn send_password_reset(
        &self,
        recipient: &str,
        reset_token: &str,
    ) -> Result<(), String> {
        let reset_link = format!("{}/reset-password?token={}", self.reset_base_url, reset_token);
        let html = format!(
            "<p>Click the following link to reset your password:</p>\
             <p><a href=\"{}\">{}</a></p>\
             <p>This link will expire in 24 hours.</p>",
            reset_link, reset_link
        );

        self.send_email(recipient, "Reset Your Password", &html).await
    }

    async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        html_content: &str,
    ) -> Result<(), String> {
        let url = format!("{}/email", self.service_url);
        let request = SendEmailRequest {
            from: self.sender.inner().to_string(),
            to: recipient.to_string(),
            subject: subject.to_string(),
            html: html_content.to_string(),
        };

        self.http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send email: {}", e);
                format!("Failed to send email: {}", e)
            })?
            .error_for_status()
            .map_err(|e| {
                tracing::error!("Email service returned error: {}", e);
                format!("Email service error: {}", e)
            })?;

        Ok(())
    }
}
