//! Console email service for development. Logs emails to tracing output.

use async_trait::async_trait;
use tracing::info;

use authforge_application::{EmailService, OtpMailer};
use authforge_core::AppResult;

/// Development email service that logs emails to the console instead of
/// delivering them.
#[derive(Clone)]
pub struct ConsoleEmailService;

impl ConsoleEmailService {
    /// Creates a new console email service.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleEmailService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailService for ConsoleEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        _html_body: Option<&str>,
    ) -> AppResult<()> {
        info!(
            to = to,
            subject = subject,
            "--- EMAIL (console) ---\nTo: {}\nSubject: {}\n\n{}\n--- END EMAIL ---",
            to,
            subject,
            text_body
        );

        Ok(())
    }
}

#[async_trait]
impl OtpMailer for ConsoleEmailService {
    async fn send_code(&self, email: &str, code: &str) -> AppResult<()> {
        self.send_email(
            email,
            "Your one-time verification code",
            &format!("Your verification code is: {code}\nIt expires in 5 minutes."),
            None,
        )
        .await
    }
}
