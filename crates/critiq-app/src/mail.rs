use tracing::info;

#[derive(Debug, thiserror::Error)]
#[error("Mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Out-of-band delivery of confirmation codes. Real transport lives
/// outside this service; the default sink writes to the log, which is
/// enough for development and tests.
pub trait Mailer: Send + Sync {
    fn send_confirmation_code(&self, email: &str, code: i64) -> Result<(), MailError>;
}

pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_confirmation_code(&self, email: &str, code: i64) -> Result<(), MailError> {
        info!("Confirmation code for {email}: your code for getting a token - {code}");
        Ok(())
    }
}
