//! Minimal SMTP client used to ask a mail server whether it accepts a
//! recipient.
//!
//! The dialog is plain TCP, no STARTTLS: greeting, `EHLO` (falling back to
//! `HELO`), `MAIL FROM`, `RCPT TO`. Each step gets its own response deadline.
//! No mail is ever sent.

mod client;
mod session;
mod types;

pub use client::SmtpClient;
pub use types::{
    SessionState, SmtpClientError, SmtpConnectionConfig, SmtpErrorStage, SmtpReply,
    SmtpRequest, SmtpResponse,
};

use crate::config::Config;

impl SmtpConnectionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            verifier_domain: config.verifier_domain().to_string(),
            verifier_email: config.verifier_email().to_string(),
            target_port: config.smtp_port(),
            connection_timeout: config.connection_timeout(),
            response_timeout: config.response_timeout(),
        }
    }
}

impl SmtpRequest {
    pub fn new(config: &Config, host: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            attempts: config.connection_attempts(),
            email: email.into(),
            host: host.into(),
            configuration: SmtpConnectionConfig::from_config(config),
            response: SmtpResponse::default(),
        }
    }

    /// Runs the dialog and stores its outcome in `self.response`.
    pub fn run(&mut self) -> bool {
        let mut client = SmtpClient::new(&self.configuration);
        let accepted = client.run_session(&self.host, &self.email);
        self.response = SmtpResponse {
            rcptto: accepted,
            state: client.state(),
            errors: client.into_errors(),
        };
        accepted
    }

    pub fn is_accepted(&self) -> bool {
        self.response.rcptto
    }

    /// Messages of every error collected during the dialog.
    pub fn error_messages(&self) -> impl Iterator<Item = &str> {
        self.response
            .errors
            .iter()
            .map(|error| error.message.as_str())
    }
}
