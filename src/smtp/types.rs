use std::fmt;
use std::time::Duration;

/// Which step of the dialog failed. Exactly one per [`SmtpClientError`].
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpErrorStage {
    Connection,
    ResponseTimeout,
    Hello,
    MailFrom,
    RcptTo,
}

impl fmt::Display for SmtpErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connection => "connection",
            Self::ResponseTimeout => "response_timeout",
            Self::Hello => "hello",
            Self::MailFrom => "mail_from",
            Self::RcptTo => "rcpt_to",
        })
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpClientError {
    pub stage: SmtpErrorStage,
    pub message: String,
}

impl SmtpClientError {
    pub fn new(stage: SmtpErrorStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    /// Classifies an I/O failure: expired deadlines win over `stage`.
    pub(crate) fn from_io(stage: SmtpErrorStage, err: &std::io::Error) -> Self {
        use std::io::ErrorKind::{TimedOut, WouldBlock};

        let stage = if matches!(err.kind(), TimedOut | WouldBlock) {
            SmtpErrorStage::ResponseTimeout
        } else {
            stage
        };
        Self::new(stage, err.to_string())
    }

    pub fn is_connection(&self) -> bool {
        self.stage == SmtpErrorStage::Connection
    }

    pub fn is_response_timeout(&self) -> bool {
        self.stage == SmtpErrorStage::ResponseTimeout
    }

    pub fn is_hello(&self) -> bool {
        self.stage == SmtpErrorStage::Hello
    }

    pub fn is_mail_from(&self) -> bool {
        self.stage == SmtpErrorStage::MailFrom
    }

    pub fn is_rcpt_to(&self) -> bool {
        self.stage == SmtpErrorStage::RcptTo
    }
}

impl fmt::Display for SmtpClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.message)
    }
}

/// Progress of one dialog. `*Sent` states are entered once the command has
/// been written, before the reply is read.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum SessionState {
    #[default]
    Init,
    Connected,
    HeloSent,
    MailFromSent,
    RcptToSent,
    Done,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::Connected => "connected",
            Self::HeloSent => "helo_sent",
            Self::MailFromSent => "mail_from_sent",
            Self::RcptToSent => "rcpt_to_sent",
            Self::Done => "done",
        })
    }
}

/// A raw SMTP reply; multi-line text is joined with spaces.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub message: String,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }
}

impl fmt::Display for SmtpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} {}", self.code, self.message)
        }
    }
}

/// Connection settings flattened out of the [`Config`](crate::Config) for a
/// single dialog.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConnectionConfig {
    pub verifier_domain: String,
    pub verifier_email: String,
    pub target_port: u16,
    pub connection_timeout: Duration,
    pub response_timeout: Duration,
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SmtpResponse {
    /// `RCPT TO` was accepted.
    pub rcptto: bool,
    pub state: SessionState,
    pub errors: Vec<SmtpClientError>,
}

/// One probe of one mail server, kept as the debug record of the SMTP layer.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpRequest {
    /// Connection attempts configured for the call; the dialog itself dials once.
    pub attempts: u32,
    pub email: String,
    pub host: String,
    pub configuration: SmtpConnectionConfig,
    pub response: SmtpResponse,
}
