#![forbid(unsafe_code)]
//! mailprobe_lib: layered email deliverability checks (domain lists, syntax,
//! MX resolution, MX blacklist and an SMTP `RCPT TO` probe).

pub mod cancel;
pub mod config;
pub mod dns;
pub mod smtp;
pub mod validator;

pub use cancel::Cancellation;
pub use config::{Config, ConfigBuilder, ConfigError, ValidationType, build_verifier_domain};
pub use dns::{DnsError, DnsResolver, LookupDns, MxHosts, MxRecord};
pub use smtp::{
    SessionState, SmtpClient, SmtpClientError, SmtpConnectionConfig, SmtpErrorStage,
    SmtpRequest, SmtpResponse,
};
pub use validator::{
    ValidationLayer, Validator, ValidatorResult, is_valid, validate, validate_with_resolver,
};
