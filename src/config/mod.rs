//! Immutable verifier configuration and its builder.
//!
//! [`Config::builder`] takes the verifier email and applies the defaults
//! below; [`ConfigBuilder::build`] validates every field and returns the first
//! violation as `"<value> is invalid <what>"`.

mod error;
pub mod patterns;
mod types;

pub use error::ConfigError;
pub use types::ValidationType;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use regex::Regex;

use crate::cancel::Cancellation;
use patterns::{EMAIL_RE, SMTP_ERROR_BODY_RE, is_dns_gateway, is_domain, is_ipv4};

pub const DEFAULT_CONNECTION_TIMEOUT: u64 = 2;
pub const DEFAULT_RESPONSE_TIMEOUT: u64 = 2;
pub const DEFAULT_CONNECTION_ATTEMPTS: u32 = 2;
pub const DEFAULT_SMTP_PORT: u16 = 25;
pub const DEFAULT_DNS_PORT: u16 = 53;

#[derive(Debug, Clone)]
pub struct Config {
    verifier_email: String,
    verifier_domain: String,
    validation_type_default: ValidationType,
    connection_timeout: Duration,
    response_timeout: Duration,
    connection_attempts: u32,
    whitelisted_domains: Vec<String>,
    whitelist_validation: bool,
    blacklisted_domains: Vec<String>,
    blacklisted_mx_ip_addresses: Vec<String>,
    dns: Option<SocketAddr>,
    validation_type_by_domain: HashMap<String, ValidationType>,
    not_rfc_mx_lookup_flow: bool,
    smtp_port: u16,
    smtp_fail_fast: bool,
    smtp_safe_check: bool,
    email_pattern: Regex,
    smtp_error_body_pattern: Regex,
    cancellation: Option<Cancellation>,
}

impl Config {
    pub fn builder(verifier_email: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(verifier_email)
    }

    pub fn verifier_email(&self) -> &str {
        &self.verifier_email
    }

    pub fn verifier_domain(&self) -> &str {
        &self.verifier_domain
    }

    pub fn validation_type_default(&self) -> ValidationType {
        self.validation_type_default
    }

    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    pub fn connection_attempts(&self) -> u32 {
        self.connection_attempts
    }

    pub fn whitelisted_domains(&self) -> &[String] {
        &self.whitelisted_domains
    }

    pub fn whitelist_validation(&self) -> bool {
        self.whitelist_validation
    }

    pub fn blacklisted_domains(&self) -> &[String] {
        &self.blacklisted_domains
    }

    pub fn blacklisted_mx_ip_addresses(&self) -> &[String] {
        &self.blacklisted_mx_ip_addresses
    }

    /// DNS gateway; `None` means the platform resolver configuration.
    pub fn dns(&self) -> Option<SocketAddr> {
        self.dns
    }

    pub fn validation_type_by_domain(&self) -> &HashMap<String, ValidationType> {
        &self.validation_type_by_domain
    }

    pub fn not_rfc_mx_lookup_flow(&self) -> bool {
        self.not_rfc_mx_lookup_flow
    }

    pub fn smtp_port(&self) -> u16 {
        self.smtp_port
    }

    pub fn smtp_fail_fast(&self) -> bool {
        self.smtp_fail_fast
    }

    pub fn smtp_safe_check(&self) -> bool {
        self.smtp_safe_check
    }

    pub fn email_pattern(&self) -> &Regex {
        &self.email_pattern
    }

    pub fn smtp_error_body_pattern(&self) -> &Regex {
        &self.smtp_error_body_pattern
    }

    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.cancellation.as_ref()
    }
}

/// Collects raw settings; nothing is checked until [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    verifier_email: String,
    verifier_domain: Option<String>,
    validation_type_default: ValidationType,
    connection_timeout: u64,
    response_timeout: u64,
    connection_attempts: u32,
    whitelisted_domains: Vec<String>,
    whitelist_validation: bool,
    blacklisted_domains: Vec<String>,
    blacklisted_mx_ip_addresses: Vec<String>,
    dns: Option<String>,
    validation_type_by_domain: Vec<(String, ValidationType)>,
    not_rfc_mx_lookup_flow: bool,
    smtp_port: u16,
    smtp_fail_fast: bool,
    smtp_safe_check: bool,
    email_pattern: Option<String>,
    smtp_error_body_pattern: Option<String>,
    cancellation: Option<Cancellation>,
}

impl ConfigBuilder {
    pub fn new(verifier_email: impl Into<String>) -> Self {
        Self {
            verifier_email: verifier_email.into(),
            verifier_domain: None,
            validation_type_default: ValidationType::default(),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            connection_attempts: DEFAULT_CONNECTION_ATTEMPTS,
            whitelisted_domains: Vec::new(),
            whitelist_validation: false,
            blacklisted_domains: Vec::new(),
            blacklisted_mx_ip_addresses: Vec::new(),
            dns: None,
            validation_type_by_domain: Vec::new(),
            not_rfc_mx_lookup_flow: false,
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_fail_fast: false,
            smtp_safe_check: false,
            email_pattern: None,
            smtp_error_body_pattern: None,
            cancellation: None,
        }
    }

    pub fn verifier_domain(mut self, domain: impl Into<String>) -> Self {
        self.verifier_domain = Some(domain.into());
        self
    }

    pub fn validation_type_default(mut self, validation_type: ValidationType) -> Self {
        self.validation_type_default = validation_type;
        self
    }

    /// Seconds.
    pub fn connection_timeout(mut self, seconds: u64) -> Self {
        self.connection_timeout = seconds;
        self
    }

    /// Seconds.
    pub fn response_timeout(mut self, seconds: u64) -> Self {
        self.response_timeout = seconds;
        self
    }

    pub fn connection_attempts(mut self, attempts: u32) -> Self {
        self.connection_attempts = attempts;
        self
    }

    pub fn whitelisted_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelisted_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn whitelist_validation(mut self, enabled: bool) -> Self {
        self.whitelist_validation = enabled;
        self
    }

    pub fn blacklisted_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklisted_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn blacklisted_mx_ip_addresses<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklisted_mx_ip_addresses = addresses.into_iter().map(Into::into).collect();
        self
    }

    /// `"A.B.C.D"` or `"A.B.C.D:port"`.
    pub fn dns(mut self, gateway: impl Into<String>) -> Self {
        self.dns = Some(gateway.into());
        self
    }

    pub fn validation_type_for_domain(
        mut self,
        domain: impl Into<String>,
        validation_type: ValidationType,
    ) -> Self {
        self.validation_type_by_domain
            .push((domain.into(), validation_type));
        self
    }

    pub fn not_rfc_mx_lookup_flow(mut self, enabled: bool) -> Self {
        self.not_rfc_mx_lookup_flow = enabled;
        self
    }

    pub fn smtp_port(mut self, port: u16) -> Self {
        self.smtp_port = port;
        self
    }

    pub fn smtp_fail_fast(mut self, enabled: bool) -> Self {
        self.smtp_fail_fast = enabled;
        self
    }

    pub fn smtp_safe_check(mut self, enabled: bool) -> Self {
        self.smtp_safe_check = enabled;
        self
    }

    pub fn email_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.email_pattern = Some(pattern.into());
        self
    }

    pub fn smtp_error_body_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.smtp_error_body_pattern = Some(pattern.into());
        self
    }

    pub fn cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let email_pattern = compile_or_default(self.email_pattern.as_deref(), &EMAIL_RE)?;
        let smtp_error_body_pattern =
            compile_or_default(self.smtp_error_body_pattern.as_deref(), &SMTP_ERROR_BODY_RE)?;

        if !email_pattern.is_match(&self.verifier_email) {
            return Err(ConfigError::invalid(&self.verifier_email, "verifier email"));
        }
        let verifier_domain =
            build_verifier_domain(&self.verifier_email, self.verifier_domain.as_deref())?;

        if !self.validation_type_default.is_requestable() {
            return Err(ConfigError::invalid(
                self.validation_type_default,
                "default validation type",
            ));
        }

        let connection_timeout = positive(self.connection_timeout)?;
        let response_timeout = positive(self.response_timeout)?;
        let connection_attempts = positive(u64::from(self.connection_attempts))? as u32;
        let smtp_port = positive(u64::from(self.smtp_port))? as u16;

        check_domains(&self.whitelisted_domains)?;
        check_domains(&self.blacklisted_domains)?;
        if let Some(ip) = self
            .blacklisted_mx_ip_addresses
            .iter()
            .find(|ip| !is_ipv4(ip))
        {
            return Err(ConfigError::invalid(ip, "ip address"));
        }

        let dns = self.dns.as_deref().map(parse_dns_gateway).transpose()?;

        let mut validation_type_by_domain = HashMap::new();
        for (domain, validation_type) in self.validation_type_by_domain {
            if !is_domain(&domain) {
                return Err(ConfigError::invalid(domain, "domain name"));
            }
            if !validation_type.is_requestable() {
                return Err(ConfigError::invalid(validation_type, "validation type"));
            }
            validation_type_by_domain.insert(domain, validation_type);
        }

        Ok(Config {
            verifier_email: self.verifier_email,
            verifier_domain,
            validation_type_default: self.validation_type_default,
            connection_timeout: Duration::from_secs(connection_timeout),
            response_timeout: Duration::from_secs(response_timeout),
            connection_attempts,
            whitelisted_domains: self.whitelisted_domains,
            whitelist_validation: self.whitelist_validation,
            blacklisted_domains: self.blacklisted_domains,
            blacklisted_mx_ip_addresses: self.blacklisted_mx_ip_addresses,
            dns,
            validation_type_by_domain,
            not_rfc_mx_lookup_flow: self.not_rfc_mx_lookup_flow,
            smtp_port,
            smtp_fail_fast: self.smtp_fail_fast,
            smtp_safe_check: self.smtp_safe_check,
            email_pattern,
            smtp_error_body_pattern,
            cancellation: self.cancellation,
        })
    }
}

/// Returns `domain` when given, otherwise the part of `verifier_email` after
/// the last `@`. Either way the result must be a valid domain.
pub fn build_verifier_domain(
    verifier_email: &str,
    domain: Option<&str>,
) -> Result<String, ConfigError> {
    match domain.filter(|value| !value.is_empty()) {
        Some(domain) if is_domain(domain) => Ok(domain.to_string()),
        Some(domain) => Err(ConfigError::invalid(domain, "verifier domain")),
        None => {
            let derived = verifier_email
                .rsplit_once('@')
                .map(|(_, domain)| domain)
                .unwrap_or_default();
            if is_domain(derived) {
                Ok(derived.to_string())
            } else {
                Err(ConfigError::invalid(derived, "verifier domain"))
            }
        }
    }
}

fn compile_or_default(pattern: Option<&str>, default: &Regex) -> Result<Regex, ConfigError> {
    match pattern {
        Some(pattern) => Regex::new(pattern).map_err(|err| ConfigError::pattern(pattern, err)),
        None => Ok(default.clone()),
    }
}

fn positive(value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        Err(ConfigError::invalid(value, "positive integer"))
    } else {
        Ok(value)
    }
}

fn check_domains(domains: &[String]) -> Result<(), ConfigError> {
    match domains.iter().find(|domain| !is_domain(domain)) {
        Some(domain) => Err(ConfigError::invalid(domain, "domain name")),
        None => Ok(()),
    }
}

fn parse_dns_gateway(gateway: &str) -> Result<SocketAddr, ConfigError> {
    if !is_dns_gateway(gateway) {
        return Err(ConfigError::invalid(gateway, "dns server"));
    }
    let with_port = if gateway.contains(':') {
        gateway.to_string()
    } else {
        format!("{gateway}:{DEFAULT_DNS_PORT}")
    };
    with_port
        .parse()
        .map_err(|_| ConfigError::invalid(gateway, "dns server"))
}
