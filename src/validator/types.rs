use std::collections::BTreeMap;
use std::fmt;

use crate::config::ValidationType;
use crate::smtp::SmtpRequest;

pub const BLACKLISTED_EMAIL: &str = "blacklisted email";
pub const REGEX_MISMATCH: &str = "email does not match the regular expression";
pub const TARGET_HOSTS_NOT_FOUND: &str = "target host(s) not found";
pub const BLACKLISTED_MX_IP: &str = "blacklisted mx server ip address";
pub const SMTP_ERROR: &str = "smtp error";

/// One step of the pipeline. Also the key of [`ValidatorResult::errors`].
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValidationLayer {
    DomainListMatch,
    Regex,
    Mx,
    MxBlacklist,
    Smtp,
}

impl ValidationLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DomainListMatch => "domain_list_match",
            Self::Regex => "regex",
            Self::Mx => "mx",
            Self::MxBlacklist => "mx_blacklist",
            Self::Smtp => "smtp",
        }
    }

    /// Layers run after the list preamble for a given depth.
    pub fn sequence(depth: ValidationType) -> &'static [ValidationLayer] {
        const ALL: [ValidationLayer; 4] = [
            ValidationLayer::Regex,
            ValidationLayer::Mx,
            ValidationLayer::MxBlacklist,
            ValidationLayer::Smtp,
        ];
        match depth {
            ValidationType::Regex => &ALL[..1],
            ValidationType::Mx => &ALL[..2],
            ValidationType::MxBlacklist => &ALL[..3],
            ValidationType::Smtp => &ALL,
            ValidationType::Whitelist => &[],
        }
    }
}

impl fmt::Display for ValidationLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorResult {
    pub email: String,
    /// Everything after the last `@`, empty when there is none.
    pub domain: String,
    pub punycode_email: String,
    pub punycode_domain: String,
    pub validation_type: ValidationType,
    pub success: bool,
    pub errors: BTreeMap<ValidationLayer, String>,
    /// IPv4 addresses, MX priority order, no duplicates.
    pub mail_servers: Vec<String>,
    /// Per-host SMTP probes, kept when safe check is enabled.
    pub smtp_debug: Option<Vec<SmtpRequest>>,
    pub used_validations: Vec<ValidationLayer>,
    #[cfg_attr(feature = "with-serde", serde(skip))]
    pub(crate) pass_from_domain_list_match: bool,
}

impl ValidatorResult {
    /// Empty, unsuccessful result for `email` at the given depth.
    pub fn new(email: &str, validation_type: ValidationType) -> Self {
        let domain = email
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or_default();
        Self {
            email: email.to_string(),
            domain: domain.to_string(),
            punycode_email: String::new(),
            punycode_domain: String::new(),
            validation_type,
            success: false,
            errors: BTreeMap::new(),
            mail_servers: Vec::new(),
            smtp_debug: None,
            used_validations: Vec::new(),
            pass_from_domain_list_match: false,
        }
    }

    pub(crate) fn fail(&mut self, layer: ValidationLayer, message: &str) {
        self.success = false;
        self.errors.insert(layer, message.to_string());
    }

    pub fn error(&self, layer: ValidationLayer) -> Option<&str> {
        self.errors.get(&layer).map(String::as_str)
    }

    /// Whether the list preamble let the address through to the deeper layers.
    pub fn is_pass_from_domain_list_match(&self) -> bool {
        self.pass_from_domain_list_match
    }
}
