//! Layered email validation.
//!
//! A call first runs the domain-list preamble, then the prefix of
//! `regex → mx → mx_blacklist → smtp` selected by the validation depth,
//! stopping at the first layer that fails. Failures are recorded on the
//! returned [`ValidatorResult`]; only unusable arguments surface as errors.

mod domain_list;
mod mx;
mod mx_blacklist;
mod smtp;
mod syntax;
mod types;

pub use types::{
    BLACKLISTED_EMAIL, BLACKLISTED_MX_IP, REGEX_MISMATCH, SMTP_ERROR, TARGET_HOSTS_NOT_FOUND,
    ValidationLayer, ValidatorResult,
};

use tracing::debug;

use crate::config::{Config, ConfigError, ValidationType};
use crate::dns::{DnsResolver, LookupDns};

/// Validates `email` with the system (or configured) DNS gateway.
///
/// `validation_type` overrides the configured default depth, a per-domain
/// override in the config wins over both. Passing
/// [`ValidationType::Whitelist`] is an argument error.
pub fn validate(
    email: &str,
    config: &Config,
    validation_type: Option<ValidationType>,
) -> Result<ValidatorResult, ConfigError> {
    let resolver = DnsResolver::new(config);
    Validator::new(config, &resolver).validate(email, validation_type)
}

/// `true` only when validation ran and succeeded.
pub fn is_valid(email: &str, config: &Config, validation_type: Option<ValidationType>) -> bool {
    validate(email, config, validation_type)
        .map(|result| result.success)
        .unwrap_or(false)
}

/// Like [`validate`], resolving through `dns` instead of the network.
pub fn validate_with_resolver<R: LookupDns + ?Sized>(
    email: &str,
    config: &Config,
    validation_type: Option<ValidationType>,
    dns: &R,
) -> Result<ValidatorResult, ConfigError> {
    Validator::new(config, dns).validate(email, validation_type)
}

pub struct Validator<'a, R: LookupDns + ?Sized> {
    config: &'a Config,
    dns: &'a R,
}

impl<'a, R: LookupDns + ?Sized> Validator<'a, R> {
    pub fn new(config: &'a Config, dns: &'a R) -> Self {
        Self { config, dns }
    }

    pub fn validate(
        &self,
        email: &str,
        validation_type: Option<ValidationType>,
    ) -> Result<ValidatorResult, ConfigError> {
        let depth = self.effective_type(email, validation_type)?;
        debug!(email, depth = %depth, "validation started");
        let mut result = ValidatorResult::new(email, depth);

        ValidationLayer::DomainListMatch.check(&mut result, self.config, self.dns);
        if !result.pass_from_domain_list_match {
            debug!(email, success = result.success, "decided by domain lists");
            return Ok(result);
        }

        for layer in ValidationLayer::sequence(depth) {
            if !result.success {
                break;
            }
            result.used_validations.push(*layer);
            layer.check(&mut result, self.config, self.dns);
            if !result.success {
                debug!(email, layer = %layer, "layer failed");
            }
        }
        debug!(
            email,
            depth = %depth,
            success = result.success,
            layers = result.used_validations.len(),
            "validation finished"
        );
        Ok(result)
    }

    fn effective_type(
        &self,
        email: &str,
        requested: Option<ValidationType>,
    ) -> Result<ValidationType, ConfigError> {
        if let Some(requested) = requested.filter(|value| !value.is_requestable()) {
            return Err(ConfigError::invalid(requested, "validation type"));
        }
        let domain = email
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or_default();
        Ok(self
            .config
            .validation_type_by_domain()
            .get(domain)
            .copied()
            .or(requested)
            .unwrap_or(self.config.validation_type_default()))
    }
}

impl ValidationLayer {
    pub(crate) fn check<R: LookupDns + ?Sized>(
        self,
        result: &mut ValidatorResult,
        config: &Config,
        dns: &R,
    ) {
        match self {
            Self::DomainListMatch => domain_list::check(result, config),
            Self::Regex => syntax::check(result, config),
            Self::Mx => mx::check(result, config, dns),
            Self::MxBlacklist => mx_blacklist::check(result, config),
            Self::Smtp => smtp::check(result, config),
        }
    }
}
