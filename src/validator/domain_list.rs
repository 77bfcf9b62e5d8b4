use tracing::debug;

use super::types::{BLACKLISTED_EMAIL, ValidationLayer, ValidatorResult};
use crate::config::{Config, ValidationType};

/// Whitelist/blacklist preamble. Either decides the call (reject, or accept
/// without probing) or sets `pass_from_domain_list_match` so the depth
/// layers run. Domains are compared as exact strings.
pub(super) fn check(result: &mut ValidatorResult, config: &Config) {
    let domain = result.domain.clone();
    let listed = |list: &[String]| list.iter().any(|entry| *entry == domain);
    let whitelisted = listed(config.whitelisted_domains());
    let blacklisted = listed(config.blacklisted_domains());

    if blacklisted || (config.whitelist_validation() && !whitelisted) {
        debug!(domain = domain.as_str(), blacklisted, "rejected by domain lists");
        result.fail(ValidationLayer::DomainListMatch, BLACKLISTED_EMAIL);
        return;
    }

    result.success = true;
    if whitelisted && !config.whitelist_validation() {
        debug!(domain = domain.as_str(), "accepted by whitelist");
        result.validation_type = ValidationType::Whitelist;
    } else {
        result.pass_from_domain_list_match = true;
    }
}
