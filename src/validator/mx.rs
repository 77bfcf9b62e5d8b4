use std::collections::HashSet;

use tracing::{debug, trace};

use super::types::{TARGET_HOSTS_NOT_FOUND, ValidationLayer, ValidatorResult};
use crate::config::Config;
use crate::dns::{
    DnsError, LookupDns, a_record, a_records, cname_record, mx_records, ptr_records, with_retry,
};

pub(super) fn check<R: LookupDns + ?Sized>(result: &mut ValidatorResult, config: &Config, dns: &R) {
    let Some((local, domain)) = result
        .email
        .rsplit_once('@')
        .map(|(local, domain)| (local.to_string(), domain.to_string()))
    else {
        result.fail(ValidationLayer::Mx, TARGET_HOSTS_NOT_FOUND);
        return;
    };
    let punycode_domain = match idna::domain_to_ascii(&domain) {
        Ok(ascii) if !ascii.is_empty() => ascii,
        Ok(_) | Err(_) => {
            debug!(domain = domain.as_str(), "punycode conversion failed");
            result.fail(ValidationLayer::Mx, TARGET_HOSTS_NOT_FOUND);
            return;
        }
    };
    result.punycode_email = format!("{local}@{punycode_domain}");

    match mail_servers(dns, &punycode_domain, config) {
        Ok(servers) if !servers.is_empty() => {
            debug!(domain = punycode_domain.as_str(), ?servers, "mail servers resolved");
            result.mail_servers = servers;
            result.success = true;
        }
        Ok(_) => result.fail(ValidationLayer::Mx, TARGET_HOSTS_NOT_FOUND),
        Err(err) => {
            debug!(error = %err, "mx resolution stopped");
            result.fail(ValidationLayer::Mx, TARGET_HOSTS_NOT_FOUND);
        }
    }
    result.punycode_domain = punycode_domain;
}

/// MX records first, then the CNAME/PTR detour, then the domain's own `A`
/// record. A null MX ends the search with an error.
fn mail_servers<R: LookupDns + ?Sized>(
    dns: &R,
    domain: &str,
    config: &Config,
) -> Result<Vec<String>, DnsError> {
    let attempts = config.connection_attempts();
    let mut addresses = match mx_addresses(dns, domain, attempts) {
        Ok(addresses) => addresses,
        Err(err) if err.is_null_mx() => return Err(err),
        Err(err) => {
            trace!(domain, error = %err, "no usable mx records");
            Vec::new()
        }
    };

    if addresses.is_empty() && !config.not_rfc_mx_lookup_flow() {
        addresses = cname_addresses(dns, domain, attempts);
        if addresses.is_empty() {
            match with_retry(attempts, || a_record(dns, domain)) {
                Ok(address) => addresses.push(address),
                Err(err) => trace!(domain, error = %err, "no a record fallback"),
            }
        }
    }

    Ok(fetch_target_hosts(addresses))
}

/// IPv4 addresses of every MX host of `domain`, in priority order. Hosts
/// that do not resolve are skipped.
fn mx_addresses<R: LookupDns + ?Sized>(
    dns: &R,
    domain: &str,
    attempts: u32,
) -> Result<Vec<String>, DnsError> {
    let mx = with_retry(attempts, || mx_records(dns, domain))?;
    if mx.is_null_mx() {
        return Err(DnsError::null_mx(domain));
    }

    let mut addresses = Vec::new();
    for host in mx.hosts.iter().filter(|host| !host.is_empty()) {
        match with_retry(attempts, || a_records(dns, host)) {
            Ok(found) => addresses.extend(found),
            Err(err) => trace!(host = host.as_str(), error = %err, "skipping mx host"),
        }
    }
    Ok(addresses)
}

/// `CNAME → A → PTR → MX` for domains that alias another host.
fn cname_addresses<R: LookupDns + ?Sized>(dns: &R, domain: &str, attempts: u32) -> Vec<String> {
    let canonical = match with_retry(attempts, || cname_record(dns, domain)) {
        Ok(canonical) if !canonical.is_empty() => canonical,
        Ok(_) => return Vec::new(),
        Err(err) => {
            trace!(domain, error = %err, "cname lookup failed");
            return Vec::new();
        }
    };
    let address = match with_retry(attempts, || a_record(dns, &canonical)) {
        Ok(address) => address,
        Err(err) => {
            trace!(host = canonical.as_str(), error = %err, "cname target has no address");
            return Vec::new();
        }
    };
    let names = match with_retry(attempts, || ptr_records(dns, &address)) {
        Ok(names) => names,
        Err(err) => {
            trace!(address = address.as_str(), error = %err, "reverse lookup failed");
            return Vec::new();
        }
    };

    names
        .iter()
        .filter_map(|name| mx_addresses(dns, name, attempts).ok())
        .flatten()
        .collect()
}

/// Drops repeated addresses, keeping the first occurrence.
pub(super) fn fetch_target_hosts(addresses: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    addresses
        .into_iter()
        .filter(|address| seen.insert(address.clone()))
        .collect()
}
