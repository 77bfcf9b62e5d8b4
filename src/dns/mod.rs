//! DNS lookups used by the MX layer.
//!
//! [`LookupDns`] is the raw capability (one method per query kind). The free
//! functions on top of it shape the answers the way the validator expects:
//! trailing dots stripped, IPv6 filtered out of `A` answers, MX records in
//! ascending priority. Production code binds [`DnsResolver`]; tests bind an
//! in-memory zone.

mod error;
mod resolver;
mod types;

pub use error::DnsError;
pub use resolver::DnsResolver;
pub use types::{MxHosts, MxRecord};

use crate::config::patterns::is_ipv4;

pub trait LookupDns {
    /// Addresses from the `A` answer, in answer order.
    fn lookup_a(&self, host: &str) -> Result<Vec<String>, DnsError>;

    /// Canonical name when `host` is an alias, `None` when the name exists
    /// without a `CNAME`.
    fn lookup_cname(&self, host: &str) -> Result<Option<String>, DnsError>;

    /// MX records in answer order, exchanges as returned by the server.
    fn lookup_mx(&self, host: &str) -> Result<Vec<MxRecord>, DnsError>;

    /// Reverse lookup of an address literal.
    fn lookup_ptr(&self, addr: &str) -> Result<Vec<String>, DnsError>;
}

pub fn a_records<L: LookupDns + ?Sized>(dns: &L, host: &str) -> Result<Vec<String>, DnsError> {
    let addresses = dns.lookup_a(host)?;
    Ok(addresses.into_iter().filter(|addr| is_ipv4(addr)).collect())
}

pub fn a_record<L: LookupDns + ?Sized>(dns: &L, host: &str) -> Result<String, DnsError> {
    a_records(dns, host)?
        .into_iter()
        .next()
        .ok_or_else(|| DnsError::not_found(host))
}

/// Empty string when `host` is not an alias.
pub fn cname_record<L: LookupDns + ?Sized>(dns: &L, host: &str) -> Result<String, DnsError> {
    let canonical = dns.lookup_cname(host)?.unwrap_or_default();
    let canonical = trim_root(&canonical);
    if canonical.is_empty() || canonical.eq_ignore_ascii_case(trim_root(host)) {
        Ok(String::new())
    } else {
        Ok(canonical.to_string())
    }
}

pub fn mx_records<L: LookupDns + ?Sized>(dns: &L, host: &str) -> Result<MxHosts, DnsError> {
    let mut records = dns.lookup_mx(host)?;
    // stable: ties keep the server order
    records.sort_by_key(|record| record.preference);
    let (priorities, hosts) = records
        .into_iter()
        .map(|record| (record.preference, trim_root(&record.exchange).to_string()))
        .unzip();
    Ok(MxHosts { priorities, hosts })
}

pub fn ptr_records<L: LookupDns + ?Sized>(dns: &L, addr: &str) -> Result<Vec<String>, DnsError> {
    let names = dns.lookup_ptr(addr)?;
    Ok(names
        .iter()
        .map(|name| trim_root(name).to_string())
        .collect())
}

/// Runs `query` up to `attempts` times. Only transient failures are retried;
/// the last error is returned.
pub(crate) fn with_retry<T>(
    attempts: u32,
    mut query: impl FnMut() -> Result<T, DnsError>,
) -> Result<T, DnsError> {
    let mut attempt = 1;
    loop {
        match query() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < attempts => {
                tracing::trace!(attempt, error = %err, "retrying dns query");
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn trim_root(name: &str) -> &str {
    name.trim_end_matches('.')
}

#[cfg(test)]
pub(crate) mod tests;
