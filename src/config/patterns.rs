//! Built-in patterns. The unanchored forms are the public defaults; the
//! anchored statics are used by the builder for whole-value checks.

use once_cell::sync::Lazy;
use regex::Regex;

pub const DOMAIN_PATTERN: &str = r"(?i)[\p{L}0-9]+([\-.]{1}[\p{L}0-9]+)*\.\p{L}{2,63}";

pub const EMAIL_PATTERN: &str =
    r"(\A([\p{L}0-9]+[\W\w]*)@((?i)[\p{L}0-9]+([\-.]{1}[\p{L}0-9]+)*\.\p{L}{2,63})\z)";

pub const SMTP_ERROR_BODY_PATTERN: &str = r"(?i).*550{1}.*(user|account|customer|mailbox).*";

pub const IPV4_PATTERN: &str =
    r"((\d|[1-9]\d|1\d{2}|2[0-4]\d|25[0-5])\.){3}(\d|[1-9]\d|1\d{2}|2[0-4]\d|25[0-5])";

pub const PORT_PATTERN: &str =
    r"(6553[0-5]|655[0-2]\d|65[0-4]\d{2}|6[0-4]\d{3}|[1-5]\d{4}|[1-9]\d{0,3})";

pub(crate) static EMAIL_RE: Lazy<Regex> = Lazy::new(|| compile(EMAIL_PATTERN));

pub(crate) static SMTP_ERROR_BODY_RE: Lazy<Regex> = Lazy::new(|| compile(SMTP_ERROR_BODY_PATTERN));

pub(crate) static DOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| compile(&format!(r"\A(?:{DOMAIN_PATTERN})\z")));

pub(crate) static IPV4_RE: Lazy<Regex> = Lazy::new(|| compile(&format!(r"\A{IPV4_PATTERN}\z")));

pub(crate) static DNS_GATEWAY_RE: Lazy<Regex> =
    Lazy::new(|| compile(&format!(r"\A{IPV4_PATTERN}(:{PORT_PATTERN})?\z")));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern must compile")
}

pub(crate) fn is_domain(value: &str) -> bool {
    DOMAIN_RE.is_match(value)
}

/// Full-string IPv4 literal check, used to keep IPv6 out of A results.
pub fn is_ipv4(value: &str) -> bool {
    IPV4_RE.is_match(value)
}

pub(crate) fn is_dns_gateway(value: &str) -> bool {
    DNS_GATEWAY_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn email_pattern_accepts_unicode_domain() {
        assert!(EMAIL_RE.is_match("user@mañana.es"));
        assert!(EMAIL_RE.is_match("first.last+tag@Sub.Example.COM"));
    }

    #[test]
    fn email_pattern_rejects_missing_tld() {
        assert!(!EMAIL_RE.is_match("user@localhost"));
        assert!(!EMAIL_RE.is_match("@example.com"));
        assert!(!EMAIL_RE.is_match("user@example.c"));
    }

    #[test]
    fn smtp_error_body_matches_mailbox_unknown() {
        assert!(SMTP_ERROR_BODY_RE.is_match("550 5.1.1 User unknown"));
        assert!(SMTP_ERROR_BODY_RE.is_match("550 Requested action not taken: MAILBOX unavailable"));
        assert!(!SMTP_ERROR_BODY_RE.is_match("421 greylisted"));
        assert!(!SMTP_ERROR_BODY_RE.is_match("554 user blocked by policy"));
    }

    #[test]
    fn ipv4_rejects_ipv6_and_out_of_range() {
        assert!(is_ipv4("203.0.113.5"));
        assert!(!is_ipv4("2001:db8::1"));
        assert!(!is_ipv4("256.1.1.1"));
        assert!(!is_ipv4("01.1.1.1"));
    }

    #[test]
    fn dns_gateway_port_bounds() {
        assert!(is_dns_gateway("10.0.0.1"));
        assert!(is_dns_gateway("10.0.0.1:65535"));
        assert!(!is_dns_gateway("10.0.0.1:65536"));
        assert!(!is_dns_gateway("10.0.0.1:0"));
        assert!(!is_dns_gateway("10.0.0.1:"));
    }

    proptest! {
        #[test]
        fn every_valid_port_is_accepted(port in 1u32..=65535) {
            let gateway = format!("192.0.2.1:{port}");
            prop_assert!(is_dns_gateway(&gateway));
        }

        #[test]
        fn every_octet_quad_is_ipv4(
            a in 0u8..=255,
            b in 0u8..=255,
            c in 0u8..=255,
            d in 0u8..=255,
        ) {
            let addr = format!("{a}.{b}.{c}.{d}");
            prop_assert!(is_ipv4(&addr));
        }
    }
}
