use std::cell::RefCell;
use std::collections::HashMap;

use proptest::prelude::*;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::op::{Query, ResponseCode};

use super::{
    DnsError, LookupDns, MxRecord, a_record, a_records, cname_record, mx_records, ptr_records,
    with_retry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum QueryKind {
    A,
    Cname,
    Mx,
    Ptr,
}

/// In-memory zone. Unknown names answer "not found"; every query is recorded
/// so tests can assert how many were issued.
#[derive(Default)]
pub(crate) struct StubZone {
    a: HashMap<String, Vec<String>>,
    cname: HashMap<String, String>,
    mx: HashMap<String, Vec<MxRecord>>,
    ptr: HashMap<String, Vec<String>>,
    transient: RefCell<HashMap<(QueryKind, String), u32>>,
    queries: RefCell<Vec<(QueryKind, String)>>,
}

impl StubZone {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_a(mut self, host: &str, addrs: &[&str]) -> Self {
        self.a
            .insert(host.to_string(), addrs.iter().map(|a| a.to_string()).collect());
        self
    }

    pub(crate) fn with_cname(mut self, host: &str, target: &str) -> Self {
        self.cname.insert(host.to_string(), target.to_string());
        self
    }

    pub(crate) fn with_mx(mut self, host: &str, records: &[(u16, &str)]) -> Self {
        let records = records
            .iter()
            .map(|(preference, exchange)| MxRecord::new(*preference, *exchange))
            .collect();
        self.mx.insert(host.to_string(), records);
        self
    }

    pub(crate) fn with_ptr(mut self, addr: &str, names: &[&str]) -> Self {
        self.ptr
            .insert(addr.to_string(), names.iter().map(|n| n.to_string()).collect());
        self
    }

    /// The next `count` queries of `kind` for `name` fail with a transient error.
    pub(crate) fn with_transient_failures(self, kind: QueryKind, name: &str, count: u32) -> Self {
        self.transient
            .borrow_mut()
            .insert((kind, name.to_string()), count);
        self
    }

    pub(crate) fn count(&self, kind: QueryKind) -> usize {
        self.queries
            .borrow()
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    pub(crate) fn queried(&self, kind: QueryKind, name: &str) -> usize {
        self.queries
            .borrow()
            .iter()
            .filter(|(k, n)| *k == kind && n == name)
            .count()
    }

    fn record(&self, kind: QueryKind, name: &str) -> Result<(), DnsError> {
        self.queries.borrow_mut().push((kind, name.to_string()));
        let mut transient = self.transient.borrow_mut();
        match transient.get_mut(&(kind, name.to_string())) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(DnsError::Lookup {
                    name: name.to_string(),
                    source: ResolveError::from("stub timeout"),
                })
            }
            _ => Ok(()),
        }
    }

    fn answer<T: Clone>(map: &HashMap<String, T>, name: &str) -> Result<T, DnsError> {
        map.get(name)
            .cloned()
            .ok_or_else(|| DnsError::not_found(name))
    }
}

impl LookupDns for StubZone {
    fn lookup_a(&self, host: &str) -> Result<Vec<String>, DnsError> {
        self.record(QueryKind::A, host)?;
        Self::answer(&self.a, host)
    }

    fn lookup_cname(&self, host: &str) -> Result<Option<String>, DnsError> {
        self.record(QueryKind::Cname, host)?;
        Ok(self.cname.get(host).cloned())
    }

    fn lookup_mx(&self, host: &str) -> Result<Vec<MxRecord>, DnsError> {
        self.record(QueryKind::Mx, host)?;
        Self::answer(&self.mx, host)
    }

    fn lookup_ptr(&self, addr: &str) -> Result<Vec<String>, DnsError> {
        self.record(QueryKind::Ptr, addr)?;
        Self::answer(&self.ptr, addr)
    }
}

#[test]
fn mx_records_sort_by_priority_and_strip_dots() {
    let zone = StubZone::new().with_mx(
        "example.com",
        &[
            (20, "mx3.example.com."),
            (10, "mx1.example.com."),
            (20, "mx4.example.com."),
            (10, "mx2.example.com"),
        ],
    );
    let mx = mx_records(&zone, "example.com").expect("records");
    assert_eq!(mx.priorities, vec![10, 10, 20, 20]);
    assert_eq!(
        mx.hosts,
        vec![
            "mx1.example.com",
            "mx2.example.com",
            "mx3.example.com",
            "mx4.example.com"
        ]
    );
    assert!(!mx.is_null_mx());
}

#[test]
fn null_mx_is_detected() {
    let zone = StubZone::new().with_mx("nomail.example", &[(0, ".")]);
    let mx = mx_records(&zone, "nomail.example").expect("records");
    assert!(mx.is_null_mx());
}

#[test]
fn a_records_drop_ipv6_entries() {
    let zone = StubZone::new().with_a(
        "mail.example.com",
        &["2001:db8::25", "192.0.2.25", "192.0.2.26"],
    );
    let addrs = a_records(&zone, "mail.example.com").expect("addresses");
    assert_eq!(addrs, vec!["192.0.2.25", "192.0.2.26"]);
}

#[test]
fn a_record_without_ipv4_is_not_found() {
    let zone = StubZone::new().with_a("v6only.example.com", &["2001:db8::1"]);
    let err = a_record(&zone, "v6only.example.com").expect_err("no ipv4");
    assert!(err.is_not_found());
}

#[test]
fn cname_equal_to_input_means_no_alias() {
    let zone = StubZone::new()
        .with_cname("self.example.com", "self.example.com.")
        .with_cname("www.example.com", "web.example.net.");
    assert_eq!(cname_record(&zone, "self.example.com").unwrap(), "");
    assert_eq!(cname_record(&zone, "plain.example.com").unwrap(), "");
    assert_eq!(cname_record(&zone, "www.example.com").unwrap(), "web.example.net");
}

#[test]
fn ptr_records_strip_dots() {
    let zone = StubZone::new()
        .with_ptr("192.0.2.25", &["mail.example.com.", "smtp.example.com."]);
    let names = ptr_records(&zone, "192.0.2.25").expect("names");
    assert_eq!(names, vec!["mail.example.com", "smtp.example.com"]);
}

#[test]
fn retry_recovers_from_transient_failures() {
    let zone = StubZone::new()
        .with_a("mail.example.com", &["192.0.2.25"])
        .with_transient_failures(QueryKind::A, "mail.example.com", 1);
    let addrs = with_retry(2, || a_records(&zone, "mail.example.com")).expect("second try");
    assert_eq!(addrs, vec!["192.0.2.25"]);
    assert_eq!(zone.queried(QueryKind::A, "mail.example.com"), 2);
}

#[test]
fn retry_gives_up_after_attempts() {
    let zone = StubZone::new()
        .with_a("mail.example.com", &["192.0.2.25"])
        .with_transient_failures(QueryKind::A, "mail.example.com", 5);
    let err = with_retry(3, || a_records(&zone, "mail.example.com")).expect_err("exhausted");
    assert!(err.is_retryable());
    assert_eq!(zone.count(QueryKind::A), 3);
}

#[test]
fn retry_stops_on_not_found() {
    let zone = StubZone::new();
    let err = with_retry(5, || mx_records(&zone, "missing.example")).expect_err("not found");
    assert!(err.is_not_found());
    assert_eq!(zone.count(QueryKind::Mx), 1);
}

fn empty_answer(response_code: ResponseCode) -> ResolveError {
    ResolveErrorKind::NoRecordsFound {
        query: Box::new(Query::new()),
        soa: None,
        negative_ttl: None,
        response_code,
        trusted: false,
    }
    .into()
}

#[test]
fn server_failures_stay_retryable() {
    for code in [
        ResponseCode::ServFail,
        ResponseCode::Refused,
        ResponseCode::FormErr,
        ResponseCode::NotImp,
    ] {
        let err = DnsError::from_resolve("example.com", empty_answer(code));
        assert!(err.is_retryable(), "{code:?}");
        assert!(!err.is_not_found(), "{code:?}");
    }
}

#[test]
fn nxdomain_and_empty_noerror_are_not_found() {
    for code in [ResponseCode::NXDomain, ResponseCode::NoError] {
        let err = DnsError::from_resolve("missing.example", empty_answer(code));
        assert!(err.is_not_found(), "{code:?}");
        assert!(!err.is_retryable(), "{code:?}");
    }
}

#[test]
fn resolve_errors_are_transient() {
    let err = DnsError::from_resolve("example.com", ResolveError::from("timed out"));
    assert!(err.is_retryable());
    assert!(!err.is_not_found());
    assert!(!err.is_null_mx());
}

proptest! {
    #[test]
    fn mx_sort_is_stable(priorities in proptest::collection::vec(0u16..4, 0..12)) {
        let hosts: Vec<String> = (0..priorities.len())
            .map(|i| format!("mx{i}.example.com"))
            .collect();
        let records: Vec<(u16, &str)> = priorities
            .iter()
            .zip(hosts.iter())
            .map(|(p, h)| (*p, h.as_str()))
            .collect();
        let zone = StubZone::new().with_mx("example.com", &records);
        let mx = mx_records(&zone, "example.com").unwrap();

        prop_assert!(mx.priorities.windows(2).all(|w| w[0] <= w[1]));
        let index = |host: &str| -> usize {
            host.trim_start_matches("mx")
                .trim_end_matches(".example.com")
                .parse()
                .unwrap()
        };
        let pairs: Vec<_> = mx.priorities.iter().zip(mx.hosts.iter()).collect();
        for window in pairs.windows(2) {
            let ((p0, h0), (p1, h1)) = (window[0], window[1]);
            if p0 == p1 {
                prop_assert!(index(h0) < index(h1));
            }
        }
    }
}
