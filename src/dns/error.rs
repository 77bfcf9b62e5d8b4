use thiserror::Error;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::op::ResponseCode;

#[derive(Debug, Error)]
pub enum DnsError {
    #[error("{name}: no such host")]
    NotFound { name: String },
    #[error("{domain}: null MX record, domain does not accept email")]
    NullMx { domain: String },
    #[error("lookup {name} failed: {source}")]
    Lookup {
        name: String,
        #[source]
        source: ResolveError,
    },
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
    #[error("{addr} is not an ip address")]
    InvalidAddress { addr: String },
    #[error("dns lookup cancelled")]
    Cancelled,
}

impl DnsError {
    pub(crate) fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub(crate) fn null_mx(domain: impl Into<String>) -> Self {
        Self::NullMx {
            domain: domain.into(),
        }
    }

    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }

    /// Wraps a resolver failure. Only an authoritative "no such name"
    /// (`NXDOMAIN`, or `NOERROR` with an empty answer) becomes
    /// [`DnsError::NotFound`]; `SERVFAIL`, `REFUSED` and other server codes
    /// stay transient.
    pub fn from_resolve(name: impl Into<String>, source: ResolveError) -> Self {
        let name = name.into();
        match no_records_code(&source) {
            Some(ResponseCode::NXDomain | ResponseCode::NoError) => Self::NotFound { name },
            _ => Self::Lookup { name, source },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_null_mx(&self) -> bool {
        matches!(self, Self::NullMx { .. })
    }

    /// Only transient failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Lookup { .. })
    }
}

/// Response code of an empty answer, `None` for any other failure.
pub(crate) fn no_records_code(err: &ResolveError) -> Option<ResponseCode> {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => Some(*response_code),
        _ => None,
    }
}
