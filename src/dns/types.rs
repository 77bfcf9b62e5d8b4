#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }
}

/// Result of [`mx_records`](super::mx_records): priorities and hosts as two
/// parallel sequences, ascending priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MxHosts {
    pub priorities: Vec<u16>,
    pub hosts: Vec<String>,
}

impl MxHosts {
    /// RFC 7505: a single record with preference 0 and an empty exchange.
    pub fn is_null_mx(&self) -> bool {
        matches!(
            (self.priorities.as_slice(), self.hosts.as_slice()),
            ([0], [host]) if host.is_empty()
        )
    }
}
