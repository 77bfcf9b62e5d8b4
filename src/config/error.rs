use thiserror::Error;

/// Errors raised while building a [`Config`](super::Config) or when a
/// validation call receives an unusable argument.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{value} is invalid {what}")]
    Invalid { value: String, what: &'static str },
    #[error("{pattern} is invalid regex pattern: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(value: impl ToString, what: &'static str) -> Self {
        Self::Invalid {
            value: value.to_string(),
            what,
        }
    }

    pub(crate) fn pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            source,
        }
    }
}
