use std::fmt;
use std::str::FromStr;

use super::ConfigError;

/// Depth of a validation call. `Whitelist` is never accepted as input: it only
/// shows up on results that were accepted by the whitelist preamble.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValidationType {
    Regex,
    Mx,
    MxBlacklist,
    #[default]
    Smtp,
    Whitelist,
}

impl ValidationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regex => "regex",
            Self::Mx => "mx",
            Self::MxBlacklist => "mx_blacklist",
            Self::Smtp => "smtp",
            Self::Whitelist => "whitelist",
        }
    }

    /// Whether a caller may ask for this depth.
    pub fn is_requestable(&self) -> bool {
        !matches!(self, Self::Whitelist)
    }
}

impl fmt::Display for ValidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regex" => Ok(Self::Regex),
            "mx" => Ok(Self::Mx),
            "mx_blacklist" => Ok(Self::MxBlacklist),
            "smtp" => Ok(Self::Smtp),
            other => Err(ConfigError::invalid(other, "validation type")),
        }
    }
}
