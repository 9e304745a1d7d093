//! Record severity levels

use serde::{Deserialize, Serialize};
use taglog_utils::{Result, TaglogError};

/// Severity of a log record, ordered from least to most severe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Three-letter uppercase form used in delimited output (`INF`, `ERR`, ...)
    pub fn short(&self) -> &'static str {
        match self {
            Self::Trace => "TRA",
            Self::Debug => "DEB",
            Self::Info => "INF",
            Self::Warn => "WAR",
            Self::Error => "ERR",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Level {
    type Err = TaglogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(TaglogError::config(format!("Invalid log level: {}", s))),
        }
    }
}
