//! Error types for the crate's I/O boundaries.
//!
//! The simulation itself never fails: degenerate input is absorbed inside the
//! tick. Only configuration parsing and leaderboard submission can report
//! errors, and callers are expected to log and carry on.

use std::fmt;

/// Failure while reading tuning data.
#[derive(Debug)]
pub enum ConfigError {
    /// The JSON payload could not be parsed.
    Parse(serde_json::Error),
    /// A value parsed but is unusable (e.g. an empty object table).
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable reason.
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(e) => write!(f, "tuning parse error: {}", e),
            ConfigError::Invalid { field, reason } => {
                write!(f, "tuning field '{}' is invalid: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Failure reported by a leaderboard collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardError {
    /// The service could not be reached.
    Unavailable,
    /// The service answered but refused the score.
    Rejected {
        /// Reason given by the service.
        reason: String,
    },
}

impl fmt::Display for LeaderboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaderboardError::Unavailable => write!(f, "leaderboard unavailable"),
            LeaderboardError::Rejected { reason } => {
                write!(f, "leaderboard rejected score: {}", reason)
            }
        }
    }
}

impl std::error::Error for LeaderboardError {}

/// Convenience alias for tuning results.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Convenience alias for leaderboard results.
pub type LeaderboardResult<T> = Result<T, LeaderboardError>;
