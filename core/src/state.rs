//! Terminal states of a `Request`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InvalidArgument;

/// Outcome of a request. A request with no state yet holds `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    /// Construction failed; the request was never sent.
    Error,
    Success,
    /// Unsuccessful response that must be surfaced.
    Failure,
    /// Unsuccessful response suppressed by `raise_for_status: false`.
    NotRaised,
}

impl RequestState {
    pub const ALL: [RequestState; 4] = [
        RequestState::Error,
        RequestState::Success,
        RequestState::Failure,
        RequestState::NotRaised,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestState::Error => "ERROR",
            RequestState::Success => "SUCCESS",
            RequestState::Failure => "FAILURE",
            RequestState::NotRaised => "NOT_RAISED",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestState {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| InvalidArgument { value: s.to_string() })
    }
}

impl TryFrom<&str> for RequestState {
    type Error = InvalidArgument;

    fn try_from(value: &str) -> Result<Self, InvalidArgument> {
        value.parse()
    }
}
