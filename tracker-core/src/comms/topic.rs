//! Topic names.
//!
//! A `Topic` identifies a logical message stream on the pub/sub transport.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of a logical stream on the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic(String);

impl Topic {
    /// Creates a topic from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The topic carrying trade events.
    pub fn trade() -> Self {
        Self::new("trade")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Topic {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Topic::new(s))
    }
}

impl Default for Topic {
    fn default() -> Self {
        Topic::trade()
    }
}
