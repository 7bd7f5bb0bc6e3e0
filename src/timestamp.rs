//! Millisecond Unix timestamp used for catalog price-validity windows.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, SystemTimeError};

/// Milliseconds since the Unix epoch.
///
/// The catalog expresses `price_valid_until` this way; comparing against
/// [`UnixMillis::now`] is how the Relay Engine rejects stale quotes.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixMillis(pub i64);

impl UnixMillis {
    pub fn now() -> Result<Self, SystemTimeError> {
        let millis = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)?
            .as_millis();
        Ok(Self(millis as i64))
    }
}

impl Display for UnixMillis {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
