use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A decentralized identity, e.g. `@alice`
///
/// Always stored in canonical form: trimmed and prefixed with exactly one
/// leading `@`. Two identities are equal iff their canonical forms match.
///
/// ```ignore
/// let alice = AtSign::new(" alice ");
/// assert_eq!(alice.as_str(), "@alice");
/// assert_eq!(alice.without_prefix(), "alice");
/// assert_eq!(AtSign::new(alice.as_str()), alice);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AtSign(String);

impl AtSign {
    /// Canonicalize an identity string, with or without its leading `@`
    pub fn new(atsign: &str) -> Self {
        AtSign(format!("@{}", atsign.trim().trim_start_matches('@')))
    }

    /// The canonical `@`-prefixed form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bare form, without the leading `@`
    pub fn without_prefix(&self) -> &str {
        &self.0[1..]
    }
}

impl fmt::Display for AtSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("empty atSign")]
pub struct EmptyAtSign;

impl FromStr for AtSign {
    type Err = EmptyAtSign;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let atsign = AtSign::new(s);
        if atsign.without_prefix().is_empty() {
            return Err(EmptyAtSign);
        }
        Ok(atsign)
    }
}

impl TryFrom<String> for AtSign {
    type Error = EmptyAtSign;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AtSign> for String {
    fn from(atsign: AtSign) -> Self {
        atsign.0
    }
}
