//! Command builders for the protocol verbs
//!
//! Every builder produces the command text without the trailing newline;
//! the channel appends it on write.

use std::fmt;

use crate::atsign::AtSign;
use crate::keys::Metadata;

pub fn from(atsign: &AtSign) -> String {
    format!("from:{}", atsign)
}

pub fn cram(digest: &str) -> String {
    format!("cram:{}", digest)
}

pub fn pkam(signature: &str) -> String {
    format!("pkam:{}", signature)
}

/// Local lookup of a key we own
pub fn llookup(key: &str) -> String {
    format!("llookup:{}", key)
}

/// Local lookup returning the key's metadata as JSON
pub fn llookup_meta(key: &str) -> String {
    format!("llookup:meta:{}", key)
}

/// Lookup of a key another atSign shared with us
pub fn lookup(key: &str) -> String {
    format!("lookup:{}", key)
}

/// Lookup of another atSign's public key (`name@owner`, no `public:` prefix)
pub fn plookup(key: &str) -> String {
    format!("plookup:{}", key)
}

/// An atSign's public encryption key
pub fn plookup_public_key(atsign: &AtSign) -> String {
    plookup(&format!("publickey{}", atsign))
}

pub fn delete(key: &str) -> String {
    format!("delete:{}", key)
}

/// `scan[:showHidden:true][:<from>][ <regex>]`
#[derive(Debug, Clone, Default)]
pub struct ScanVerb {
    pub show_hidden: bool,
    pub from: Option<AtSign>,
    pub regex: Option<String>,
}

impl ScanVerb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_hidden(mut self, show_hidden: bool) -> Self {
        self.show_hidden = show_hidden;
        self
    }

    pub fn from(mut self, atsign: AtSign) -> Self {
        self.from = Some(atsign);
        self
    }

    pub fn regex(mut self, regex: impl Into<String>) -> Self {
        let regex = regex.into();
        self.regex = (!regex.trim().is_empty()).then_some(regex);
        self
    }
}

impl fmt::Display for ScanVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scan")?;
        if self.show_hidden {
            f.write_str(":showHidden:true")?;
        }
        if let Some(from) = &self.from {
            write!(f, ":{}", from)?;
        }
        if let Some(regex) = &self.regex {
            write!(f, " {}", regex)?;
        }
        Ok(())
    }
}

/// `update<metadata suffix>:<keyspec> <value>`
#[derive(Debug, Clone)]
pub struct UpdateVerb<'a> {
    pub key: &'a str,
    pub metadata: &'a Metadata,
    pub value: &'a str,
}

impl<'a> UpdateVerb<'a> {
    pub fn new(key: &'a str, metadata: &'a Metadata, value: &'a str) -> Self {
        Self {
            key,
            metadata,
            value,
        }
    }
}

impl fmt::Display for UpdateVerb<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "update{}:{} {}", self.metadata, self.key, self.value)
    }
}
