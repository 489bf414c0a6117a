//! The atProtocol key model
//!
//! Every value on a secondary server lives under a key whose *variant*
//! decides how the value is encrypted:
//!
//! - **Public** (`public:name@owner`): plaintext, signed by the owner.
//! - **Self** (`name@owner`): only the owner can read it; encrypted under
//!   the owner's self-encryption key.
//! - **Shared** (`@reader:name@owner`): encrypted under a symmetric key
//!   known only to owner and reader.
//! - **Private-hidden** (`_name@owner`, `privatekey:name@owner`): owner
//!   only and excluded from default scans.
//!
//! A key's namespace is tracked separately from its name and is only
//! joined (`name.namespace`) when the key is rendered.

mod metadata;
mod parse;

use std::fmt;
use std::str::FromStr;

pub use metadata::Metadata;

use crate::atsign::AtSign;
use crate::error::{AtError, Result};

/// Fields common to every key variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBase {
    name: String,
    owner: AtSign,
    namespace: Option<String>,
    pub metadata: Metadata,
}

impl KeyBase {
    fn new(name: &str, owner: AtSign) -> Self {
        let name = name.trim().to_string();
        let metadata = Metadata {
            is_hidden: name.starts_with('_'),
            ..Default::default()
        };
        Self {
            name,
            owner,
            namespace: None,
            metadata,
        }
    }

    /// Bare key name, without namespace
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The identity that owns (wrote) the key, a.k.a. `sharedBy`
    pub fn owner(&self) -> &AtSign {
        &self.owner
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// `name.namespace`, or just `name` without a namespace
    pub fn fully_qualified_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}.{}", self.name, namespace),
            None => self.name.clone(),
        }
    }

    fn set_namespace(&mut self, namespace: &str) {
        let namespace = namespace
            .trim_start_matches(|c: char| c == '.' || c.is_whitespace())
            .trim_end();
        self.namespace = (!namespace.is_empty()).then(|| namespace.to_string());
    }
}

/// A self key; may carry a counterpart purely so its string form
/// round-trips (`@alice:name@alice`). The counterpart plays no part in
/// encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfKey {
    pub base: KeyBase,
    pub shared_with: Option<AtSign>,
}

/// A key written by `base.owner` for `shared_with` to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedKey {
    pub base: KeyBase,
    pub shared_with: AtSign,
}

impl SharedKey {
    /// # Errors
    ///
    /// `InvalidKeyFormat` if writer and reader are the same identity.
    pub fn new(name: &str, shared_by: AtSign, shared_with: AtSign) -> Result<Self> {
        if shared_by == shared_with {
            return Err(AtError::InvalidKeyFormat(format!(
                "shared key {} has identical sharedBy and sharedWith {}",
                name, shared_by
            )));
        }
        Ok(Self {
            base: KeyBase::new(name, shared_by),
            shared_with,
        })
    }

    pub fn shared_by(&self) -> &AtSign {
        &self.base.owner
    }

    /// Name under which the reader's session caches the decrypted pair key
    pub fn shared_key_cache_name(&self) -> String {
        format!("{}:shared_key{}", self.shared_with, self.base.owner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Public,
    SelfKey,
    Shared,
    PrivateHidden,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyKind::Public => "PublicKey",
            KeyKind::SelfKey => "SelfKey",
            KeyKind::Shared => "SharedKey",
            KeyKind::PrivateHidden => "PrivateHiddenKey",
        };
        f.write_str(name)
    }
}

/// A typed atProtocol key
///
/// The `Display` impl renders the canonical key string and `FromStr`
/// reclassifies one back into a typed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtKey {
    Public(KeyBase),
    SelfKey(SelfKey),
    Shared(SharedKey),
    PrivateHidden(KeyBase),
}

impl AtKey {
    pub fn public(name: &str, owner: AtSign) -> Self {
        let mut base = KeyBase::new(name, owner);
        base.metadata.is_public = true;
        AtKey::Public(base)
    }

    pub fn self_key(name: &str, owner: AtSign) -> Self {
        AtKey::SelfKey(SelfKey {
            base: KeyBase::new(name, owner),
            shared_with: None,
        })
    }

    pub fn shared(name: &str, shared_by: AtSign, shared_with: AtSign) -> Result<Self> {
        SharedKey::new(name, shared_by, shared_with).map(AtKey::Shared)
    }

    pub fn private_hidden(name: &str, owner: AtSign) -> Self {
        let mut base = KeyBase::new(name, owner);
        base.metadata.is_hidden = true;
        AtKey::PrivateHidden(base)
    }

    /// Parse a canonical key string, see [`parse::parse_key_string`]
    pub fn parse(full: &str) -> Result<Self> {
        parse::parse_key_string(full)
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.base_mut().set_namespace(namespace);
        self
    }

    /// Replace the metadata, keeping the flags the variant and name imply
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        let hidden = self.name().starts_with('_') || self.kind() == KeyKind::PrivateHidden;
        let public = self.kind() == KeyKind::Public;
        let base = self.base_mut();
        base.metadata = metadata;
        base.metadata.is_hidden |= hidden;
        base.metadata.is_public |= public;
        self
    }

    pub fn kind(&self) -> KeyKind {
        match self {
            AtKey::Public(_) => KeyKind::Public,
            AtKey::SelfKey(_) => KeyKind::SelfKey,
            AtKey::Shared(_) => KeyKind::Shared,
            AtKey::PrivateHidden(_) => KeyKind::PrivateHidden,
        }
    }

    pub fn base(&self) -> &KeyBase {
        match self {
            AtKey::Public(base) | AtKey::PrivateHidden(base) => base,
            AtKey::SelfKey(key) => &key.base,
            AtKey::Shared(key) => &key.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut KeyBase {
        match self {
            AtKey::Public(base) | AtKey::PrivateHidden(base) => base,
            AtKey::SelfKey(key) => &mut key.base,
            AtKey::Shared(key) => &mut key.base,
        }
    }

    pub fn name(&self) -> &str {
        self.base().name()
    }

    pub fn owner(&self) -> &AtSign {
        self.base().owner()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.base().namespace()
    }

    pub fn shared_with(&self) -> Option<&AtSign> {
        match self {
            AtKey::SelfKey(key) => key.shared_with.as_ref(),
            AtKey::Shared(key) => Some(&key.shared_with),
            AtKey::Public(_) | AtKey::PrivateHidden(_) => None,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.base().metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.base_mut().metadata
    }

    pub fn fully_qualified_name(&self) -> String {
        self.base().fully_qualified_name()
    }
}

/// Canonical form: `[cached:][public:|<sharedWith>:|privatekey:]<name>[.<namespace>]<owner>`
impl fmt::Display for AtKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.base();
        let cached = base.metadata.is_cached && matches!(self, AtKey::Public(_) | AtKey::Shared(_));
        if cached {
            f.write_str("cached:")?;
        }
        match self {
            AtKey::Public(_) => f.write_str("public:")?,
            AtKey::Shared(key) => write!(f, "{}:", key.shared_with)?,
            AtKey::SelfKey(SelfKey {
                shared_with: Some(with),
                ..
            }) => write!(f, "{}:", with)?,
            AtKey::SelfKey(_) => {}
            AtKey::PrivateHidden(base) if !base.name.starts_with('_') => {
                f.write_str("privatekey:")?
            }
            AtKey::PrivateHidden(_) => {}
        }
        write!(f, "{}{}", base.fully_qualified_name(), base.owner)
    }
}

impl FromStr for AtKey {
    type Err = AtError;

    fn from_str(s: &str) -> Result<Self> {
        AtKey::parse(s)
    }
}
