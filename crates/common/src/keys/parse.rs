use crate::atsign::AtSign;
use crate::error::{AtError, Result};

use super::{AtKey, KeyBase, KeyKind, SelfKey, SharedKey};

// Names the server itself manages; never split into name + namespace
const RESERVED_PREFIXES: [&str; 2] = ["shared_key", "publickey"];

/// Reclassify a key string (as returned by `scan`) into a typed key
///
/// Decision procedure:
/// 1. Split on `:`. A single segment is a self key, or private-hidden when
///    its name starts with `_`.
/// 2. Otherwise segment 0 selects the variant: `public` / `cached:public`
///    is public, `private` / `privatekey` is private-hidden. If segment 0
///    or 1 starts with `@` the key is shared (unless already classified)
///    and that segment names the counterpart.
/// 3. The last segment always carries `name[.namespace]@owner`.
/// 4. A counterpart equal to the owner turns the key into a self key.
///
/// # Errors
///
/// `InvalidKeyFormat` when the owner is missing, a shared key has no
/// counterpart, or no variant can be determined.
pub(super) fn parse_key_string(full: &str) -> Result<AtKey> {
    let invalid = |reason: &str| AtError::InvalidKeyFormat(format!("{}: '{}'", reason, full));

    let full = full.trim();
    let segments: Vec<&str> = full.split(':').collect();

    let mut kind = None;
    let mut counterpart = None;
    let mut cached = false;
    let mut hidden = false;

    if segments.len() == 1 {
        kind = Some(if segments[0].starts_with('_') {
            KeyKind::PrivateHidden
        } else {
            KeyKind::SelfKey
        });
    } else {
        cached = segments[0] == "cached";
        if segments[0] == "public" || (cached && segments[1] == "public") {
            kind = Some(KeyKind::Public);
        } else if segments[0] == "private" || segments[0] == "privatekey" {
            kind = Some(KeyKind::PrivateHidden);
            hidden = true;
        }

        let with_segment = [segments[0], segments[1]]
            .into_iter()
            .find(|segment| segment.starts_with('@'));
        if let Some(segment) = with_segment {
            kind.get_or_insert(KeyKind::Shared);
            let bare = segment.trim_start_matches('@');
            if !bare.is_empty() {
                counterpart = Some(AtSign::new(bare));
            }
        }
    }

    let last = segments[segments.len() - 1];
    let (name_and_namespace, owner) = last
        .split_once('@')
        .ok_or_else(|| invalid("missing owner atSign"))?;
    if owner.trim().is_empty() {
        return Err(invalid("missing owner atSign"));
    }
    if name_and_namespace.trim().is_empty() {
        return Err(invalid("missing key name"));
    }
    let owner = AtSign::new(owner);

    let (name, namespace) = split_namespace(name_and_namespace);

    if counterpart.as_ref() == Some(&owner) {
        kind = Some(KeyKind::SelfKey);
    }

    let mut base = KeyBase::new(name, owner);
    if let Some(namespace) = namespace {
        base.set_namespace(namespace);
    }
    base.metadata.is_cached = cached;
    base.metadata.is_hidden |= hidden;

    let key = match kind.ok_or_else(|| invalid("could not determine key type"))? {
        KeyKind::Public => {
            base.metadata.is_public = true;
            AtKey::Public(base)
        }
        KeyKind::SelfKey => AtKey::SelfKey(SelfKey {
            base,
            shared_with: counterpart,
        }),
        KeyKind::Shared => {
            let shared_with = counterpart.ok_or_else(|| invalid("shared key has no sharedWith"))?;
            AtKey::Shared(SharedKey { base, shared_with })
        }
        KeyKind::PrivateHidden => {
            base.metadata.is_hidden = true;
            AtKey::PrivateHidden(base)
        }
    };
    Ok(key)
}

fn split_namespace(name: &str) -> (&str, Option<&str>) {
    if RESERVED_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return (name, None);
    }
    match name.split_once('.') {
        Some((name, namespace)) if !name.is_empty() => (name, Some(namespace)),
        _ => (name, None),
    }
}
