use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::crypto::{CryptoError, IV_SIZE};

/// Per-key attributes stored alongside a value
///
/// Durations (`ttl`, `ttb`, `ttr`) are in milliseconds; `0` means unset.
/// A negative `ttr` is passed through untouched (the server reads `-1` as
/// "cache until the owner changes it").
///
/// Serialized two ways:
/// - as JSON, the shape `llookup:meta:` returns
/// - as a `:name:value` suffix via `Display`, consumed by the `update` verb
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    #[serde(deserialize_with = "null_as_default")]
    pub ttl: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub ttb: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub ttr: i64,
    /// Cascade delete: the cached copy goes when the owner's copy does
    #[serde(deserialize_with = "null_as_default")]
    pub ccd: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub created_by: String,
    #[serde(deserialize_with = "null_as_default")]
    pub updated_by: String,
    #[serde(deserialize_with = "timestamp", skip_serializing_if = "Option::is_none")]
    pub available_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp", skip_serializing_if = "Option::is_none")]
    pub refresh_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub version: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub data_signature: String,
    #[serde(deserialize_with = "null_as_default")]
    pub shared_key_status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_public: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_encrypted: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_hidden: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub namespace_aware: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_binary: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_cached: bool,
    /// The shared key wrapped for the reader, base64
    #[serde(deserialize_with = "null_as_default")]
    pub shared_key_enc: String,
    /// Checksum of the public key `shared_key_enc` was wrapped under
    #[serde(rename = "pubKeyCS", deserialize_with = "null_as_default")]
    pub pub_key_cs: String,
    #[serde(deserialize_with = "null_as_default")]
    pub encoding: String,
    /// Base64 IV for the value cipher; empty selects the zero IV
    #[serde(deserialize_with = "null_as_default")]
    pub iv_nonce: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Servers emit `2024-01-02 03:04:05.678Z`; accept that alongside RFC3339
fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(None),
    };
    let normalized = raw.trim().replacen(' ', "T", 1);
    DateTime::parse_from_rfc3339(&normalized)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
}

fn first_nonzero(a: i64, b: i64) -> i64 {
    if a != 0 {
        a
    } else {
        b
    }
}

fn first_nonempty(a: &str, b: &str) -> String {
    if !a.is_empty() {
        a.to_string()
    } else {
        b.to_string()
    }
}

impl Metadata {
    /// Decode the JSON document returned by `llookup:meta:<key>`
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Merge two records field by field, `self` taking precedence
    ///
    /// Durations and timestamps take the first set value, strings the first
    /// non-empty value, and flags are OR-ed.
    pub fn squash(&self, other: &Metadata) -> Metadata {
        Metadata {
            ttl: first_nonzero(self.ttl, other.ttl),
            ttb: first_nonzero(self.ttb, other.ttb),
            ttr: first_nonzero(self.ttr, other.ttr),
            ccd: self.ccd || other.ccd,
            created_by: first_nonempty(&self.created_by, &other.created_by),
            updated_by: first_nonempty(&self.updated_by, &other.updated_by),
            available_at: self.available_at.or(other.available_at),
            expires_at: self.expires_at.or(other.expires_at),
            refresh_at: self.refresh_at.or(other.refresh_at),
            created_at: self.created_at.or(other.created_at),
            updated_at: self.updated_at.or(other.updated_at),
            status: first_nonempty(&self.status, &other.status),
            version: first_nonzero(self.version, other.version),
            data_signature: first_nonempty(&self.data_signature, &other.data_signature),
            shared_key_status: first_nonempty(&self.shared_key_status, &other.shared_key_status),
            is_public: self.is_public || other.is_public,
            is_encrypted: self.is_encrypted || other.is_encrypted,
            is_hidden: self.is_hidden || other.is_hidden,
            namespace_aware: self.namespace_aware || other.namespace_aware,
            is_binary: self.is_binary || other.is_binary,
            is_cached: self.is_cached || other.is_cached,
            shared_key_enc: first_nonempty(&self.shared_key_enc, &other.shared_key_enc),
            pub_key_cs: first_nonempty(&self.pub_key_cs, &other.pub_key_cs),
            encoding: first_nonempty(&self.encoding, &other.encoding),
            iv_nonce: first_nonempty(&self.iv_nonce, &other.iv_nonce),
        }
    }

    /// Decode `iv_nonce` into a cipher IV; `None` when unset
    pub fn iv(&self) -> Result<Option<[u8; IV_SIZE]>, CryptoError> {
        if self.iv_nonce.is_empty() {
            return Ok(None);
        }
        let bytes = BASE64
            .decode(self.iv_nonce.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("ivNonce base64 decode error: {}", e)))?;
        let iv: [u8; IV_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "invalid ivNonce size, expected {}, got {}",
                IV_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Some(iv))
    }
}

/// Renders the `update` verb suffix, e.g. `:ttl:1000:isBinary:false:isEncrypted:true`
///
/// Unset fields are omitted, except `isBinary` and `isEncrypted` which are
/// always written out.
impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ttl > 0 {
            write!(f, ":ttl:{}", self.ttl)?;
        }
        if self.ttb > 0 {
            write!(f, ":ttb:{}", self.ttb)?;
        }
        if self.ttr != 0 {
            write!(f, ":ttr:{}", self.ttr)?;
        }
        if self.ccd {
            f.write_str(":ccd:true")?;
        }
        if self.is_hidden {
            f.write_str(":isHidden:true")?;
        }
        if self.is_public {
            f.write_str(":isPublic:true")?;
        }
        if self.is_cached {
            f.write_str(":isCached:true")?;
        }
        write!(f, ":isBinary:{}", self.is_binary)?;
        write!(f, ":isEncrypted:{}", self.is_encrypted)?;
        for (name, value) in [
            ("dataSignature", &self.data_signature),
            ("sharedKeyStatus", &self.shared_key_status),
            ("sharedKeyEnc", &self.shared_key_enc),
            ("pubKeyCS", &self.pub_key_cs),
            ("encoding", &self.encoding),
            ("ivNonce", &self.iv_nonce),
        ] {
            if !value.is_empty() {
                write!(f, ":{}:{}", name, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_suffix_only_has_flags() {
        assert_eq!(
            Metadata::default().to_string(),
            ":isBinary:false:isEncrypted:false"
        );
    }

    #[test]
    fn test_suffix_field_order() {
        let metadata = Metadata {
            ttl: 1000,
            ttr: 86_400_000,
            ccd: true,
            is_encrypted: true,
            data_signature: "c2ln".to_string(),
            encoding: "base64".to_string(),
            ..Default::default()
        };
        assert_eq!(
            metadata.to_string(),
            ":ttl:1000:ttr:86400000:ccd:true:isBinary:false:isEncrypted:true\
             :dataSignature:c2ln:encoding:base64"
        );
    }

    #[test]
    fn test_squash() {
        let first = Metadata {
            ttl: 5,
            ccd: false,
            is_hidden: true,
            data_signature: "first".to_string(),
            ..Default::default()
        };
        let second = Metadata {
            ttl: 9,
            ttb: 3,
            ccd: true,
            data_signature: "second".to_string(),
            encoding: "utf8".to_string(),
            created_at: Some(Utc::now()),
            ..Default::default()
        };

        let merged = first.squash(&second);
        assert_eq!(merged.ttl, 5);
        assert_eq!(merged.ttb, 3);
        assert!(merged.ccd);
        assert!(merged.is_hidden);
        assert_eq!(merged.data_signature, "first");
        assert_eq!(merged.encoding, "utf8");
        assert_eq!(merged.created_at, second.created_at);

        let reversed = second.squash(&first);
        assert_eq!(reversed.ttl, 9);
        assert_eq!(reversed.data_signature, "second");
        assert!(reversed.ccd && reversed.is_hidden);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "ttl": 60000,
            "ttb": null,
            "ccd": true,
            "createdBy": "@alice",
            "createdAt": "2024-03-01 10:20:30.123Z",
            "expiresAt": null,
            "isEncrypted": true,
            "isBinary": false,
            "pubKeyCS": "abc123",
            "ivNonce": "AAAAAAAAAAAAAAAAAAAAAA==",
            "someFutureField": 1
        }"#;
        let metadata = Metadata::from_json(json).unwrap();
        assert_eq!(metadata.ttl, 60000);
        assert_eq!(metadata.ttb, 0);
        assert!(metadata.ccd);
        assert_eq!(metadata.created_by, "@alice");
        assert!(metadata.created_at.is_some());
        assert!(metadata.expires_at.is_none());
        assert!(metadata.is_encrypted);
        assert_eq!(metadata.pub_key_cs, "abc123");
        assert_eq!(metadata.iv().unwrap(), Some([0u8; IV_SIZE]));
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        assert!(Metadata::from_json(r#"{"createdAt": "yesterday"}"#).is_err());
    }

    #[test]
    fn test_iv_size_checked() {
        let metadata = Metadata {
            iv_nonce: "AAAA".to_string(),
            ..Default::default()
        };
        assert!(metadata.iv().is_err());
        assert_eq!(Metadata::default().iv().unwrap(), None);
    }
}
