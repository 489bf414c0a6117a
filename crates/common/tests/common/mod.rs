//! Shared test utilities: an in-memory secondary server and key material
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use common::atsign::AtSign;
use common::client::AtClient;
use common::connection::CommandChannel;
use common::crypto::{cram_digest, PublicKey};
use common::error::{AtError, Result};
use common::keys::Metadata;
use common::keystore::KeyMaterial;

pub const CHALLENGE: &str = "_70138292-07b5-4e47-8c94-e02e38220775@alice:883ea0aa-c526-400a-926e-48cae9281de9";

// Update-verb fields that precede the key spec, each followed by a value
const METADATA_FIELDS: [&str; 15] = [
    "ttl",
    "ttb",
    "ttr",
    "ccd",
    "isHidden",
    "isPublic",
    "isCached",
    "isBinary",
    "isEncrypted",
    "dataSignature",
    "sharedKeyStatus",
    "sharedKeyEnc",
    "pubKeyCS",
    "encoding",
    "ivNonce",
];

/// Small keys keep generation fast; everything else is the real thing
pub fn test_keys() -> KeyMaterial {
    KeyMaterial::generate_with_bits(1024).unwrap()
}

/// A scripted, in-memory secondary for one atSign
///
/// Speaks just enough of the protocol for the client: `from`, `pkam`,
/// `cram`, `scan`, `update`, `llookup`, `lookup`, `plookup` and `delete`.
/// Every command is logged; replies can be overridden per command prefix.
pub struct FakeSecondary {
    atsign: AtSign,
    pkam_public_key: PublicKey,
    cram_secret: Option<String>,
    store: BTreeMap<String, (String, Metadata)>,
    overrides: HashMap<String, String>,
    commands: Vec<String>,
    connected: bool,
    commit_id: u64,
}

impl FakeSecondary {
    pub fn new(atsign: &AtSign, keys: &KeyMaterial) -> Self {
        Self {
            atsign: atsign.clone(),
            pkam_public_key: keys.pkam_public_key.clone(),
            cram_secret: None,
            store: BTreeMap::new(),
            overrides: HashMap::new(),
            commands: Vec::new(),
            connected: true,
            commit_id: 0,
        }
    }

    pub fn with_cram_secret(mut self, secret: &str) -> Self {
        self.cram_secret = Some(secret.to_string());
        self
    }

    /// Store a value directly, bypassing the wire
    pub fn insert(&mut self, key: &str, value: &str) {
        self.store
            .insert(key.to_string(), (value.to_string(), Metadata::default()));
    }

    pub fn insert_with_metadata(&mut self, key: &str, value: &str, metadata: Metadata) {
        self.store.insert(key.to_string(), (value.to_string(), metadata));
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.store.get(key).map(|(value, _)| value.as_str())
    }

    pub fn metadata(&self, key: &str) -> Option<&Metadata> {
        self.store.get(key).map(|(_, metadata)| metadata)
    }

    /// Answer every command starting with `prefix` with `raw_reply`
    pub fn reply_to(&mut self, prefix: &str, raw_reply: &str) {
        self.overrides.insert(prefix.to_string(), raw_reply.to_string());
    }

    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn commands_starting_with(&self, prefix: &str) -> Vec<&String> {
        self.commands
            .iter()
            .filter(|command| command.starts_with(prefix))
            .collect()
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    fn respond(&mut self, command: &str) -> String {
        if let Some((_, reply)) = self
            .overrides
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
        {
            return reply.clone();
        }

        if let Some(atsign) = command.strip_prefix("from:") {
            return if atsign == self.atsign.as_str() {
                data(CHALLENGE)
            } else {
                error("AT0008", "handshake failure")
            };
        }
        if let Some(signature) = command.strip_prefix("pkam:") {
            return match self.pkam_public_key.verify(CHALLENGE.as_bytes(), signature) {
                Ok(()) => data("success"),
                Err(_) => error("AT0401", "Client authentication failed"),
            };
        }
        if let Some(digest) = command.strip_prefix("cram:") {
            let expected = self
                .cram_secret
                .as_deref()
                .map(|secret| cram_digest(secret, CHALLENGE));
            return if expected.as_deref() == Some(digest) {
                data("success")
            } else {
                error("AT0401", "Client authentication failed")
            };
        }
        if let Some(rest) = command.strip_prefix("scan") {
            return self.scan(rest);
        }
        if let Some(rest) = command.strip_prefix("update") {
            return self.update(rest);
        }
        if let Some(key) = command.strip_prefix("llookup:meta:") {
            return match self.store.get(key) {
                Some((_, metadata)) => data(&serde_json::to_string(metadata).unwrap()),
                None => not_found(key),
            };
        }
        if let Some(key) = command.strip_prefix("llookup:") {
            return self.read(key);
        }
        if let Some(key) = command.strip_prefix("lookup:") {
            // served from the other atSign's copy shared with us
            return self.read(&format!("{}:{}", self.atsign, key));
        }
        if let Some(key) = command.strip_prefix("plookup:") {
            return self.read(&format!("public:{}", key));
        }
        if let Some(key) = command.strip_prefix("delete:") {
            return match self.store.remove(key) {
                Some(_) => self.commit(),
                None => not_found(key),
            };
        }
        error("AT0003", "Invalid syntax")
    }

    fn read(&self, key: &str) -> String {
        match self.store.get(key) {
            Some((value, _)) => data(value),
            None => not_found(key),
        }
    }

    fn scan(&self, rest: &str) -> String {
        let (flags, regex) = match rest.split_once(' ') {
            Some((flags, regex)) => (flags, Some(regex)),
            None => (rest, None),
        };
        let show_hidden = flags.contains(":showHidden:true");
        let keys: Vec<&String> = self
            .store
            .keys()
            .filter(|key| show_hidden || !is_hidden(key))
            .filter(|key| regex.map_or(true, |r| key.contains(r)))
            .collect();
        data(&serde_json::to_string(&keys).unwrap())
    }

    fn update(&mut self, rest: &str) -> String {
        let Some((head, value)) = rest.split_once(' ') else {
            return error("AT0003", "Invalid syntax");
        };
        let segments: Vec<&str> = head.trim_start_matches(':').split(':').collect();
        let mut metadata = Metadata::default();
        let mut i = 0;
        while i + 1 < segments.len() && METADATA_FIELDS.contains(&segments[i]) {
            let field = segments[i];
            let v = segments[i + 1];
            match field {
                "ttl" => metadata.ttl = v.parse().unwrap(),
                "ttb" => metadata.ttb = v.parse().unwrap(),
                "ttr" => metadata.ttr = v.parse().unwrap(),
                "ccd" => metadata.ccd = v == "true",
                "isHidden" => metadata.is_hidden = v == "true",
                "isPublic" => metadata.is_public = v == "true",
                "isCached" => metadata.is_cached = v == "true",
                "isBinary" => metadata.is_binary = v == "true",
                "isEncrypted" => metadata.is_encrypted = v == "true",
                "dataSignature" => metadata.data_signature = v.to_string(),
                "sharedKeyStatus" => metadata.shared_key_status = v.to_string(),
                "sharedKeyEnc" => metadata.shared_key_enc = v.to_string(),
                "pubKeyCS" => metadata.pub_key_cs = v.to_string(),
                "encoding" => metadata.encoding = v.to_string(),
                "ivNonce" => metadata.iv_nonce = v.to_string(),
                _ => unreachable!(),
            }
            i += 2;
        }
        let key = segments[i..].join(":");
        if key.is_empty() {
            return error("AT0003", "Invalid syntax");
        }
        self.store.insert(key, (value.to_string(), metadata));
        self.commit()
    }

    fn commit(&mut self) -> String {
        self.commit_id += 1;
        data(&self.commit_id.to_string())
    }
}

fn is_hidden(key: &str) -> bool {
    let last = key.rsplit(':').next().unwrap_or(key);
    last.starts_with('_') || key.starts_with("privatekey:") || last.starts_with("shared_key")
}

fn data(payload: &str) -> String {
    format!("data:{}\n@", payload)
}

fn error(code: &str, message: &str) -> String {
    format!("error:{}-{}\n@", code, message)
}

fn not_found(key: &str) -> String {
    error("AT0015", &format!("{} does not exist in keystore", key))
}

#[async_trait]
impl CommandChannel for FakeSecondary {
    async fn send(&mut self, command: &str) -> Result<()> {
        if !self.connected {
            return Err(AtError::NotConnected);
        }
        self.commands.push(command.trim_end().to_string());
        Ok(())
    }

    async fn execute_raw(&mut self, command: &str) -> Result<String> {
        if !self.connected {
            return Err(AtError::NotConnected);
        }
        let command = command.trim_end().to_string();
        self.commands.push(command.clone());
        Ok(self.respond(&command))
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn close(&mut self) {
        self.connected = false;
    }
}

/// Authenticate `fake` with PKAM and wrap it in a client session
pub async fn client_for(atsign: &AtSign, keys: &KeyMaterial, fake: FakeSecondary) -> AtClient<FakeSecondary> {
    AtClient::authenticate(fake, atsign.clone(), keys.clone())
        .await
        .unwrap()
}
