/**
 * Identities and secondary server addresses.
 */
pub mod address;
pub mod atsign;
/**
 * Challenge/response authentication:
 *  CRAM (shared secret) and PKAM (RSA signature).
 */
pub mod auth;
/**
 * The authenticated session: key enumeration,
 *  put/get/delete and pairwise shared keys.
 */
pub mod client;
pub mod config;
/**
 * Command framing over TLS, reply parsing
 *  and the server error taxonomy.
 */
pub mod connection;
/**
 * Cryptographic types and operations.
 *  - RSA keypairs for authentication and key wrapping
 *  - AES-256-CTR for values
 */
pub mod crypto;
/**
 * Root directory lookup of secondary addresses.
 */
pub mod directory;
pub mod error;
/**
 * The four key variants, their canonical
 *  string form and their metadata.
 */
pub mod keys;
/**
 * Loading and saving local key material.
 */
pub mod keystore;

pub mod prelude {
    pub use crate::address::Address;
    pub use crate::atsign::AtSign;
    pub use crate::client::AtClient;
    pub use crate::config::{ClientConfig, LookupErrorPolicy};
    pub use crate::connection::{CommandChannel, Response, SecureChannel, ServerErrorKind};
    pub use crate::directory::{DirectoryResolver, RootDirectory, StaticResolver};
    pub use crate::error::{AtError, Result};
    pub use crate::keys::{AtKey, KeyKind, Metadata};
    pub use crate::keystore::{FileKeyStore, KeyMaterial, KeyStore};
}
