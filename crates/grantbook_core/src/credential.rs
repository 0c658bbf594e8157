//! Credential codec for account secrets.
//!
//! # Responsibility
//! - Turn plaintext secrets into encoded credential strings.
//! - Verify plaintext candidates against stored credentials.
//!
//! # Invariants
//! - `Credential` values only hold encoded strings; plaintext never reaches
//!   the store.
//! - Verification of malformed stored strings returns `false`, never panics.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use log::warn;
use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Encoded account secret (PHC string for the default codec).
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps an already-encoded credential, e.g. a value loaded from storage.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

// Encoded form only; adapters decide whether to expose it at all.
impl Serialize for Credential {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    InvalidParams(String),
    Hash(String),
}

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParams(message) => write!(f, "invalid credential parameters: {message}"),
            Self::Hash(message) => write!(f, "credential encoding failed: {message}"),
        }
    }
}

impl Error for CredentialError {}

/// Opaque hash/verify pair used by the account service.
pub trait CredentialCodec: Send + Sync {
    fn encode(&self, plaintext: &str) -> Result<Credential, CredentialError>;
    fn verify(&self, plaintext: &str, credential: &Credential) -> bool;
}

/// Argon2id codec producing `$argon2id$v=19$m=..,t=..,p=..$salt$hash` strings.
#[derive(Debug, Clone)]
pub struct Argon2Codec {
    params: Params,
}

impl Argon2Codec {
    /// Builds a codec with explicit memory (KiB), iteration and lane costs.
    pub fn with_costs(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, CredentialError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|err| CredentialError::InvalidParams(err.to_string()))?;
        Ok(Self { params })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Codec {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl CredentialCodec for Argon2Codec {
    fn encode(&self, plaintext: &str) -> Result<Credential, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|err| CredentialError::Hash(err.to_string()))?;
        Ok(Credential(hash.to_string()))
    }

    fn verify(&self, plaintext: &str, credential: &Credential) -> bool {
        // Cost parameters are read back from the encoded string.
        let parsed = match PasswordHash::new(credential.as_str()) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(
                    "event=credential_verify module=credential status=error error_code=malformed_credential error={}",
                    err
                );
                return false;
            }
        };
        self.hasher()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::{Argon2Codec, Credential, CredentialCodec};

    fn cheap_codec() -> Argon2Codec {
        Argon2Codec::with_costs(256, 1, 1).expect("params should be valid")
    }

    #[test]
    fn encode_produces_argon2id_phc_string() {
        let credential = cheap_codec().encode("dodol123").unwrap();
        assert!(credential.as_str().starts_with("$argon2id$v=19$m=256,t=1,p=1$"));
        assert_eq!(credential.as_str().split('$').count(), 6);
    }

    #[test]
    fn verify_accepts_matching_and_rejects_other_secrets() {
        let codec = cheap_codec();
        let credential = codec.encode("dodol123").unwrap();
        assert!(codec.verify("dodol123", &credential));
        assert!(!codec.verify("duren123", &credential));
    }

    #[test]
    fn verify_uses_costs_from_stored_string() {
        let stored = Argon2Codec::with_costs(512, 2, 1)
            .unwrap()
            .encode("secret")
            .unwrap();
        assert!(cheap_codec().verify("secret", &stored));
    }

    #[test]
    fn same_secret_encodes_with_fresh_salt() {
        let codec = cheap_codec();
        let first = codec.encode("same").unwrap();
        let second = codec.encode("same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_credential_does_not_verify() {
        let codec = cheap_codec();
        assert!(!codec.verify("x", &Credential::from_encoded("not-a-phc-string")));
        assert!(!codec.verify("x", &Credential::from_encoded("$argon2id$v=19$broken")));
    }

    #[test]
    fn debug_output_redacts_value() {
        let credential = Credential::from_encoded("$argon2id$secret");
        assert_eq!(format!("{credential:?}"), "Credential(<redacted>)");
    }

    #[test]
    fn rejects_invalid_costs() {
        assert!(Argon2Codec::with_costs(0, 0, 0).is_err());
    }
}
