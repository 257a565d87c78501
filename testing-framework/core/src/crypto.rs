//! Wallet keys, client ids and transaction signing for ed25519 networks.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;
use sha3::{Digest as _, Sha3_256};
use thiserror::Error;

use crate::models::{Wallet, WalletKey};

const SECRET_KEY_LEN: usize = 32;
const KEYPAIR_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("{what} is not valid hex: {source}")]
    InvalidHex {
        what: &'static str,
        #[source]
        source: hex::FromHexError,
    },
    #[error("{what} has {actual} bytes, expected {expected}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid {what}: {source}")]
    InvalidKey {
        what: &'static str,
        #[source]
        source: ed25519_dalek::SignatureError,
    },
    #[error("wallet has no key pair")]
    MissingKey,
}

/// ed25519 signing key of a wallet.
#[derive(Clone)]
pub struct KeyPair {
    signing: SigningKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Accepts a 32-byte secret or a 64-byte secret+public key, hex encoded.
    pub fn from_private_hex(private_key: &str) -> Result<Self, CryptoError> {
        let bytes = decode_hex("private key", private_key)?;
        let secret: [u8; SECRET_KEY_LEN] = match bytes.len() {
            SECRET_KEY_LEN | KEYPAIR_LEN => {
                let mut secret = [0_u8; SECRET_KEY_LEN];
                secret.copy_from_slice(&bytes[..SECRET_KEY_LEN]);
                secret
            }
            actual => {
                return Err(CryptoError::InvalidLength {
                    what: "private key",
                    expected: SECRET_KEY_LEN,
                    actual,
                });
            }
        };
        Ok(Self {
            signing: SigningKey::from_bytes(&secret),
        })
    }

    #[must_use]
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing.verifying_key().as_bytes())
    }

    /// Secret and public key concatenated, the layout wallet files use.
    #[must_use]
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing.to_keypair_bytes())
    }

    #[must_use]
    pub fn client_id(&self) -> String {
        sha3_hex(self.signing.verifying_key().as_bytes())
    }

    /// Signs the raw bytes of a hex-encoded hash.
    pub fn sign_hash(&self, hash: &str) -> Result<String, CryptoError> {
        let digest = decode_hex("hash", hash)?;
        Ok(hex::encode(self.signing.sign(&digest).to_bytes()))
    }

    #[must_use]
    pub fn wallet(&self) -> Wallet {
        let public_key = self.public_key_hex();
        Wallet {
            client_id: self.client_id(),
            client_key: public_key.clone(),
            keys: vec![WalletKey {
                public_key,
                private_key: self.private_key_hex(),
            }],
            mnemonics: None,
            version: "1.0".to_owned(),
        }
    }
}

/// Client id of a hex-encoded public key.
pub fn client_id(public_key: &str) -> Result<String, CryptoError> {
    Ok(sha3_hex(&decode_hex("public key", public_key)?))
}

#[must_use]
pub fn sha3_hex(data: &[u8]) -> String {
    hex::encode(Sha3_256::digest(data))
}

/// Hash the network expects for a transaction.
#[must_use]
pub fn transaction_hash(
    creation_date: i64,
    nonce: i64,
    client_id: &str,
    to_client_id: &str,
    value: i64,
    data: &str,
) -> String {
    let data_hash = sha3_hex(data.as_bytes());
    sha3_hex(
        format!("{creation_date}:{nonce}:{client_id}:{to_client_id}:{value}:{data_hash}").as_bytes(),
    )
}

pub fn verify(public_key: &str, hash: &str, signature: &str) -> Result<bool, CryptoError> {
    let key_bytes: [u8; SECRET_KEY_LEN] = fixed("public key", public_key)?;
    let key = VerifyingKey::from_bytes(&key_bytes).map_err(|source| CryptoError::InvalidKey {
        what: "public key",
        source,
    })?;
    let signature: [u8; KEYPAIR_LEN] = fixed("signature", signature)?;
    let digest = decode_hex("hash", hash)?;
    Ok(key
        .verify(&digest, &Signature::from_bytes(&signature))
        .is_ok())
}

fn decode_hex(what: &'static str, value: &str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(value).map_err(|source| CryptoError::InvalidHex { what, source })
}

fn fixed<const N: usize>(what: &'static str, value: &str) -> Result<[u8; N], CryptoError> {
    let bytes = decode_hex(what, value)?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| CryptoError::InvalidLength {
        what,
        expected: N,
        actual,
    })
}
