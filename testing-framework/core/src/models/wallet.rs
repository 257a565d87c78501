use serde::{Deserialize, Serialize};

use super::tokens::Tokens;
use crate::crypto::{CryptoError, KeyPair};

/// Hex-encoded key pair as stored in wallet files.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct WalletKey {
    pub public_key: String,
    pub private_key: String,
}

/// Client wallet in the storage CLI file format.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub client_id: String,
    pub client_key: String,
    pub keys: Vec<WalletKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonics: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
}

impl Wallet {
    /// Signing key of the wallet's primary key pair.
    pub fn key_pair(&self) -> Result<KeyPair, CryptoError> {
        let key = self.keys.first().ok_or(CryptoError::MissingKey)?;
        KeyPair::from_private_hex(&key.private_key)
    }

    /// Registration body for this wallet.
    #[must_use]
    pub fn registration(&self) -> ClientRegistration {
        ClientRegistration {
            id: self.client_id.clone(),
            public_key: self.client_key.clone(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_owned()
}

/// Body of a client registration call.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClientRegistration {
    pub id: String,
    pub public_key: String,
}

/// Client record the miners return after registration.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RegisteredClient {
    pub id: String,
    pub public_key: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub creation_date: Option<i64>,
}

/// Balance of a client as reported by the sharders.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    #[serde(default)]
    pub txn: String,
    #[serde(default)]
    pub round: i64,
    pub balance: Tokens,
    #[serde(default)]
    pub nonce: i64,
}
