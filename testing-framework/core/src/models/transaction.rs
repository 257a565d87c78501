use serde::{Deserialize, Serialize};

use super::tokens::Tokens;

/// Chain transaction types used by the scenarios.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum TransactionType {
    Send,
    Data,
    SmartContract,
}

impl TransactionType {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Send => 0,
            Self::Data => 10,
            Self::SmartContract => 1000,
        }
    }
}

impl From<TransactionType> for i32 {
    fn from(value: TransactionType) -> Self {
        value.code()
    }
}

impl TryFrom<i32> for TransactionType {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Send),
            10 => Ok(Self::Data),
            1000 => Ok(Self::SmartContract),
            other => Err(format!("unknown transaction type {other}")),
        }
    }
}

/// What a scenario wants to submit; hashing and signing happen in the chain
/// client.
#[derive(Clone, Debug)]
pub struct TransactionRequest {
    pub to_client_id: String,
    pub value: Tokens,
    pub data: String,
    pub transaction_type: TransactionType,
    pub fee: Tokens,
}

impl TransactionRequest {
    /// Smart contract call `{"name": <name>, "input": <input>}`.
    pub fn smart_contract<I: Serialize>(
        address: &str,
        name: &str,
        input: &I,
        value: Tokens,
    ) -> serde_json::Result<Self> {
        let data = serde_json::to_string(&SmartContractCall { name, input })?;
        Ok(Self {
            to_client_id: address.to_owned(),
            value,
            data,
            transaction_type: TransactionType::SmartContract,
            fee: Tokens::ZERO,
        })
    }
}

#[derive(Serialize)]
struct SmartContractCall<'a, I> {
    name: &'a str,
    input: &'a I,
}

/// Signed transaction body accepted by `/v1/transaction/put`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub version: String,
    pub client_id: String,
    pub public_key: String,
    pub to_client_id: String,
    pub chain_id: String,
    pub transaction_data: String,
    pub transaction_value: Tokens,
    pub signature: String,
    pub creation_date: i64,
    pub transaction_fee: Tokens,
    pub transaction_nonce: i64,
    pub transaction_type: TransactionType,
}

/// Response of `/v1/transaction/put`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmittedTransaction {
    #[serde(rename = "async", default)]
    pub is_async: bool,
    pub entity: TransactionEntity,
}

/// Transaction as echoed back by miners and sharders.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TransactionEntity {
    pub hash: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub to_client_id: String,
    #[serde(default)]
    pub transaction_value: Tokens,
    #[serde(default)]
    pub transaction_nonce: i64,
    #[serde(default)]
    pub transaction_status: i32,
    #[serde(default)]
    pub transaction_output: String,
}

impl TransactionEntity {
    pub const STATUS_SUCCESS: i32 = 1;

    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.transaction_status == Self::STATUS_SUCCESS
    }
}

/// Block inclusion proof for a transaction, served by the sharders.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    #[serde(default)]
    pub version: String,
    pub hash: String,
    #[serde(default)]
    pub block_hash: String,
    #[serde(default)]
    pub creation_date: i64,
    #[serde(default)]
    pub round: i64,
    #[serde(rename = "txn", default)]
    pub transaction: Option<TransactionEntity>,
}

impl Confirmation {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.transaction
            .as_ref()
            .is_some_and(TransactionEntity::succeeded)
    }

    #[must_use]
    pub fn output(&self) -> &str {
        self.transaction
            .as_ref()
            .map(|txn| txn.transaction_output.as_str())
            .unwrap_or_default()
    }
}
