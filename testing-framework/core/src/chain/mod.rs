//! Chain-side operations scenarios rely on: wallets, balances, faucet pours,
//! transactions and storage allocations.

mod http;

use async_trait::async_trait;
pub use http::HttpChain;
use reqwest::StatusCode;
use thiserror::Error;

use crate::{
    crypto::CryptoError,
    models::{
        Allocation, Balance, ClientRegistration, Confirmation, NewAllocationRequest,
        RegisteredClient, StorageNode, Tokens, TransactionEntity, TransactionRequest, Wallet,
    },
    nodes::ApiError,
    wait::WaitError,
};

#[derive(Debug, Error)]
pub enum ChainError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("failed to encode transaction payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("transaction {hash} was not confirmed: {source}")]
    Unconfirmed {
        hash: String,
        #[source]
        source: WaitError,
    },
    #[error("transaction {hash} failed on chain: {output}")]
    TransactionFailed { hash: String, output: String },
}

impl ChainError {
    /// HTTP status of the node that rejected the call, if one answered.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api(err) => err.status(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|status| status.is_client_error())
    }
}

/// Remote chain as seen by scenarios.
#[async_trait]
pub trait ChainApi: Send + Sync {
    async fn register_wallet(
        &self,
        registration: &ClientRegistration,
    ) -> Result<RegisteredClient, ChainError>;

    async fn balance(&self, client_id: &str) -> Result<Balance, ChainError>;

    /// Hashes, signs and submits a transaction from `wallet`.
    async fn submit_transaction(
        &self,
        wallet: &Wallet,
        request: TransactionRequest,
    ) -> Result<TransactionEntity, ChainError>;

    async fn confirmation(&self, hash: &str) -> Result<Confirmation, ChainError>;

    /// Pours `tokens` into `wallet` and waits for the pour to be confirmed.
    async fn execute_faucet(
        &self,
        wallet: &Wallet,
        tokens: Tokens,
    ) -> Result<Confirmation, ChainError>;

    async fn blobbers(&self) -> Result<Vec<StorageNode>, ChainError>;

    /// Creates an allocation owned by `wallet` and returns its id once the
    /// request is confirmed.
    async fn create_allocation(
        &self,
        wallet: &Wallet,
        request: &NewAllocationRequest,
    ) -> Result<String, ChainError>;

    async fn allocation(&self, id: &str) -> Result<Allocation, ChainError>;

    async fn allocations(&self, owner_id: &str) -> Result<Vec<Allocation>, ChainError>;
}
