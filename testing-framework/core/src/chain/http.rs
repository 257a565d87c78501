use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::json;
use testing_framework_config::NetworkConfig;
use tracing::{debug, info, instrument};

use super::{ChainApi, ChainError};
use crate::{
    crypto,
    models::{
        Allocation, Balance, ClientRegistration, Confirmation, NewAllocationRequest,
        RegisteredClient, StorageNode, StorageNodes, SubmittedTransaction, Tokens, Transaction,
        TransactionEntity, TransactionRequest, Wallet,
    },
    nodes::{NodeClients, NodeGroup, Reply, paths},
    wait::wait_until,
};

const TRANSACTION_VERSION: &str = "1.0";
const FAUCET_POUR: &str = "pour";
const NEW_ALLOCATION: &str = "new_allocation_request";

/// [`ChainApi`] over the miners' and sharders' HTTP APIs. Writes go to every
/// miner, reads to the first sharder that answers.
#[derive(Clone, Debug)]
pub struct HttpChain {
    nodes: NodeClients,
    chain_id: String,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl HttpChain {
    #[must_use]
    pub fn new(nodes: NodeClients, config: &NetworkConfig) -> Self {
        Self {
            nodes,
            chain_id: config.chain_id.clone(),
            poll_interval: config.poll_interval,
            confirmation_timeout: crate::adjust_timeout(config.confirmation_timeout),
        }
    }

    /// Resolve the nodes from `config` (discovering them if needed).
    pub async fn connect(config: &NetworkConfig) -> Result<Self, ChainError> {
        let nodes = NodeClients::from_config(config).await?;
        Ok(Self::new(nodes, config))
    }

    #[must_use]
    pub const fn nodes(&self) -> &NodeClients {
        &self.nodes
    }

    /// Nonce of the next transaction from `client_id`. A client the sharders
    /// do not know yet starts at 1.
    async fn next_nonce(&self, client_id: &str) -> Result<i64, ChainError> {
        match self.balance(client_id).await {
            Ok(balance) => Ok(balance.nonce + 1),
            Err(err) if err.is_client_error() => {
                debug!(client_id, "no balance yet; starting nonce at 1");
                Ok(1)
            }
            Err(err) => Err(err),
        }
    }

    async fn wait_for_success(&self, hash: &str) -> Result<Confirmation, ChainError> {
        let confirmation = wait_until(
            format!("confirmation of {hash}"),
            self.confirmation_timeout,
            self.poll_interval,
            || async move { self.confirmation(hash).await.ok() },
        )
        .await
        .map_err(|source| ChainError::Unconfirmed {
            hash: hash.to_owned(),
            source,
        })?;

        if !confirmation.succeeded() {
            return Err(ChainError::TransactionFailed {
                hash: hash.to_owned(),
                output: confirmation.output().to_owned(),
            });
        }
        Ok(confirmation)
    }

    async fn sc_get<T>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T, ChainError>
    where
        T: serde::de::DeserializeOwned,
    {
        let path = paths::sc_rest(paths::STORAGE_SC_ADDRESS, endpoint);
        let reply: Reply<T> = self
            .nodes
            .first_success(NodeGroup::Sharders, |client| {
                client.get_json_query(&path, query)
            })
            .await?;
        Ok(reply.into_value())
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
        })
}

#[async_trait]
impl ChainApi for HttpChain {
    #[instrument(skip_all, fields(client_id = %registration.id))]
    async fn register_wallet(
        &self,
        registration: &ClientRegistration,
    ) -> Result<RegisteredClient, ChainError> {
        let reply: Reply<RegisteredClient> = self
            .nodes
            .broadcast(NodeGroup::Miners, |client| {
                client.post_json(paths::CLIENT_PUT, registration)
            })
            .await?;
        info!(status = %reply.status, "wallet registered");
        Ok(reply.into_value())
    }

    async fn balance(&self, client_id: &str) -> Result<Balance, ChainError> {
        let query = [("client_id", client_id)];
        let reply: Reply<Balance> = self
            .nodes
            .first_success(NodeGroup::Sharders, |client| {
                client.get_json_query(paths::CLIENT_BALANCE, &query)
            })
            .await?;
        Ok(reply.into_value())
    }

    #[instrument(skip_all, fields(from = %wallet.client_id, to = %request.to_client_id))]
    async fn submit_transaction(
        &self,
        wallet: &Wallet,
        request: TransactionRequest,
    ) -> Result<TransactionEntity, ChainError> {
        let keys = wallet.key_pair()?;
        let nonce = self.next_nonce(&wallet.client_id).await?;
        let creation_date = unix_now();
        let hash = crypto::transaction_hash(
            creation_date,
            nonce,
            &wallet.client_id,
            &request.to_client_id,
            request.value.units(),
            &request.data,
        );
        let signature = keys.sign_hash(&hash)?;

        let transaction = Transaction {
            hash: hash.clone(),
            version: TRANSACTION_VERSION.to_owned(),
            client_id: wallet.client_id.clone(),
            public_key: wallet.client_key.clone(),
            to_client_id: request.to_client_id,
            chain_id: self.chain_id.clone(),
            transaction_data: request.data,
            transaction_value: request.value,
            signature,
            creation_date,
            transaction_fee: request.fee,
            transaction_nonce: nonce,
            transaction_type: request.transaction_type,
        };

        let reply: Reply<SubmittedTransaction> = self
            .nodes
            .broadcast(NodeGroup::Miners, |client| {
                client.post_json(paths::TRANSACTION_PUT, &transaction)
            })
            .await?;

        let mut entity = reply.into_value().entity;
        if entity.hash.is_empty() {
            entity.hash = hash;
        }
        debug!(hash = %entity.hash, nonce, "transaction submitted");
        Ok(entity)
    }

    async fn confirmation(&self, hash: &str) -> Result<Confirmation, ChainError> {
        let query = [("hash", hash)];
        let reply: Reply<Confirmation> = self
            .nodes
            .first_success(NodeGroup::Sharders, |client| {
                client.get_json_query(paths::TRANSACTION_CONFIRMATION, &query)
            })
            .await?;
        Ok(reply.into_value())
    }

    #[instrument(skip_all, fields(client_id = %wallet.client_id, tokens = %tokens))]
    async fn execute_faucet(
        &self,
        wallet: &Wallet,
        tokens: Tokens,
    ) -> Result<Confirmation, ChainError> {
        let request =
            TransactionRequest::smart_contract(paths::FAUCET_SC_ADDRESS, FAUCET_POUR, &json!({}), tokens)?;
        let entity = self.submit_transaction(wallet, request).await?;
        let confirmation = self.wait_for_success(&entity.hash).await?;
        info!(hash = %entity.hash, round = confirmation.round, "faucet pour confirmed");
        Ok(confirmation)
    }

    async fn blobbers(&self) -> Result<Vec<StorageNode>, ChainError> {
        let nodes: StorageNodes = self.sc_get(paths::GET_BLOBBERS, &[]).await?;
        Ok(nodes.nodes)
    }

    #[instrument(skip_all, fields(owner = %wallet.client_id, data = request.data_shards, parity = request.parity_shards))]
    async fn create_allocation(
        &self,
        wallet: &Wallet,
        request: &NewAllocationRequest,
    ) -> Result<String, ChainError> {
        let transaction = TransactionRequest::smart_contract(
            paths::STORAGE_SC_ADDRESS,
            NEW_ALLOCATION,
            request,
            request.lock,
        )?;
        let entity = self.submit_transaction(wallet, transaction).await?;
        self.wait_for_success(&entity.hash).await?;
        info!(allocation_id = %entity.hash, "allocation created");
        Ok(entity.hash)
    }

    async fn allocation(&self, id: &str) -> Result<Allocation, ChainError> {
        self.sc_get(paths::ALLOCATION, &[("allocation", id)]).await
    }

    async fn allocations(&self, owner_id: &str) -> Result<Vec<Allocation>, ChainError> {
        self.sc_get(paths::ALLOCATIONS, &[("client", owner_id)]).await
    }
}
