use std::{sync::Arc, time::Duration};

use testing_framework_config::NetworkConfig;
use testing_framework_core::{
    adjust_timeout,
    chain::{ChainApi, ChainError, HttpChain},
    models::{Tokens, Wallet},
    sdk::{SdkError, StorageSdk, ZboxCli},
    wallets::{PoolError, WalletPool},
    zs3::{Zs3Client, Zs3Error},
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to reach the chain: {0}")]
    Chain(#[from] ChainError),
    #[error("failed to prepare the storage sdk: {0}")]
    Sdk(#[from] SdkError),
    #[error("failed to prepare the gateway client: {0}")]
    Zs3(#[from] Zs3Error),
    #[error("failed to load the wallet pool: {0}")]
    Pool(#[from] PoolError),
}

/// Everything a scenario needs to act on the network under test.
pub struct Network {
    pub chain: Arc<dyn ChainApi>,
    pub sdk: Arc<dyn StorageSdk>,
    pub zs3: Option<Zs3Client>,
    pub wallets: Option<WalletPool>,
    pub config: NetworkConfig,
}

impl Network {
    #[must_use]
    pub fn new(chain: Arc<dyn ChainApi>, sdk: Arc<dyn StorageSdk>, config: NetworkConfig) -> Self {
        Self {
            chain,
            sdk,
            zs3: None,
            wallets: None,
            config,
        }
    }

    #[must_use]
    pub fn with_zs3(mut self, client: Zs3Client) -> Self {
        self.zs3 = Some(client);
        self
    }

    #[must_use]
    pub fn with_wallet_pool(mut self, pool: WalletPool) -> Self {
        self.wallets = Some(pool);
        self
    }

    /// Connects the HTTP chain client, the storage CLI and, when configured,
    /// the gateway client and the wallet pool.
    pub async fn connect(config: NetworkConfig) -> Result<Self, NetworkError> {
        let chain = HttpChain::connect(&config).await?;
        let sdk = ZboxCli::new(&config.sdk)?;
        let mut network = Self::new(Arc::new(chain), Arc::new(sdk), config);

        if let Some(zs3) = &network.config.zs3 {
            network.zs3 = Some(Zs3Client::new(zs3)?);
        }
        if let Some(path) = &network.config.wallet_pool {
            network.wallets = Some(WalletPool::load(path)?);
        }

        info!(
            zs3 = network.zs3.is_some(),
            pooled_wallets = network.wallets.as_ref().map_or(0, WalletPool::len),
            "network connected"
        );
        Ok(network)
    }

    #[must_use]
    pub fn faucet_amount(&self) -> Tokens {
        Tokens::from_tokens(self.config.faucet_amount)
    }

    /// Upper bound for eventual-consistency waits.
    #[must_use]
    pub fn settle_timeout(&self) -> Duration {
        adjust_timeout(self.config.confirmation_timeout)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }

    /// Claims a pre-funded wallet when a pool is configured.
    pub fn pooled_wallet(&self) -> Option<Result<Wallet, PoolError>> {
        self.wallets.as_ref().map(WalletPool::claim)
    }
}
