use std::future::Future;

use futures::future::join_all;
use rand::{seq::SliceRandom as _, thread_rng};
use serde::{Deserialize, Serialize};
use testing_framework_config::NetworkConfig;
use tracing::{debug, info, warn};

use super::{
    api_client::{ApiClient, ApiError},
    paths,
};

/// Named endpoint groups of the network.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeGroup {
    Miners,
    Sharders,
}

impl NodeGroup {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Miners => "miners",
            Self::Sharders => "sharders",
        }
    }
}

/// Node lists published by the block worker.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct NetworkNodes {
    #[serde(default)]
    pub miners: Vec<String>,
    #[serde(default)]
    pub sharders: Vec<String>,
}

/// API clients for every miner and sharder.
#[derive(Clone, Debug, Default)]
pub struct NodeClients {
    miners: Vec<ApiClient>,
    sharders: Vec<ApiClient>,
}

impl NodeClients {
    pub fn from_urls(miners: &[String], sharders: &[String]) -> Result<Self, ApiError> {
        Ok(Self {
            miners: clients(miners)?,
            sharders: clients(sharders)?,
        })
    }

    /// Fetch the node lists from the block worker.
    pub async fn discover(block_worker: &str) -> Result<Self, ApiError> {
        let nodes: NetworkNodes = ApiClient::new(block_worker)?
            .get_json(paths::NETWORK)
            .await?
            .into_value();
        info!(
            block_worker,
            miners = nodes.miners.len(),
            sharders = nodes.sharders.len(),
            "discovered network nodes"
        );
        Self::from_urls(&nodes.miners, &nodes.sharders)
    }

    /// Explicit node lists when both are configured, block worker discovery
    /// otherwise.
    pub async fn from_config(config: &NetworkConfig) -> Result<Self, ApiError> {
        if !config.miners.is_empty() && !config.sharders.is_empty() {
            return Self::from_urls(&config.miners, &config.sharders);
        }
        match config.block_worker.as_deref() {
            Some(block_worker) => Self::discover(block_worker).await,
            None => Err(ApiError::NoNodes {
                group: if config.miners.is_empty() {
                    NodeGroup::Miners
                } else {
                    NodeGroup::Sharders
                },
            }),
        }
    }

    #[must_use]
    pub fn group(&self, group: NodeGroup) -> &[ApiClient] {
        match group {
            NodeGroup::Miners => &self.miners,
            NodeGroup::Sharders => &self.sharders,
        }
    }

    /// Try the nodes of `group` in random order until one call succeeds.
    pub async fn first_success<'a, T, F, Fut>(
        &'a self,
        group: NodeGroup,
        mut call: F,
    ) -> Result<T, ApiError>
    where
        F: FnMut(&'a ApiClient) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut clients: Vec<&'a ApiClient> = self.group(group).iter().collect();
        if clients.is_empty() {
            return Err(ApiError::NoNodes { group });
        }
        clients.shuffle(&mut thread_rng());

        let mut errors = Vec::new();
        for client in clients {
            match call(client).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    debug!(group = group.label(), node = %client.base_url(), error = %err, "node call failed");
                    errors.push(err);
                }
            }
        }

        Err(collapse(group, errors))
    }

    /// Send the same call to every node of `group` concurrently. Succeeds
    /// with the first accepted answer if any node accepted.
    pub async fn broadcast<'a, T, F, Fut>(&'a self, group: NodeGroup, call: F) -> Result<T, ApiError>
    where
        F: Fn(&'a ApiClient) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let clients = self.group(group);
        if clients.is_empty() {
            return Err(ApiError::NoNodes { group });
        }

        let results = join_all(clients.iter().map(call)).await;
        let total = results.len();
        let mut accepted = None;
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(value) => {
                    if accepted.is_none() {
                        accepted = Some(value);
                    }
                }
                Err(err) => errors.push(err),
            }
        }

        match accepted {
            Some(value) => {
                if !errors.is_empty() {
                    warn!(
                        group = group.label(),
                        rejected = errors.len(),
                        total,
                        "broadcast partially rejected"
                    );
                }
                Ok(value)
            }
            None => Err(collapse(group, errors)),
        }
    }
}

fn clients(urls: &[String]) -> Result<Vec<ApiClient>, ApiError> {
    urls.iter().map(|url| ApiClient::new(url)).collect()
}

fn collapse(group: NodeGroup, mut errors: Vec<ApiError>) -> ApiError {
    if errors.len() == 1 {
        if let Some(err) = errors.pop() {
            return err;
        }
    }
    ApiError::AllFailed { group, errors }
}
