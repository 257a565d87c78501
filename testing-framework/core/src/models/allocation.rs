use serde::{Deserialize, Serialize};

use super::tokens::Tokens;

/// Inclusive price bounds an allocation accepts from blobbers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Tokens,
    pub max: Tokens,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: Tokens::ZERO,
            max: Tokens(i64::MAX),
        }
    }
}

/// Prices a blobber charges, per GB.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Terms {
    #[serde(default)]
    pub read_price: Tokens,
    #[serde(default)]
    pub write_price: Tokens,
}

/// A blobber as listed by the storage smart contract.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StorageNode {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub terms: Terms,
    #[serde(default)]
    pub capacity: i64,
    #[serde(default)]
    pub allocated: i64,
    #[serde(default)]
    pub is_killed: bool,
    #[serde(default)]
    pub is_shutdown: bool,
}

impl StorageNode {
    #[must_use]
    pub const fn is_available(&self) -> bool {
        !self.is_killed && !self.is_shutdown && self.capacity > self.allocated
    }
}

/// `getblobbers` response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StorageNodes {
    #[serde(rename = "Nodes", default)]
    pub nodes: Vec<StorageNode>,
}

/// Blobber as attached to an allocation.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct AllocationBlobber {
    #[serde(alias = "id")]
    pub blobber_id: String,
    #[serde(default)]
    pub url: String,
}

/// Storage allocation as reported by the storage smart contract.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: String,
    #[serde(default)]
    pub tx: String,
    pub data_shards: u32,
    pub parity_shards: u32,
    pub size: i64,
    #[serde(default)]
    pub expiration_date: i64,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub owner_public_key: String,
    #[serde(default)]
    pub blobbers: Vec<AllocationBlobber>,
    #[serde(default)]
    pub finalized: bool,
    #[serde(default)]
    pub canceled: bool,
}

impl Allocation {
    #[must_use]
    pub fn blobber_ids(&self) -> Vec<String> {
        self.blobbers
            .iter()
            .map(|blobber| blobber.blobber_id.clone())
            .collect()
    }
}

/// Input of the `new_allocation_request` smart contract call.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NewAllocationRequest {
    pub data_shards: u32,
    pub parity_shards: u32,
    pub size: i64,
    pub owner_id: String,
    pub owner_public_key: String,
    pub blobbers: Vec<String>,
    pub read_price_range: PriceRange,
    pub write_price_range: PriceRange,
    /// Tokens locked into the allocation; sent as the transaction value.
    #[serde(skip)]
    pub lock: Tokens,
}

impl NewAllocationRequest {
    #[must_use]
    pub const fn total_shards(&self) -> usize {
        (self.data_shards + self.parity_shards) as usize
    }
}
