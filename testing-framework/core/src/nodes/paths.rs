//! Endpoint paths served by miners, sharders and the block worker.

pub const CLIENT_PUT: &str = "/v1/client/put";
pub const CLIENT_BALANCE: &str = "/v1/client/get/balance";
pub const TRANSACTION_PUT: &str = "/v1/transaction/put";
pub const TRANSACTION_CONFIRMATION: &str = "/v1/transaction/get/confirmation";
/// Served by the block worker, not by the nodes.
pub const NETWORK: &str = "/network";

pub const STORAGE_SC_ADDRESS: &str =
    "6dba10422e368813802877a85039d3985d96760ed844092319743fb3a76712d7";
pub const FAUCET_SC_ADDRESS: &str =
    "6dba10422e368813802877a85039d3985d96760ed844092319743fb3a76712d3";

pub const GET_BLOBBERS: &str = "getblobbers";
pub const ALLOCATION: &str = "allocation";
pub const ALLOCATIONS: &str = "allocations";

/// REST path of a smart contract endpoint.
#[must_use]
pub fn sc_rest(address: &str, endpoint: &str) -> String {
    format!("/v1/screst/{address}/{endpoint}")
}
