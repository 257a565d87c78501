//! Storage allocation lifecycle on the storage smart contract.

use std::sync::Arc;

use testing_framework_core::{
    harness::{CaseResult, SystemTest},
    models::Tokens,
};

use super::util::{Shards, allocation_request, create_allocation, funded_wallet};
use crate::Network;

pub fn allocation_tests(t: &SystemTest, network: Arc<Network>) {
    t.mark_smoke(["create_and_query"]);

    let shared = Arc::clone(&network);
    t.run_parallel("create_and_query", move |t| create_and_query(t, shared));
    t.run_parallel("lock_above_balance_rejected", move |t| {
        lock_above_balance_rejected(t, network)
    });
}

async fn create_and_query(t: SystemTest, network: Arc<Network>) -> CaseResult {
    let wallet = funded_wallet(&t, &network).await?;
    let allocation = create_allocation(&t, &network, &wallet, Shards::TWO_TWO).await?;

    t.check_eq(allocation.data_shards, 2, "data shards");
    t.check_eq(allocation.parity_shards, 2, "parity shards");
    t.check_eq(
        allocation.owner_id.as_str(),
        wallet.client_id.as_str(),
        "allocation owner",
    );
    t.check_eq(allocation.blobber_ids().len(), 4, "allocation blobbers");
    t.check(!allocation.finalized, "new allocation is finalized");
    t.check(!allocation.canceled, "new allocation is canceled");

    let owned = t.require_ok(
        network.chain.allocations(&wallet.client_id).await,
        "list owned allocations",
    )?;
    t.require(
        owned.iter().any(|candidate| candidate.id == allocation.id),
        format!("allocation {} missing from the owner's list", allocation.id),
    )
}

async fn lock_above_balance_rejected(t: SystemTest, network: Arc<Network>) -> CaseResult {
    let wallet = funded_wallet(&t, &network).await?;
    let balance = t.require_ok(
        network.chain.balance(&wallet.client_id).await,
        "balance before allocation",
    )?;
    let before = t
        .require_ok(
            network.chain.allocations(&wallet.client_id).await,
            "list owned allocations",
        )?
        .len();

    let lock = balance.balance + Tokens::from_tokens(1.0);
    let request = allocation_request(&t, &network, &wallet, Shards::TWO_TWO, lock).await?;
    let err = t.require_err(
        network.chain.create_allocation(&wallet, &request).await,
        format!("allocation locking {lock} with a balance of {}", balance.balance),
    )?;
    t.log(format!("rejected as expected: {err}"));

    let owned = t.require_ok(
        network.chain.allocations(&wallet.client_id).await,
        "list owned allocations",
    )?;
    t.require_eq(owned.len(), before, "owned allocations after the rejected request")
}
