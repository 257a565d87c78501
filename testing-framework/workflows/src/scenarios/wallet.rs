//! Client registration and balance queries.

use std::sync::Arc;

use testing_framework_core::{
    crypto::KeyPair,
    harness::{CaseResult, SystemTest},
    models::ClientRegistration,
};

use super::util::{registered_wallet, settled_balance};
use crate::Network;

const MALFORMED_PUBLIC_KEY: &str = "not-a-public-key";

pub fn register_wallet_tests(t: &SystemTest, network: Arc<Network>) {
    t.mark_smoke(["register_and_fund"]);

    let shared = Arc::clone(&network);
    t.run_parallel("register_and_fund", move |t| register_and_fund(t, shared));
    let shared = Arc::clone(&network);
    t.run_parallel("malformed_public_key", move |t| {
        malformed_public_key(t, shared)
    });
    t.run_parallel("unknown_wallet_balance", move |t| {
        unknown_wallet_balance(t, network)
    });
}

async fn register_and_fund(t: SystemTest, network: Arc<Network>) -> CaseResult {
    let wallet = registered_wallet(&t, &network).await?;
    let amount = network.faucet_amount();

    let confirmation = t.require_ok(
        network.chain.execute_faucet(&wallet, amount).await,
        "faucet pour",
    )?;
    t.check(
        confirmation.succeeded(),
        format!("pour {} not successful", confirmation.hash),
    );

    let balance = settled_balance(&t, &network, &wallet.client_id, |balance| {
        balance >= amount
    })
    .await?;
    t.require_eq(balance, amount, "balance after a single pour")
}

async fn malformed_public_key(t: SystemTest, network: Arc<Network>) -> CaseResult {
    let client_id = KeyPair::generate().client_id();
    let registration = ClientRegistration {
        id: client_id.clone(),
        public_key: MALFORMED_PUBLIC_KEY.to_owned(),
    };

    let err = t.require_err(
        network.chain.register_wallet(&registration).await,
        "register a malformed key",
    )?;
    t.check(
        err.is_client_error(),
        format!("expected a client error status, got {:?}: {err}", err.status()),
    );

    // The rejected client must not exist afterwards.
    let lookup = t.require_err(
        network.chain.balance(&client_id).await,
        "balance of the rejected client",
    )?;
    t.check(
        lookup.is_client_error(),
        format!("expected a client error status, got {:?}: {lookup}", lookup.status()),
    );
    Ok(())
}

async fn unknown_wallet_balance(t: SystemTest, network: Arc<Network>) -> CaseResult {
    let client_id = KeyPair::generate().client_id();
    let err = t.require_err(
        network.chain.balance(&client_id).await,
        "balance of an unregistered client",
    )?;
    t.require(
        err.is_client_error(),
        format!("expected a client error status, got {:?}: {err}", err.status()),
    )
}
