use std::sync::Arc;

use testing_framework_core::{
    chain::ChainError,
    harness::{CaseResult, SystemTest},
    models::Tokens,
};

use super::util::{registered_wallet, settled_balance};
use crate::Network;

pub fn faucet_tests(t: &SystemTest, network: Arc<Network>) {
    let shared = Arc::clone(&network);
    t.run_parallel("pours_accumulate", move |t| pours_accumulate(t, shared));
    t.run_parallel("zero_pour_rejected", move |t| zero_pour_rejected(t, network));
}

async fn pours_accumulate(t: SystemTest, network: Arc<Network>) -> CaseResult {
    let wallet = registered_wallet(&t, &network).await?;
    let amount = network.faucet_amount();

    for pour in 1..=2 {
        t.require_ok(
            network.chain.execute_faucet(&wallet, amount).await,
            format!("pour #{pour}"),
        )?;
    }

    let expected = amount + amount;
    let balance = settled_balance(&t, &network, &wallet.client_id, |balance| {
        balance >= expected
    })
    .await?;
    t.check_eq(balance, expected, "balance after two pours");

    let state = t.require_ok(
        network.chain.balance(&wallet.client_id).await,
        "balance after two pours",
    )?;
    t.check(
        state.nonce >= 2,
        format!("nonce {} after two transactions", state.nonce),
    );
    Ok(())
}

async fn zero_pour_rejected(t: SystemTest, network: Arc<Network>) -> CaseResult {
    let wallet = registered_wallet(&t, &network).await?;

    let err = t.require_err(
        network.chain.execute_faucet(&wallet, Tokens::ZERO).await,
        "pour of zero tokens",
    )?;
    t.check(
        matches!(err, ChainError::TransactionFailed { .. }) || err.is_client_error(),
        format!("unexpected rejection: {err}"),
    );

    // Nothing may have been credited, whether or not the chain knows the
    // client yet.
    if let Ok(balance) = network.chain.balance(&wallet.client_id).await {
        t.check_eq(balance.balance, Tokens::ZERO, "balance after rejected pour");
    }
    Ok(())
}
