//! Scenario groups. Each group registers its cases as parallel children of
//! the case it is called from; every case works on its own wallet and
//! allocation, so groups are free to run side by side.

pub mod allocation;
pub mod faucet;
pub mod file_ops;
pub mod repair;
pub mod util;
pub mod wallet;
pub mod zs3;

use std::sync::Arc;

use testing_framework_core::harness::SystemTest;

use crate::Network;

/// Registers the cases of one group under the given handle.
pub type ScenarioGroup = fn(&SystemTest, Arc<Network>);

/// Every group, in the order the runner registers them.
#[must_use]
pub fn all_groups() -> Vec<(&'static str, ScenarioGroup)> {
    vec![
        ("wallet", wallet::register_wallet_tests as ScenarioGroup),
        ("faucet", faucet::faucet_tests as ScenarioGroup),
        ("allocation", allocation::allocation_tests as ScenarioGroup),
        ("file_ops", file_ops::multi_operation_tests as ScenarioGroup),
        ("repair", repair::repair_tests as ScenarioGroup),
        ("zs3", zs3::zs3_tests as ScenarioGroup),
    ]
}

/// Registers every group in `selected` (all groups when empty) as a parallel
/// child of `t`. Returns the names of the unknown groups.
pub fn register_groups(t: &SystemTest, network: &Arc<Network>, selected: &[String]) -> Vec<String> {
    let groups = all_groups();
    let unknown = selected
        .iter()
        .filter(|name| !groups.iter().any(|(group, _)| group == name))
        .cloned()
        .collect();

    for (name, group) in groups {
        if !selected.is_empty() && !selected.iter().any(|wanted| wanted == name) {
            continue;
        }
        let network = Arc::clone(network);
        t.run_parallel(name, move |t| async move {
            group(&t, network);
            Ok(())
        });
    }
    unknown
}
