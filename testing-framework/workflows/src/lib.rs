pub mod network;
pub mod scenarios;

pub use network::{Network, NetworkError};
pub use scenarios::{
    ScenarioGroup, all_groups, allocation, faucet, file_ops, register_groups, repair, wallet, zs3,
};
