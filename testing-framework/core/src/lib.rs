pub mod chain;
pub mod crypto;
pub mod harness;
pub mod models;
pub mod nodes;
pub mod sdk;
pub mod wait;
pub mod wallets;
pub mod zs3;

pub use testing_framework_config::adjust_timeout;
