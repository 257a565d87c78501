//! Value objects exchanged with miners, sharders and the storage CLI.

mod allocation;
mod files;
mod tokens;
mod transaction;
mod wallet;

pub use allocation::{
    Allocation, AllocationBlobber, NewAllocationRequest, PriceRange, StorageNode, StorageNodes,
    Terms,
};
pub use files::{FileRef, ListResult};
pub use tokens::{Tokens, UNITS_PER_TOKEN};
pub use transaction::{
    Confirmation, SubmittedTransaction, Transaction, TransactionEntity, TransactionRequest,
    TransactionType,
};
pub use wallet::{Balance, ClientRegistration, RegisteredClient, Wallet, WalletKey};
