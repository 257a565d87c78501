mod api_client;
mod cluster;
pub mod paths;

pub use api_client::{ApiClient, ApiError, Reply};
pub use cluster::{NetworkNodes, NodeClients, NodeGroup};
