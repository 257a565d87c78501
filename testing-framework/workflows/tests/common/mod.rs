//! In-memory chain and storage SDK that behave like a healthy network.

#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use testing_framework_config::NetworkConfig;
use testing_framework_core::{
    chain::{ChainApi, ChainError},
    crypto,
    models::{
        Allocation, AllocationBlobber, Balance, ClientRegistration, Confirmation, FileRef,
        ListResult, NewAllocationRequest, RegisteredClient, StorageNode, Tokens,
        TransactionEntity, TransactionRequest, Wallet,
    },
    nodes::ApiError,
    sdk::{FileOperation, SdkError, StorageSdk, ensure_batch},
    wallets::WalletPool,
};
use testing_framework_workflows::Network;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn client_error(body: &str) -> ChainError {
    ChainError::Api(ApiError::Status {
        status: StatusCode::BAD_REQUEST,
        url: Url::parse("http://sharder.fake.invalid/").unwrap(),
        body: body.to_owned(),
    })
}

#[derive(Default)]
struct ChainState {
    registered: HashMap<String, String>,
    balances: HashMap<String, (Tokens, i64)>,
    allocations: Vec<Allocation>,
    next_hash: u64,
}

impl ChainState {
    fn next_hash(&mut self) -> String {
        self.next_hash += 1;
        crypto::sha3_hex(&self.next_hash.to_le_bytes())
    }

    fn bump_nonce(&mut self, client_id: &str) -> &mut (Tokens, i64) {
        let entry = self
            .balances
            .entry(client_id.to_owned())
            .or_insert((Tokens::ZERO, 0));
        entry.1 += 1;
        entry
    }
}

pub struct FakeChain {
    blobbers: Vec<StorageNode>,
    state: Mutex<ChainState>,
}

impl FakeChain {
    pub fn new(blobbers: usize) -> Self {
        Self {
            blobbers: (0..blobbers)
                .map(|index| StorageNode {
                    id: format!("blobber-{index}"),
                    url: format!("http://blobber-{index}.fake.invalid"),
                    capacity: 1 << 40,
                    ..StorageNode::default()
                })
                .collect(),
            state: Mutex::new(ChainState::default()),
        }
    }

    /// Registers and credits `wallet` directly, as a pre-funded pool wallet.
    pub fn seed(&self, wallet: &Wallet, tokens: Tokens) {
        let mut state = self.state.lock().unwrap();
        state
            .registered
            .insert(wallet.client_id.clone(), wallet.client_key.clone());
        state
            .balances
            .insert(wallet.client_id.clone(), (tokens, 0));
    }

    pub fn registered(&self) -> usize {
        self.state.lock().unwrap().registered.len()
    }
}

#[async_trait]
impl ChainApi for FakeChain {
    async fn register_wallet(
        &self,
        registration: &ClientRegistration,
    ) -> Result<RegisteredClient, ChainError> {
        match crypto::client_id(&registration.public_key) {
            Ok(id) if id == registration.id => {
                self.state
                    .lock()
                    .unwrap()
                    .registered
                    .insert(id.clone(), registration.public_key.clone());
                Ok(RegisteredClient {
                    id,
                    public_key: registration.public_key.clone(),
                    version: Some("1.0".to_owned()),
                    creation_date: None,
                })
            }
            _ => Err(client_error("invalid public key")),
        }
    }

    async fn balance(&self, client_id: &str) -> Result<Balance, ChainError> {
        let state = self.state.lock().unwrap();
        let (balance, nonce) = state
            .balances
            .get(client_id)
            .copied()
            .ok_or_else(|| client_error("value not present"))?;
        Ok(Balance {
            txn: String::new(),
            round: 1,
            balance,
            nonce,
        })
    }

    async fn submit_transaction(
        &self,
        wallet: &Wallet,
        request: TransactionRequest,
    ) -> Result<TransactionEntity, ChainError> {
        let mut state = self.state.lock().unwrap();
        let hash = state.next_hash();
        let nonce = state.bump_nonce(&wallet.client_id).1;
        Ok(TransactionEntity {
            hash,
            client_id: wallet.client_id.clone(),
            to_client_id: request.to_client_id,
            transaction_value: request.value,
            transaction_nonce: nonce,
            ..TransactionEntity::default()
        })
    }

    async fn confirmation(&self, hash: &str) -> Result<Confirmation, ChainError> {
        Err(client_error(&format!("transaction {hash} not found")))
    }

    async fn execute_faucet(
        &self,
        wallet: &Wallet,
        tokens: Tokens,
    ) -> Result<Confirmation, ChainError> {
        let mut state = self.state.lock().unwrap();
        let hash = state.next_hash();
        let entry = state.bump_nonce(&wallet.client_id);
        if tokens.units() <= 0 {
            return Err(ChainError::TransactionFailed {
                hash,
                output: "pour amount must be positive".to_owned(),
            });
        }
        entry.0 = entry.0 + tokens;
        Ok(Confirmation {
            hash: hash.clone(),
            round: 1,
            transaction: Some(TransactionEntity {
                hash,
                client_id: wallet.client_id.clone(),
                transaction_value: tokens,
                transaction_status: TransactionEntity::STATUS_SUCCESS,
                ..TransactionEntity::default()
            }),
            ..Confirmation::default()
        })
    }

    async fn blobbers(&self) -> Result<Vec<StorageNode>, ChainError> {
        Ok(self.blobbers.clone())
    }

    async fn create_allocation(
        &self,
        wallet: &Wallet,
        request: &NewAllocationRequest,
    ) -> Result<String, ChainError> {
        let mut state = self.state.lock().unwrap();
        let hash = state.next_hash();
        let entry = state.bump_nonce(&wallet.client_id);
        if request.lock.units() <= 0 || entry.0 < request.lock {
            return Err(ChainError::TransactionFailed {
                hash,
                output: "not enough tokens to honor the min lock demand".to_owned(),
            });
        }
        entry.0 = Tokens::from_units(entry.0.units() - request.lock.units());
        state.allocations.push(Allocation {
            id: hash.clone(),
            tx: hash.clone(),
            data_shards: request.data_shards,
            parity_shards: request.parity_shards,
            size: request.size,
            owner_id: request.owner_id.clone(),
            owner_public_key: request.owner_public_key.clone(),
            blobbers: request
                .blobbers
                .iter()
                .map(|blobber_id| AllocationBlobber {
                    blobber_id: blobber_id.clone(),
                    url: String::new(),
                })
                .collect(),
            ..Allocation::default()
        });
        Ok(hash)
    }

    async fn allocation(&self, id: &str) -> Result<Allocation, ChainError> {
        self.state
            .lock()
            .unwrap()
            .allocations
            .iter()
            .find(|allocation| allocation.id == id)
            .cloned()
            .ok_or_else(|| client_error("allocation not found"))
    }

    async fn allocations(&self, owner_id: &str) -> Result<Vec<Allocation>, ChainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .allocations
            .iter()
            .filter(|allocation| allocation.owner_id == owner_id)
            .cloned()
            .collect())
    }
}

type Files = BTreeMap<String, Vec<u8>>;

#[derive(Default)]
struct AllocationFiles {
    files: Files,
    commits: Vec<Files>,
}

/// Storage SDK keeping every allocation's files in memory. Each
/// multi-operation is one commit that rollback can undo.
#[derive(Default)]
pub struct FakeSdk {
    targets_blobbers: bool,
    lossy_rollback: bool,
    allocations: Mutex<HashMap<String, AllocationFiles>>,
    repairs: Mutex<Vec<(String, String)>>,
}

fn parent(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((dir, _)) => dir,
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

fn join(dir: &str, name: &str) -> String {
    format!("{}/{name}", dir.trim_end_matches('/'))
}

fn missing(op: &FileOperation) -> SdkError {
    SdkError::Command {
        command: op.label().to_owned(),
        status: Some(1),
        stderr: format!("{} not found", op.remote()),
    }
}

impl FakeSdk {
    pub fn new() -> Self {
        Self {
            targets_blobbers: true,
            ..Self::default()
        }
    }

    /// Rejects per-blobber repair lists like the storage CLI does.
    pub fn without_repair_lists(mut self) -> Self {
        self.targets_blobbers = false;
        self
    }

    /// Rollback drops the previous commit without restoring it.
    pub fn with_lossy_rollback(mut self) -> Self {
        self.lossy_rollback = true;
        self
    }

    /// `(allocation, root)` of every repair requested so far.
    pub fn repairs(&self) -> Vec<(String, String)> {
        self.repairs.lock().unwrap().clone()
    }

    fn apply(files: &mut Files, op: &FileOperation) -> Result<(), SdkError> {
        match op {
            FileOperation::Upload { local, remote } | FileOperation::Update { local, remote } => {
                let content = std::fs::read(local).map_err(SdkError::Wallet)?;
                files.insert(remote.clone(), content);
            }
            FileOperation::Delete { remote } => {
                files.remove(remote).ok_or_else(|| missing(op))?;
            }
            FileOperation::Rename { remote, new_name } => {
                let content = files.remove(remote).ok_or_else(|| missing(op))?;
                files.insert(join(parent(remote), new_name), content);
            }
            FileOperation::Move { remote, dest_dir } => {
                let content = files.remove(remote).ok_or_else(|| missing(op))?;
                files.insert(join(dest_dir, base_name(remote)), content);
            }
            FileOperation::Copy { remote, dest_dir } => {
                let content = files.get(remote).cloned().ok_or_else(|| missing(op))?;
                files.insert(join(dest_dir, base_name(remote)), content);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StorageSdk for FakeSdk {
    async fn list_files(
        &self,
        _wallet: &Wallet,
        allocation_id: &str,
        remote_dir: &str,
    ) -> Result<ListResult, SdkError> {
        let allocations = self.allocations.lock().unwrap();
        let dir = match remote_dir.trim_end_matches('/') {
            "" => "/",
            dir => dir,
        };
        let list = allocations
            .get(allocation_id)
            .map(|allocation| {
                allocation
                    .files
                    .iter()
                    .filter(|(path, _)| parent(path) == dir)
                    .map(|(path, content)| FileRef {
                        path: path.clone(),
                        name: base_name(path).to_owned(),
                        kind: FileRef::FILE.to_owned(),
                        size: i64::try_from(content.len()).unwrap_or(i64::MAX),
                        ..FileRef::default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(ListResult {
            allocation_id: allocation_id.to_owned(),
            path: dir.to_owned(),
            list,
        })
    }

    async fn multi_operation(
        &self,
        _wallet: &Wallet,
        allocation_id: &str,
        ops: &[FileOperation],
        repair_list: Option<&[String]>,
    ) -> Result<(), SdkError> {
        ensure_batch(ops)?;
        if repair_list.is_some() && !self.targets_blobbers {
            return Err(SdkError::Unsupported("per-blobber repair lists"));
        }

        let mut allocations = self.allocations.lock().unwrap();
        let allocation = allocations.entry(allocation_id.to_owned()).or_default();
        let mut next = allocation.files.clone();
        for op in ops {
            Self::apply(&mut next, op)?;
        }
        let previous = std::mem::replace(&mut allocation.files, next);
        allocation.commits.push(previous);
        Ok(())
    }

    async fn download(
        &self,
        _wallet: &Wallet,
        allocation_id: &str,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<(), SdkError> {
        let content = self
            .allocations
            .lock()
            .unwrap()
            .get(allocation_id)
            .and_then(|allocation| allocation.files.get(remote_path).cloned())
            .ok_or_else(|| SdkError::Command {
                command: "download".to_owned(),
                status: Some(1),
                stderr: format!("{remote_path} not found"),
            })?;
        std::fs::write(local_path, content).map_err(SdkError::Wallet)
    }

    async fn repair_allocation(
        &self,
        _wallet: &Wallet,
        allocation_id: &str,
        remote_root: &str,
    ) -> Result<(), SdkError> {
        self.repairs
            .lock()
            .unwrap()
            .push((allocation_id.to_owned(), remote_root.to_owned()));
        Ok(())
    }

    async fn rollback_allocation(
        &self,
        _wallet: &Wallet,
        allocation_id: &str,
    ) -> Result<(), SdkError> {
        let mut allocations = self.allocations.lock().unwrap();
        let allocation = allocations
            .get_mut(allocation_id)
            .ok_or_else(|| SdkError::Command {
                command: "rollback".to_owned(),
                status: Some(1),
                stderr: "unknown allocation".to_owned(),
            })?;
        let previous = allocation.commits.pop().ok_or_else(|| SdkError::Command {
            command: "rollback".to_owned(),
            status: Some(1),
            stderr: "nothing to roll back".to_owned(),
        })?;
        if !self.lossy_rollback {
            allocation.files = previous;
        }
        Ok(())
    }
}

pub struct FakeNetwork {
    pub network: Arc<Network>,
    pub chain: Arc<FakeChain>,
    pub sdk: Arc<FakeSdk>,
}

pub fn test_config(settle: Duration) -> NetworkConfig {
    let mut config = NetworkConfig::with_nodes(
        vec!["http://miner.fake.invalid".to_owned()],
        vec!["http://sharder.fake.invalid".to_owned()],
    );
    config.poll_interval = Duration::from_millis(10);
    config.confirmation_timeout = settle;
    config
}

pub fn fake_network(blobbers: usize, sdk: FakeSdk) -> FakeNetwork {
    fake_network_with(blobbers, sdk, None)
}

pub fn fake_network_with(blobbers: usize, sdk: FakeSdk, pool: Option<WalletPool>) -> FakeNetwork {
    let chain = Arc::new(FakeChain::new(blobbers));
    let sdk = Arc::new(sdk);
    let mut network = Network::new(
        Arc::clone(&chain) as Arc<dyn ChainApi>,
        Arc::clone(&sdk) as Arc<dyn StorageSdk>,
        test_config(Duration::from_secs(2)),
    );
    if let Some(pool) = pool {
        network = network.with_wallet_pool(pool);
    }
    FakeNetwork {
        network: Arc::new(network),
        chain,
        sdk,
    }
}
