use std::path::{Path, PathBuf};

use rand::{Rng as _, RngCore as _, thread_rng};
use testing_framework_core::{
    crypto::KeyPair,
    harness::{Halt, SystemTest},
    models::{Allocation, ListResult, NewAllocationRequest, PriceRange, Tokens, Wallet},
    wait::wait_until,
};
use tracing::debug;

use crate::Network;

/// Allocation size requested by every scenario.
pub const ALLOCATION_SIZE: i64 = 10 * 1024 * 1024;
/// Tokens locked into a new allocation.
pub const ALLOCATION_LOCK_TOKENS: f64 = 0.5;
const LOCAL_FILE_SIZE: usize = 1024;

/// Shard layout of a new allocation.
#[derive(Clone, Copy, Debug)]
pub struct Shards {
    pub data: u32,
    pub parity: u32,
}

impl Shards {
    pub const TWO_TWO: Self = Self { data: 2, parity: 2 };

    #[must_use]
    pub const fn total(self) -> usize {
        (self.data + self.parity) as usize
    }
}

/// Lowercase suffix that keeps remote names unique across runs.
#[must_use]
pub fn unique_suffix() -> String {
    hex::encode(thread_rng().r#gen::<[u8; 6]>())
}

/// Generates a key pair and registers it as a new client.
pub async fn registered_wallet(t: &SystemTest, network: &Network) -> Result<Wallet, Halt> {
    let wallet = KeyPair::generate().wallet();
    let registered = t.require_ok(
        network.chain.register_wallet(&wallet.registration()).await,
        "register wallet",
    )?;
    t.check_eq(registered.id.as_str(), wallet.client_id.as_str(), "registered client id");
    t.log(format!("registered wallet {}", wallet.client_id));
    Ok(wallet)
}

/// A wallet holding at least the faucet amount: claimed from the pool when
/// one is configured, otherwise registered and funded through the faucet.
pub async fn funded_wallet(t: &SystemTest, network: &Network) -> Result<Wallet, Halt> {
    if let Some(claimed) = network.pooled_wallet() {
        let wallet = t.require_ok(claimed, "claim pooled wallet")?;
        t.log(format!("using pooled wallet {}", wallet.client_id));
        return Ok(wallet);
    }

    let wallet = registered_wallet(t, network).await?;
    t.require_ok(
        network
            .chain
            .execute_faucet(&wallet, network.faucet_amount())
            .await,
        "faucet pour",
    )?;
    Ok(wallet)
}

/// Polls the balance of `client_id` until `accept` holds for it.
pub async fn settled_balance<F>(
    t: &SystemTest,
    network: &Network,
    client_id: &str,
    accept: F,
) -> Result<Tokens, Halt>
where
    F: Fn(Tokens) -> bool,
{
    let accept = &accept;
    let settled = wait_until(
        format!("settled balance of {client_id}"),
        network.settle_timeout(),
        network.poll_interval(),
        move || async move {
            let balance = network.chain.balance(client_id).await.ok()?.balance;
            accept(balance).then_some(balance)
        },
    )
    .await;

    match settled {
        Ok(balance) => Ok(balance),
        Err(err) => {
            let last = network.chain.balance(client_id).await;
            Err(t.fatal(format!("{err}; last balance {last:?}")))
        }
    }
}

/// Builds an allocation request for `wallet` over the first available
/// blobbers. Skips the case when the network has too few of them.
pub async fn allocation_request(
    t: &SystemTest,
    network: &Network,
    wallet: &Wallet,
    shards: Shards,
    lock: Tokens,
) -> Result<NewAllocationRequest, Halt> {
    let blobbers = t.require_ok(network.chain.blobbers().await, "list blobbers")?;
    let available: Vec<String> = blobbers
        .iter()
        .filter(|node| node.is_available())
        .map(|node| node.id.clone())
        .take(shards.total())
        .collect();
    if available.len() < shards.total() {
        return Err(t.skip(format!(
            "{} shards requested but only {} blobbers are available",
            shards.total(),
            available.len()
        )));
    }

    Ok(NewAllocationRequest {
        data_shards: shards.data,
        parity_shards: shards.parity,
        size: ALLOCATION_SIZE,
        owner_id: wallet.client_id.clone(),
        owner_public_key: wallet.client_key.clone(),
        blobbers: available,
        read_price_range: PriceRange::default(),
        write_price_range: PriceRange::default(),
        lock,
    })
}

/// Creates an allocation and waits until the sharders report it.
pub async fn create_allocation(
    t: &SystemTest,
    network: &Network,
    wallet: &Wallet,
    shards: Shards,
) -> Result<Allocation, Halt> {
    let request = allocation_request(
        t,
        network,
        wallet,
        shards,
        Tokens::from_tokens(ALLOCATION_LOCK_TOKENS),
    )
    .await?;
    let id = t.require_ok(
        network.chain.create_allocation(wallet, &request).await,
        "create allocation",
    )?;
    t.log(format!("created allocation {id}"));

    let allocation_id = id.as_str();
    let allocation = wait_until(
        format!("allocation {id}"),
        network.settle_timeout(),
        network.poll_interval(),
        move || async move { network.chain.allocation(allocation_id).await.ok() },
    )
    .await?;
    Ok(allocation)
}

/// Writes `count` files of random content named `file-<i>.txt` under `dir`.
pub async fn write_local_files(dir: &Path, count: usize) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(count);
    for index in 0..count {
        let path = dir.join(format!("file-{index}.txt"));
        write_random_file(&path).await?;
        paths.push(path);
    }
    Ok(paths)
}

pub async fn write_random_file(path: &Path) -> std::io::Result<()> {
    let mut content = vec![0_u8; LOCAL_FILE_SIZE];
    thread_rng().fill_bytes(&mut content);
    tokio::fs::write(path, content).await
}

/// Joins a remote directory and a file name.
#[must_use]
pub fn remote_path(dir: &str, name: &str) -> String {
    format!("{}/{name}", dir.trim_end_matches('/'))
}

/// Polls the listing of `remote_dir` until it holds exactly `expected` files.
pub async fn wait_for_file_count(
    t: &SystemTest,
    network: &Network,
    wallet: &Wallet,
    allocation_id: &str,
    remote_dir: &str,
    expected: usize,
) -> Result<ListResult, Halt> {
    let listing = wait_until(
        format!("{expected} files in {remote_dir}"),
        network.settle_timeout(),
        network.poll_interval(),
        move || async move {
            let listing = network
                .sdk
                .list_files(wallet, allocation_id, remote_dir)
                .await
                .ok()?;
            (listing.files().count() == expected).then_some(listing)
        },
    )
    .await;

    match listing {
        Ok(listing) => {
            debug!(remote_dir, expected, "listing settled");
            Ok(listing)
        }
        Err(err) => {
            let last = network
                .sdk
                .list_files(wallet, allocation_id, remote_dir)
                .await
                .map(|listing| listing.paths().join(", "));
            Err(t.fatal(format!("{err}; last listing {last:?}")))
        }
    }
}
