use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use thiserror::Error;
use tracing::{debug, info};

use crate::models::Wallet;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to read wallet pool {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse wallet pool {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("wallet pool exhausted: requested {requested}, {remaining} remaining")]
    Exhausted { requested: usize, remaining: usize },
}

/// Preloaded, pre-funded wallets shared by scenarios.
///
/// Every claim advances a shared cursor atomically, so concurrent claims
/// always receive disjoint wallets.
#[derive(Debug)]
pub struct WalletPool {
    wallets: Vec<Wallet>,
    cursor: AtomicUsize,
}

impl WalletPool {
    #[must_use]
    pub const fn new(wallets: Vec<Wallet>) -> Self {
        Self {
            wallets,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Loads a JSON array of wallets.
    pub fn load(path: &Path) -> Result<Self, PoolError> {
        let raw = fs::read(path).map_err(|source| PoolError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let wallets: Vec<Wallet> =
            serde_json::from_slice(&raw).map_err(|source| PoolError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), wallets = wallets.len(), "loaded wallet pool");
        Ok(Self::new(wallets))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.cursor.load(Ordering::Acquire))
    }

    pub fn claim(&self) -> Result<Wallet, PoolError> {
        let mut wallets = self.claim_range(1)?;
        wallets.pop().ok_or(PoolError::Exhausted {
            requested: 1,
            remaining: 0,
        })
    }

    /// Claims `count` consecutive wallets at once, or none of them.
    pub fn claim_range(&self, count: usize) -> Result<Vec<Wallet>, PoolError> {
        let total = self.len();
        let start = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                cursor
                    .checked_add(count)
                    .filter(|end| *end <= total)
            })
            .map_err(|cursor| PoolError::Exhausted {
                requested: count,
                remaining: total.saturating_sub(cursor),
            })?;

        debug!(start, count, "claimed wallets from pool");
        Ok(self.wallets[start..start + count].to_vec())
    }
}
