// src/mcp/wallet_storage.rs

//! Filesystem wallet store: one JSON file per wallet plus a flat index.
//!
//! Index updates are serialised in-process by a mutex and across processes
//! by an exclusive lock on `wallets-index.lock`; the index itself is
//! replaced by rename so readers never observe a half-written file.

use chrono::{SecondsFormat, Utc};
use fs2::FileExt;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use crate::config::Network;

pub const INDEX_FILE: &str = "wallets-index.json";
const LOCK_FILE: &str = "wallets-index.lock";

#[derive(Debug, Error)]
pub enum WalletStoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is not valid wallet JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("wallet store task failed: {0}")]
    Task(String),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> WalletStoreError + '_ {
    move |source| WalletStoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub address: String,
    pub mnemonic: String,
    pub network: Network,
    pub label: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub address: String,
    pub network: Network,
    pub label: String,
    pub created_at: String,
    pub filename: String,
}

#[derive(Debug, Clone)]
pub struct NewWallet {
    pub address: String,
    pub mnemonic: String,
    pub network: Network,
    pub label: Option<String>,
}

#[derive(Debug)]
pub struct WalletStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl WalletStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Writes the wallet file, then appends it to the index.
    pub async fn save(&self, wallet: NewWallet) -> Result<(WalletRecord, IndexEntry), WalletStoreError> {
        let _guard = self.write_lock.lock().await;
        let dir = self.dir.clone();
        let saved = tokio::task::spawn_blocking(move || save_blocking(&dir, wallet))
            .await
            .map_err(|e| WalletStoreError::Task(e.to_string()))??;
        info!(filename = %saved.1.filename, network = saved.1.network.as_str(), "saved wallet");
        Ok(saved)
    }

    /// Index entries in save order. A missing index means no wallets.
    pub async fn list(&self) -> Result<Vec<IndexEntry>, WalletStoreError> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || read_index(&dir))
            .await
            .map_err(|e| WalletStoreError::Task(e.to_string()))?
    }

    /// Looks a wallet up by address, ignoring case.
    pub async fn get(&self, address: &str) -> Result<Option<WalletRecord>, WalletStoreError> {
        let dir = self.dir.clone();
        let address = address.to_string();
        tokio::task::spawn_blocking(move || {
            let entries = read_index(&dir)?;
            let Some(entry) = entries
                .iter()
                .find(|e| e.address.eq_ignore_ascii_case(&address))
            else {
                return Ok(None);
            };
            let path = dir.join(&entry.filename);
            let bytes = fs::read(&path).map_err(io_err(&path))?;
            let record = serde_json::from_slice(&bytes)
                .map_err(|source| WalletStoreError::Corrupt { path, source })?;
            Ok(Some(record))
        })
        .await
        .map_err(|e| WalletStoreError::Task(e.to_string()))?
    }
}

fn ensure_dir(dir: &Path) -> Result<(), WalletStoreError> {
    fs::create_dir_all(dir).map_err(io_err(dir))
}

fn read_index(dir: &Path) -> Result<Vec<IndexEntry>, WalletStoreError> {
    let path = dir.join(INDEX_FILE);
    match fs::read(&path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|source| WalletStoreError::Corrupt { path, source }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(io_err(&path)(e)),
    }
}

fn save_blocking(dir: &Path, wallet: NewWallet) -> Result<(WalletRecord, IndexEntry), WalletStoreError> {
    ensure_dir(dir)?;

    let lock_path = dir.join(LOCK_FILE);
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(io_err(&lock_path))?;
    lock.lock_exclusive().map_err(io_err(&lock_path))?;

    let result = write_wallet_and_index(dir, wallet);

    if let Err(e) = FileExt::unlock(&lock) {
        warn!("failed to release {}: {}", lock_path.display(), e);
    }
    result
}

fn write_wallet_and_index(
    dir: &Path,
    wallet: NewWallet,
) -> Result<(WalletRecord, IndexEntry), WalletStoreError> {
    let now = Utc::now();
    let created_at = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let label = wallet
        .label
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| format!("Wallet {}", created_at));

    let record = WalletRecord {
        address: wallet.address,
        mnemonic: wallet.mnemonic,
        network: wallet.network,
        label,
        created_at,
    };
    let body = serde_json::to_vec_pretty(&record).map_err(|source| WalletStoreError::Corrupt {
        path: dir.to_path_buf(),
        source,
    })?;

    let network = record.network.as_str().to_lowercase();
    let (filename, wallet_path) = create_wallet_file(dir, &network, now.timestamp_millis(), &body)?;

    let entry = IndexEntry {
        address: record.address.clone(),
        network: record.network,
        label: record.label.clone(),
        created_at: record.created_at.clone(),
        filename,
    };

    let appended = read_index(dir).and_then(|mut entries| {
        entries.push(entry.clone());
        write_index(dir, &entries)
    });
    if let Err(e) = appended {
        // Keep the directory consistent with the index.
        if let Err(rm) = fs::remove_file(&wallet_path) {
            warn!("failed to remove orphaned {}: {}", wallet_path.display(), rm);
        }
        return Err(e);
    }

    Ok((record, entry))
}

/// Creates `wallet-<network>-<millis>.json`, bumping the timestamp until the
/// name is free.
fn create_wallet_file(
    dir: &Path,
    network: &str,
    mut millis: i64,
    body: &[u8],
) -> Result<(String, PathBuf), WalletStoreError> {
    loop {
        let filename = format!("wallet-{}-{}.json", network, millis);
        let path = dir.join(&filename);
        match private_file(&path) {
            Ok(mut file) => {
                file.write_all(body)
                    .and_then(|_| file.sync_all())
                    .map_err(io_err(&path))?;
                return Ok((filename, path));
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => millis += 1,
            Err(e) => return Err(io_err(&path)(e)),
        }
    }
}

fn private_file(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create_new(true).write(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path)
}

fn write_index(dir: &Path, entries: &[IndexEntry]) -> Result<(), WalletStoreError> {
    let path = dir.join(INDEX_FILE);
    let body = serde_json::to_vec_pretty(entries).map_err(|source| WalletStoreError::Corrupt {
        path: path.clone(),
        source,
    })?;

    let mut suffix = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut suffix);
    let tmp = dir.join(format!(".{}.tmp.{}", INDEX_FILE, hex::encode(suffix)));

    let written = private_file(&tmp).and_then(|mut file| {
        file.write_all(&body)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(&tmp)(e));
    }

    // `rename` does not replace an existing file on Windows.
    #[cfg(windows)]
    {
        if path.exists() {
            fs::remove_file(&path).map_err(io_err(&path))?;
        }
    }

    fs::rename(&tmp, &path).map_err(io_err(&path))
}
