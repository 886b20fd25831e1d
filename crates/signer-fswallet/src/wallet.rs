//! The filesystem keystore wallet.
//!
//! A [`FilesystemWallet`] watches a directory of keystore v3 files, maps
//! addresses to files by name (extension or regex), decrypts keys on demand
//! with their companion password files, caches the decrypted keys, and
//! notifies listeners of newly discovered addresses.
//!
//! # Lifecycle
//!
//! `Uninitialized -> Initializing -> Running -> Closed`. [`initialize`]
//! starts the background watcher, waits for it to report readiness, then
//! performs a synchronous initial scan. Dropping the `initialize` future
//! mid-flight aborts the watcher it started; [`close`] is idempotent and
//! also clears the signer cache.
//!
//! Re-scans only ever add addresses; a file disappearing from the directory
//! is not observed here (removal is an operator workflow, not a signing
//! concern). A file *replacing* another for the same address invalidates
//! the cached key so a superseded key is never served.
//!
//! [`initialize`]: FilesystemWallet::initialize
//! [`close`]: FilesystemWallet::close

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use evm_signer_core::eip712::{self, TypedData};
use evm_signer_core::keystore::KeystoreV3;
use evm_signer_core::{Address, Error, KeyPair, Result, Transaction, Wallet};
use regex::Regex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};
use zeroize::Zeroizing;

use crate::cache::SignerCache;
use crate::config::Config;
use crate::template::Template;

/// Where the wallet is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, not yet initialized.
    Uninitialized,
    /// Watcher starting, initial scan not yet complete.
    Initializing,
    /// Initial scan done; serving requests.
    Running,
    /// Closed; watcher stopped and cache cleared.
    Closed,
}

/// A wallet backed by a directory of keystore v3 files.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct FilesystemWallet {
    inner: Arc<WalletInner>,
}

struct WalletInner {
    conf: Config,
    primary_regex: Option<Regex>,
    key_file_template: Option<Template>,
    password_file_template: Option<Template>,
    cache: SignerCache,
    shared: Mutex<Shared>,
}

/// Everything mutated under the one wallet mutex.
struct Shared {
    state: LifecycleState,
    address_to_file: HashMap<Address, String>,
    listeners: Vec<mpsc::UnboundedSender<Address>>,
    watcher: Option<JoinHandle<()>>,
}

/// Aborts a freshly spawned watcher if `initialize` is cancelled before it
/// hands the task over to the wallet state.
struct WatcherGuard {
    handle: Option<JoinHandle<()>>,
}

impl WatcherGuard {
    fn disarm(mut self) -> JoinHandle<()> {
        self.handle.take().expect("guard already disarmed")
    }
}

impl Drop for WatcherGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl FilesystemWallet {
    /// Validates the configuration and builds a wallet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRegex`] when `primary_match_regex` does not
    /// compile or has no capture group, and [`Error::BadTemplate`] when a
    /// metadata property template does not parse.
    pub fn new(conf: Config) -> Result<Self> {
        let primary_regex = match &conf.filenames.primary_match_regex {
            Some(pattern) => {
                let regex =
                    Regex::new(pattern).map_err(|e| Error::BadRegex(format!("{pattern}: {e}")))?;
                if regex.captures_len() < 2 {
                    return Err(Error::BadRegex(format!(
                        "{pattern}: must contain at least one capture group"
                    )));
                }
                Some(regex)
            }
            None => None,
        };

        let key_file_template = conf
            .metadata
            .key_file_property
            .as_deref()
            .map(Template::parse)
            .transpose()?;
        let password_file_template = conf
            .metadata
            .password_file_property
            .as_deref()
            .map(Template::parse)
            .transpose()?;

        let cache = SignerCache::new(
            conf.signer_cache.max_size,
            Duration::from_secs(conf.signer_cache.ttl_secs),
        );

        Ok(Self {
            inner: Arc::new(WalletInner {
                conf,
                primary_regex,
                key_file_template,
                password_file_template,
                cache,
                shared: Mutex::new(Shared {
                    state: LifecycleState::Uninitialized,
                    address_to_file: HashMap::new(),
                    listeners: Vec::new(),
                    watcher: None,
                }),
            }),
        })
    }

    /// Registers a sink that receives every newly discovered address.
    ///
    /// Notifications are pushed from outside the wallet lock, in no
    /// particular order; a disconnected listener is skipped.
    pub fn add_listener(&self, listener: mpsc::UnboundedSender<Address>) {
        self.inner.lock_shared().listeners.push(listener);
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.inner.lock_shared().state
    }

    async fn get_signer(&self, from: Address) -> Result<Arc<KeyPair>> {
        let inner = &self.inner;
        let cache_key = from.to_hex();
        if let Some(keypair) = inner.cache.get(&cache_key) {
            return Ok(keypair);
        }

        let filename = inner
            .lock_shared()
            .address_to_file
            .get(&from)
            .cloned()
            .ok_or(Error::WalletNotAvailable(from))?;

        let keypair = inner.load_key(from, &filename).await?;
        if keypair.address() != from {
            return Err(Error::AddressMismatch {
                derived: keypair.address(),
                expected: from,
            });
        }

        let keypair = Arc::new(keypair);
        inner.cache.insert(cache_key, Arc::clone(&keypair));
        Ok(keypair)
    }
}

#[async_trait]
impl Wallet for FilesystemWallet {
    async fn initialize(&self) -> Result<()> {
        self.inner.lock_shared().state = LifecycleState::Initializing;

        if !self.inner.conf.disable_listener {
            let (ready_tx, ready_rx) = oneshot::channel();
            let watcher_inner = Arc::clone(&self.inner);
            let guard = WatcherGuard {
                handle: Some(tokio::spawn(watcher_loop(watcher_inner, ready_tx))),
            };

            // The watcher must be live before the initial scan so no file
            // lands between the two unseen
            if ready_rx.await.is_err() {
                return Err(Error::SignerInternal(
                    "filesystem watcher failed to start".to_string(),
                ));
            }

            let handle = guard.disarm();
            let mut shared = self.inner.lock_shared();
            if shared.state == LifecycleState::Closed {
                handle.abort();
                return Ok(());
            }
            if let Some(old) = shared.watcher.replace(handle) {
                old.abort();
            }
        }

        self.inner.refresh_scan().await?;

        let mut shared = self.inner.lock_shared();
        if shared.state != LifecycleState::Closed {
            shared.state = LifecycleState::Running;
        }
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.inner.refresh_scan().await
    }

    async fn close(&self) -> Result<()> {
        let watcher = {
            let mut shared = self.inner.lock_shared();
            shared.state = LifecycleState::Closed;
            shared.watcher.take()
        };
        if let Some(handle) = watcher {
            handle.abort();
        }
        self.inner.cache.clear();
        Ok(())
    }

    async fn get_accounts(&self) -> Result<Vec<Address>> {
        Ok(self
            .inner
            .lock_shared()
            .address_to_file
            .keys()
            .copied()
            .collect())
    }

    async fn sign(&self, txn: &Transaction, chain_id: i64) -> Result<Vec<u8>> {
        let from = txn
            .from
            .ok_or_else(|| Error::BadAddress("transaction has no from address".to_string()))?;
        let keypair = self.get_signer(from).await?;
        txn.sign(&keypair, chain_id)
    }

    async fn sign_typed_data_v4(&self, from: &Address, payload: &TypedData) -> Result<Vec<u8>> {
        let keypair = self.get_signer(*from).await?;
        eip712::sign_typed_data_v4(&keypair, payload)
    }
}

impl WalletInner {
    fn lock_shared(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().expect("wallet state poisoned")
    }

    /// Lists the directory and folds new files into the address map.
    async fn refresh_scan(&self) -> Result<()> {
        let path = &self.conf.path;
        let read_dir_failed = |e: std::io::Error| Error::ReadDirFailed {
            path: path.display().to_string(),
            detail: e.to_string(),
        };

        let mut dir = tokio::fs::read_dir(path).await.map_err(read_dir_failed)?;
        let mut filenames = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(read_dir_failed)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            match entry.file_type().await {
                Ok(file_type) if file_type.is_dir() => {
                    trace!(dir = %path.display(), file = %name, "ignoring directory");
                }
                Ok(_) => filenames.push(name),
                Err(err) => {
                    warn!(dir = %path.display(), file = %name, %err, "ignoring unreadable entry");
                }
            }
        }

        self.notify_new_files(&filenames);
        Ok(())
    }

    /// Applies the match policy and fans out discovery notifications.
    fn notify_new_files(&self, filenames: &[String]) {
        let mut new_addresses = Vec::new();
        let listeners = {
            let mut shared = self.lock_shared();
            for name in filenames {
                let Some(addr) = self.match_filename(name) else {
                    continue;
                };
                match shared.address_to_file.get(&addr) {
                    Some(existing) if existing == name => {}
                    Some(_) => {
                        // Same address, different file: the old key is stale
                        shared.address_to_file.insert(addr, name.clone());
                        self.cache.remove(&addr.to_hex());
                    }
                    None => {
                        shared.address_to_file.insert(addr, name.clone());
                        new_addresses.push(addr);
                    }
                }
            }
            shared.listeners.clone()
        };

        debug!(
            files = filenames.len(),
            new_addresses = new_addresses.len(),
            "scanned wallet directory"
        );

        // Listener sends happen outside the wallet lock
        if !new_addresses.is_empty() && !listeners.is_empty() {
            tokio::spawn(async move {
                for listener in &listeners {
                    for addr in &new_addresses {
                        let _ = listener.send(*addr);
                    }
                }
            });
        }
    }

    /// Maps a directory entry name to an address, or skips it.
    fn match_filename(&self, name: &str) -> Option<Address> {
        if let Some(regex) = &self.primary_regex {
            let Some(captures) = regex.captures(name) else {
                trace!(file = %name, "ignoring: does not match regexp");
                return None;
            };
            // Group 1 exists: enforced at construction
            let addr_str = captures.get(1)?.as_str();
            return match Address::from_hex(addr_str) {
                Ok(addr) => Some(addr),
                Err(err) => {
                    warn!(file = %name, candidate = %addr_str, %err, "ignoring: invalid address");
                    None
                }
            };
        }

        let Some(stem) = name.strip_suffix(&self.conf.filenames.primary_ext) else {
            trace!(file = %name, ext = %self.conf.filenames.primary_ext,
                "ignoring: does not match extension");
            return None;
        };
        match Address::from_hex(stem) {
            Ok(addr) => Some(addr),
            Err(err) => {
                warn!(file = %name, candidate = %stem, %err, "ignoring: invalid address");
                None
            }
        }
    }

    /// Reads, resolves and decrypts the key material behind an address.
    async fn load_key(&self, addr: Address, filename: &str) -> Result<KeyPair> {
        let primary_path = self.conf.path.join(filename);
        let primary_bytes = tokio::fs::read(&primary_path).await.map_err(|err| {
            error!(%addr, file = %primary_path.display(), %err, "failed to read primary file");
            Error::WalletFailed(addr)
        })?;

        let (key_file, password_file) =
            self.resolve_files(addr, &primary_path, &primary_bytes)?;
        debug!(%addr, key_file = %key_file.display(),
            password_file = %password_file.as_deref().unwrap_or_else(|| Path::new("<default>")).display(),
            "resolved key material");

        let key_bytes = if key_file == primary_path {
            primary_bytes
        } else {
            tokio::fs::read(&key_file).await.map_err(|err| {
                error!(%addr, file = %key_file.display(), %err, "failed to read keyfile");
                Error::WalletFailed(addr)
            })?
        };

        let mut password: Option<Zeroizing<Vec<u8>>> = None;
        if let Some(pf) = &password_file {
            match tokio::fs::read(pf).await {
                Ok(bytes) => password = Some(Zeroizing::new(bytes)),
                Err(err) => {
                    debug!(%addr, file = %pf.display(), %err, "failed to read password file");
                }
            }
        }
        let password = match password {
            Some(password) => password,
            None => {
                let Some(default_pf) = &self.conf.default_password_file else {
                    error!(%addr, "no password file available and no default configured");
                    return Err(Error::WalletFailed(addr));
                };
                Zeroizing::new(tokio::fs::read(default_pf).await.map_err(|err| {
                    error!(%addr, file = %default_pf.display(), %err,
                        "failed to read default password file");
                    Error::WalletFailed(addr)
                })?)
            }
        };

        // KDF work is CPU-bound for seconds on the cold path; keep it off
        // the async workers
        let decrypted = tokio::task::spawn_blocking(move || {
            KeystoreV3::read_wallet_file(&key_bytes, &password)
        })
        .await
        .map_err(|e| Error::SignerInternal(format!("keystore decrypt task: {e}")))?;

        decrypted.map_err(|err| match err {
            mismatch @ Error::AddressMismatch { .. } => mismatch,
            other => {
                error!(%addr, %other, "failed to decrypt keystore");
                Error::WalletFailed(addr)
            }
        })
    }

    /// Determines the keystore and password file paths for a primary file,
    /// via metadata templates or extension substitution.
    fn resolve_files(
        &self,
        addr: Address,
        primary_path: &Path,
        primary_bytes: &[u8],
    ) -> Result<(PathBuf, Option<PathBuf>)> {
        let mut format = self.conf.metadata.format.to_lowercase();
        if format == "auto" {
            format = self
                .conf
                .filenames
                .primary_ext
                .trim_start_matches('.')
                .to_lowercase();
        }

        let parsed: std::result::Result<Value, String> = match format.as_str() {
            "json" => serde_json::from_slice(primary_bytes).map_err(|e| e.to_string()),
            "toml" | "tml" => toml::from_str(&String::from_utf8_lossy(primary_bytes))
                .map_err(|e| e.to_string()),
            "yaml" | "yml" => serde_yaml::from_slice(primary_bytes).map_err(|e| e.to_string()),
            _ => {
                // No metadata: the primary file is the keystore itself
                return Ok((
                    primary_path.to_path_buf(),
                    self.password_file_by_extension(primary_path),
                ));
            }
        };
        let metadata = match parsed {
            Ok(value) => value,
            Err(err) => {
                error!(%addr, file = %primary_path.display(), %format, %err,
                    "failed to parse metadata file");
                return Err(Error::WalletFailed(addr));
            }
        };

        let Some(key_template) = &self.key_file_template else {
            error!(%addr, "metadata mode requires metadata.key_file_property");
            return Err(Error::WalletFailed(addr));
        };
        let key_file = match key_template.render(&metadata) {
            Ok(path) if !path.is_empty() => PathBuf::from(path),
            Ok(_) => {
                error!(%addr, "metadata resolved an empty keyfile path");
                return Err(Error::WalletFailed(addr));
            }
            Err(err) => {
                error!(%addr, %err, "keyfile template failed against metadata");
                return Err(Error::WalletFailed(addr));
            }
        };

        let password_file = self.password_file_template.as_ref().and_then(|template| {
            match template.render(&metadata) {
                Ok(path) if !path.is_empty() => Some(PathBuf::from(path)),
                Ok(_) => None,
                Err(err) => {
                    debug!(%addr, %err, "password template failed against metadata");
                    None
                }
            }
        });

        Ok((key_file, password_file))
    }

    /// Swaps `primary_ext` for `password_ext` on the primary path.
    fn password_file_by_extension(&self, primary_path: &Path) -> Option<PathBuf> {
        let password_ext = &self.conf.filenames.password_ext;
        if password_ext.is_empty() {
            return None;
        }

        let mut ext_to_remove = self.conf.filenames.primary_ext.clone();
        if ext_to_remove.is_empty() {
            // Without a configured extension, strip from the first dot so
            // multi-part extensions like '.key.json' come off whole
            let name = primary_path.file_name()?.to_string_lossy();
            if let Some(first_dot) = name.find('.') {
                ext_to_remove = name[first_dot..].to_string();
            }
        }

        let full = primary_path.to_string_lossy();
        let stem = full.strip_suffix(&ext_to_remove).unwrap_or(&full);
        Some(PathBuf::from(format!("{stem}{password_ext}")))
    }
}

/// Periodic re-scan driving the wallet's discovery notifications.
async fn watcher_loop(inner: Arc<WalletInner>, ready: oneshot::Sender<()>) {
    let period = Duration::from_secs(inner.conf.refresh_interval_secs.max(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    // First tick completes immediately; readiness gates the initial scan
    interval.tick().await;
    if ready.send(()).is_err() {
        return; // initialize was cancelled
    }

    loop {
        interval.tick().await;
        if let Err(err) = inner.refresh_scan().await {
            warn!(%err, "background wallet refresh failed");
        }
    }
}
