//! Filesystem Keystore Wallet
//!
//! This crate composes the signing primitives of `evm-signer-core` into a
//! wallet backed by a directory of Ethereum keystore v3 files: one file per
//! address, each decryptable with a companion password file.
//!
//! # Overview
//!
//! - **Discovery**: directory scans map filenames to addresses, either by
//!   extension (`<address>.json`) or by a configured regular expression
//! - **Resolution**: the keystore and password paths behind an address can
//!   also be driven by a parsed metadata file (JSON/TOML/YAML) and two
//!   path templates
//! - **Caching**: decrypted keys live in a size-aware LRU cache with a
//!   read-refreshed TTL; evicted key material zeroizes on release
//! - **Notification**: listeners receive every address the wallet sees for
//!   the first time, outside the wallet lock
//! - **Watching**: a background task re-scans the directory so new keys
//!   appear without explicit `refresh` calls
//!
//! # Quick Start
//!
//! ```no_run
//! use evm_signer_core::{Transaction, Wallet};
//! use evm_signer_fswallet::{Config, FilesystemWallet};
//!
//! # async fn example() -> evm_signer_core::Result<()> {
//! let wallet = FilesystemWallet::new(Config::new("/data/keystore"))?;
//! wallet.initialize().await?;
//!
//! let accounts = wallet.get_accounts().await?;
//! let txn = Transaction {
//!     from: Some(accounts[0]),
//!     ..Transaction::default()
//! };
//! let raw = wallet.sign(&txn, 1).await?;
//! # let _ = raw;
//! # Ok(())
//! # }
//! ```

// Modules
pub mod cache;
pub mod config;
pub mod template;
pub mod wallet;

// Re-exports for convenience
pub use cache::SignerCache;
pub use config::{Config, FilenamesConfig, MetadataConfig, SignerCacheConfig};
pub use wallet::{FilesystemWallet, LifecycleState};

// The wallet capability comes from the core crate
pub use evm_signer_core::Wallet;
