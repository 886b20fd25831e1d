//! Filesystem wallet configuration.
//!
//! Plain serde structures, so the wallet drops into whatever configuration
//! loader the embedding service uses. Every field except `path` has a
//! working default.
//!
//! ```
//! let conf: evm_signer_fswallet::Config = serde_json::from_str(
//!     r#"{
//!         "path": "/data/keystore",
//!         "filenames": {"primary_ext": ".json", "password_ext": ".password"},
//!         "signer_cache": {"max_size": 1048576, "ttl_secs": 3600}
//!     }"#,
//! )
//! .unwrap();
//! assert_eq!(conf.filenames.primary_ext, ".json");
//! ```

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level wallet configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory containing the keystore files. Required.
    pub path: PathBuf,

    /// Filename matching rules.
    #[serde(default)]
    pub filenames: FilenamesConfig,

    /// Metadata-driven key/password file resolution.
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Password file used when no per-key password file resolves.
    #[serde(default)]
    pub default_password_file: Option<PathBuf>,

    /// Decrypted signer cache tuning.
    #[serde(default)]
    pub signer_cache: SignerCacheConfig,

    /// Seconds between background re-scans of the directory.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Disables the background watcher; only explicit `refresh` calls will
    /// observe new files.
    #[serde(default)]
    pub disable_listener: bool,
}

impl Config {
    /// A minimal configuration for the given directory: `.json` keystores
    /// with `.password` companions.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            filenames: FilenamesConfig::default(),
            metadata: MetadataConfig::default(),
            default_password_file: None,
            signer_cache: SignerCacheConfig::default(),
            refresh_interval_secs: default_refresh_interval_secs(),
            disable_listener: false,
        }
    }
}

/// How directory entries map to addresses and password files.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilenamesConfig {
    /// Extension of primary files; the remainder of the name is the
    /// address. Ignored when `primary_match_regex` is set.
    pub primary_ext: String,

    /// Extension that replaces `primary_ext` to locate the password file.
    pub password_ext: String,

    /// Alternative matching: a regular expression whose first capture group
    /// is the address. Non-matching entries are skipped.
    pub primary_match_regex: Option<String>,
}

impl Default for FilenamesConfig {
    fn default() -> Self {
        Self {
            primary_ext: ".json".to_string(),
            password_ext: ".password".to_string(),
            primary_match_regex: None,
        }
    }
}

/// Metadata-file driven resolution of key and password paths.
///
/// When `format` selects a parser, the primary file is parsed and the two
/// property templates are evaluated against it to locate the real keystore
/// and password files.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// `auto`, `json`, `toml`, `yaml`, or empty for no metadata parsing.
    /// `auto` derives the format from `primary_ext`.
    pub format: String,

    /// Template producing the keystore file path, e.g.
    /// `{{ .signing.keyFile }}`.
    pub key_file_property: Option<String>,

    /// Template producing the password file path.
    pub password_file_property: Option<String>,
}

/// Signer cache tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignerCacheConfig {
    /// Byte-size ceiling across all cached keys.
    pub max_size: u64,

    /// Seconds a cached key lives without being read.
    pub ttl_secs: u64,
}

impl Default for SignerCacheConfig {
    fn default() -> Self {
        Self {
            // Room for a few thousand decrypted keys
            max_size: 1024 * 1024,
            ttl_secs: 24 * 60 * 60,
        }
    }
}

fn default_refresh_interval_secs() -> u64 {
    30
}
