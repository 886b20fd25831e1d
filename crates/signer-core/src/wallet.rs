//! The wallet capability: the boundary higher layers sign through.
//!
//! A [`Wallet`] maps addresses to key material and performs signing on
//! behalf of callers. Implementations range from the in-memory single-key
//! wallet here to the filesystem keystore wallet in the companion crate;
//! consumers depend on the trait, never a concrete backend.
//!
//! All operations are async so that slow backends (directory scans, KDF
//! work) can suspend; dropping a returned future cancels the operation at
//! its next suspension point.

use async_trait::async_trait;

use crate::address::Address;
use crate::eip712::{self, TypedData};
use crate::error::{Error, Result};
use crate::keypair::KeyPair;
use crate::transaction::Transaction;

/// An address-keyed signing backend.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Prepares the wallet for use; must be called before signing.
    async fn initialize(&self) -> Result<()>;

    /// Re-discovers available accounts.
    async fn refresh(&self) -> Result<()>;

    /// Releases wallet resources. Idempotent.
    async fn close(&self) -> Result<()>;

    /// Lists the currently known addresses.
    async fn get_accounts(&self) -> Result<Vec<Address>>;

    /// Signs a transaction with the key behind `txn.from`, returning the
    /// raw wire bytes.
    async fn sign(&self, txn: &Transaction, chain_id: i64) -> Result<Vec<u8>>;

    /// Signs an EIP-712 payload with the key behind `from`, returning the
    /// RLP list `[digest, R, S, V]`.
    async fn sign_typed_data_v4(&self, from: &Address, payload: &TypedData) -> Result<Vec<u8>>;
}

/// A wallet holding exactly one key pair in memory.
///
/// Useful for tests and single-identity services.
#[derive(Debug)]
pub struct MemoryWallet {
    keypair: KeyPair,
}

impl MemoryWallet {
    /// Wraps a key pair.
    #[must_use]
    pub fn new(keypair: KeyPair) -> Self {
        Self { keypair }
    }

    /// The address of the held key.
    #[must_use]
    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    fn keypair_for(&self, from: Option<&Address>) -> Result<&KeyPair> {
        match from {
            Some(addr) if *addr != self.keypair.address() => {
                Err(Error::WalletNotAvailable(*addr))
            }
            _ => Ok(&self.keypair),
        }
    }
}

#[async_trait]
impl Wallet for MemoryWallet {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn get_accounts(&self) -> Result<Vec<Address>> {
        Ok(vec![self.keypair.address()])
    }

    async fn sign(&self, txn: &Transaction, chain_id: i64) -> Result<Vec<u8>> {
        let keypair = self.keypair_for(txn.from.as_ref())?;
        txn.sign(keypair, chain_id)
    }

    async fn sign_typed_data_v4(&self, from: &Address, payload: &TypedData) -> Result<Vec<u8>> {
        let keypair = self.keypair_for(Some(from))?;
        eip712::sign_typed_data_v4(keypair, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_wallet_signs_for_its_address() {
        let wallet = MemoryWallet::new(KeyPair::generate().unwrap());
        let address = wallet.address();

        wallet.initialize().await.unwrap();
        assert_eq!(wallet.get_accounts().await.unwrap(), vec![address]);

        let txn = Transaction {
            from: Some(address),
            ..Transaction::default()
        };
        let raw = wallet.sign(&txn, 1).await.unwrap();
        assert!(!raw.is_empty());
    }

    #[tokio::test]
    async fn memory_wallet_rejects_unknown_from() {
        let wallet = MemoryWallet::new(KeyPair::generate().unwrap());
        let other = Address::new([0x99; 20]);

        let txn = Transaction {
            from: Some(other),
            ..Transaction::default()
        };
        assert!(matches!(
            wallet.sign(&txn, 1).await,
            Err(Error::WalletNotAvailable(addr)) if addr == other
        ));
    }

    #[tokio::test]
    async fn memory_wallet_signs_typed_data() {
        let wallet = MemoryWallet::new(KeyPair::generate().unwrap());
        let address = wallet.address();

        let raw = wallet
            .sign_typed_data_v4(&address, &TypedData::default())
            .await
            .unwrap();
        assert!(!raw.is_empty());
        wallet.close().await.unwrap();
    }
}
