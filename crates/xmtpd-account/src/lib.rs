//! Transaction signing for registry administration.
//!
//! A signer binds a private key to one chain ID. Every signature it produces
//! carries that chain ID (EIP-155), so a transaction signed for one chain is
//! invalid on any other.
//!
//! Signers hold no mutable state and can be shared between concurrent
//! administrative calls. Nonce allocation is left to the transport that
//! broadcasts the signed transactions, so callers must serialize writes made
//! with the same key.

use alloy_consensus::TxEnvelope;
use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

pub use implementations::local::LocalTransactionSigner;

/// Errors that can occur during signing operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a private key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when a transaction targets a different chain than
	/// the signer is bound to.
	#[error("Chain ID mismatch: signer is bound to {signer}, transaction targets {requested}")]
	ChainIdMismatch { signer: u64, requested: u64 },
}

/// Trait defining the interface for transaction signers.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
	/// Address of the signing account.
	fn address(&self) -> Address;

	/// Chain ID every signature is bound to.
	fn chain_id(&self) -> u64;

	/// A wallet for transaction-filling providers, bound to [`Self::chain_id`].
	fn wallet(&self) -> EthereumWallet;

	/// Signs a fully populated transaction request.
	///
	/// Requests without a chain ID are bound to the signer's chain. Requests
	/// for another chain are rejected.
	async fn sign_transaction(&self, request: TransactionRequest) -> Result<TxEnvelope, AccountError>;
}
