//! Signer backed by an in-memory private key.

use crate::{AccountError, TransactionSigner};
use alloy_consensus::TxEnvelope;
use alloy_network::{Ethereum, EthereumWallet, NetworkWallet};
use alloy_primitives::Address;
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use xmtpd_types::{parse_private_key, SecretString};

/// A signer holding a secp256k1 private key bound to one chain ID.
#[derive(Clone)]
pub struct LocalTransactionSigner {
	signer: PrivateKeySigner,
	chain_id: u64,
}

impl LocalTransactionSigner {
	/// Creates a signer from a hex private key, with or without `0x`.
	pub fn from_private_key(private_key: &SecretString, chain_id: u64) -> Result<Self, AccountError> {
		let signer = private_key
			.with_exposed(parse_private_key)
			.map_err(|e| AccountError::InvalidKey(e.to_string()))?;
		Ok(Self::new(signer, chain_id))
	}

	pub fn new(signer: PrivateKeySigner, chain_id: u64) -> Self {
		Self {
			signer: signer.with_chain_id(Some(chain_id)),
			chain_id,
		}
	}
}

impl std::fmt::Debug for LocalTransactionSigner {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LocalTransactionSigner")
			.field("address", &self.signer.address())
			.field("chain_id", &self.chain_id)
			.finish()
	}
}

#[async_trait]
impl TransactionSigner for LocalTransactionSigner {
	fn address(&self) -> Address {
		self.signer.address()
	}

	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	fn wallet(&self) -> EthereumWallet {
		EthereumWallet::from(self.signer.clone())
	}

	async fn sign_transaction(&self, request: TransactionRequest) -> Result<TxEnvelope, AccountError> {
		let mut request = request;
		match request.chain_id {
			Some(requested) if requested != self.chain_id => {
				return Err(AccountError::ChainIdMismatch {
					signer: self.chain_id,
					requested,
				});
			},
			Some(_) => {},
			None => request.chain_id = Some(self.chain_id),
		}

		let wallet = self.wallet();
		NetworkWallet::<Ethereum>::sign_request(&wallet, request)
			.await
			.map_err(|e| AccountError::SigningFailed(e.to_string()))
	}
}
