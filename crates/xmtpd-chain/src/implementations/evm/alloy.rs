//! JSON-RPC chain client built on the Alloy provider stack.
//!
//! Write-capable clients sign through the provider's wallet filler, which
//! also fills nonce, gas and fee fields before broadcast.

use crate::{ChainClient, ChainError, ChainLog, LogQuery};
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::{Filter, TransactionRequest};
use alloy_transport_http::Http;
use async_trait::async_trait;
use std::sync::Arc;
use xmtpd_account::TransactionSigner;
use xmtpd_types::TransactionReceipt;

type DynProvider = Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>;

/// Alloy-based chain client bound to one RPC endpoint and chain ID.
#[derive(Clone)]
pub struct AlloyChainClient {
	provider: DynProvider,
	chain_id: u64,
	rpc_url: String,
}

impl AlloyChainClient {
	/// Creates a client that signs transactions with `signer`.
	///
	/// The signer must be bound to `chain_id`.
	pub fn connect(
		rpc_url: &str,
		chain_id: u64,
		signer: &dyn TransactionSigner,
	) -> Result<Self, ChainError> {
		if signer.chain_id() != chain_id {
			return Err(ChainError::ChainIdMismatch {
				expected: chain_id,
				actual: signer.chain_id(),
			});
		}

		let url = parse_url(rpc_url)?;
		let provider = ProviderBuilder::new()
			.with_recommended_fillers()
			.wallet(signer.wallet())
			.on_http(url);

		tracing::debug!(rpc_url = %rpc_url, chain_id, from = %signer.address(), "Connected signing client");
		Ok(Self {
			provider: Arc::new(provider) as DynProvider,
			chain_id,
			rpc_url: rpc_url.to_string(),
		})
	}

	/// Like [`AlloyChainClient::connect`], then checks the endpoint's chain ID.
	pub async fn connect_checked(
		rpc_url: &str,
		chain_id: u64,
		signer: &dyn TransactionSigner,
	) -> Result<Self, ChainError> {
		let client = Self::connect(rpc_url, chain_id, signer)?;
		client.verify_chain_id().await?;
		Ok(client)
	}

	/// Creates a client for calls and log queries only.
	pub fn read_only(rpc_url: &str, chain_id: u64) -> Result<Self, ChainError> {
		let url = parse_url(rpc_url)?;
		let provider = ProviderBuilder::new().on_http(url);

		tracing::debug!(rpc_url = %rpc_url, chain_id, "Connected read-only client");
		Ok(Self {
			provider: Arc::new(provider) as DynProvider,
			chain_id,
			rpc_url: rpc_url.to_string(),
		})
	}

	pub fn rpc_url(&self) -> &str {
		&self.rpc_url
	}
}

impl std::fmt::Debug for AlloyChainClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AlloyChainClient")
			.field("rpc_url", &self.rpc_url)
			.field("chain_id", &self.chain_id)
			.finish()
	}
}

fn parse_url(rpc_url: &str) -> Result<reqwest::Url, ChainError> {
	rpc_url
		.parse()
		.map_err(|e| ChainError::Network(format!("Invalid RPC URL {}: {}", rpc_url, e)))
}

#[async_trait]
impl ChainClient for AlloyChainClient {
	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn rpc_chain_id(&self) -> Result<u64, ChainError> {
		self.provider
			.get_chain_id()
			.await
			.map_err(|e| ChainError::Network(format!("Failed to get chain ID: {}", e)))
	}

	async fn get_balance(&self, address: Address) -> Result<U256, ChainError> {
		self.provider
			.get_balance(address)
			.await
			.map_err(|e| ChainError::Network(format!("Failed to get balance: {}", e)))
	}

	async fn get_block_number(&self) -> Result<u64, ChainError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| ChainError::Network(format!("Failed to get block number: {}", e)))
	}

	async fn call(&self, request: TransactionRequest) -> Result<Bytes, ChainError> {
		self.provider
			.call(&request)
			.await
			.map_err(|e| ChainError::Network(format!("Call failed: {}", e)))
	}

	async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, ChainError> {
		let pending_tx = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| ChainError::Network(format!("Failed to send transaction: {}", e)))?;

		let tx_hash = *pending_tx.tx_hash();
		tracing::debug!(tx_hash = %tx_hash, chain_id = self.chain_id, "Broadcast transaction");
		Ok(tx_hash)
	}

	async fn get_transaction_receipt(
		&self,
		hash: TxHash,
	) -> Result<Option<TransactionReceipt>, ChainError> {
		let receipt = self
			.provider
			.get_transaction_receipt(hash)
			.await
			.map_err(|e| ChainError::Network(format!("Failed to get receipt: {}", e)))?;

		Ok(receipt.map(|receipt| TransactionReceipt {
			hash: receipt.transaction_hash,
			block_number: receipt.block_number.unwrap_or(0),
			success: receipt.status(),
			logs: receipt
				.inner
				.logs()
				.iter()
				.map(|log| log.inner.clone())
				.collect(),
		}))
	}

	async fn get_logs(&self, query: &LogQuery) -> Result<Vec<ChainLog>, ChainError> {
		let filter = Filter::new()
			.address(query.address)
			.event_signature(query.event_signature)
			.from_block(query.from_block)
			.to_block(query.to_block);

		let logs = self.provider.get_logs(&filter).await.map_err(|e| {
			ChainError::Network(format!(
				"Failed to get logs for blocks {}..={}: {}",
				query.from_block, query.to_block, e
			))
		})?;

		Ok(logs
			.into_iter()
			.map(|log| ChainLog {
				block_number: log.block_number,
				transaction_hash: log.transaction_hash,
				log_index: log.log_index,
				log: log.inner,
			})
			.collect())
	}

	async fn trace_revert(&self, hash: TxHash) -> Result<Option<Bytes>, ChainError> {
		let params = (hash, serde_json::json!({ "tracer": "callTracer" }));
		let trace: serde_json::Value = self
			.provider
			.client()
			.request("debug_traceTransaction", params)
			.await
			.map_err(|e| ChainError::Network(format!("Failed to trace transaction: {}", e)))?;

		let output = match trace.get("output").and_then(|o| o.as_str()) {
			Some(output) => output,
			None => return Ok(None),
		};
		let data = hex::decode(output.trim_start_matches("0x"))
			.map_err(|e| ChainError::Decode(format!("Invalid revert output: {}", e)))?;
		Ok(Some(Bytes::from(data)))
	}
}
