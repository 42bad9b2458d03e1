//! In-memory chain used by tests.
//!
//! Every sent transaction is mined into a new block with an outcome chosen
//! by the `on_send` handler. Read-only calls are answered by `on_call`.

use crate::{ChainClient, ChainError, ChainLog, LogQuery};
use alloy_primitives::{keccak256, Address, Bytes, Log, TxHash, U256};
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use xmtpd_types::TransactionReceipt;

/// Result of mining a transaction sent to the mock.
#[derive(Debug, Clone)]
pub enum MockOutcome {
	/// Mined successfully, emitting these logs.
	Success(Vec<Log>),
	/// Mined but reverted with this revert data.
	Revert(Bytes),
	/// Never mined.
	Pending,
}

type SendHandler =
	Box<dyn Fn(&TransactionRequest) -> Result<MockOutcome, ChainError> + Send + Sync>;
type CallHandler = Box<dyn Fn(&TransactionRequest) -> Result<Bytes, ChainError> + Send + Sync>;

#[derive(Default)]
struct MockState {
	rpc_chain_id: Option<u64>,
	block_number: u64,
	balances: HashMap<Address, U256>,
	sent: Vec<TransactionRequest>,
	receipts: HashMap<TxHash, TransactionReceipt>,
	reverts: HashMap<TxHash, Bytes>,
	pending_polls: u32,
	polls_left: HashMap<TxHash, u32>,
	logs: Vec<ChainLog>,
	requests: usize,
}

/// A [`ChainClient`] backed by in-memory state.
pub struct MockChainClient {
	chain_id: u64,
	on_send: Option<SendHandler>,
	on_call: Option<CallHandler>,
	state: Mutex<MockState>,
}

impl MockChainClient {
	pub fn new(chain_id: u64) -> Self {
		Self {
			chain_id,
			on_send: None,
			on_call: None,
			state: Mutex::new(MockState::default()),
		}
	}

	pub fn with_balance(self, address: Address, balance: U256) -> Self {
		self.state().balances.insert(address, balance);
		self
	}

	/// Chain ID reported by the endpoint, when it differs from the
	/// configured one.
	pub fn with_rpc_chain_id(self, chain_id: u64) -> Self {
		self.state().rpc_chain_id = Some(chain_id);
		self
	}

	pub fn with_block_number(self, block_number: u64) -> Self {
		self.state().block_number = block_number;
		self
	}

	/// Number of receipt polls answered with "not mined" for each
	/// transaction before its receipt becomes visible.
	pub fn with_pending_polls(self, polls: u32) -> Self {
		self.state().pending_polls = polls;
		self
	}

	pub fn on_send<F>(mut self, handler: F) -> Self
	where
		F: Fn(&TransactionRequest) -> Result<MockOutcome, ChainError> + Send + Sync + 'static,
	{
		self.on_send = Some(Box::new(handler));
		self
	}

	pub fn on_call<F>(mut self, handler: F) -> Self
	where
		F: Fn(&TransactionRequest) -> Result<Bytes, ChainError> + Send + Sync + 'static,
	{
		self.on_call = Some(Box::new(handler));
		self
	}

	/// Adds a log at the given block, raising the chain head if needed.
	pub fn push_log(&self, block_number: u64, log: Log) {
		let mut state = self.state();
		let log_index = state.logs.len() as u64;
		state.block_number = state.block_number.max(block_number);
		state.logs.push(ChainLog {
			log,
			block_number: Some(block_number),
			transaction_hash: Some(keccak256(log_index.to_be_bytes())),
			log_index: Some(log_index),
		});
	}

	/// Transactions received so far, in order.
	pub fn sent_transactions(&self) -> Vec<TransactionRequest> {
		self.state().sent.clone()
	}

	/// Number of RPC requests served so far.
	pub fn request_count(&self) -> usize {
		self.state().requests
	}

	fn state(&self) -> MutexGuard<'_, MockState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn request(&self) -> MutexGuard<'_, MockState> {
		let mut state = self.state();
		state.requests += 1;
		state
	}
}

#[async_trait]
impl ChainClient for MockChainClient {
	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn rpc_chain_id(&self) -> Result<u64, ChainError> {
		Ok(self.request().rpc_chain_id.unwrap_or(self.chain_id))
	}

	async fn get_balance(&self, address: Address) -> Result<U256, ChainError> {
		Ok(self
			.request()
			.balances
			.get(&address)
			.copied()
			.unwrap_or_default())
	}

	async fn get_block_number(&self) -> Result<u64, ChainError> {
		Ok(self.request().block_number)
	}

	async fn call(&self, request: TransactionRequest) -> Result<Bytes, ChainError> {
		self.request();
		match &self.on_call {
			Some(handler) => handler(&request),
			None => Err(ChainError::Network("no call handler".to_string())),
		}
	}

	async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, ChainError> {
		let outcome = match &self.on_send {
			Some(handler) => handler(&request)?,
			None => MockOutcome::Success(Vec::new()),
		};

		let mut state = self.request();
		let nonce = state.sent.len() as u64;
		let hash = keccak256([self.chain_id.to_be_bytes(), nonce.to_be_bytes()].concat());
		state.sent.push(request);

		let (success, logs) = match outcome {
			MockOutcome::Pending => return Ok(hash),
			MockOutcome::Success(logs) => (true, logs),
			MockOutcome::Revert(data) => {
				state.reverts.insert(hash, data);
				(false, Vec::new())
			},
		};

		state.block_number += 1;
		let block_number = state.block_number;
		for log in &logs {
			let log_index = state.logs.len() as u64;
			state.logs.push(ChainLog {
				log: log.clone(),
				block_number: Some(block_number),
				transaction_hash: Some(hash),
				log_index: Some(log_index),
			});
		}

		let polls = state.pending_polls;
		state.polls_left.insert(hash, polls);
		state.receipts.insert(
			hash,
			TransactionReceipt {
				hash,
				block_number,
				success,
				logs,
			},
		);
		Ok(hash)
	}

	async fn get_transaction_receipt(
		&self,
		hash: TxHash,
	) -> Result<Option<TransactionReceipt>, ChainError> {
		let mut state = self.request();
		if let Some(left) = state.polls_left.get_mut(&hash) {
			if *left > 0 {
				*left -= 1;
				return Ok(None);
			}
		}
		Ok(state.receipts.get(&hash).cloned())
	}

	async fn get_logs(&self, query: &LogQuery) -> Result<Vec<ChainLog>, ChainError> {
		let state = self.request();
		Ok(state
			.logs
			.iter()
			.filter(|entry| {
				let block = entry.block_number.unwrap_or_default();
				entry.log.address == query.address
					&& entry.log.topics().first() == Some(&query.event_signature)
					&& block >= query.from_block
					&& block <= query.to_block
			})
			.cloned()
			.collect())
	}

	async fn trace_revert(&self, hash: TxHash) -> Result<Option<Bytes>, ChainError> {
		Ok(self.request().reverts.get(&hash).cloned())
	}
}
