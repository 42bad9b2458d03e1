//! Transaction lifecycle shared by every administrative write.
//!
//! A write goes through the same steps regardless of which contract function
//! it calls: check that signer and client agree on the chain, check that the
//! sender can pay for gas, build the transaction, broadcast it, wait for it
//! to be mined, then find and decode the event proving the state change.

use crate::{ChainClient, ChainError, ProtocolError};
use alloy_primitives::{Address, Log, TxHash, B256};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::SolEvent;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use xmtpd_account::TransactionSigner;
use xmtpd_types::TransactionReceipt;

/// Gas limit applied to administrative transactions.
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;

/// Sender parameters handed to a transaction builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactOpts {
	pub from: Address,
	pub chain_id: u64,
	pub gas_limit: u64,
}

/// Waiting behaviour of [`execute_transaction`].
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
	/// How long to wait for the transaction to be mined.
	pub timeout: Duration,
	/// Delay between receipt polls.
	pub poll_interval: Duration,
	pub gas_limit: u64,
	/// Ask the node for revert data when a transaction fails.
	pub trace_reverts: bool,
}

impl Default for ExecutorOptions {
	fn default() -> Self {
		Self {
			timeout: Duration::from_secs(60),
			poll_interval: Duration::from_millis(250),
			gas_limit: DEFAULT_GAS_LIMIT,
			trace_reverts: true,
		}
	}
}

/// The event a transaction is expected to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedEvent {
	/// Contract that emits the event.
	pub contract: Address,
	/// Event signature hash, the first log topic.
	pub signature: B256,
	pub name: &'static str,
}

impl ExpectedEvent {
	pub fn of<E: SolEvent>(contract: Address) -> Self {
		Self {
			contract,
			signature: E::SIGNATURE_HASH,
			name: E::SIGNATURE,
		}
	}

	fn matches(&self, log: &Log) -> bool {
		log.address == self.contract && log.topics().first() == Some(&self.signature)
	}
}

/// Runs one state-changing transaction to completion.
///
/// `build_tx` receives the sender parameters and returns the transaction to
/// send; an error from it is returned unchanged and nothing is broadcast.
/// Once the transaction is mined successfully, every receipt log emitted by
/// the expected contract with the expected signature is handed to
/// `parse_log`. The first one that parses is passed to `verify` and
/// returned. If none parses the result is [`ChainError::EventNotFound`],
/// carrying the last parse error as detail.
#[instrument(skip_all, fields(from = %signer.address(), event = expected.name))]
pub async fn execute_transaction<T, B, P, V>(
	client: &dyn ChainClient,
	signer: &dyn TransactionSigner,
	expected: ExpectedEvent,
	options: &ExecutorOptions,
	build_tx: B,
	parse_log: P,
	verify: V,
) -> Result<T, ChainError>
where
	B: FnOnce(&TransactOpts) -> Result<TransactionRequest, ChainError>,
	P: Fn(&Log) -> Result<T, ChainError>,
	V: FnOnce(&T) -> Result<(), ChainError>,
{
	if signer.chain_id() != client.chain_id() {
		return Err(ChainError::ChainIdMismatch {
			expected: client.chain_id(),
			actual: signer.chain_id(),
		});
	}

	let from = signer.address();
	let balance = client.get_balance(from).await?;
	if balance.is_zero() {
		return Err(ChainError::ZeroBalance(from));
	}
	debug!(balance = %balance, "Sender balance");

	let opts = TransactOpts {
		from,
		chain_id: signer.chain_id(),
		gas_limit: options.gas_limit,
	};
	let mut request = build_tx(&opts)?;
	request.from.get_or_insert(from);
	request.chain_id.get_or_insert(opts.chain_id);
	request.gas.get_or_insert(opts.gas_limit);

	let tx_hash = client.send_transaction(request).await?;
	info!(tx_hash = %tx_hash, "Transaction submitted");

	let receipt = wait_for_transaction(client, tx_hash, options).await?;
	if !receipt.success {
		return Err(revert_error(client, &receipt, options).await);
	}
	info!(tx_hash = %tx_hash, block = receipt.block_number, "Transaction confirmed");

	let mut last_error = None;
	for log in receipt.logs.iter().filter(|log| expected.matches(log)) {
		match parse_log(log) {
			Ok(event) => {
				verify(&event)?;
				return Ok(event);
			},
			Err(e) => {
				debug!(error = %e, "Skipping log that failed to parse");
				last_error = Some(e);
			},
		}
	}

	Err(ChainError::EventNotFound {
		event: expected.name,
		contract: expected.contract,
		tx_hash,
		detail: last_error.map(|e| e.to_string()),
	})
}

/// Polls for a transaction receipt until it appears or the timeout elapses.
///
/// The receipt is returned whatever its status.
pub async fn wait_for_transaction(
	client: &dyn ChainClient,
	tx_hash: TxHash,
	options: &ExecutorOptions,
) -> Result<TransactionReceipt, ChainError> {
	let poll = async {
		loop {
			if let Some(receipt) = client.get_transaction_receipt(tx_hash).await? {
				return Ok(receipt);
			}
			debug!(tx_hash = %tx_hash, "Transaction not mined yet");
			tokio::time::sleep(options.poll_interval).await;
		}
	};

	tokio::time::timeout(options.timeout, poll)
		.await
		.map_err(|_| ChainError::Timeout {
			tx_hash,
			timeout: options.timeout,
		})?
}

async fn revert_error(
	client: &dyn ChainClient,
	receipt: &TransactionReceipt,
	options: &ExecutorOptions,
) -> ChainError {
	let revert_data = if options.trace_reverts {
		match client.trace_revert(receipt.hash).await {
			Ok(data) => data,
			Err(e) => {
				warn!(tx_hash = %receipt.hash, error = %e, "Could not trace reverted transaction");
				None
			},
		}
	} else {
		None
	};

	let protocol_error = revert_data
		.as_deref()
		.and_then(|data| ProtocolError::from_revert_data(data));
	let reason = match (&protocol_error, &revert_data) {
		(Some(error), _) => error.signature().to_string(),
		(None, Some(data)) if !data.is_empty() => format!("revert data {}", data),
		_ => "execution reverted".to_string(),
	};

	ChainError::Reverted {
		tx_hash: receipt.hash,
		reason,
		protocol_error,
	}
}
