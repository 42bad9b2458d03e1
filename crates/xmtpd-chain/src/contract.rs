//! Typed access to a deployed contract.
//!
//! [`BoundContract`] pairs an address with a [`ChainClient`] and works with
//! any interface generated by `sol!`: calls are ABI encoded and their returns
//! decoded, transactions are built for [`crate::execute_transaction`], and
//! events are read page by page through an [`EventCursor`].

use crate::{ChainClient, ChainError, ChainLog, LogQuery, TransactOpts};
use alloy_primitives::{Address, Log, TxHash};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{SolCall, SolEvent};
use futures::Stream;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

/// A contract address bound to a chain client.
#[derive(Clone)]
pub struct BoundContract {
	address: Address,
	client: Arc<dyn ChainClient>,
}

impl BoundContract {
	pub fn new(address: Address, client: Arc<dyn ChainClient>) -> Self {
		Self { address, client }
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn client(&self) -> &Arc<dyn ChainClient> {
		&self.client
	}

	/// Executes a read-only call and decodes its return values.
	pub async fn call<C: SolCall>(&self, call: &C) -> Result<C::Return, ChainError> {
		let request = TransactionRequest::default()
			.to(self.address)
			.input(call.abi_encode().into());
		let raw = self.client.call(request).await?;
		C::abi_decode_returns(&raw, true)
			.map_err(|e| ChainError::Decode(format!("{} returns: {}", C::SIGNATURE, e)))
	}

	/// Builds the transaction invoking `call` from the sender in `opts`.
	pub fn transact<C: SolCall>(&self, opts: &TransactOpts, call: &C) -> TransactionRequest {
		TransactionRequest::default()
			.from(opts.from)
			.to(self.address)
			.gas_limit(opts.gas_limit)
			.input(call.abi_encode().into())
	}

	/// Decodes `log` as event `E` emitted by this contract.
	pub fn decode_event<E: SolEvent>(&self, log: &Log) -> Result<E, ChainError> {
		if log.address != self.address {
			return Err(ChainError::Decode(format!(
				"{} emitted by {}, expected {}",
				E::SIGNATURE,
				log.address,
				self.address
			)));
		}
		E::decode_log_data(&log.data, true)
			.map_err(|e| ChainError::Decode(format!("{}: {}", E::SIGNATURE, e)))
	}

	/// Returns a cursor over events `E` starting at `from_block`, fetching
	/// at most `page_size` blocks per query.
	pub fn watch<E: SolEvent>(&self, from_block: u64, page_size: u64) -> EventCursor<E> {
		EventCursor {
			client: self.client.clone(),
			address: self.address,
			next_block: from_block,
			page_size: page_size.max(1),
			pending: VecDeque::new(),
			closed: false,
			_event: PhantomData,
		}
	}
}

impl std::fmt::Debug for BoundContract {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BoundContract")
			.field("address", &self.address)
			.field("chain_id", &self.client.chain_id())
			.finish()
	}
}

/// An event together with where it was emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent<E> {
	pub event: E,
	pub block_number: Option<u64>,
	pub transaction_hash: Option<TxHash>,
	pub log_index: Option<u64>,
}

/// A forward-only cursor over one event type of one contract.
///
/// Reaching the chain head ends the current iteration without closing the
/// cursor. A later [`EventCursor::next`] resumes from the first block not
/// yet read, so events mined in between are picked up.
pub struct EventCursor<E> {
	client: Arc<dyn ChainClient>,
	address: Address,
	next_block: u64,
	page_size: u64,
	pending: VecDeque<Result<DecodedEvent<E>, ChainError>>,
	closed: bool,
	_event: PhantomData<fn() -> E>,
}

impl<E: SolEvent> EventCursor<E> {
	/// Returns the next event, or `None` once the cursor is closed or has
	/// caught up with the chain head.
	pub async fn next(&mut self) -> Option<Result<DecodedEvent<E>, ChainError>> {
		loop {
			if self.closed {
				return None;
			}
			if let Some(item) = self.pending.pop_front() {
				return Some(item);
			}

			let head = match self.client.get_block_number().await {
				Ok(head) => head,
				Err(e) => return Some(Err(e)),
			};
			if self.next_block > head {
				return None;
			}

			let to_block = head.min(self.next_block.saturating_add(self.page_size - 1));
			let query = LogQuery {
				address: self.address,
				event_signature: E::SIGNATURE_HASH,
				from_block: self.next_block,
				to_block,
			};
			let logs = match self.client.get_logs(&query).await {
				Ok(logs) => logs,
				Err(e) => return Some(Err(e)),
			};

			tracing::trace!(
				event = E::SIGNATURE,
				from_block = query.from_block,
				to_block,
				count = logs.len(),
				"Fetched event page"
			);
			self.pending.extend(logs.into_iter().map(decode::<E>));
			self.next_block = to_block + 1;
		}
	}

	/// Stops the cursor. Buffered events are dropped.
	pub fn close(&mut self) {
		self.closed = true;
		self.pending.clear();
	}

	/// Reopens the cursor at `from_block`.
	pub fn restart(&mut self, from_block: u64) {
		self.next_block = from_block;
		self.pending.clear();
		self.closed = false;
	}

	/// First block not yet fetched.
	pub fn next_block(&self) -> u64 {
		self.next_block
	}

	pub fn is_closed(&self) -> bool {
		self.closed
	}

	/// Turns the cursor into a stream that ends with the cursor.
	pub fn into_stream(self) -> impl Stream<Item = Result<DecodedEvent<E>, ChainError>> {
		futures::stream::unfold(self, |mut cursor| async move {
			let item = cursor.next().await?;
			Some((item, cursor))
		})
	}
}

fn decode<E: SolEvent>(entry: ChainLog) -> Result<DecodedEvent<E>, ChainError> {
	let event = E::decode_log_data(&entry.log.data, true)
		.map_err(|e| ChainError::Decode(format!("{}: {}", E::SIGNATURE, e)))?;
	Ok(DecodedEvent {
		event,
		block_number: entry.block_number,
		transaction_hash: entry.transaction_hash,
		log_index: entry.log_index,
	})
}
