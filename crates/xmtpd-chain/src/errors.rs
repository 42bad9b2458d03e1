//! Custom errors raised by the XMTP protocol contracts.
//!
//! Contracts revert with 4-byte error selectors. Nodes surface them either as
//! raw revert data on a traced transaction or embedded in the text of an RPC
//! error, so both forms can be resolved back to the error signature.

use alloy_primitives::keccak256;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Signatures of every custom error the protocol contracts can raise.
const PROTOCOL_ERROR_SIGNATURES: &[&str] = &[
	"AlreadyClaimed(uint32,uint256)",
	"ArrayLengthMismatch()",
	"DeployFailed()",
	"ERC721IncorrectOwner(address,uint256,address)",
	"ERC721InsufficientApproval(address,uint256)",
	"ERC721InvalidApprover(address)",
	"ERC721InvalidOperator(address)",
	"ERC721InvalidOwner(address)",
	"ERC721InvalidReceiver(address)",
	"ERC721InvalidSender(address)",
	"EmptyAdmins()",
	"EmptyArray()",
	"EmptyBytecode()",
	"EmptyCode(address)",
	"EndIndexOutOfRange()",
	"FailedToAddNodeToCanonicalNetwork()",
	"FailedToRemoveNodeFromCanonicalNetwork()",
	"FromIndexOutOfRange()",
	"InitializationFailed(bytes)",
	"InsufficientBalance()",
	"InsufficientDeposit(uint96,uint96)",
	"InsufficientSignatures(uint8,uint8)",
	"InvalidBitCount32Input()",
	"InvalidHttpAddress()",
	"InvalidImplementation()",
	"InvalidLeafCount()",
	"InvalidMaxPayloadSize()",
	"InvalidMinPayloadSize()",
	"InvalidOwner()",
	"InvalidPayloadSize(uint256,uint256,uint256)",
	"InvalidProof()",
	"InvalidProtocolFeeRate()",
	"InvalidSequenceIds()",
	"InvalidSigningPublicKey()",
	"InvalidStartSequenceId(uint64,uint64)",
	"InvalidURI()",
	"MaxCanonicalNodesBelowCurrentCount()",
	"MaxCanonicalNodesReached()",
	"MaxNodesReached()",
	"MigrationFailed(address,bytes)",
	"NoChainIds()",
	"NoChange()",
	"NoExcess()",
	"NoFeesOwed()",
	"NoKeyComponents()",
	"NoKeys()",
	"NoLeaves()",
	"NoPendingWithdrawal()",
	"NoProofElements()",
	"NotAdmin()",
	"NotInPayerReport(uint32,uint256)",
	"NotNodeOwner()",
	"NotPaused()",
	"NotPayloadBootstrapper()",
	"NotSettlementChainGateway()",
	"NotSettler()",
	"ParameterOutOfTypeBounds()",
	"Paused()",
	"PayerFeesLengthTooLong()",
	"PayerInDebt()",
	"PayerReportEntirelySettled()",
	"PayerReportIndexOutOfBounds()",
	"PayerReportNotSettled(uint32,uint256)",
	"PendingWithdrawalExists()",
	"SettleUsageFailed(bytes)",
	"TransferFailed()",
	"TransferFromFailed()",
	"UnorderedNodeIds()",
	"UnsupportedChainId(uint256)",
	"WithdrawalNotReady(uint32,uint32)",
	"ZeroAdmin()",
	"ZeroAmount()",
	"ZeroAppChainGateway()",
	"ZeroAppChainId()",
	"ZeroAvailableBalance()",
	"ZeroBalance()",
	"ZeroCount()",
	"ZeroFeeDistributor()",
	"ZeroFeeToken()",
	"ZeroImplementation()",
	"ZeroMigrator()",
	"ZeroMinimumDeposit()",
	"ZeroNodeRegistry()",
	"ZeroParameterRegistry()",
	"ZeroPayer()",
	"ZeroPayerRegistry()",
	"ZeroPayerReportManager()",
	"ZeroRecipient()",
	"ZeroSettlementChainGateway()",
	"ZeroSettler()",
	"ZeroTotalAmount()",
	"ZeroUnderlying()",
	"ZeroWithdrawalAmount()",
];

static PROTOCOL_ERRORS: LazyLock<HashMap<[u8; 4], &'static str>> = LazyLock::new(|| {
	PROTOCOL_ERROR_SIGNATURES
		.iter()
		.map(|signature| (selector_of(signature), *signature))
		.collect()
});

static SELECTOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"0x([0-9a-fA-F]{8})\b").expect("valid selector pattern")
});

fn selector_of(signature: &str) -> [u8; 4] {
	let hash = keccak256(signature.as_bytes());
	[hash[0], hash[1], hash[2], hash[3]]
}

/// A recognised protocol contract error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolError {
	selector: [u8; 4],
	signature: &'static str,
}

impl ProtocolError {
	/// Looks up an error by its 4-byte selector.
	pub fn from_selector(selector: [u8; 4]) -> Option<Self> {
		PROTOCOL_ERRORS
			.get(&selector)
			.map(|signature| Self { selector, signature })
	}

	/// Resolves the error encoded at the start of ABI revert data.
	pub fn from_revert_data(data: &[u8]) -> Option<Self> {
		let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
		Self::from_selector(selector)
	}

	/// Finds the first known error selector quoted in an error message,
	/// such as `execution reverted: 0xa88ee577`.
	///
	/// Longer hex strings like transaction hashes never match.
	pub fn from_message(message: &str) -> Option<Self> {
		SELECTOR_PATTERN.captures_iter(message).find_map(|captures| {
			let mut selector = [0u8; 4];
			hex::decode_to_slice(&captures[1], &mut selector).ok()?;
			Self::from_selector(selector)
		})
	}

	pub fn selector(&self) -> [u8; 4] {
		self.selector
	}

	/// Error signature, for example `NotNodeOwner()`.
	pub fn signature(&self) -> &'static str {
		self.signature
	}

	/// Error name without its parameter list.
	pub fn name(&self) -> &'static str {
		self.signature
			.split_once('(')
			.map_or(self.signature, |(name, _)| name)
	}

	/// The call would not have changed any state.
	pub fn is_no_change(&self) -> bool {
		self.name() == "NoChange"
	}
}

impl fmt::Display for ProtocolError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} (0x{})", self.signature, hex::encode(self.selector))
	}
}
