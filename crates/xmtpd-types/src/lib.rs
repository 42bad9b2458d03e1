//! Common types for the xmtpd registry tooling.
//!
//! This crate holds the data types and pure helpers shared by the
//! configuration loader, the chain client and the registry facade: key and
//! address encodings, command-line flag value types, node snapshots and
//! transaction receipts.

/// Flag value types parsed from comma separated command-line input.
pub mod flags;
/// Private key, public key and address utilities.
pub mod keys;
/// Node registry snapshot types.
pub mod node;
/// Transaction receipt types.
pub mod receipt;
/// Secure string type for private keys.
pub mod secret_string;
/// Utility functions for hex formatting.
pub mod utils;

pub use alloy_signer_local::PrivateKeySigner;
pub use flags::{FlagError, SourceLowerLimits, Uint32Slice};
pub use keys::{
	generate_private_key, parse_address, parse_private_key, parse_public_key,
	private_key_to_hex, public_key_compressed, public_key_to_address, public_key_uncompressed,
	KeyError,
};
pub use node::NodeRecord;
pub use receipt::TransactionReceipt;
pub use secret_string::SecretString;
pub use utils::{truncate_id, with_0x_prefix, without_0x_prefix};
