//! Private key, public key and address encodings.
//!
//! Node signing keys are secp256k1 keys. The registry contract stores the
//! uncompressed SEC1 public key (65 bytes, `0x04 || X || Y`), while
//! operators usually exchange the 33 byte compressed form. Both are accepted
//! wherever a public key is parsed.

use crate::utils::{with_0x_prefix, without_0x_prefix};
use alloy_primitives::{keccak256, Address};
use alloy_signer_local::PrivateKeySigner;
use k256::PublicKey;
use thiserror::Error;

/// Errors produced while decoding keys and addresses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
	/// The private key is not a valid 32 byte secp256k1 scalar.
	#[error("Invalid private key: {0}")]
	InvalidPrivateKey(String),
	/// The public key is not a valid SEC1 encoded secp256k1 point.
	#[error("Invalid public key: {0}")]
	InvalidPublicKey(String),
	/// The address is not 20 bytes of hex.
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
}

/// Generates a new random secp256k1 private key.
pub fn generate_private_key() -> PrivateKeySigner {
	PrivateKeySigner::random()
}

/// Encodes a private key as `0x` prefixed hex.
pub fn private_key_to_hex(signer: &PrivateKeySigner) -> String {
	with_0x_prefix(&hex::encode(signer.to_bytes()))
}

/// Parses a hex private key, with or without the `0x` prefix.
pub fn parse_private_key(key: &str) -> Result<PrivateKeySigner, KeyError> {
	let raw = without_0x_prefix(key.trim());
	let bytes = hex::decode(raw).map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))?;
	if bytes.len() != 32 {
		return Err(KeyError::InvalidPrivateKey(format!(
			"expected 32 bytes, got {}",
			bytes.len()
		)));
	}
	PrivateKeySigner::from_slice(&bytes).map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))
}

/// Returns the 65 byte uncompressed public key of a signer.
pub fn public_key_uncompressed(signer: &PrivateKeySigner) -> Vec<u8> {
	signer
		.credential()
		.verifying_key()
		.to_encoded_point(false)
		.as_bytes()
		.to_vec()
}

/// Returns the 33 byte compressed public key of a signer.
pub fn public_key_compressed(signer: &PrivateKeySigner) -> Vec<u8> {
	signer
		.credential()
		.verifying_key()
		.to_encoded_point(true)
		.as_bytes()
		.to_vec()
}

/// Parses a compressed or uncompressed hex public key.
pub fn parse_public_key(key: &str) -> Result<PublicKey, KeyError> {
	let bytes = hex::decode(without_0x_prefix(key.trim()))
		.map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?;
	PublicKey::from_sec1_bytes(&bytes).map_err(|_| {
		KeyError::InvalidPublicKey(format!(
			"{} bytes is not a valid secp256k1 point",
			bytes.len()
		))
	})
}

/// Derives the Ethereum address of a public key.
pub fn public_key_to_address(key: &PublicKey) -> Address {
	use k256::elliptic_curve::sec1::ToEncodedPoint;

	let point = key.to_encoded_point(false);
	let hash = keccak256(&point.as_bytes()[1..]);
	Address::from_slice(&hash[12..])
}

/// Parses a `0x` prefixed or bare 20 byte hex address.
pub fn parse_address(address: &str) -> Result<Address, KeyError> {
	let raw = without_0x_prefix(address.trim());
	if raw.len() != 40 {
		return Err(KeyError::InvalidAddress(address.to_string()));
	}
	let bytes = hex::decode(raw).map_err(|_| KeyError::InvalidAddress(address.to_string()))?;
	Ok(Address::from_slice(&bytes))
}
