use super::print_json;
use crate::required::flag;
use crate::GetPubKeyArgs;
use k256::PublicKey;
use serde::Serialize;
use tracing::info;
use xmtpd_types::{
	generate_private_key, parse_private_key, private_key_to_hex, public_key_compressed,
	public_key_to_address, with_0x_prefix, PrivateKeySigner,
};

/// Key material printed by the key commands.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyInfo {
	#[serde(skip_serializing_if = "Option::is_none")]
	private_key: Option<String>,
	public_key: String,
	address: String,
}

impl KeyInfo {
	fn from_signer(signer: &PrivateKeySigner, include_private: bool) -> Self {
		let public_key = PublicKey::from(*signer.credential().verifying_key());
		Self {
			private_key: include_private.then(|| private_key_to_hex(signer)),
			public_key: with_0x_prefix(&hex::encode(public_key_compressed(signer))),
			address: public_key_to_address(&public_key).to_checksum(None),
		}
	}
}

pub(super) fn generate_key() -> anyhow::Result<()> {
	let key = KeyInfo::from_signer(&generate_private_key(), true);
	info!(
		public_key = %key.public_key,
		address = %key.address,
		"Generated private key"
	);
	print_json(&key)
}

pub(super) fn get_pub_key(args: &GetPubKeyArgs) -> anyhow::Result<()> {
	let signer = parse_private_key(flag(&args.private_key, "private-key")?)?;
	let key = KeyInfo::from_signer(&signer, false);
	info!(
		public_key = %key.public_key,
		address = %key.address,
		"Parsed private key"
	);
	print_json(&key)
}
