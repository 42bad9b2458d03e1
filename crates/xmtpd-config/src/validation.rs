//! Field validators for contracts options.
//!
//! Validators never fail fast. They record problems in a [`ValidationReport`]
//! so that one run reports everything that is wrong.

use crate::ConfigError;
use alloy_primitives::Address;
use std::collections::BTreeSet;
use url::Url;

/// Problems found while validating options.
///
/// Missing values and invalid values are kept apart because they are
/// reported differently. Both sets are ordered so messages are stable.
#[derive(Debug, Default)]
pub struct ValidationReport {
	missing: BTreeSet<String>,
	invalid: BTreeSet<String>,
}

impl ValidationReport {
	pub fn missing(&mut self, field: &str) {
		self.missing.insert(format!("--{}", field));
	}

	pub fn invalid(&mut self, message: String) {
		self.invalid.insert(message);
	}

	pub fn is_empty(&self) -> bool {
		self.missing.is_empty() && self.invalid.is_empty()
	}

	/// Renders the report as a single validation error, if there is anything
	/// to report.
	pub fn into_result(self) -> Result<(), ConfigError> {
		if self.is_empty() {
			return Ok(());
		}

		let mut parts = Vec::new();
		if !self.missing.is_empty() {
			let missing: Vec<String> = self.missing.into_iter().collect();
			parts.push(format!("Missing required arguments: {}", missing.join(", ")));
		}
		parts.extend(self.invalid);

		Err(ConfigError::Validation(parts.join("; ")))
	}
}

/// Requires a non-empty, well formed, non-zero hex address.
pub fn validate_hex_address(address: &str, field: &str, report: &mut ValidationReport) {
	if address.is_empty() {
		report.missing(field);
		return;
	}

	match address.parse::<Address>() {
		Ok(parsed) if parsed != Address::ZERO => {},
		_ => report.invalid(format!("--{} is invalid", field)),
	}
}

/// Requires an `http` or `https` URL.
pub fn validate_rpc_url(rpc_url: &str, field: &str, report: &mut ValidationReport) {
	validate_url_scheme(rpc_url, field, &["http", "https"], "http or https", report);
}

/// Requires a `ws` or `wss` URL.
pub fn validate_websocket_url(ws_url: &str, field: &str, report: &mut ValidationReport) {
	validate_url_scheme(ws_url, field, &["ws", "wss"], "ws or wss", report);
}

fn validate_url_scheme(
	value: &str,
	field: &str,
	schemes: &[&str],
	expected: &str,
	report: &mut ValidationReport,
) {
	if value.is_empty() {
		report.missing(field);
		return;
	}

	match Url::parse(value) {
		Err(e) => report.invalid(format!("--{} is an invalid URL, {}", field, e)),
		Ok(url) if !schemes.contains(&url.scheme()) => report.invalid(format!(
			"--{} is invalid, expected {}, got {}",
			field,
			expected,
			url.scheme()
		)),
		Ok(_) => {},
	}
}

/// Requires a value greater than zero.
pub fn validate_positive<T>(value: T, field: &str, report: &mut ValidationReport)
where
	T: PartialOrd + Default,
{
	if value <= T::default() {
		report.invalid(format!("--{} must be greater than 0", field));
	}
}

/// Parses a configured contract address, naming the field on failure.
pub fn parse_contract_address(address: &str, field: &str) -> Result<Address, ConfigError> {
	let mut report = ValidationReport::default();
	validate_hex_address(address, field, &mut report);
	report.into_result()?;
	address
		.parse::<Address>()
		.map_err(|e| ConfigError::Validation(format!("--{} is invalid: {}", field, e)))
}
