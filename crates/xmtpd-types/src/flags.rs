//! Value types for list-valued command-line flags and environment variables.
//!
//! Both types parse from, and render back to, comma separated text so they
//! can be used directly as `clap` value types.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing flag values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlagError {
	#[error("invalid uint32 value {value:?}: {reason}")]
	InvalidUint32 { value: String, reason: String },
	#[error("invalid limit entry {0:?}, expected <source>=<limit>")]
	InvalidLimitEntry(String),
}

/// A list of `u32` values written as `1,2,3`.
///
/// Empty or whitespace-only input yields an empty list, and empty segments
/// such as the trailing one in `1,2,` are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uint32Slice(pub Vec<u32>);

impl Uint32Slice {
	pub fn as_slice(&self) -> &[u32] {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl FromStr for Uint32Slice {
	type Err = FlagError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let values = s
			.split(',')
			.map(str::trim)
			.filter(|part| !part.is_empty())
			.map(|part| {
				part.parse::<u32>().map_err(|e| FlagError::InvalidUint32 {
					value: part.to_string(),
					reason: e.to_string(),
				})
			})
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self(values))
	}
}

impl fmt::Display for Uint32Slice {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let rendered: Vec<String> = self.0.iter().map(u32::to_string).collect();
		f.write_str(&rendered.join(","))
	}
}

impl From<Vec<u32>> for Uint32Slice {
	fn from(values: Vec<u32>) -> Self {
		Self(values)
	}
}

/// Per-source lower bounds written as `100=5,200=7`.
///
/// Keys are originator (source node) IDs and values are the lowest sequence
/// ID to accept from that source. A source that is not listed has a lower
/// limit of 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLowerLimits(HashMap<u32, u64>);

impl SourceLowerLimits {
	/// Returns the lower limit for `source`, or 0 when none is configured.
	pub fn get(&self, source: u32) -> u64 {
		self.0.get(&source).copied().unwrap_or(0)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl FromStr for SourceLowerLimits {
	type Err = FlagError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut limits = HashMap::new();

		for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
			let (source, limit) = entry
				.split_once('=')
				.ok_or_else(|| FlagError::InvalidLimitEntry(entry.to_string()))?;
			let source = source
				.trim()
				.parse::<u32>()
				.map_err(|_| FlagError::InvalidLimitEntry(entry.to_string()))?;
			let limit = limit
				.trim()
				.parse::<u64>()
				.map_err(|_| FlagError::InvalidLimitEntry(entry.to_string()))?;
			limits.insert(source, limit);
		}

		Ok(Self(limits))
	}
}

impl fmt::Display for SourceLowerLimits {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let sorted: BTreeMap<_, _> = self.0.iter().collect();
		let rendered: Vec<String> = sorted
			.into_iter()
			.map(|(source, limit)| format!("{}={}", source, limit))
			.collect();
		f.write_str(&rendered.join(","))
	}
}

impl From<HashMap<u32, u64>> for SourceLowerLimits {
	fn from(limits: HashMap<u32, u64>) -> Self {
		Self(limits)
	}
}
