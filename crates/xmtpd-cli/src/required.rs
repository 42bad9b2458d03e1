//! Required flag checks.
//!
//! Subcommand flags are declared optional and checked after parsing, so a
//! single error can name every flag that is missing.

use std::fmt;

/// Required flags that were not given, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFlags(Vec<&'static str>);

impl fmt::Display for MissingFlags {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let quoted: Vec<String> = self.0.iter().map(|name| format!("`--{}'", name)).collect();
		match quoted.split_last() {
			None => write!(f, "no required flags are missing"),
			Some((only, [])) => write!(f, "the required flag {} was not specified", only),
			Some((last, rest)) => write!(
				f,
				"the required flags {} and {} were not specified",
				rest.join(", "),
				last
			),
		}
	}
}

impl std::error::Error for MissingFlags {}

/// Collects missing flags.
#[derive(Debug, Default)]
pub struct RequiredFlags {
	missing: Vec<&'static str>,
}

impl RequiredFlags {
	pub fn check<T>(mut self, name: &'static str, value: &Option<T>) -> Self {
		if value.is_none() {
			self.missing.push(name);
		}
		self
	}

	pub fn finish(mut self) -> Result<(), MissingFlags> {
		if self.missing.is_empty() {
			return Ok(());
		}
		self.missing.sort_unstable();
		self.missing.dedup();
		Err(MissingFlags(self.missing))
	}
}

/// Returns a flag value, or the missing flag error.
pub fn flag<'a, T>(value: &'a Option<T>, name: &'static str) -> Result<&'a T, MissingFlags> {
	value.as_ref().ok_or_else(|| MissingFlags(vec![name]))
}
