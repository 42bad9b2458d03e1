//! Resolution of a contracts manifest from its configured source.
//!
//! Every call re-reads its source. Nothing is cached between calls.

use crate::{ChainConfig, ConfigError, ContractsOptions, Environment};
use percent_encoding::percent_decode_str;
use std::path::PathBuf;
use std::time::Duration;

/// Largest remote manifest accepted, in bytes.
pub const MAX_CONFIG_SIZE: usize = 10 << 10;
/// Timeout for fetching a remote manifest.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const CONFIG_SCHEME: &str = "config://";
const FILE_SCHEME: &str = "file://";

/// Where to load a contracts manifest from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractsSource {
	/// A manifest embedded in the binary.
	Environment(Environment),
	/// A local path, `file://` URI, `http(s)://` URL or `config://<env>`.
	FilePath(String),
	/// Inline manifest JSON.
	Json(String),
}

impl ContractsSource {
	/// Builds a source from three optional settings, of which exactly one
	/// must be set. Empty strings count as unset.
	pub fn from_parts(
		environment: Option<&str>,
		file_path: Option<&str>,
		json: Option<&str>,
	) -> Result<Self, ConfigError> {
		fn set(value: Option<&str>) -> Option<&str> {
			value.filter(|v| !v.is_empty())
		}
		let (environment, file_path, json) = (set(environment), set(file_path), set(json));

		let count = [environment, file_path, json]
			.iter()
			.filter(|v| v.is_some())
			.count();
		match count {
			0 => return Err(ConfigError::SourceRequired),
			1 => {},
			_ => return Err(ConfigError::MutuallyExclusive),
		}

		if let Some(name) = environment {
			return Ok(ContractsSource::Environment(name.parse()?));
		}
		if let Some(path) = file_path {
			return Ok(ContractsSource::FilePath(path.to_string()));
		}
		Ok(ContractsSource::Json(json.unwrap_or_default().to_string()))
	}
}

/// Loads and maps a contracts manifest.
///
/// RPC endpoints are left empty, see [`ContractsOptions::with_settlement_rpc_url`].
pub async fn load_contracts_config(source: &ContractsSource) -> Result<ContractsOptions, ConfigError> {
	let data = match source {
		ContractsSource::Environment(env) => env.manifest().to_vec(),
		ContractsSource::FilePath(path) => load_from_path(path).await?,
		ContractsSource::Json(json) => json.as_bytes().to_vec(),
	};

	let config = ChainConfig::from_slice(&data)?;
	Ok(config.into_options())
}

async fn load_from_path(path: &str) -> Result<Vec<u8>, ConfigError> {
	if let Some(name) = path.strip_prefix(CONFIG_SCHEME) {
		let env: Environment = name.parse()?;
		return Ok(env.manifest().to_vec());
	}

	if path.starts_with("http://") || path.starts_with("https://") {
		return fetch_url(path).await;
	}

	let local = match path.strip_prefix(FILE_SCHEME) {
		Some(rest) => file_uri_path(rest)
			.ok_or_else(|| ConfigError::InvalidFileUrl(path.to_string()))?,
		None => path.into(),
	};

	tracing::debug!(path = %local.display(), "Reading contracts config");
	tokio::fs::read(&local).await.map_err(|source| ConfigError::Io {
		path: local.display().to_string(),
		source,
	})
}

/// Decodes the part of a `file://` URI after the scheme. Relative paths
/// resolve against the working directory.
fn file_uri_path(rest: &str) -> Option<PathBuf> {
	percent_decode_str(rest)
		.decode_utf8()
		.ok()
		.map(|decoded| PathBuf::from(decoded.as_ref()))
}

/// Fetches a remote manifest, failing on non-2xx statuses and on bodies
/// larger than [`MAX_CONFIG_SIZE`].
///
/// The body is read chunk by chunk and the read stops as soon as the limit
/// is passed, so an oversized response is never buffered in full.
async fn fetch_url(url: &str) -> Result<Vec<u8>, ConfigError> {
	let fetch_error = |e: reqwest::Error| ConfigError::Fetch {
		url: url.to_string(),
		reason: e.to_string(),
	};

	let client = reqwest::Client::builder()
		.timeout(HTTP_TIMEOUT)
		.build()
		.map_err(fetch_error)?;

	tracing::debug!(url = %url, "Fetching contracts config");
	let mut response = client.get(url).send().await.map_err(fetch_error)?;

	let status = response.status();
	if !status.is_success() {
		return Err(ConfigError::HttpStatus {
			url: url.to_string(),
			status: status.as_u16(),
		});
	}

	let mut body = Vec::new();
	while let Some(chunk) = response.chunk().await.map_err(fetch_error)? {
		body.extend_from_slice(&chunk);
		if body.len() > MAX_CONFIG_SIZE {
			return Err(ConfigError::TooLarge {
				url: url.to_string(),
				limit: MAX_CONFIG_SIZE,
			});
		}
	}

	Ok(body)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;
	use tokio::io::{AsyncReadExt, AsyncWriteExt};
	use tokio::net::TcpListener;
	use url::Url;

	/// Serves a single HTTP response and returns the URL to request.
	async fn serve_once(status: &'static str, body: Vec<u8>) -> String {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let address = listener.local_addr().unwrap();

		tokio::spawn(async move {
			let (mut socket, _) = listener.accept().await.unwrap();
			let mut request = Vec::new();
			let mut buf = [0u8; 1024];
			while !request.windows(4).any(|w| w == b"\r\n\r\n") {
				let n = socket.read(&mut buf).await.unwrap();
				if n == 0 {
					break;
				}
				request.extend_from_slice(&buf[..n]);
			}

			let header = format!(
				"HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
				status,
				body.len()
			);
			socket.write_all(header.as_bytes()).await.unwrap();
			socket.write_all(&body).await.unwrap();
			socket.shutdown().await.ok();
		});

		format!("http://{}/config.json", address)
	}

	/// A manifest padded with an ignored key to exactly `size` bytes.
	fn manifest_of_size(size: usize) -> Vec<u8> {
		let prefix = r#"{"nodeRegistry":"0x5FbDB2315678afecb367f032d93F642f64180aa3","padding":""#;
		let suffix = r#""}"#;
		let padding = "x".repeat(size - prefix.len() - suffix.len());
		format!("{}{}{}", prefix, padding, suffix).into_bytes()
	}

	#[tokio::test]
	async fn test_every_environment_loads() {
		for env in Environment::ALL {
			let options = load_contracts_config(&ContractsSource::Environment(env))
				.await
				.unwrap();
			assert!(!options.settlement_chain.node_registry_address.is_empty(), "{}", env);
			assert!(
				!options.app_chain.group_message_broadcaster_address.is_empty(),
				"{}",
				env
			);
			assert!(options.settlement_chain.chain_id > 0, "{}", env);
		}
	}

	#[test]
	fn test_source_arity() {
		let err = ContractsSource::from_parts(None, Some(""), None).unwrap_err();
		assert!(err.to_string().contains("required"));

		let err = ContractsSource::from_parts(Some("testnet"), Some("/tmp/x.json"), None)
			.unwrap_err();
		assert!(err.to_string().contains("mutually exclusive"));

		let err = ContractsSource::from_parts(Some("testnet"), Some("a"), Some("{}")).unwrap_err();
		assert!(matches!(err, ConfigError::MutuallyExclusive));

		assert_eq!(
			ContractsSource::from_parts(Some("testnet"), None, Some("")).unwrap(),
			ContractsSource::Environment(Environment::Testnet)
		);
		assert!(matches!(
			ContractsSource::from_parts(Some("devnet"), None, None),
			Err(ConfigError::UnknownEnvironment(_))
		));
	}

	#[tokio::test]
	async fn test_config_scheme_matches_environment() {
		let by_name = load_contracts_config(&ContractsSource::Environment(Environment::Testnet))
			.await
			.unwrap();
		let by_url = load_contracts_config(&ContractsSource::FilePath("config://testnet".into()))
			.await
			.unwrap();
		assert_eq!(by_name, by_url);

		let err = load_contracts_config(&ContractsSource::FilePath("config://nope".into()))
			.await
			.unwrap_err();
		assert!(matches!(err, ConfigError::UnknownEnvironment(_)));
	}

	#[tokio::test]
	async fn test_inline_json() {
		let options = load_contracts_config(&ContractsSource::Json(
			r#"{"nodeRegistry":"0x5FbDB2315678afecb367f032d93F642f64180aa3","settlementChainId":31337}"#
				.into(),
		))
		.await
		.unwrap();
		assert_eq!(options.chain_id(), 31337);

		let err = load_contracts_config(&ContractsSource::Json("{".into()))
			.await
			.unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[tokio::test]
	async fn test_local_file_and_file_url() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("my config.json");
		fs::write(&config_path, Environment::Anvil.manifest()).unwrap();

		let expected = load_contracts_config(&ContractsSource::Environment(Environment::Anvil))
			.await
			.unwrap();

		let from_path = load_contracts_config(&ContractsSource::FilePath(
			config_path.to_string_lossy().into_owned(),
		))
		.await
		.unwrap();
		assert_eq!(from_path, expected);

		// The space in the file name is percent encoded in the URI.
		let file_url = Url::from_file_path(&config_path).unwrap().to_string();
		assert!(file_url.contains("%20"));
		let from_url = load_contracts_config(&ContractsSource::FilePath(file_url))
			.await
			.unwrap();
		assert_eq!(from_url, expected);
	}

	#[tokio::test]
	async fn test_missing_file() {
		let temp_dir = TempDir::new().unwrap();
		let missing = temp_dir.path().join("missing.json");
		let err = load_contracts_config(&ContractsSource::FilePath(
			missing.to_string_lossy().into_owned(),
		))
		.await
		.unwrap_err();
		assert!(matches!(err, ConfigError::Io { .. }));

		let err = load_contracts_config(&ContractsSource::FilePath("file://relative/x.json".into()))
			.await
			.unwrap_err();
		assert!(matches!(err, ConfigError::Io { ref path, .. } if path == "relative/x.json"));

		let err = load_contracts_config(&ContractsSource::FilePath("file:///tmp/%FF.json".into()))
			.await
			.unwrap_err();
		assert!(matches!(err, ConfigError::InvalidFileUrl(_)));
	}

	#[tokio::test]
	async fn test_relative_file_url() {
		let expected = load_contracts_config(&ContractsSource::Environment(Environment::Anvil))
			.await
			.unwrap();

		// Tests run from the package root.
		for uri in [
			"file://src/environments/anvil.json",
			"file://./src/environments/anvil%2Ejson",
		] {
			let options = load_contracts_config(&ContractsSource::FilePath(uri.into()))
				.await
				.unwrap();
			assert_eq!(options, expected, "{}", uri);
		}
	}

	#[test]
	fn test_file_uri_path_decoding() {
		assert_eq!(
			file_uri_path("/etc/my%20config.json"),
			Some(PathBuf::from("/etc/my config.json"))
		);
		assert_eq!(file_uri_path("configs/a.json"), Some(PathBuf::from("configs/a.json")));
		assert_eq!(file_uri_path("%C3%28"), None);
	}

	#[tokio::test]
	async fn test_remote_manifest_at_limit() {
		let body = manifest_of_size(MAX_CONFIG_SIZE);
		assert_eq!(body.len(), MAX_CONFIG_SIZE);
		let url = serve_once("200 OK", body).await;

		let options = load_contracts_config(&ContractsSource::FilePath(url))
			.await
			.unwrap();
		assert_eq!(
			options.settlement_chain.node_registry_address,
			"0x5FbDB2315678afecb367f032d93F642f64180aa3"
		);
	}

	#[tokio::test]
	async fn test_remote_manifest_over_limit() {
		let url = serve_once("200 OK", manifest_of_size(MAX_CONFIG_SIZE + 1)).await;

		let err = load_contracts_config(&ContractsSource::FilePath(url))
			.await
			.unwrap_err();
		assert!(matches!(err, ConfigError::TooLarge { limit, .. } if limit == MAX_CONFIG_SIZE));
		assert!(err.to_string().contains("response exceeds 10240 bytes"));
	}

	#[tokio::test]
	async fn test_remote_manifest_error_status() {
		let url = serve_once(
			"404 Not Found",
			Environment::Anvil.manifest().to_vec(),
		)
		.await;

		let err = load_contracts_config(&ContractsSource::FilePath(url))
			.await
			.unwrap_err();
		assert!(matches!(err, ConfigError::HttpStatus { status: 404, .. }));
	}
}
