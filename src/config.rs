//! Client configuration: backend address, credential key, and timing knobs.

// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable holding the backend origin (without the `/api` suffix).
pub const ENV_BASE_URL: &str = "STOREFRONT_API_BASE_URL";
/// Environment variable overriding the application name.
pub const ENV_APP_NAME: &str = "STOREFRONT_APP_NAME";
/// Environment variable overriding the credential store key.
pub const ENV_CREDENTIAL_KEY: &str = "STOREFRONT_CREDENTIAL_KEY";
/// Environment variable overriding the search debounce window, in milliseconds.
pub const ENV_DEBOUNCE_MS: &str = "STOREFRONT_DEBOUNCE_MS";
/// Environment variable enabling a refresh timeout, in milliseconds.
pub const ENV_REFRESH_TIMEOUT_MS: &str = "STOREFRONT_REFRESH_TIMEOUT_MS";

/// Settings shared by the client, the endpoint helpers, and the debounced search.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Backend address every request path is appended to; always ends in `/api`.
	pub base_url: Url,
	/// Key the credential is stored under.
	pub credential_key: String,
	/// Quiet period before a filter change triggers a product search.
	pub debounce: Duration,
	/// Upper bound for a single refresh attempt; `None` waits indefinitely.
	pub refresh_timeout: Option<Duration>,
	/// Keeps cookies set by the backend and sends them on later calls.
	pub keep_cookies: bool,
	/// Display name of the application.
	pub app_name: String,
}
impl ClientConfig {
	/// Path segment appended to the configured backend origin.
	pub const API_SUFFIX: &'static str = "/api";
	/// Default credential store key.
	pub const DEFAULT_CREDENTIAL_KEY: &'static str = "accessToken";
	/// Default debounce window.
	pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
	/// Default application name.
	pub const DEFAULT_APP_NAME: &'static str = "App";

	/// Creates a configuration for the backend at `origin`; `/api` is appended.
	pub fn new(origin: impl AsRef<str>) -> Result<Self, ConfigError> {
		Ok(Self {
			base_url: Self::api_base(origin.as_ref())?,
			credential_key: Self::DEFAULT_CREDENTIAL_KEY.into(),
			debounce: Self::DEFAULT_DEBOUNCE,
			refresh_timeout: None,
			keep_cookies: true,
			app_name: Self::DEFAULT_APP_NAME.into(),
		})
	}

	/// Reads the configuration from process environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads the configuration through `lookup`, which maps variable names to values.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
		let origin = read(ENV_BASE_URL).ok_or(ConfigError::Missing { name: ENV_BASE_URL })?;
		let mut config = Self::new(origin)?;

		if let Some(name) = read(ENV_APP_NAME) {
			config.app_name = name;
		}
		if let Some(key) = lookup(ENV_CREDENTIAL_KEY) {
			config = config.with_credential_key(key)?;
		}
		if let Some(raw) = read(ENV_DEBOUNCE_MS) {
			config.debounce = parse_millis(ENV_DEBOUNCE_MS, &raw)?;
		}
		if let Some(raw) = read(ENV_REFRESH_TIMEOUT_MS) {
			config.refresh_timeout = Some(parse_millis(ENV_REFRESH_TIMEOUT_MS, &raw)?);
		}

		Ok(config)
	}

	/// Overrides the credential store key.
	pub fn with_credential_key(mut self, key: impl Into<String>) -> Result<Self, ConfigError> {
		let key = key.into();

		if key.trim().is_empty() {
			return Err(ConfigError::EmptyCredentialKey);
		}

		self.credential_key = key;

		Ok(self)
	}

	/// Overrides the debounce window.
	pub fn with_debounce(mut self, debounce: Duration) -> Self {
		self.debounce = debounce;

		self
	}

	/// Bounds each refresh attempt by `timeout`.
	pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = Some(timeout);

		self
	}

	/// Enables or disables the cookie jar.
	pub fn with_cookies(mut self, keep_cookies: bool) -> Self {
		self.keep_cookies = keep_cookies;

		self
	}

	/// Overrides the application name.
	pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
		self.app_name = name.into();

		self
	}

	/// Resolves a request path such as `/welcome` against the base address.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let joined = format!("{}/{}", self.base_url.as_str(), path.trim_start_matches('/'));

		Url::parse(&joined)
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
	}

	fn api_base(origin: &str) -> Result<Url, ConfigError> {
		let raw = format!("{}{}", origin.trim().trim_end_matches('/'), Self::API_SUFFIX);

		Url::parse(&raw)
			.map_err(|source| ConfigError::InvalidBaseUrl { value: origin.to_owned(), source })
	}
}

fn parse_millis(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
	raw.trim()
		.parse::<u64>()
		.map(Duration::from_millis)
		.map_err(|_| ConfigError::InvalidDuration { name, value: raw.to_owned() })
}
