//! Transport primitives for backend calls.
//!
//! The module exposes [`HttpTransport`] alongside the [`ApiRequest`] and [`ApiResponse`] values
//! it exchanges, so downstream crates can swap in a custom HTTP stack (or a scripted fake in
//! tests) without touching the client's retry protocol. Transports only report what came back
//! over the wire; status classification happens in [`crate::client`].

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{_prelude::*, auth::Credential, error::TransportError};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing a single backend call.
///
/// Implementations must be `Send + Sync + 'static` so a client can be cloned into spawned
/// tasks. They must send `request.authorization` as an `Authorization: Bearer` header when it is
/// set and must not follow any retry policy of their own.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` to the absolute `url` and returns whatever status the backend answered.
	fn execute<'a>(&'a self, url: Url, request: &'a ApiRequest) -> TransportFuture<'a>;
}

/// HTTP verbs used by the storefront backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
}
impl Method {
	/// Returns the canonical verb label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outgoing call relative to the client's base address.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP verb.
	pub method: Method,
	/// Path appended to the base address, starting with `/`.
	pub path: String,
	/// Serialized JSON body, if any.
	pub body: Option<Vec<u8>>,
	/// Bearer credential sent as the `Authorization` header.
	pub authorization: Option<Credential>,
	/// One-shot marker set once the request has been replayed after a 401.
	pub retried: bool,
}
impl ApiRequest {
	/// Creates a body-less request.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), body: None, authorization: None, retried: false }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Serializes `body` as the JSON payload.
	pub fn with_json<T>(mut self, body: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body).map_err(Error::Encode)?);

		Ok(self)
	}

	/// Attaches (or replaces) the bearer credential.
	pub fn with_authorization(mut self, credential: Credential) -> Self {
		self.authorization = Some(credential);

		self
	}

	/// Marks the request as already replayed so a later 401 is not retried.
	pub fn mark_retried(mut self) -> Self {
		self.retried = true;

		self
	}
}

/// Raw backend answer.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// `Content-Type` header, when present.
	pub content_type: Option<String>,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Builds a response from a status code and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, content_type: None, body: body.into() }
	}

	/// Sets the `Content-Type` header value.
	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = Some(content_type.into());

		self
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` for 401 responses.
	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}

	/// Lossy UTF-8 rendering of the body.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that optionally keeps cookies across calls.
	pub fn build(keep_cookies: bool) -> Result<Self> {
		let client = ReqwestClient::builder()
			.cookie_store(keep_cookies)
			.build()
			.map_err(crate::error::ConfigError::from)?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	fn execute<'a>(&'a self, url: Url, request: &'a ApiRequest) -> TransportFuture<'a> {
		use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

		Box::pin(async move {
			let mut builder = match request.method {
				Method::Get => self.0.get(url),
				Method::Post => self.0.post(url),
			};

			if let Some(credential) = &request.authorization {
				builder = builder.header(AUTHORIZATION, credential.bearer());
			}
			if let Some(body) = &request.body {
				builder = builder.header(CONTENT_TYPE, "application/json").body(body.clone());
			}

			let response = builder
				.send()
				.await
				.map_err(|e| TransportError::network(request.path.as_str(), e))?;
			let status = response.status().as_u16();
			let content_type = response
				.headers()
				.get(CONTENT_TYPE)
				.and_then(|value| value.to_str().ok())
				.map(str::to_owned);
			let body = response
				.bytes()
				.await
				.map_err(|e| TransportError::network(request.path.as_str(), e))?
				.to_vec();

			Ok(ApiResponse { status, content_type, body })
		})
	}
}
