//! Typed storefront endpoints: the welcome banner and the filtered product list.

// self
use crate::{
	_prelude::*,
	client::ApiClient,
	http::{ApiRequest, ApiResponse, HttpTransport},
};

/// Path of the welcome banner endpoint.
pub const WELCOME_PATH: &str = "/welcome";
/// Path of the product listing endpoint.
pub const PRODUCTS_PATH: &str = "/products/get-all";

/// Product row returned by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
	/// Backend identifier.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Price as sent by the backend (a decimal string).
	pub price: String,
}
impl Product {
	/// Renders the price as `$` plus two decimals, or `None` when it is not numeric.
	pub fn formatted_price(&self) -> Option<String> {
		let value = self.price.trim().parse::<f64>().ok().filter(|value| value.is_finite())?;

		Some(format!("${value:.2}"))
	}
}

/// Product search filter posted to [`PRODUCTS_PATH`].
///
/// Absent fields are omitted from the JSON body entirely, so the default filter serializes as
/// `{}` and fetches every product.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
	/// Name fragment to match.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Inclusive lower price bound.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub min_price: Option<String>,
	/// Inclusive upper price bound.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_price: Option<String>,
}
impl ProductFilter {
	/// Builds a filter from raw form inputs.
	///
	/// The name is always sent (an empty string matches everything on the backend); empty price
	/// inputs are dropped.
	pub fn from_inputs(
		name: impl Into<String>,
		min_price: impl Into<String>,
		max_price: impl Into<String>,
	) -> Self {
		Self {
			name: Some(name.into()),
			min_price: non_empty(min_price.into()),
			max_price: non_empty(max_price.into()),
		}
	}
}

fn non_empty(value: String) -> Option<String> {
	if value.is_empty() { None } else { Some(value) }
}

impl<T> ApiClient<T>
where
	T: HttpTransport,
{
	/// Fetches the welcome banner text.
	///
	/// JSON string bodies are unwrapped; anything else is returned as raw text.
	pub async fn welcome(&self) -> Result<String> {
		let response = self.send(ApiRequest::get(WELCOME_PATH)).await?;

		Ok(welcome_text(&response))
	}

	/// Fetches the products matching `filter`, in backend order.
	pub async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
		let request = ApiRequest::post(PRODUCTS_PATH).with_json(filter)?;
		let response = self.send(request).await?;

		decode_products(&response)
	}
}

fn welcome_text(response: &ApiResponse) -> String {
	serde_json::from_slice::<String>(&response.body).unwrap_or_else(|_| response.text())
}

fn decode_products(response: &ApiResponse) -> Result<Vec<Product>> {
	if response.body.iter().all(u8::is_ascii_whitespace) {
		return Ok(Vec::new());
	}

	let mut deserializer = serde_json::Deserializer::from_slice(&response.body);
	let products: Option<Vec<Product>> = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::Decode { source, status: response.status })?;

	Ok(products.unwrap_or_default())
}
