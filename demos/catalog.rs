//! Demonstrates the storefront client against a mock backend: the welcome banner, a 401 that is
//! recovered through a refresher, and a debounced product search.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use storefront_client::{
	auth::{Credential, RefreshContext, RefreshFuture, TokenRefresher},
	client::ApiClient,
	config::ClientConfig,
	search::ProductSearch,
	store::MemoryStore,
};

/// Hands out a fixed credential; a real deployment would call its auth service here.
struct DemoRefresher;
impl TokenRefresher for DemoRefresher {
	fn refresh(&self, context: RefreshContext) -> RefreshFuture<'_> {
		println!("refreshing credential after 401 on {}", context.path);

		Box::pin(async { Ok(Credential::new("demo-fresh")) })
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let _expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/welcome").header("authorization", "Bearer demo-stale");
			then.status(401);
		})
		.await;
	let _welcome = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/welcome").header("authorization", "Bearer demo-fresh");
			then.status(200).header("content-type", "text/plain").body("Fresh arrivals every day!");
		})
		.await;
	let _products = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/products/get-all");
			then.status(200).header("content-type", "application/json").body(
				r#"[{"id":"1","name":"Widget","price":"9.5"},{"id":"2","name":"Gadget","price":"19"}]"#,
			);
		})
		.await;
	let config = ClientConfig::new(server.base_url())?
		.with_app_name("Demo Shop")
		.with_debounce(Duration::from_millis(300));
	let store = Arc::new(MemoryStore::with_credential("accessToken", Credential::new("demo-stale")));
	let client = ApiClient::new(config)?.with_store(store).with_refresher(Arc::new(DemoRefresher));

	println!("Welcome to {}!", client.config().app_name);
	println!("{}", client.welcome().await?);

	let (search, mut outcomes) = ProductSearch::new(client.clone());

	search.set_inputs("w", "", "");
	search.set_inputs("wid", "5", "");

	if let Some(outcome) = outcomes.recv().await {
		println!("filter: {:?}", outcome.filter);

		for (index, product) in outcome.result?.iter().enumerate() {
			println!(
				"{:>2}. {:<10} {}",
				index + 1,
				product.name,
				product.formatted_price().unwrap_or_else(|| product.price.clone())
			);
		}
	}

	println!(
		"refreshes attempted: {}, succeeded: {}",
		client.refresh_metrics.attempts(),
		client.refresh_metrics.successes()
	);

	Ok(())
}
