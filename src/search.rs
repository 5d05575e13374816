//! Debounced product search driven by filter edits.
//!
//! Every edit restarts a quiet-period timer; only when no newer edit arrives before it elapses
//! does a single `POST /products/get-all` go out. Cancelling only ever affects timers that have
//! not fired: a search already sent runs to completion and its outcome is still delivered.
//! All scheduling methods spawn Tokio tasks and must be called from within a Tokio runtime.

// crates.io
use tokio::{
	sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
	task::JoinHandle,
};
// self
use crate::{
	_prelude::*,
	api::{Product, ProductFilter},
	client::ApiClient,
	http::HttpTransport,
};

/// Delays an action until a quiet period passes without a newer [`Debouncer::schedule`] call.
#[derive(Debug)]
pub struct Debouncer {
	quiet: Duration,
	pending: Mutex<Option<JoinHandle<()>>>,
}
impl Debouncer {
	/// Creates a debouncer with the given quiet period.
	pub fn new(quiet: Duration) -> Self {
		Self { quiet, pending: Mutex::new(None) }
	}

	/// Quiet period an action waits for before firing.
	pub fn quiet(&self) -> Duration {
		self.quiet
	}

	/// Schedules `action` to run after the quiet period, cancelling the previous timer if it
	/// has not fired yet.
	pub fn schedule<F>(&self, action: F)
	where
		F: 'static + Send + Future<Output = ()>,
	{
		let quiet = self.quiet;
		let timer = tokio::spawn(async move {
			tokio::time::sleep(quiet).await;
			// Detached so later schedules cannot cancel an action that already fired.
			tokio::spawn(action);
		});

		if let Some(previous) = self.pending.lock().replace(timer) {
			previous.abort();
		}
	}

	/// Cancels the pending timer; returns `true` if one had not fired yet.
	pub fn cancel(&self) -> bool {
		match self.pending.lock().take() {
			Some(timer) => {
				let unfired = !timer.is_finished();

				timer.abort();

				unfired
			},
			None => false,
		}
	}
}
impl Drop for Debouncer {
	fn drop(&mut self) {
		if let Some(timer) = self.pending.get_mut().take() {
			timer.abort();
		}
	}
}

/// Completed product search.
#[derive(Debug)]
pub struct SearchOutcome {
	/// Filter the search was issued with.
	pub filter: ProductFilter,
	/// Products returned by the backend, or the failure.
	pub result: Result<Vec<Product>>,
}

/// Product list state machine: debounces filter edits and reports each completed search.
pub struct ProductSearch<T>
where
	T: HttpTransport,
{
	client: ApiClient<T>,
	debouncer: Debouncer,
	outcomes: UnboundedSender<SearchOutcome>,
}
impl<T> ProductSearch<T>
where
	T: HttpTransport,
{
	/// Creates a search bound to `client`, using its configured debounce window.
	///
	/// Completed searches are delivered on the returned receiver in completion order.
	pub fn new(client: ApiClient<T>) -> (Self, UnboundedReceiver<SearchOutcome>) {
		let debouncer = Debouncer::new(client.config().debounce);
		let (outcomes, rx) = mpsc::unbounded_channel();

		(Self { client, debouncer, outcomes }, rx)
	}

	/// Issues the initial, unfiltered search immediately.
	pub fn load_initial(&self) {
		self.fetch_now(ProductFilter::default());
	}

	/// Issues a search for `filter` immediately, bypassing the debounce window.
	pub fn fetch_now(&self, filter: ProductFilter) {
		tokio::spawn(run_search(self.client.clone(), self.outcomes.clone(), filter));
	}

	/// Records a filter edit; the search fires once the debounce window passes quietly.
	pub fn set_filter(&self, filter: ProductFilter) {
		tracing::trace!(?filter, "Product filter changed.");

		self.debouncer.schedule(run_search(self.client.clone(), self.outcomes.clone(), filter));
	}

	/// Records raw form inputs, see [`ProductFilter::from_inputs`].
	pub fn set_inputs(
		&self,
		name: impl Into<String>,
		min_price: impl Into<String>,
		max_price: impl Into<String>,
	) {
		self.set_filter(ProductFilter::from_inputs(name, min_price, max_price));
	}

	/// Drops a pending, unfired search; returns `true` if one was cancelled.
	pub fn cancel_pending(&self) -> bool {
		self.debouncer.cancel()
	}
}
impl<T> Debug for ProductSearch<T>
where
	T: HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProductSearch")
			.field("client", &self.client)
			.field("debouncer", &self.debouncer)
			.finish()
	}
}

async fn run_search<T>(
	client: ApiClient<T>,
	outcomes: UnboundedSender<SearchOutcome>,
	filter: ProductFilter,
) where
	T: HttpTransport,
{
	let result = client.products(&filter).await;

	match &result {
		Ok(products) => tracing::debug!(count = products.len(), "Product search completed."),
		Err(e) => tracing::error!(error = %e, "Product search failed."),
	}

	// The receiver going away just means nobody renders the list anymore.
	let _ = outcomes.send(SearchOutcome { filter, result });
}
