mod support;

// std
use std::{sync::Arc, time::Duration};
// self
use storefront_client::{
	api::ProductFilter,
	auth::{Credential, RefreshError},
	client::ApiClient,
	error::Error,
	http::ApiRequest,
	store::{CredentialStore, MemoryStore},
};
use support::{GatedRefresher, ScriptedTransport, config};

type TestClient = ApiClient<ScriptedTransport>;

fn build_client(
	transport: &Arc<ScriptedTransport>,
	refresher: &Arc<GatedRefresher>,
	stored: Option<&str>,
) -> (TestClient, Arc<MemoryStore>) {
	let store = Arc::new(match stored {
		Some(token) => MemoryStore::with_credential("accessToken", Credential::new(token)),
		None => MemoryStore::default(),
	});
	let client = ApiClient::with_transport(config(), transport.clone())
		.with_store(store.clone())
		.with_refresher(refresher.clone());

	(client, store)
}

async fn release_when_waiting(client: &TestClient, refresher: &GatedRefresher, waiters: usize) {
	while client.pending_refresh_waiters() < waiters {
		tokio::task::yield_now().await;
	}

	refresher.release();
}

#[tokio::test]
async fn credential_header_tracks_store_contents() {
	let transport = Arc::new(ScriptedTransport::open());
	let refresher = Arc::new(GatedRefresher::succeeding("unused"));
	let (client, _store) = build_client(&transport, &refresher, None);

	client.welcome().await.expect("Anonymous welcome call should succeed.");
	client.set_credential(Credential::new("abc")).await.expect("Credential should be stored.");
	client.welcome().await.expect("Authenticated welcome call should succeed.");

	let calls = transport.calls();

	assert_eq!(calls.len(), 2);
	assert_eq!(calls[0].url, "http://storefront.test/api/welcome");
	assert_eq!(calls[0].authorization, None);
	assert_eq!(calls[1].authorization.as_deref(), Some("Bearer abc"));
	assert_eq!(refresher.calls(), 0);
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
	let transport = Arc::new(ScriptedTransport::accepting("fresh"));
	let refresher = Arc::new(GatedRefresher::succeeding("fresh"));
	let (client, store) = build_client(&transport, &refresher, Some("stale"));
	let filter = ProductFilter::default();
	let (first, second, third, ()) = tokio::join!(
		client.welcome(),
		client.welcome(),
		client.products(&filter),
		release_when_waiting(&client, &refresher, 2),
	);

	let welcome = "Welcome to the storefront!";

	assert_eq!(first.expect("Leader should succeed after the refresh."), welcome);
	assert_eq!(second.expect("Queued request should succeed after the refresh."), welcome);
	assert_eq!(third.expect("Queued product search should succeed after the refresh.").len(), 2);
	assert_eq!(refresher.calls(), 1);
	assert_eq!(client.refresh_metrics.attempts(), 1);
	assert_eq!(client.refresh_metrics.successes(), 1);
	assert_eq!(client.refresh_metrics.queued(), 2);
	assert!(!client.is_refreshing());
	assert_eq!(client.pending_refresh_waiters(), 0);

	let calls = transport.calls();
	let replays: Vec<_> = calls.iter().filter(|call| call.retried).collect();

	assert_eq!(calls.len(), 6);
	assert_eq!(replays.len(), 3);
	assert!(replays.iter().all(|call| call.authorization.as_deref() == Some("Bearer fresh")));

	let persisted = store
		.load("accessToken")
		.await
		.expect("Store read should succeed.")
		.expect("Refreshed credential should be persisted.");

	assert_eq!(persisted.expose(), "fresh");

	let contexts = refresher.contexts();

	assert_eq!(contexts.len(), 1);
	assert_eq!(contexts[0].rejected.as_ref().map(Credential::expose), Some("stale"));
	assert_eq!(contexts[0].path, "/welcome");
}

#[tokio::test]
async fn failed_refresh_rejects_every_waiter_with_the_same_error() {
	let transport = Arc::new(ScriptedTransport::accepting("fresh"));
	let refresher =
		Arc::new(GatedRefresher::failing(RefreshError::failed("refresh endpoint down")));
	let (client, store) = build_client(&transport, &refresher, Some("stale"));
	let (first, second, third, ()) = tokio::join!(
		client.welcome(),
		client.welcome(),
		client.welcome(),
		release_when_waiting(&client, &refresher, 2),
	);
	let expected = RefreshError::failed("refresh endpoint down");

	for result in [first, second, third] {
		match result {
			Err(Error::Refresh(err)) => assert_eq!(err, expected),
			other => panic!("Unexpected outcome: {other:?}."),
		}
	}

	assert_eq!(refresher.calls(), 1);
	assert_eq!(client.refresh_metrics.failures(), 1);
	assert!(!client.is_refreshing());
	assert_eq!(client.pending_refresh_waiters(), 0);
	assert_eq!(transport.calls().len(), 3, "Failed refreshes must not replay any request.");
	assert_eq!(
		store.get("accessToken").as_ref().map(Credential::expose),
		Some("stale"),
		"Failed refreshes must leave the stored credential untouched."
	);
}

#[tokio::test]
async fn default_refresher_surfaces_unsupported() {
	let transport = Arc::new(ScriptedTransport::accepting("fresh"));
	let store = Arc::new(MemoryStore::with_credential("accessToken", Credential::new("stale")));
	let client: TestClient =
		ApiClient::with_transport(config(), transport.clone()).with_store(store);
	let err = client.welcome().await.expect_err("Stub refresh must fail the request.");

	assert!(matches!(err, Error::Refresh(RefreshError::Unsupported)));
	assert!(err.is_authorization_denied());
	assert_eq!(transport.calls().len(), 1);
	assert!(!client.is_refreshing());
}

#[tokio::test]
async fn replayed_request_is_never_retried_twice() {
	let transport = Arc::new(ScriptedTransport::accepting("never-issued"));
	let refresher = Arc::new(GatedRefresher::succeeding("fresh"));
	let (client, _store) = build_client(&transport, &refresher, Some("stale"));

	refresher.release();

	let err = client.welcome().await.expect_err("Second 401 should surface.");

	assert!(matches!(err, Error::AuthorizationDenied { status: 401 }));
	assert_eq!(refresher.calls(), 1);

	let calls = transport.calls();

	assert_eq!(calls.len(), 2);
	assert!(!calls[0].retried);
	assert!(calls[1].retried);
	assert_eq!(calls[1].authorization.as_deref(), Some("Bearer fresh"));
}

#[tokio::test]
async fn requests_marked_retried_skip_the_refresh() {
	let transport = Arc::new(ScriptedTransport::accepting("fresh"));
	let refresher = Arc::new(GatedRefresher::succeeding("fresh"));
	let (client, _store) = build_client(&transport, &refresher, Some("stale"));
	let err = client
		.send(ApiRequest::get("/welcome").mark_retried())
		.await
		.expect_err("A retried request must not be retried again.");

	assert!(matches!(err, Error::AuthorizationDenied { status: 401 }));
	assert_eq!(refresher.calls(), 0);
	assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn other_failures_propagate_unchanged() {
	let transport = Arc::new(ScriptedTransport::open());
	let refresher = Arc::new(GatedRefresher::succeeding("unused"));
	let (client, _store) = build_client(&transport, &refresher, None);
	let err = client
		.send(ApiRequest::get("/boom"))
		.await
		.expect_err("Server errors should surface.");

	match err {
		Error::Status { status, body } => {
			assert_eq!(status, 500);
			assert_eq!(body, "backend exploded");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	let err = client
		.send(ApiRequest::get("/offline"))
		.await
		.expect_err("Transport failures should surface.");

	assert!(matches!(err, Error::Transport(_)));
	assert!(!err.is_authorization_denied());
	assert_eq!(refresher.calls(), 0);
}

#[tokio::test]
async fn dropped_leader_abandons_queued_requests() {
	let transport = Arc::new(ScriptedTransport::accepting("fresh"));
	let refresher = Arc::new(GatedRefresher::succeeding("fresh"));
	let (client, _store) = build_client(&transport, &refresher, Some("stale"));
	let leader = tokio::spawn({
		let client = client.clone();

		async move { client.welcome().await }
	});

	while !client.is_refreshing() {
		tokio::task::yield_now().await;
	}

	let follower = tokio::spawn({
		let client = client.clone();

		async move { client.welcome().await }
	});

	while client.pending_refresh_waiters() < 1 {
		tokio::task::yield_now().await;
	}

	leader.abort();

	let err = follower
		.await
		.expect("Follower task should not panic.")
		.expect_err("Follower should observe the abandoned refresh.");

	assert!(matches!(err, Error::Refresh(RefreshError::Abandoned)));
	assert!(!client.is_refreshing());
	assert_eq!(client.pending_refresh_waiters(), 0);
}

#[tokio::test(start_paused = true)]
async fn refresh_timeout_fails_the_request() {
	let transport = Arc::new(ScriptedTransport::accepting("fresh"));
	let refresher = Arc::new(GatedRefresher::succeeding("fresh"));
	let store = Arc::new(MemoryStore::with_credential("accessToken", Credential::new("stale")));
	let client: TestClient = ApiClient::with_transport(
		config().with_refresh_timeout(Duration::from_millis(250)),
		transport.clone(),
	)
	.with_store(store)
	.with_refresher(refresher.clone());
	let err = client.welcome().await.expect_err("Hung refresh should time out.");

	assert!(matches!(
		err,
		Error::Refresh(RefreshError::TimedOut { timeout }) if timeout == Duration::from_millis(250)
	));
	assert!(!client.is_refreshing());
	assert_eq!(client.refresh_metrics.failures(), 1);
}
