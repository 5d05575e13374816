//! Thread-safe in-memory [`CredentialStore`] for local development and tests.

// std
use std::collections::HashMap;
// self
use crate::{
	_prelude::*,
	auth::Credential,
	store::{CredentialStore, StoreFuture},
};

/// Storage backend that keeps credentials in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<HashMap<String, Credential>>>);
impl MemoryStore {
	/// Creates a store pre-populated with a single credential.
	pub fn with_credential(key: impl Into<String>, credential: Credential) -> Self {
		let store = Self::default();

		store.0.write().insert(key.into(), credential);

		store
	}

	/// Returns the credential under `key` without going through the async contract.
	pub fn get(&self, key: &str) -> Option<Credential> {
		self.0.read().get(key).cloned()
	}
}
impl CredentialStore for MemoryStore {
	fn load<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Credential>> {
		let found = self.get(key);

		Box::pin(async move { Ok(found) })
	}

	fn save<'a>(&'a self, key: &'a str, credential: Credential) -> StoreFuture<'a, ()> {
		self.0.write().insert(key.to_owned(), credential);

		Box::pin(async { Ok(()) })
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Credential>> {
		let removed = self.0.write().remove(key);

		Box::pin(async move { Ok(removed) })
	}
}
