//! Refresh-in-progress flag and the FIFO queue of requests waiting on it.

// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::{Credential, RefreshError},
};

/// Outcome handed to every request waiting on a refresh.
pub(crate) type Settlement = Result<Credential, RefreshError>;

/// Client-owned refresh coordination state.
///
/// The flag and the queue share one lock so "queue is non-empty only while a refresh is in
/// flight" holds at every observation point. The lock is never held across an `.await`.
#[derive(Debug, Default)]
pub(crate) struct RefreshQueue(Mutex<QueueState>);
impl RefreshQueue {
	/// Either claims the refresh for the caller or enqueues it behind the in-flight one.
	pub(crate) fn join_or_lead(&self) -> Ticket<'_> {
		let mut state = self.0.lock();

		if state.in_flight {
			let (tx, rx) = oneshot::channel();

			state.waiters.push_back(tx);

			Ticket::Follower(rx)
		} else {
			state.in_flight = true;

			Ticket::Leader(RefreshLead { queue: self, concluded: false })
		}
	}

	pub(crate) fn is_refreshing(&self) -> bool {
		self.0.lock().in_flight
	}

	pub(crate) fn pending(&self) -> usize {
		self.0.lock().waiters.len()
	}

	fn conclude(&self, settlement: Settlement) -> usize {
		let waiters = {
			let mut state = self.0.lock();

			state.in_flight = false;

			std::mem::take(&mut state.waiters)
		};
		let settled = waiters.len();

		// A closed receiver means its request was dropped; nothing to deliver.
		for waiter in waiters {
			let _ = waiter.send(settlement.clone());
		}

		settled
	}
}

#[derive(Debug, Default)]
struct QueueState {
	in_flight: bool,
	waiters: VecDeque<oneshot::Sender<Settlement>>,
}

/// Role assigned to a request that received a 401.
pub(crate) enum Ticket<'a> {
	/// The caller must run the refresh and conclude it.
	Leader(RefreshLead<'a>),
	/// The caller waits for the in-flight refresh to settle it.
	Follower(oneshot::Receiver<Settlement>),
}

/// Ownership of the in-flight refresh.
///
/// Dropping the lead without concluding (the driving future was cancelled) settles every waiter
/// with [`RefreshError::Abandoned`] and clears the flag.
pub(crate) struct RefreshLead<'a> {
	queue: &'a RefreshQueue,
	concluded: bool,
}
impl RefreshLead<'_> {
	/// Settles all waiters in enqueue order, clears the flag, and returns how many were settled.
	pub(crate) fn conclude(mut self, settlement: Settlement) -> usize {
		self.concluded = true;

		self.queue.conclude(settlement)
	}
}
impl Drop for RefreshLead<'_> {
	fn drop(&mut self) {
		if !self.concluded {
			self.queue.conclude(Err(RefreshError::Abandoned));
		}
	}
}
