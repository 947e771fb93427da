use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;

use crate::error::TransportError;
use crate::events::{MessageId, Reply, ReplyKind, UserId};
use crate::lock_mutex;
use crate::transport::Transport;

/// Keeps every delivered reply in memory. Edits reuse the edited id;
/// everything else gets the next one.
pub struct RecordingTransport {
	delivered: Mutex<Vec<(UserId, Reply)>>,
	next_id: AtomicI64,
	failing: AtomicBool,
}

impl RecordingTransport {
	pub fn new() -> Self {
		Self {
			delivered: Mutex::new(Vec::new()),
			next_id: AtomicI64::new(1),
			failing: AtomicBool::new(false),
		}
	}

	pub fn delivered(&self) -> Vec<(UserId, Reply)> {
		lock_mutex(&self.delivered).clone()
	}

	pub fn replies_to(&self, user: UserId) -> Vec<Reply> {
		lock_mutex(&self.delivered)
			.iter()
			.filter(|(u, _)| *u == user)
			.map(|(_, r)| r.clone())
			.collect()
	}

	pub fn clear(&self) {
		lock_mutex(&self.delivered).clear();
	}

	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}
}

impl Default for RecordingTransport {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Transport for RecordingTransport {
	async fn deliver(&self, user: UserId, reply: &Reply) -> Result<MessageId, TransportError> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(TransportError::Delivery {
				user,
				reason: "recording transport set to fail".to_string(),
			});
		}

		lock_mutex(&self.delivered).push((user, reply.clone()));
		match reply.kind {
			ReplyKind::Edit(id) => Ok(id),
			ReplyKind::Send | ReplyKind::Notice => Ok(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst))),
		}
	}
}
