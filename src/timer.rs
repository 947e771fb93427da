use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::events::UserId;
use crate::{lock_mutex, logging};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// What comes back when a timer fires. `round` lets the receiver tell a
/// current deadline from one that was already superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerPayload {
	pub user: UserId,
	pub round: u64,
}

pub trait Scheduler: Send + Sync {
	fn schedule_once(&self, delay: Duration, key: &str, payload: TimerPayload) -> TimerHandle;
	fn cancel(&self, handle: TimerHandle);
}

/// Runs each timer as a sleeping tokio task and sends the payload into a
/// channel when it fires.
pub struct TokioScheduler {
	runtime: Handle,
	sender: mpsc::UnboundedSender<TimerPayload>,
	pending: Arc<Mutex<HashMap<TimerHandle, AbortHandle>>>,
	next: AtomicU64,
}

impl TokioScheduler {
	pub fn new(runtime: Handle) -> (Self, mpsc::UnboundedReceiver<TimerPayload>) {
		let (sender, receiver) = mpsc::unbounded_channel();
		let scheduler = Self {
			runtime,
			sender,
			pending: Arc::new(Mutex::new(HashMap::new())),
			next: AtomicU64::new(1),
		};
		(scheduler, receiver)
	}

	pub fn pending(&self) -> usize {
		lock_mutex(&self.pending).len()
	}
}

impl Scheduler for TokioScheduler {
	fn schedule_once(&self, delay: Duration, key: &str, payload: TimerPayload) -> TimerHandle {
		let handle = TimerHandle(self.next.fetch_add(1, Ordering::SeqCst));
		let sender = self.sender.clone();
		let pending = Arc::clone(&self.pending);

		// Held across spawn so the task cannot remove its entry before it exists.
		let mut guard = lock_mutex(&self.pending);
		let task = self.runtime.spawn(async move {
			tokio::time::sleep(delay).await;
			lock_mutex(&pending).remove(&handle);
			let _ = sender.send(payload);
		});
		guard.insert(handle, task.abort_handle());

		logging::log("Timer", "SCHEDULE", &format!("{} #{} in {:?}", key, payload.round, delay));
		handle
	}

	fn cancel(&self, handle: TimerHandle) {
		if let Some(task) = lock_mutex(&self.pending).remove(&handle) {
			task.abort();
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTimer {
	pub handle: TimerHandle,
	pub delay: Duration,
	pub key: String,
	pub payload: TimerPayload,
}

/// Scheduler that never fires on its own; tests pop timers and feed the
/// payloads back in by hand.
#[derive(Default)]
pub struct ManualScheduler {
	next: AtomicU64,
	pending: Mutex<Vec<ScheduledTimer>>,
	cancelled: Mutex<Vec<TimerHandle>>,
}

impl ManualScheduler {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn pending(&self) -> Vec<ScheduledTimer> {
		lock_mutex(&self.pending).clone()
	}

	/// Removes and returns the oldest pending timer.
	pub fn fire_next(&self) -> Option<TimerPayload> {
		let mut pending = lock_mutex(&self.pending);
		if pending.is_empty() {
			None
		} else {
			Some(pending.remove(0).payload)
		}
	}

	pub fn cancelled(&self) -> Vec<TimerHandle> {
		lock_mutex(&self.cancelled).clone()
	}
}

impl Scheduler for ManualScheduler {
	fn schedule_once(&self, delay: Duration, key: &str, payload: TimerPayload) -> TimerHandle {
		let handle = TimerHandle(self.next.fetch_add(1, Ordering::SeqCst));
		lock_mutex(&self.pending).push(ScheduledTimer {
			handle,
			delay,
			key: key.to_string(),
			payload,
		});
		handle
	}

	fn cancel(&self, handle: TimerHandle) {
		let mut pending = lock_mutex(&self.pending);
		let before = pending.len();
		pending.retain(|t| t.handle != handle);
		if pending.len() != before {
			lock_mutex(&self.cancelled).push(handle);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn payload(round: u64) -> TimerPayload {
		TimerPayload {
			user: UserId(1),
			round,
		}
	}

	#[test]
	fn test_manual_cancel_removes_pending() {
		let scheduler = ManualScheduler::new();
		let first = scheduler.schedule_once(Duration::from_secs(10), "race:1", payload(1));
		scheduler.schedule_once(Duration::from_secs(10), "race:1", payload(2));

		scheduler.cancel(first);
		assert_eq!(scheduler.cancelled(), vec![first]);
		assert_eq!(scheduler.fire_next(), Some(payload(2)));
		assert_eq!(scheduler.fire_next(), None);
	}

	#[test]
	fn test_manual_cancel_after_fire_is_noop() {
		let scheduler = ManualScheduler::new();
		let handle = scheduler.schedule_once(Duration::ZERO, "race:1", payload(1));
		scheduler.fire_next();
		scheduler.cancel(handle);
		assert!(scheduler.cancelled().is_empty());
	}

	#[tokio::test]
	async fn test_tokio_scheduler_fires_and_cancels() {
		let (scheduler, mut fired) = TokioScheduler::new(Handle::current());

		let cancelled = scheduler.schedule_once(Duration::from_millis(20), "race:1", payload(1));
		scheduler.schedule_once(Duration::from_millis(40), "race:1", payload(2));
		scheduler.cancel(cancelled);

		let received = tokio::time::timeout(Duration::from_secs(2), fired.recv())
			.await
			.expect("timer should fire");
		assert_eq!(received, Some(payload(2)));
		assert_eq!(scheduler.pending(), 0);
	}
}
