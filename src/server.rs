use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::Casino;
use crate::events::{Envelope, ReplyKind};
use crate::logging;
use crate::timer::TimerPayload;
use crate::transport::Transport;

/// Feeds inbound messages and timer firings to the casino one at a time and
/// delivers the replies. Flushes the ledger on a timer and at shutdown.
pub struct CasinoServer<T: Transport> {
	casino: Arc<Casino>,
	transport: Arc<T>,
}

impl<T: Transport> CasinoServer<T> {
	pub fn new(casino: Arc<Casino>, transport: Arc<T>) -> Self {
		Self { casino, transport }
	}

	pub fn casino(&self) -> &Arc<Casino> {
		&self.casino
	}

	/// Handles one envelope. A failed delivery is logged; whatever the
	/// ledger already recorded stands.
	pub async fn process(&self, envelope: Envelope) {
		let user = envelope.user;
		for reply in self.casino.handle(envelope) {
			match self.transport.deliver(user, &reply).await {
				Ok(id) => {
					if reply.kind == ReplyKind::Send {
						self.casino.record_delivery(user, id);
					}
				}
				Err(e) => logging::transport::failed(&e),
			}
		}
	}

	pub fn flush(&self) {
		// Failures are logged by the bank and retried on the next tick.
		let _ = self.casino.bank().flush();
	}

	/// Runs until the inbound channel closes.
	pub async fn run(
		&self,
		mut inbound: mpsc::Receiver<Envelope>,
		mut timers: mpsc::UnboundedReceiver<TimerPayload>,
	) {
		let mut autosave = tokio::time::interval(self.casino.config().bank.autosave_interval());
		autosave.tick().await;

		loop {
			tokio::select! {
				envelope = inbound.recv() => match envelope {
					Some(envelope) => self.process(envelope).await,
					None => break,
				},
				Some(payload) = timers.recv() => self.process(Envelope::timer(payload)).await,
				_ = autosave.tick() => self.flush(),
			}
		}

		self.flush();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bank::{Bank, MemoryStore};
	use crate::clock::ManualClock;
	use crate::config::CasinoConfig;
	use crate::events::{Action, UserId};
	use crate::session::MemorySessionStore;
	use crate::timer::ManualScheduler;
	use crate::transport::RecordingTransport;

	fn server(store: Arc<MemoryStore>) -> CasinoServer<RecordingTransport> {
		let config = CasinoConfig {
			seed: Some(1),
			..CasinoConfig::default()
		};
		let bank = Arc::new(Bank::load(store, &config.bank).unwrap());
		let casino = Casino::new(
			config,
			bank,
			Arc::new(MemorySessionStore::new()),
			Arc::new(ManualScheduler::new()),
			Arc::new(ManualClock::default()),
		);
		CasinoServer::new(Arc::new(casino), Arc::new(RecordingTransport::new()))
	}

	#[tokio::test]
	async fn test_run_processes_and_flushes_on_shutdown() {
		let store = Arc::new(MemoryStore::default());
		let server = server(store.clone());
		let (tx, rx) = mpsc::channel(8);
		let (_timer_tx, timer_rx) = mpsc::unbounded_channel();

		tx.send(Envelope::button(UserId(7), None, Action::Work)).await.unwrap();
		drop(tx);
		server.run(rx, timer_rx).await;

		assert_eq!(server.transport.replies_to(UserId(7)).len(), 1);
		assert_eq!(store.saved()[&UserId(7)].balance, 15_000);
	}

	#[tokio::test]
	async fn test_delivery_failure_keeps_balance_change() {
		let store = Arc::new(MemoryStore::default());
		let server = server(store);
		server.transport.set_failing(true);

		server.process(Envelope::button(UserId(3), None, Action::Work)).await;
		assert!(server.transport.delivered().is_empty());
		assert_eq!(server.casino().bank().balance(UserId(3)), 15_000);
	}
}
