use std::collections::HashMap;
use std::sync::Mutex;

use crate::events::UserId;
use crate::games::GameId;
use crate::games::blackjack::BlackjackHand;
use crate::games::race::RaceRound;
use crate::lock_mutex;

/// Where a user is in a game's multi-step flow. At most one per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
	#[default]
	Idle,
	/// Waiting for the wager amount as text.
	AwaitingBet(GameId),
	BetPlaced(GameId),
	/// No-wager game opened, waiting for an explicit start.
	InGameMenu(GameId),
	/// A race problem is live.
	AwaitingAnswer(GameId),
	/// A wagered hand is mid-round; its data lives under `SessionKey::Blackjack`.
	GameInProgress(GameId),
}

impl Phase {
	pub fn game(&self) -> Option<GameId> {
		match *self {
			Phase::Idle => None,
			Phase::AwaitingBet(game)
			| Phase::BetPlaced(game)
			| Phase::InGameMenu(game)
			| Phase::AwaitingAnswer(game)
			| Phase::GameInProgress(game) => Some(game),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
	Phase,
	CurrentBet,
	Blackjack,
	Race,
}

pub const RACE_KEYS: &[SessionKey] = &[SessionKey::Phase, SessionKey::Race];
pub const BLACKJACK_KEYS: &[SessionKey] = &[SessionKey::Blackjack, SessionKey::CurrentBet];
pub const GAME_KEYS: &[SessionKey] = &[
	SessionKey::Phase,
	SessionKey::CurrentBet,
	SessionKey::Blackjack,
	SessionKey::Race,
];

/// The flat per-user record. Each field is one `SessionKey`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
	pub phase: Phase,
	pub current_bet: Option<i64>,
	pub blackjack: Option<BlackjackHand>,
	pub race: Option<RaceRound>,
}

impl Session {
	pub fn clear(&mut self, keys: &[SessionKey]) {
		for key in keys {
			match key {
				SessionKey::Phase => self.phase = Phase::Idle,
				SessionKey::CurrentBet => self.current_bet = None,
				SessionKey::Blackjack => self.blackjack = None,
				SessionKey::Race => self.race = None,
			}
		}
	}

	pub fn is_empty(&self) -> bool {
		*self == Session::default()
	}
}

pub trait SessionStore: Send + Sync {
	fn get(&self, user: UserId) -> Session;
	fn set(&self, user: UserId, session: Session);
	fn clear_keys(&self, user: UserId, keys: &[SessionKey]);
}

#[derive(Default)]
pub struct MemorySessionStore {
	sessions: Mutex<HashMap<UserId, Session>>,
}

impl MemorySessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn active_users(&self) -> usize {
		lock_mutex(&self.sessions).len()
	}
}

impl SessionStore for MemorySessionStore {
	fn get(&self, user: UserId) -> Session {
		lock_mutex(&self.sessions).get(&user).cloned().unwrap_or_default()
	}

	fn set(&self, user: UserId, session: Session) {
		let mut sessions = lock_mutex(&self.sessions);
		if session.is_empty() {
			sessions.remove(&user);
		} else {
			sessions.insert(user, session);
		}
	}

	fn clear_keys(&self, user: UserId, keys: &[SessionKey]) {
		let mut sessions = lock_mutex(&self.sessions);
		if let Some(session) = sessions.get_mut(&user) {
			session.clear(keys);
			if session.is_empty() {
				sessions.remove(&user);
			}
		}
	}
}
