use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::bank::Bank;
use crate::clock::Clock;
use crate::config::CasinoConfig;
use crate::error::CasinoError;
use crate::events::{Action, Choice, Envelope, Inbound, MessageId, Reply, UserId};
use crate::games::blackjack::Move;
use crate::games::{self, GameId};
use crate::session::{GAME_KEYS, Phase, Session, SessionKey, SessionStore};
use crate::timer::Scheduler;
use crate::{lock_mutex, logging, menu};

/// The casino core. Routes each inbound action by the user's session phase
/// into wager negotiation or the active game.
pub struct Casino {
	pub(super) config: CasinoConfig,
	pub(super) bank: Arc<Bank>,
	pub(super) sessions: Arc<dyn SessionStore>,
	pub(super) scheduler: Arc<dyn Scheduler>,
	pub(super) clock: Arc<dyn Clock>,
	rng: Mutex<StdRng>,
	pub(super) rounds: AtomicU64,
}

impl Casino {
	pub fn new(
		config: CasinoConfig,
		bank: Arc<Bank>,
		sessions: Arc<dyn SessionStore>,
		scheduler: Arc<dyn Scheduler>,
		clock: Arc<dyn Clock>,
	) -> Self {
		let rng = match config.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_os_rng(),
		};

		Self {
			config,
			bank,
			sessions,
			scheduler,
			clock,
			rng: Mutex::new(rng),
			rounds: AtomicU64::new(1),
		}
	}

	pub fn config(&self) -> &CasinoConfig {
		&self.config
	}

	pub fn bank(&self) -> &Arc<Bank> {
		&self.bank
	}

	pub fn session(&self, user: UserId) -> Session {
		self.sessions.get(user)
	}

	/// Processes one inbound and returns what to show the user. Errors never
	/// escape: they become a notice for button presses and a message for
	/// text.
	pub fn handle(&self, envelope: Envelope) -> Vec<Reply> {
		let Envelope {
			user,
			message,
			inbound,
		} = envelope;
		logging::set_user(user);

		let (result, pressed) = match inbound {
			Inbound::Text(text) => {
				self.bank.touch(user, self.clock.now());
				(self.route_text(user, &text), false)
			}
			Inbound::Button(action) => {
				self.bank.touch(user, self.clock.now());
				(self.route_action(user, message, action), true)
			}
			Inbound::Timer(payload) => (self.race_timeout(payload), false),
		};

		match result {
			Ok(replies) => replies,
			Err(err) => {
				let text = describe_error(&err);
				if pressed {
					vec![Reply::notice(text)]
				} else {
					vec![Reply::send(text, Vec::new())]
				}
			}
		}
	}

	/// Binds a freshly delivered message to the live race round, so a
	/// timeout can edit the problem it expired on.
	pub fn record_delivery(&self, user: UserId, message: MessageId) {
		let mut session = self.sessions.get(user);
		if let Some(round) = session.race.as_mut() {
			if round.message.is_none() {
				round.message = Some(message);
				self.sessions.set(user, session);
			}
		}
	}

	pub(super) fn save(&self, user: UserId, before: Phase, session: Session) {
		logging::session::phase(&before, &session.phase);
		self.sessions.set(user, session);
	}

	pub(super) fn clear(&self, user: UserId, from: Phase, keys: &[SessionKey]) {
		if keys.contains(&SessionKey::Phase) {
			logging::session::phase(&from, &Phase::Idle);
		}
		logging::session::cleared(keys);
		self.sessions.clear_keys(user, keys);
	}

	pub(super) fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
		let mut rng = lock_mutex(&self.rng);
		f(&mut rng)
	}

	/// Drops whatever game the user was in. A live race timer is cancelled
	/// and an unfinished blackjack hand forfeits its stake.
	pub(super) fn leave_game(&self, user: UserId) {
		let session = self.sessions.get(user);
		if session.is_empty() {
			return;
		}

		if let Some(round) = &session.race {
			if let Some(timer) = round.timer {
				self.scheduler.cancel(timer);
			}
			logging::race::stopped("left the race");
		}
		if let Some(hand) = &session.blackjack {
			if hand.outcome_if_settled().is_none() {
				logging::blackjack::abandoned(hand.stake());
			}
		}
		self.clear(user, session.phase, GAME_KEYS);
	}

	fn route_text(&self, user: UserId, text: &str) -> Result<Vec<Reply>, CasinoError> {
		let session = self.sessions.get(user);
		match session.phase {
			Phase::AwaitingBet(game) | Phase::BetPlaced(game) => self.place_bet(user, game, text),
			Phase::AwaitingAnswer(_) => self.race_answer(user, text),
			Phase::GameInProgress(_) => {
				let controls = session
					.blackjack
					.as_ref()
					.map(super::blackjack::move_controls)
					.unwrap_or_default();
				Ok(vec![Reply::send("Finish the current hand with the buttons first.", controls)])
			}
			Phase::Idle | Phase::InGameMenu(_) => {
				self.clear(user, session.phase, &[SessionKey::Phase, SessionKey::CurrentBet]);
				let (_, controls) = menu::main_menu(self.bank.balance(user));
				Ok(vec![Reply::send(
					"Sorry, I did not understand that. Pick something from the menu.",
					controls,
				)])
			}
		}
	}

	fn route_action(
		&self,
		user: UserId,
		message: Option<MessageId>,
		action: Action,
	) -> Result<Vec<Reply>, CasinoError> {
		let now = self.clock.now();
		match action {
			Action::Main => {
				self.leave_game(user);
				let (text, controls) = menu::main_menu(self.bank.balance(user));
				Ok(vec![Reply::show(message, text, controls)])
			}
			Action::Games => {
				self.leave_game(user);
				self.bank.apply_auto_bankruptcy(user);
				let (text, controls) = menu::games_menu(self.bank.balance(user));
				Ok(vec![Reply::show(message, text, controls)])
			}
			Action::Settings => {
				let (text, controls) = menu::settings_menu(self.bank.get(user).auto_bankruptcy);
				Ok(vec![Reply::show(message, text, controls)])
			}
			Action::News => {
				let (text, controls) = menu::news_menu(self.bank.get(user).faction);
				Ok(vec![Reply::show(message, text, controls)])
			}
			Action::StartGame { game, fresh } => self.start_game(user, message, game, fresh),
			Action::ModifyBet { game, change } => self.modify_bet(user, message, game, change),
			Action::Play { game, choice } => {
				let choice = games::validate_choice(game, choice)?;
				match game {
					GameId::Blackjack => {
						let mv = match choice {
							Some(Choice::Move(mv)) => mv,
							_ => Move::Deal,
						};
						self.blackjack_move(user, message, mv)
					}
					GameId::AcademicRace => self.start_race(user),
					GameId::Dice | GameId::Roulette | GameId::CoinFlip => {
						self.play_simple(user, message, game, choice)
					}
				}
			}
			Action::Work => match self.bank.try_work(user, now) {
				Ok(balance) => Ok(vec![Reply::notice(format!(
					"💼 You earned {} ducats. Balance: {}",
					self.config.bank.work_bonus, balance
				))]),
				Err(wait) => Ok(vec![Reply::notice(format!(
					"You are tired. Come back in {}.",
					menu::wait_text(wait)
				))]),
			},
			Action::Bankruptcy => {
				if self.bank.reset_to_floor(user) {
					let (text, controls) = menu::games_menu(self.bank.balance(user));
					Ok(vec![
						Reply::notice(format!("🆘 Your balance was reset to {} ducats.", self.bank.floor())),
						Reply::show(message, text, controls),
					])
				} else {
					Ok(vec![Reply::notice(format!(
						"Bankruptcy is only for balances below {} ducats.",
						self.bank.floor()
					))])
				}
			}
			Action::ToggleAutoBankruptcy => {
				let enabled = self.bank.toggle_auto_bankruptcy(user);
				let (text, controls) = menu::settings_menu(enabled);
				Ok(vec![Reply::show(message, text, controls)])
			}
			Action::Subscribe(faction) => {
				self.bank.set_faction(user, faction);
				let (text, controls) = menu::news_menu(Some(faction));
				Ok(vec![
					Reply::notice(format!("You now follow the {} faction.", faction)),
					Reply::show(message, text, controls),
				])
			}
			Action::Stats => match self.bank.try_stats(user, now) {
				Ok(()) => Ok(vec![Reply::send(menu::stats_report(&self.bank.summary()), Vec::new())]),
				Err(wait) => Ok(vec![Reply::notice(format!(
					"Statistics refresh in {}.",
					menu::wait_text(wait)
				))]),
			},
			Action::Noop => Ok(Vec::new()),
		}
	}
}

fn describe_error(err: &CasinoError) -> String {
	match err {
		CasinoError::InsufficientFunds(funds) => format!(
			"Not enough ducats: that needs {}, you have {}.",
			funds.required, funds.available
		),
		other => other.to_string(),
	}
}
