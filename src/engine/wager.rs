use crate::error::{CasinoError, InsufficientFunds};
use crate::events::{BetChange, Choice, Controls, MessageId, Reply, UserId};
use crate::games::{self, GameId, race};
use crate::logging;
use crate::session::{Phase, Session, SessionKey};

use super::Casino;

/// Keeps only the digits, so "1 000 ducats" is a bet of 1000.
fn parse_bet(text: &str) -> Result<i64, CasinoError> {
	let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
	if digits.is_empty() {
		return Err(CasinoError::InputFormat(text.to_string()));
	}
	// Too long for i64 is more than any balance.
	Ok(digits.parse().unwrap_or(i64::MAX))
}

impl Casino {
	pub(super) fn bet_controls(&self, game: GameId, bet: Option<i64>) -> Controls {
		games::controls(game, bet, &self.config.wager.multipliers)
	}

	/// Opens a game screen. Wagered games wait for a bet; the race waits for
	/// an explicit start. Without `fresh`, reopening the same game keeps a
	/// bet that still fits the balance.
	pub(super) fn start_game(
		&self,
		user: UserId,
		message: Option<MessageId>,
		game: GameId,
		fresh: bool,
	) -> Result<Vec<Reply>, CasinoError> {
		let balance = self.bank.balance(user);
		let current = self.sessions.get(user);

		if !fresh && current.phase == Phase::BetPlaced(game) {
			if let Some(bet) = current.current_bet.filter(|&b| b > 0 && b <= balance) {
				return Ok(vec![Reply::show(
					message,
					games::rules(game, balance, bet),
					self.bet_controls(game, Some(bet)),
				)]);
			}
		}

		self.leave_game(user);

		let mut session = Session::default();
		let text = if game.requires_bet() {
			session.phase = Phase::AwaitingBet(game);
			games::bet_prompt(game, balance)
		} else {
			session.phase = Phase::InGameMenu(game);
			let rules = &self.config.race;
			race::rules(rules.time_limit_secs, rules.base_reward, rules.max_timeouts)
		};
		self.save(user, Phase::Idle, session);

		Ok(vec![Reply::show(message, text, self.bet_controls(game, None))])
	}

	/// Commits a typed bet. Bad input leaves the session untouched.
	pub(super) fn place_bet(&self, user: UserId, game: GameId, text: &str) -> Result<Vec<Reply>, CasinoError> {
		let amount = parse_bet(text)?;
		let balance = self.bank.balance(user);
		if amount <= 0 || amount > balance {
			return Err(CasinoError::BetOutOfRange { balance });
		}

		let mut session = self.sessions.get(user);
		let before = session.phase;
		session.phase = Phase::BetPlaced(game);
		session.current_bet = Some(amount);
		self.save(user, before, session);
		logging::wager::committed(game, amount);

		Ok(vec![Reply::send(
			games::rules(game, balance, amount),
			self.bet_controls(game, Some(amount)),
		)])
	}

	/// Multiplies the bet or goes all-in. A result over the balance is
	/// rejected and the previous bet stays.
	pub(super) fn modify_bet(
		&self,
		user: UserId,
		message: Option<MessageId>,
		game: GameId,
		change: BetChange,
	) -> Result<Vec<Reply>, CasinoError> {
		let mut session = self.sessions.get(user);
		match session.phase {
			Phase::AwaitingBet(g) | Phase::BetPlaced(g) if g == game => {}
			_ => return Err(CasinoError::StaleState("This game is no longer open.")),
		}
		let current = session.current_bet.ok_or(CasinoError::NoBet)?;
		let balance = self.bank.balance(user);

		let proposed = match change {
			BetChange::Multiply(factor) => current.checked_mul(factor).unwrap_or(i64::MAX),
			BetChange::AllIn => balance,
		};
		if proposed <= 0 {
			return Err(CasinoError::BetOutOfRange { balance });
		}
		if proposed > balance {
			return Err(InsufficientFunds {
				user,
				required: proposed,
				available: balance,
			}
			.into());
		}

		let before = session.phase;
		session.phase = Phase::BetPlaced(game);
		session.current_bet = Some(proposed);
		self.save(user, before, session);
		logging::wager::modified(game, current, proposed);

		Ok(vec![Reply::show(
			message,
			games::rules(game, balance, proposed),
			self.bet_controls(game, Some(proposed)),
		)])
	}

	/// The bet this game may play with right now.
	pub(super) fn committed_bet(&self, session: &Session, game: GameId) -> Result<i64, CasinoError> {
		match session.phase {
			Phase::BetPlaced(g) if g == game => session.current_bet.ok_or(CasinoError::NoBet),
			Phase::AwaitingBet(g) if g == game => Err(CasinoError::NoBet),
			_ => Err(CasinoError::StaleState(
				"This round is over. Start a new one from the games menu.",
			)),
		}
	}

	/// The balance no longer covers the committed bet: drop it and ask for a
	/// new one. Never clamps.
	pub(super) fn discard_bet(
		&self,
		user: UserId,
		message: Option<MessageId>,
		game: GameId,
		mut session: Session,
		balance: i64,
	) -> Reply {
		let bet = session.current_bet.take().unwrap_or_default();
		let before = session.phase;
		session.phase = Phase::AwaitingBet(game);
		self.save(user, before, session);
		logging::wager::discarded(game, bet, balance);

		Reply::show(
			message,
			format!(
				"Your balance changed and no longer covers the {} ducat bet, so it was cancelled.\n\n{}",
				bet,
				games::bet_prompt(game, balance)
			),
			self.bet_controls(game, None),
		)
	}

	/// Dice, roulette and coin flip: debit, draw, credit, back to idle.
	pub(super) fn play_simple(
		&self,
		user: UserId,
		message: Option<MessageId>,
		game: GameId,
		choice: Option<Choice>,
	) -> Result<Vec<Reply>, CasinoError> {
		let session = self.sessions.get(user);
		let bet = self.committed_bet(&session, game)?;

		let played = games::play_round(&self.bank, user, bet, || {
			self.with_rng(|rng| games::resolve_simple(rng, game, bet, choice))
		});

		match played {
			Ok(settlement) => {
				logging::round::settled(game, bet, settlement.payout, &settlement.summary);
				self.clear(user, session.phase, &[SessionKey::Phase, SessionKey::CurrentBet]);
				Ok(vec![Reply::show(
					message,
					settlement.report(),
					games::replay_controls(game),
				)])
			}
			Err(funds) => Ok(vec![self.discard_bet(user, message, game, session, funds.available)]),
		}
	}
}
