use crate::error::CasinoError;
use crate::events::{Action, Button, Choice, Controls, MessageId, Reply, UserId};
use crate::games::blackjack::{self, BlackjackHand, Move, Stage};
use crate::games::{self, GameId};
use crate::logging;
use crate::session::{Phase, Session, SessionKey};

use super::Casino;

pub(super) fn move_controls(hand: &BlackjackHand) -> Controls {
	let button = |label: &str, mv: Move| {
		Button::new(
			label,
			Action::Play {
				game: GameId::Blackjack,
				choice: Some(Choice::Move(mv)),
			},
		)
	};
	let mut row = vec![button("Hit", Move::Hit), button("Stand", Move::Stand)];
	if hand.can_double() {
		row.push(button("Double", Move::Double));
	}
	vec![row]
}

fn table(hand: &BlackjackHand, reveal: bool) -> String {
	let dealer = if reveal {
		format!("{} ({})", hand.dealer(), hand.dealer().value())
	} else {
		let up = hand.dealer().cards().first().map(|c| c.to_string()).unwrap_or_default();
		format!("{} ??", up)
	};
	format!(
		"🃏 Blackjack, stake {} ducats\n\nDealer: {}\nYou: {} ({})",
		hand.stake(),
		dealer,
		hand.player(),
		hand.player().value()
	)
}

impl Casino {
	pub(super) fn blackjack_move(
		&self,
		user: UserId,
		message: Option<MessageId>,
		mv: Move,
	) -> Result<Vec<Reply>, CasinoError> {
		match mv {
			Move::Deal => self.deal_blackjack(user, message),
			Move::Hit | Move::Stand | Move::Double => self.continue_blackjack(user, message, mv),
		}
	}

	/// Re-checks the committed bet against the balance, debits it and deals.
	fn deal_blackjack(&self, user: UserId, message: Option<MessageId>) -> Result<Vec<Reply>, CasinoError> {
		let session = self.sessions.get(user);
		let bet = self.committed_bet(&session, GameId::Blackjack)?;

		let balance_after_bet = match self.bank.debit(user, bet) {
			Ok(balance) => balance,
			Err(funds) => {
				return Ok(vec![self.discard_bet(
					user,
					message,
					GameId::Blackjack,
					session,
					funds.available,
				)]);
			}
		};

		let deck = self.with_rng(|rng| blackjack::shuffled_deck(rng));
		let hand = BlackjackHand::deal(deck, bet, balance_after_bet);
		logging::blackjack::dealt(&hand.player().to_string(), &hand.dealer().to_string(), bet);

		self.after_move(user, message, session, hand)
	}

	fn continue_blackjack(
		&self,
		user: UserId,
		message: Option<MessageId>,
		mv: Move,
	) -> Result<Vec<Reply>, CasinoError> {
		let session = self.sessions.get(user);
		let mut hand = match (session.phase, &session.blackjack) {
			(Phase::GameInProgress(GameId::Blackjack), Some(hand)) => hand.clone(),
			_ => return Err(CasinoError::StaleState("There is no hand in progress.")),
		};

		match mv {
			Move::Hit => {
				hand.hit()?;
			}
			Move::Stand => {
				hand.stand()?;
			}
			Move::Double => {
				if !hand.can_double() {
					return Err(CasinoError::StaleState(
						"Double down is only possible before your first hit.",
					));
				}
				self.bank.debit(user, hand.bet())?;
				if let Err(err) = hand.double() {
					self.bank.credit(user, hand.bet());
					return Err(err);
				}
			}
			Move::Deal => return Err(CasinoError::StaleState("Finish the current hand first.")),
		}
		logging::blackjack::action(&mv.to_string(), &hand.player().to_string());

		if hand.stage() == Stage::DealerTurn {
			hand.play_dealer()?;
		}
		self.after_move(user, message, session, hand)
	}

	/// Stores a hand still in play, or pays out a settled one and returns the
	/// user to idle.
	fn after_move(
		&self,
		user: UserId,
		message: Option<MessageId>,
		mut session: Session,
		hand: BlackjackHand,
	) -> Result<Vec<Reply>, CasinoError> {
		let before = session.phase;

		let Some(outcome) = hand.outcome_if_settled() else {
			let text = table(&hand, false);
			let controls = move_controls(&hand);
			session.phase = Phase::GameInProgress(GameId::Blackjack);
			session.blackjack = Some(hand);
			self.save(user, before, session);
			return Ok(vec![Reply::show(message, text, controls)]);
		};

		let stake = hand.stake();
		let payout = outcome.payout(stake);
		let balance = if payout > 0 {
			self.bank.credit(user, payout)
		} else {
			self.bank.balance(user)
		};
		logging::blackjack::settled(&format!("{:?}", outcome), stake, payout);
		self.clear(
			user,
			before,
			&[SessionKey::Phase, SessionKey::Blackjack, SessionKey::CurrentBet],
		);

		let net = payout - stake;
		let result = if net > 0 {
			format!("+{} ducats", net)
		} else {
			format!("{} ducats", net)
		};
		Ok(vec![Reply::show(
			message,
			format!(
				"{}\n\n{} {}\nBalance: {} ducats",
				table(&hand, true),
				outcome.describe(),
				result,
				balance
			),
			games::replay_controls(GameId::Blackjack),
		)])
	}
}
