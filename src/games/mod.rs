pub mod blackjack;
pub mod coinflip;
pub mod dice;
pub mod race;
pub mod roulette;

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bank::Bank;
use crate::error::{CasinoError, InsufficientFunds};
use crate::events::{Action, BetChange, Button, Choice, Controls, UserId};
use crate::games::blackjack::Move;
use crate::games::coinflip::CoinFace;
use crate::games::roulette::RouletteColor;

/// Every game the casino offers. Dispatch is by matching on this, never
/// through a trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameId {
	Dice,
	Roulette,
	#[serde(rename = "coinflip")]
	CoinFlip,
	Blackjack,
	AcademicRace,
}

impl GameId {
	pub const ALL: [GameId; 5] = [
		GameId::Dice,
		GameId::Roulette,
		GameId::CoinFlip,
		GameId::Blackjack,
		GameId::AcademicRace,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			GameId::Dice => "dice",
			GameId::Roulette => "roulette",
			GameId::CoinFlip => "coinflip",
			GameId::Blackjack => "blackjack",
			GameId::AcademicRace => "academic_race",
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			GameId::Dice => "🎲 Dice",
			GameId::Roulette => "🎡 Roulette",
			GameId::CoinFlip => "🪙 Coin Flip",
			GameId::Blackjack => "🃏 Blackjack",
			GameId::AcademicRace => "🧮 Academic Race",
		}
	}

	pub fn requires_bet(self) -> bool {
		self != GameId::AcademicRace
	}
}

impl fmt::Display for GameId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl FromStr for GameId {
	type Err = CasinoError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		GameId::ALL
			.into_iter()
			.find(|g| g.as_str() == s)
			.ok_or_else(|| CasinoError::UnknownAction(format!("unknown game '{}'", s)))
	}
}

/// Result of one single-shot round before it touches the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
	pub payout: i64,
	pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
	pub bet: i64,
	pub payout: i64,
	pub balance: i64,
	pub summary: String,
}

impl Settlement {
	pub fn net(&self) -> i64 {
		self.payout - self.bet
	}

	pub fn report(&self) -> String {
		let net = self.net();
		let verdict = if net > 0 {
			format!("You won {} ducats!", net)
		} else if net == 0 {
			"You broke even.".to_string()
		} else {
			format!("You lost {} ducats.", -net)
		};
		format!("{}\n\n{}\nBalance: {} ducats", self.summary, verdict, self.balance)
	}
}

/// Debits the bet, then draws the outcome and credits any payout.
pub fn play_round(
	bank: &Bank,
	user: UserId,
	bet: i64,
	draw: impl FnOnce() -> Round,
) -> Result<Settlement, InsufficientFunds> {
	let mut balance = bank.debit(user, bet)?;
	let round = draw();
	if round.payout > 0 {
		balance = bank.credit(user, round.payout);
	}
	Ok(Settlement {
		bet,
		payout: round.payout,
		balance,
		summary: round.summary,
	})
}

/// Checks that a play button carries what the game needs, before any money
/// moves.
pub fn validate_choice(game: GameId, choice: Option<Choice>) -> Result<Option<Choice>, CasinoError> {
	let ok = match (game, choice) {
		(GameId::Dice, None) => true,
		(GameId::Roulette, Some(Choice::Color(_))) => true,
		(GameId::CoinFlip, Some(Choice::Face(_))) => true,
		(GameId::Blackjack, None | Some(Choice::Move(_))) => true,
		(GameId::AcademicRace, None) => true,
		_ => false,
	};
	if ok {
		Ok(choice)
	} else {
		let choice = choice.map(|c| c.to_string()).unwrap_or_default();
		Err(CasinoError::UnknownAction(format!("{} {}", game, choice)))
	}
}

/// Resolves a validated dice, roulette or coin flip round.
pub fn resolve_simple<R: Rng + ?Sized>(
	rng: &mut R,
	game: GameId,
	bet: i64,
	choice: Option<Choice>,
) -> Round {
	match (game, choice) {
		(GameId::Roulette, Some(Choice::Color(color))) => roulette::play(rng, bet, color),
		(GameId::CoinFlip, Some(Choice::Face(face))) => coinflip::play(rng, bet, face),
		_ => dice::play(rng, bet),
	}
}

pub fn rules(game: GameId, balance: i64, bet: i64) -> String {
	match game {
		GameId::Dice => dice::rules(balance, bet),
		GameId::Roulette => roulette::rules(balance, bet),
		GameId::CoinFlip => coinflip::rules(balance, bet),
		GameId::Blackjack => blackjack::rules(balance, bet),
		GameId::AcademicRace => format!("{}\n\nBalance: {} ducats", game.name(), balance),
	}
}

pub fn bet_prompt(game: GameId, balance: i64) -> String {
	format!(
		"{}\n\nYour balance: {} ducats.\nSend the amount you want to bet.",
		game.name(),
		balance
	)
}

fn play_row(game: GameId) -> Vec<Button> {
	let play = |label: &str, choice: Option<Choice>| Button::new(label, Action::Play { game, choice });
	match game {
		GameId::Dice => vec![play("🎲 Roll", None)],
		GameId::Roulette => RouletteColor::ALL
			.iter()
			.map(|&c| play(&format!("{} {}", c.emoji(), c), Some(Choice::Color(c))))
			.collect(),
		GameId::CoinFlip => vec![
			play("Heads", Some(Choice::Face(CoinFace::Heads))),
			play("Tails", Some(Choice::Face(CoinFace::Tails))),
		],
		GameId::Blackjack => vec![play("🃏 Deal", Some(Choice::Move(Move::Deal)))],
		GameId::AcademicRace => vec![play("▶ Start race", None)],
	}
}

/// Controls for a game screen. With a committed bet: multipliers, all-in,
/// the play buttons and a fresh-bet option.
pub fn controls(game: GameId, bet: Option<i64>, multipliers: &[i64]) -> Controls {
	let back = vec![Button::new("⬅ Back to games", Action::Games)];

	if !game.requires_bet() {
		return vec![play_row(game), back];
	}
	if bet.is_none() {
		return vec![back];
	}

	let mut modify: Vec<Button> = multipliers
		.iter()
		.map(|&m| {
			Button::new(
				format!("×{}", m),
				Action::ModifyBet {
					game,
					change: BetChange::Multiply(m),
				},
			)
		})
		.collect();
	modify.push(Button::new(
		"All-in",
		Action::ModifyBet {
			game,
			change: BetChange::AllIn,
		},
	));

	vec![
		modify,
		play_row(game),
		vec![
			Button::new("💰 New bet", Action::StartGame { game, fresh: true }),
			Button::new("⬅ Back to games", Action::Games),
		],
	]
}

pub fn replay_controls(game: GameId) -> Controls {
	vec![
		vec![Button::new("🔁 Play again", Action::StartGame { game, fresh: true })],
		vec![Button::new("⬅ Back to games", Action::Games)],
	]
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::BankConfig;

	#[test]
	fn test_game_id_codec() {
		for game in GameId::ALL {
			assert_eq!(game.as_str().parse::<GameId>().unwrap(), game);
		}
		assert!("poker".parse::<GameId>().is_err());
	}

	#[test]
	fn test_play_round_debits_before_draw() {
		let bank = Bank::in_memory(&BankConfig {
			starting_balance: 1000,
			..BankConfig::default()
		});
		let user = UserId(1);

		let settlement = play_round(&bank, user, 200, || {
			assert_eq!(bank.balance(user), 800);
			dice::settle([4, 4, 4], 200)
		})
		.unwrap();

		assert_eq!(settlement.payout, 2000);
		assert_eq!(settlement.net(), 1800);
		assert_eq!(bank.balance(user), 2800);
	}

	#[test]
	fn test_play_round_rejects_over_balance() {
		let bank = Bank::in_memory(&BankConfig {
			starting_balance: 50,
			..BankConfig::default()
		});
		let err = play_round(&bank, UserId(1), 60, || unreachable!()).unwrap_err();
		assert_eq!(err.available, 50);
		assert_eq!(bank.balance(UserId(1)), 50);
	}

	#[test]
	fn test_validate_choice() {
		assert!(validate_choice(GameId::Dice, None).is_ok());
		assert!(validate_choice(GameId::Roulette, None).is_err());
		assert!(validate_choice(GameId::CoinFlip, Some(Choice::Color(RouletteColor::Red))).is_err());
		assert!(validate_choice(GameId::Roulette, Some(Choice::Color(RouletteColor::Green))).is_ok());
	}

	#[test]
	fn test_controls_offer_multipliers_once_bet_placed() {
		let controls = controls(GameId::Dice, Some(10), &[2, 10]);
		let actions: Vec<Action> = controls.iter().flatten().map(|b| b.action).collect();
		assert!(actions.contains(&Action::ModifyBet {
			game: GameId::Dice,
			change: BetChange::Multiply(10),
		}));
		assert!(actions.contains(&Action::Play {
			game: GameId::Dice,
			choice: None,
		}));

		let waiting = super::controls(GameId::Dice, None, &[2, 10]);
		assert_eq!(waiting.len(), 1);
	}
}
