use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::games::Round;

/// Red pockets on a European wheel; every other non-zero pocket is black.
const RED_NUMBERS: [u8; 18] = [1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouletteColor {
	Red,
	Black,
	Green,
}

impl RouletteColor {
	pub const ALL: [RouletteColor; 3] = [RouletteColor::Red, RouletteColor::Black, RouletteColor::Green];

	fn as_str(self) -> &'static str {
		match self {
			RouletteColor::Red => "red",
			RouletteColor::Black => "black",
			RouletteColor::Green => "green",
		}
	}

	pub fn emoji(self) -> &'static str {
		match self {
			RouletteColor::Red => "🔴",
			RouletteColor::Black => "⚫",
			RouletteColor::Green => "🟢",
		}
	}
}

impl fmt::Display for RouletteColor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl FromStr for RouletteColor {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		RouletteColor::ALL
			.into_iter()
			.find(|c| c.as_str() == s)
			.ok_or_else(|| format!("unknown color '{}'", s))
	}
}

pub fn spin<R: Rng + ?Sized>(rng: &mut R) -> u8 {
	rng.random_range(0..=36)
}

pub fn color_of(pocket: u8) -> RouletteColor {
	if pocket == 0 {
		RouletteColor::Green
	} else if RED_NUMBERS.contains(&pocket) {
		RouletteColor::Red
	} else {
		RouletteColor::Black
	}
}

pub fn payout(choice: RouletteColor, pocket: u8, bet: i64) -> i64 {
	let landed = color_of(pocket);
	match (choice == landed, landed) {
		(true, RouletteColor::Green) => bet.saturating_mul(36),
		(true, _) => bet.saturating_mul(2),
		(false, _) => 0,
	}
}

pub fn settle(choice: RouletteColor, pocket: u8, bet: i64) -> Round {
	let landed = color_of(pocket);
	Round {
		payout: payout(choice, pocket, bet),
		summary: format!(
			"The ball lands on {} {}. You picked {} {}.",
			landed.emoji(),
			pocket,
			choice.emoji(),
			choice
		),
	}
}

pub fn play<R: Rng + ?Sized>(rng: &mut R, bet: i64, choice: RouletteColor) -> Round {
	settle(choice, spin(rng), bet)
}

pub fn rules(balance: i64, bet: i64) -> String {
	format!(
		"🎡 Roulette\n\
		Pick a color before the spin.\n\
		• Red or black: ×2\n\
		• Green (zero): ×36\n\n\
		Balance: {} ducats\nBet: {} ducats",
		balance, bet
	)
}
