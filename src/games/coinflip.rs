use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::games::Round;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinFace {
	Heads,
	Tails,
}

impl fmt::Display for CoinFace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CoinFace::Heads => write!(f, "heads"),
			CoinFace::Tails => write!(f, "tails"),
		}
	}
}

impl FromStr for CoinFace {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"heads" => Ok(CoinFace::Heads),
			"tails" => Ok(CoinFace::Tails),
			_ => Err(format!("unknown coin face '{}'", s)),
		}
	}
}

pub fn flip<R: Rng + ?Sized>(rng: &mut R) -> CoinFace {
	if rng.random_bool(0.5) {
		CoinFace::Heads
	} else {
		CoinFace::Tails
	}
}

pub fn settle(choice: CoinFace, landed: CoinFace, bet: i64) -> Round {
	let payout = if choice == landed { bet * 2 } else { 0 };
	Round {
		payout,
		summary: format!("🪙 The coin shows {}. You called {}.", landed, choice),
	}
}

pub fn play<R: Rng + ?Sized>(rng: &mut R, bet: i64, choice: CoinFace) -> Round {
	settle(choice, flip(rng), bet)
}

pub fn rules(balance: i64, bet: i64) -> String {
	format!(
		"🪙 Coin Flip\n\
		Call heads or tails. A correct call pays ×2.\n\n\
		Balance: {} ducats\nBet: {} ducats",
		balance, bet
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn test_match_pays_double() {
		assert_eq!(settle(CoinFace::Heads, CoinFace::Heads, 40).payout, 80);
		assert_eq!(settle(CoinFace::Heads, CoinFace::Tails, 40).payout, 0);
	}

	#[test]
	fn test_both_faces_come_up() {
		let mut rng = StdRng::seed_from_u64(1);
		let heads = (0..1000).filter(|_| flip(&mut rng) == CoinFace::Heads).count();
		assert!((400..600).contains(&heads), "heads = {}", heads);
	}
}
