use rand::Rng;

use crate::games::Round;

pub type Roll = [u8; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiceOutcome {
	Triple,
	Pair,
	High,
	Twelve,
	Low,
}

pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Roll {
	[
		rng.random_range(1..=6),
		rng.random_range(1..=6),
		rng.random_range(1..=6),
	]
}

/// Triple before pair before the sum thresholds.
pub fn classify(roll: Roll) -> DiceOutcome {
	let [a, b, c] = roll;
	if a == b && b == c {
		return DiceOutcome::Triple;
	}
	if a == b || b == c || a == c {
		return DiceOutcome::Pair;
	}
	let sum: u8 = roll.iter().sum();
	if sum > 12 {
		DiceOutcome::High
	} else if sum == 12 {
		DiceOutcome::Twelve
	} else {
		DiceOutcome::Low
	}
}

pub fn payout(outcome: DiceOutcome, bet: i64) -> i64 {
	match outcome {
		DiceOutcome::Triple => bet.saturating_mul(10),
		DiceOutcome::Pair => bet,
		DiceOutcome::High => bet.saturating_mul(2),
		DiceOutcome::Twelve => bet / 2,
		DiceOutcome::Low => 0,
	}
}

pub fn settle(roll: Roll, bet: i64) -> Round {
	let outcome = classify(roll);
	let label = match outcome {
		DiceOutcome::Triple => "Triple!",
		DiceOutcome::Pair => "A pair, your stake is returned.",
		DiceOutcome::High => "Over twelve!",
		DiceOutcome::Twelve => "Exactly twelve, half back.",
		DiceOutcome::Low => "Under twelve.",
	};
	Round {
		payout: payout(outcome, bet),
		summary: format!("🎲 {} {} {}  {}", roll[0], roll[1], roll[2], label),
	}
}

pub fn play<R: Rng + ?Sized>(rng: &mut R, bet: i64) -> Round {
	settle(roll(rng), bet)
}

pub fn rules(balance: i64, bet: i64) -> String {
	format!(
		"🎲 Dice\n\
		Three dice are rolled.\n\
		• Three of a kind: ×10\n\
		• A pair: stake returned\n\
		• Sum over 12: ×2\n\
		• Sum of exactly 12: ×0.5\n\
		• Anything else loses.\n\n\
		Balance: {} ducats\nBet: {} ducats",
		balance, bet
	)
}
