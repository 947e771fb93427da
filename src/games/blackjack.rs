//! Single-deck blackjack against the house.
//!
//! House rules: dealer hits soft 17, one double down before the first hit,
//! no splits, no insurance, natural pays 3:2.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::CasinoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suit {
	Spades,
	Hearts,
	Diamonds,
	Clubs,
}

impl Suit {
	pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

	fn symbol(self) -> char {
		match self {
			Suit::Spades => '♠',
			Suit::Hearts => '♥',
			Suit::Diamonds => '♦',
			Suit::Clubs => '♣',
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
	Two,
	Three,
	Four,
	Five,
	Six,
	Seven,
	Eight,
	Nine,
	Ten,
	Jack,
	Queen,
	King,
	Ace,
}

impl Rank {
	pub const ALL: [Rank; 13] = [
		Rank::Two,
		Rank::Three,
		Rank::Four,
		Rank::Five,
		Rank::Six,
		Rank::Seven,
		Rank::Eight,
		Rank::Nine,
		Rank::Ten,
		Rank::Jack,
		Rank::Queen,
		Rank::King,
		Rank::Ace,
	];

	/// Face cards count 10, an ace counts 11 until reduced.
	pub fn value(self) -> u32 {
		match self {
			Rank::Two => 2,
			Rank::Three => 3,
			Rank::Four => 4,
			Rank::Five => 5,
			Rank::Six => 6,
			Rank::Seven => 7,
			Rank::Eight => 8,
			Rank::Nine => 9,
			Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
			Rank::Ace => 11,
		}
	}

	fn label(self) -> &'static str {
		match self {
			Rank::Two => "2",
			Rank::Three => "3",
			Rank::Four => "4",
			Rank::Five => "5",
			Rank::Six => "6",
			Rank::Seven => "7",
			Rank::Eight => "8",
			Rank::Nine => "9",
			Rank::Ten => "10",
			Rank::Jack => "J",
			Rank::Queen => "Q",
			Rank::King => "K",
			Rank::Ace => "A",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
	pub rank: Rank,
	pub suit: Suit,
}

impl Card {
	pub fn new(rank: Rank, suit: Suit) -> Self {
		Self { rank, suit }
	}
}

impl fmt::Display for Card {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{}", self.rank.label(), self.suit.symbol())
	}
}

pub fn new_deck() -> Vec<Card> {
	Suit::ALL
		.iter()
		.flat_map(|&suit| Rank::ALL.iter().map(move |&rank| Card::new(rank, suit)))
		.collect()
}

pub fn shuffled_deck<R: Rng + ?Sized>(rng: &mut R) -> Vec<Card> {
	let mut deck = new_deck();
	deck.shuffle(rng);
	deck
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hand {
	cards: Vec<Card>,
}

impl Hand {
	pub fn new(cards: Vec<Card>) -> Self {
		Self { cards }
	}

	pub fn cards(&self) -> &[Card] {
		&self.cards
	}

	pub fn len(&self) -> usize {
		self.cards.len()
	}

	pub fn is_empty(&self) -> bool {
		self.cards.is_empty()
	}

	fn push(&mut self, card: Card) {
		self.cards.push(card);
	}

	/// Total after reducing aces, and how many aces still count as 11.
	fn totals(&self) -> (u32, u32) {
		let mut value: u32 = self.cards.iter().map(|c| c.rank.value()).sum();
		let mut high_aces = self.cards.iter().filter(|c| c.rank == Rank::Ace).count() as u32;
		while value > 21 && high_aces > 0 {
			value -= 10;
			high_aces -= 1;
		}
		(value, high_aces)
	}

	pub fn value(&self) -> u32 {
		self.totals().0
	}

	pub fn is_soft(&self) -> bool {
		self.totals().1 > 0
	}

	pub fn is_bust(&self) -> bool {
		self.value() > 21
	}

	/// 21 with exactly two cards. Doubling is checked by the hand's owner.
	pub fn is_natural(&self) -> bool {
		self.cards.len() == 2 && self.value() == 21
	}
}

impl fmt::Display for Hand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let cards: Vec<String> = self.cards.iter().map(|c| c.to_string()).collect();
		write!(f, "{}", cards.join(" "))
	}
}

/// Dealer draws below 17 and on soft 17.
pub fn dealer_should_hit(hand: &Hand) -> bool {
	let value = hand.value();
	value < 17 || (value == 17 && hand.is_soft())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
	/// Deal a new hand from the committed bet.
	Deal,
	Hit,
	Stand,
	Double,
}

impl fmt::Display for Move {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Move::Deal => "start",
			Move::Hit => "hit",
			Move::Stand => "stand",
			Move::Double => "double",
		};
		write!(f, "{}", s)
	}
}

impl FromStr for Move {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"start" => Ok(Move::Deal),
			"hit" => Ok(Move::Hit),
			"stand" => Ok(Move::Stand),
			"double" => Ok(Move::Double),
			_ => Err(format!("unknown move '{}'", s)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	PlayerBust,
	Blackjack,
	DealerBust,
	DealerBlackjack,
	PlayerHigher,
	DealerHigher,
	Push,
}

impl Outcome {
	/// Amount credited back; the stake was already debited.
	pub fn payout(self, stake: i64) -> i64 {
		match self {
			Outcome::PlayerBust | Outcome::DealerBlackjack | Outcome::DealerHigher => 0,
			Outcome::Blackjack => i64::try_from(i128::from(stake) * 5 / 2).unwrap_or(i64::MAX),
			Outcome::DealerBust | Outcome::PlayerHigher => stake.saturating_mul(2),
			Outcome::Push => stake,
		}
	}

	pub fn describe(self) -> &'static str {
		match self {
			Outcome::PlayerBust => "Bust! You lose.",
			Outcome::Blackjack => "Blackjack! Pays 3:2.",
			Outcome::DealerBust => "Dealer busts, you win!",
			Outcome::DealerBlackjack => "Dealer has blackjack. You lose.",
			Outcome::PlayerHigher => "You win!",
			Outcome::DealerHigher => "Dealer wins.",
			Outcome::Push => "Push, your stake is returned.",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	PlayerTurn { can_double: bool },
	DealerTurn,
	Settled(Outcome),
}

/// One hand in progress: the remaining deck, both hands and the stake.
#[derive(Debug, Clone, PartialEq)]
pub struct BlackjackHand {
	deck: Vec<Card>,
	player: Hand,
	dealer: Hand,
	bet: i64,
	doubled: bool,
	stage: Stage,
}

impl BlackjackHand {
	/// Deals two cards each from the back of `deck`. The bet has already
	/// been debited; `balance_after_bet` decides whether doubling is offered.
	/// A 52-card deck covers any single hand.
	pub fn deal(mut deck: Vec<Card>, bet: i64, balance_after_bet: i64) -> Self {
		let mut player = Hand::default();
		let mut dealer = Hand::default();
		for _ in 0..2 {
			player.push(draw(&mut deck));
		}
		for _ in 0..2 {
			dealer.push(draw(&mut deck));
		}

		let mut hand = Self {
			deck,
			player,
			dealer,
			bet,
			doubled: false,
			stage: Stage::PlayerTurn {
				can_double: balance_after_bet >= bet,
			},
		};

		if hand.player.value() == 21 {
			hand.stage = Stage::Settled(hand.outcome());
		}
		hand
	}

	pub fn player(&self) -> &Hand {
		&self.player
	}

	pub fn dealer(&self) -> &Hand {
		&self.dealer
	}

	pub fn stage(&self) -> Stage {
		self.stage
	}

	/// The original wager, before any double.
	pub fn bet(&self) -> i64 {
		self.bet
	}

	pub fn stake(&self) -> i64 {
		if self.doubled { self.bet.saturating_mul(2) } else { self.bet }
	}

	pub fn doubled(&self) -> bool {
		self.doubled
	}

	pub fn can_double(&self) -> bool {
		matches!(self.stage, Stage::PlayerTurn { can_double: true })
	}

	pub fn outcome_if_settled(&self) -> Option<Outcome> {
		match self.stage {
			Stage::Settled(outcome) => Some(outcome),
			_ => None,
		}
	}

	pub fn is_natural(&self) -> bool {
		self.player.is_natural() && !self.doubled
	}

	fn require_player_turn(&self) -> Result<(), CasinoError> {
		match self.stage {
			Stage::PlayerTurn { .. } => Ok(()),
			_ => Err(CasinoError::StaleState("It is not your turn in this hand")),
		}
	}

	pub fn hit(&mut self) -> Result<Stage, CasinoError> {
		self.require_player_turn()?;
		let card = draw(&mut self.deck);
		self.player.push(card);
		self.stage = if self.player.is_bust() {
			Stage::Settled(Outcome::PlayerBust)
		} else {
			Stage::PlayerTurn { can_double: false }
		};
		Ok(self.stage)
	}

	pub fn stand(&mut self) -> Result<Stage, CasinoError> {
		self.require_player_turn()?;
		self.stage = Stage::DealerTurn;
		Ok(self.stage)
	}

	/// Doubles the stake and draws exactly one card. The caller debits the
	/// extra wager first.
	pub fn double(&mut self) -> Result<Stage, CasinoError> {
		if !self.can_double() {
			self.require_player_turn()?;
			return Err(CasinoError::StaleState("Double down is only possible before your first hit"));
		}
		self.doubled = true;
		let card = draw(&mut self.deck);
		self.player.push(card);
		self.stage = if self.player.is_bust() {
			Stage::Settled(Outcome::PlayerBust)
		} else {
			Stage::DealerTurn
		};
		Ok(self.stage)
	}

	/// Runs the dealer's draws and settles the hand.
	pub fn play_dealer(&mut self) -> Result<Outcome, CasinoError> {
		if self.stage != Stage::DealerTurn {
			return Err(CasinoError::StaleState("The dealer is not playing this hand"));
		}
		while dealer_should_hit(&self.dealer) {
			let card = draw(&mut self.deck);
			self.dealer.push(card);
		}
		let outcome = self.outcome();
		self.stage = Stage::Settled(outcome);
		Ok(outcome)
	}

	/// First match wins, in casino precedence order.
	fn outcome(&self) -> Outcome {
		let player = self.player.value();
		let dealer = self.dealer.value();
		let player_natural = self.is_natural();
		let dealer_natural = self.dealer.is_natural();

		if player > 21 {
			Outcome::PlayerBust
		} else if player_natural && !dealer_natural {
			Outcome::Blackjack
		} else if dealer > 21 {
			Outcome::DealerBust
		} else if dealer_natural && !player_natural {
			Outcome::DealerBlackjack
		} else if player > dealer {
			Outcome::PlayerHigher
		} else if player < dealer {
			Outcome::DealerHigher
		} else {
			Outcome::Push
		}
	}
}

fn draw(deck: &mut Vec<Card>) -> Card {
	deck.pop().expect("a single hand never exhausts a 52-card deck")
}

pub fn rules(balance: i64, bet: i64) -> String {
	format!(
		"🃏 Blackjack\n\
		Get closer to 21 than the dealer without going over.\n\
		• Dealer hits soft 17\n\
		• Blackjack pays 3:2, a win pays ×2, a push returns the stake\n\
		• Double down before your first hit\n\n\
		Balance: {} ducats\nBet: {} ducats",
		balance, bet
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn card(rank: Rank) -> Card {
		Card::new(rank, Suit::Spades)
	}

	fn hand(ranks: &[Rank]) -> Hand {
		Hand::new(ranks.iter().map(|&r| card(r)).collect())
	}

	/// Deck that deals `player` then `dealer`, then `draws` in order.
	pub(crate) fn stacked(player: [Rank; 2], dealer: [Rank; 2], draws: &[Rank]) -> Vec<Card> {
		let mut order: Vec<Card> = player.iter().chain(dealer.iter()).chain(draws).map(|&r| card(r)).collect();
		order.extend(new_deck());
		order.reverse();
		order
	}

	#[test]
	fn test_new_deck_has_52_unique_cards() {
		let deck = new_deck();
		assert_eq!(deck.len(), 52);
		let unique: std::collections::HashSet<_> = deck.iter().collect();
		assert_eq!(unique.len(), 52);
	}

	#[test]
	fn test_shuffle_keeps_cards() {
		let mut rng = StdRng::seed_from_u64(3);
		let mut deck = shuffled_deck(&mut rng);
		deck.sort_by_key(|c| (c.rank, c.suit as u8));
		let mut fresh = new_deck();
		fresh.sort_by_key(|c| (c.rank, c.suit as u8));
		assert_eq!(deck, fresh);
	}

	#[test]
	fn test_ace_king_is_natural() {
		let h = hand(&[Rank::Ace, Rank::King]);
		assert_eq!(h.value(), 21);
		assert!(h.is_natural());
		assert!(h.is_soft());
	}

	#[test]
	fn test_double_ace_reduction() {
		let h = hand(&[Rank::Ace, Rank::Ace, Rank::Nine]);
		assert_eq!(h.value(), 21);
		// One ace drops to 1, the other still counts 11.
		assert!(h.is_soft());
		assert!(!h.is_natural());

		let h = hand(&[Rank::Ace, Rank::Ace, Rank::Nine, Rank::King]);
		assert_eq!(h.value(), 21);
		assert!(!h.is_soft());
	}

	#[test]
	fn test_dealer_policy() {
		assert!(dealer_should_hit(&hand(&[Rank::Ten, Rank::Six])));
		assert!(dealer_should_hit(&hand(&[Rank::Ace, Rank::Six])));
		assert!(!dealer_should_hit(&hand(&[Rank::Ten, Rank::Seven])));
		assert!(!dealer_should_hit(&hand(&[Rank::Ten, Rank::Six, Rank::Ace])));
		assert!(!dealer_should_hit(&hand(&[Rank::Ace, Rank::Seven])));
		assert!(!dealer_should_hit(&hand(&[Rank::Ten, Rank::Nine])));
	}

	#[test]
	fn test_stand_dealer_draws_to_eighteen() {
		let deck = stacked([Rank::Ten, Rank::Nine], [Rank::Ten, Rank::Six], &[Rank::Two]);
		let mut h = BlackjackHand::deal(deck, 100, 900);
		assert!(h.can_double());

		assert_eq!(h.stand().unwrap(), Stage::DealerTurn);
		let outcome = h.play_dealer().unwrap();
		assert_eq!(h.dealer().value(), 18);
		assert_eq!(outcome, Outcome::PlayerHigher);
		assert_eq!(outcome.payout(h.stake()), 200);
	}

	#[test]
	fn test_dealer_hits_soft_seventeen() {
		let deck = stacked([Rank::Ten, Rank::Eight], [Rank::Ace, Rank::Six], &[Rank::Ten, Rank::Two]);
		let mut h = BlackjackHand::deal(deck, 10, 100);
		h.stand().unwrap();
		h.play_dealer().unwrap();
		// A+6 soft 17 hits: +10 -> hard 17, stands.
		assert_eq!(h.dealer().len(), 3);
		assert_eq!(h.dealer().value(), 17);
		assert_eq!(h.outcome_if_settled(), Some(Outcome::PlayerHigher));
	}

	#[test]
	fn test_initial_twenty_one_settles_without_dealer_draw() {
		let deck = stacked([Rank::Ace, Rank::King], [Rank::Ten, Rank::Five], &[]);
		let h = BlackjackHand::deal(deck, 100, 0);
		assert_eq!(h.stage(), Stage::Settled(Outcome::Blackjack));
		assert_eq!(h.dealer().len(), 2);
		assert_eq!(Outcome::Blackjack.payout(100), 250);
		assert_eq!(Outcome::Blackjack.payout(15), 37);
	}

	#[test]
	fn test_both_naturals_push() {
		let deck = stacked([Rank::Ace, Rank::Queen], [Rank::Ace, Rank::King], &[]);
		let h = BlackjackHand::deal(deck, 100, 0);
		assert_eq!(h.stage(), Stage::Settled(Outcome::Push));
	}

	#[test]
	fn test_dealer_natural_beats_drawn_twenty_one() {
		let deck = stacked([Rank::Five, Rank::Six], [Rank::Ace, Rank::King], &[Rank::Ten]);
		let mut h = BlackjackHand::deal(deck, 10, 100);
		h.hit().unwrap();
		assert_eq!(h.player().value(), 21);
		h.stand().unwrap();
		assert_eq!(h.play_dealer().unwrap(), Outcome::DealerBlackjack);
	}

	#[test]
	fn test_hit_disables_double() {
		let deck = stacked([Rank::Two, Rank::Three], [Rank::Ten, Rank::Seven], &[Rank::Four]);
		let mut h = BlackjackHand::deal(deck, 10, 100);
		assert_eq!(h.hit().unwrap(), Stage::PlayerTurn { can_double: false });
		assert!(matches!(h.double(), Err(CasinoError::StaleState(_))));
	}

	#[test]
	fn test_double_needs_balance_for_original_bet() {
		let deck = stacked([Rank::Two, Rank::Three], [Rank::Ten, Rank::Seven], &[]);
		let h = BlackjackHand::deal(deck.clone(), 100, 99);
		assert!(!h.can_double());
		let h = BlackjackHand::deal(deck, 100, 100);
		assert!(h.can_double());
	}

	#[test]
	fn test_double_bust_settles_as_loss() {
		let deck = stacked([Rank::Ten, Rank::Six], [Rank::Ten, Rank::Six], &[Rank::King, Rank::Two, Rank::Two]);
		let mut h = BlackjackHand::deal(deck, 50, 500);
		assert_eq!(h.double().unwrap(), Stage::Settled(Outcome::PlayerBust));
		assert_eq!(h.stake(), 100);
		assert_eq!(h.player().len(), 3);
		assert_eq!(h.dealer().len(), 2);
		assert!(h.play_dealer().is_err());
	}

	#[test]
	fn test_double_to_twenty_one_is_not_natural() {
		let deck = stacked([Rank::Five, Rank::Six], [Rank::Ten, Rank::Nine], &[Rank::King]);
		let mut h = BlackjackHand::deal(deck, 50, 500);
		assert_eq!(h.double().unwrap(), Stage::DealerTurn);
		assert!(!h.is_natural());
		let outcome = h.play_dealer().unwrap();
		assert_eq!(outcome, Outcome::PlayerHigher);
		assert_eq!(outcome.payout(h.stake()), 200);
	}

	#[test]
	fn test_actions_rejected_after_settlement() {
		let deck = stacked([Rank::Ten, Rank::Six], [Rank::Ten, Rank::Seven], &[Rank::King]);
		let mut h = BlackjackHand::deal(deck, 10, 100);
		h.hit().unwrap();
		assert!(h.hit().is_err());
		assert!(h.stand().is_err());
	}

	#[test]
	fn test_outcome_payouts() {
		assert_eq!(Outcome::PlayerBust.payout(100), 0);
		assert_eq!(Outcome::DealerBust.payout(100), 200);
		assert_eq!(Outcome::DealerHigher.payout(100), 0);
		assert_eq!(Outcome::Push.payout(100), 100);
		assert_eq!(Outcome::Blackjack.payout(100), 250);
		assert_eq!(Outcome::Blackjack.payout(5), 12);
	}

	#[test]
	fn test_huge_stake_payouts_saturate() {
		assert_eq!(Outcome::Blackjack.payout(i64::MAX), i64::MAX);
		assert_eq!(Outcome::PlayerHigher.payout(i64::MAX / 2 + 1), i64::MAX);
	}

	#[test]
	fn test_move_codec() {
		assert_eq!("start".parse::<Move>(), Ok(Move::Deal));
		assert_eq!(Move::Double.to_string(), "double");
		assert!("split".parse::<Move>().is_err());
	}
}
