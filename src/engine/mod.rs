mod blackjack;
mod casino;
mod race;
mod wager;

pub use casino::Casino;
