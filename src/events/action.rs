use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bank::Faction;
use crate::error::CasinoError;
use crate::games::GameId;
use crate::games::blackjack::Move;
use crate::games::coinflip::CoinFace;
use crate::games::roulette::RouletteColor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetChange {
	Multiply(i64),
	AllIn,
}

/// Game-specific argument of a play button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
	Color(RouletteColor),
	Face(CoinFace),
	Move(Move),
}

impl Choice {
	fn parse(game: GameId, s: &str) -> Result<Self, CasinoError> {
		let unknown = || CasinoError::UnknownAction(format!("{}:{}", game, s));
		match game {
			GameId::Roulette => s.parse().map(Choice::Color).map_err(|_| unknown()),
			GameId::CoinFlip => s.parse().map(Choice::Face).map_err(|_| unknown()),
			GameId::Blackjack => s.parse().map(Choice::Move).map_err(|_| unknown()),
			GameId::Dice | GameId::AcademicRace => Err(unknown()),
		}
	}
}

impl fmt::Display for Choice {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Choice::Color(color) => write!(f, "{}", color),
			Choice::Face(face) => write!(f, "{}", face),
			Choice::Move(mv) => write!(f, "{}", mv),
		}
	}
}

/// A button press. The `Display`/`FromStr` pair is the callback-data codec
/// the transport attaches to buttons, e.g. `game:modify:dice:multiply:10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
	Main,
	Games,
	Settings,
	News,
	StartGame { game: GameId, fresh: bool },
	ModifyBet { game: GameId, change: BetChange },
	Play { game: GameId, choice: Option<Choice> },
	Work,
	Bankruptcy,
	ToggleAutoBankruptcy,
	Subscribe(Faction),
	Stats,
	Noop,
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Action::Main => write!(f, "nav:main"),
			Action::Games => write!(f, "nav:games"),
			Action::Settings => write!(f, "nav:settings"),
			Action::News => write!(f, "nav:news"),
			Action::StartGame { game, fresh: false } => write!(f, "game:start:{}", game),
			Action::StartGame { game, fresh: true } => write!(f, "game:start:{}:new", game),
			Action::ModifyBet { game, change: BetChange::Multiply(n) } => {
				write!(f, "game:modify:{}:multiply:{}", game, n)
			}
			Action::ModifyBet { game, change: BetChange::AllIn } => write!(f, "game:modify:{}:allin", game),
			Action::Play { game, choice: None } => write!(f, "game:play:{}", game),
			Action::Play { game, choice: Some(choice) } => write!(f, "game:play:{}:{}", game, choice),
			Action::Work => write!(f, "game:work"),
			Action::Bankruptcy => write!(f, "game:bankruptcy"),
			Action::ToggleAutoBankruptcy => write!(f, "settings:toggle_autobankrupt"),
			Action::Subscribe(faction) => write!(f, "sub:{}", faction),
			Action::Stats => write!(f, "get_public_stats"),
			Action::Noop => write!(f, "do_nothing"),
		}
	}
}

impl FromStr for Action {
	type Err = CasinoError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let unknown = || CasinoError::UnknownAction(s.to_string());
		let parts: Vec<&str> = s.trim().split(':').collect();

		let action = match parts.as_slice() {
			["nav", "main"] => Action::Main,
			["nav", "games"] => Action::Games,
			["nav", "settings"] => Action::Settings,
			["nav", "news"] => Action::News,
			["game", "work"] => Action::Work,
			["game", "bankruptcy"] => Action::Bankruptcy,
			["game", "start", game] => Action::StartGame {
				game: game.parse()?,
				fresh: false,
			},
			["game", "start", game, "new"] => Action::StartGame {
				game: game.parse()?,
				fresh: true,
			},
			["game", "modify", game, "allin"] => Action::ModifyBet {
				game: game.parse()?,
				change: BetChange::AllIn,
			},
			["game", "modify", game, "multiply", factor] => Action::ModifyBet {
				game: game.parse()?,
				change: BetChange::Multiply(factor.parse().map_err(|_| unknown())?),
			},
			["game", "play", game] => Action::Play {
				game: game.parse()?,
				choice: None,
			},
			["game", "play", game, choice] => {
				let game: GameId = game.parse()?;
				Action::Play {
					game,
					choice: Some(Choice::parse(game, choice)?),
				}
			}
			["settings", "toggle_autobankrupt"] => Action::ToggleAutoBankruptcy,
			["sub", faction] => Action::Subscribe(faction.parse().map_err(|_| unknown())?),
			["get_public_stats"] => Action::Stats,
			["do_nothing"] => Action::Noop,
			_ => return Err(unknown()),
		};
		Ok(action)
	}
}
