use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

use chrono::Utc;

use crate::events::UserId;

struct LogState {
	file: Option<std::fs::File>,
	current_date: String,
	user: Option<UserId>,
}

static LOG_STATE: Mutex<LogState> = Mutex::new(LogState {
	file: None,
	current_date: String::new(),
	user: None,
});

fn ensure_log_file(state: &mut LogState) {
	let date = Utc::now().format("%Y-%m-%d").to_string();
	if state.current_date != date || state.file.is_none() {
		let _ = fs::create_dir_all("logs");
		let path = format!("logs/casino-{}.log", date);
		if let Ok(file) = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&path)
		{
			state.file = Some(file);
			state.current_date = date;
		}
	}
}

pub fn set_user(user: UserId) {
	if let Ok(mut state) = LOG_STATE.lock() {
		state.user = Some(user);
	}
}

pub fn log(module: &str, log_type: &str, message: &str) {
	if let Ok(mut state) = LOG_STATE.lock() {
		ensure_log_file(&mut state);

		let user = match state.user {
			Some(user) => user.to_string(),
			None => "-".to_string(),
		};
		let line = format!(
			"[{}][{}][{}:{}] {}\n",
			Utc::now().format("%H:%M:%S%.3f"),
			user,
			module,
			log_type,
			message
		);

		if let Some(ref mut file) = state.file {
			let _ = file.write_all(line.as_bytes());
			let _ = file.flush();
		}
	}
}

pub mod bank {
	use super::log;
	use crate::events::UserId;

	pub fn debit(user: UserId, amount: i64, balance: i64) {
		log("Bank", "DEBIT", &format!("{}: -{} (bal: {})", user, amount, balance));
	}

	pub fn credit(user: UserId, amount: i64, balance: i64) {
		log("Bank", "CREDIT", &format!("{}: +{} (bal: {})", user, amount, balance));
	}

	pub fn bankruptcy(user: UserId, floor: i64, automatic: bool) {
		let kind = if automatic { "auto" } else { "manual" };
		log("Bank", "BANKRUPT", &format!("{}: reset to {} ({})", user, floor, kind));
	}

	pub fn flushed(accounts: usize) {
		log("Bank", "FLUSH", &format!("saved {} accounts", accounts));
	}

	pub fn error(msg: &str) {
		log("Bank", "ERROR", msg);
	}
}

pub mod session {
	use super::log;
	use crate::session::{Phase, SessionKey};

	pub fn phase(from: &Phase, to: &Phase) {
		if from != to {
			log("Session", "PHASE", &format!("{:?} -> {:?}", from, to));
		}
	}

	pub fn cleared(keys: &[SessionKey]) {
		log("Session", "CLEAR", &format!("{:?}", keys));
	}
}

pub mod wager {
	use super::log;
	use crate::games::GameId;

	pub fn committed(game: GameId, amount: i64) {
		log("Wager", "COMMIT", &format!("{}: {}", game, amount));
	}

	pub fn modified(game: GameId, from: i64, to: i64) {
		log("Wager", "MODIFY", &format!("{}: {} -> {}", game, from, to));
	}

	pub fn discarded(game: GameId, amount: i64, balance: i64) {
		log("Wager", "DISCARD", &format!("{}: {} exceeds balance {}", game, amount, balance));
	}
}

pub mod round {
	use super::log;
	use crate::games::GameId;

	pub fn settled(game: GameId, bet: i64, payout: i64, summary: &str) {
		log("Round", "SETTLE", &format!("{} bet={} payout={} ({})", game, bet, payout, summary));
	}
}

pub mod blackjack {
	use super::log;

	pub fn dealt(player: &str, dealer: &str, bet: i64) {
		log("Blackjack", "DEAL", &format!("player [{}] dealer [{}] bet={}", player, dealer, bet));
	}

	pub fn action(action: &str, player: &str) {
		log("Blackjack", "ACTION", &format!("{} -> [{}]", action, player));
	}

	pub fn settled(outcome: &str, stake: i64, payout: i64) {
		log("Blackjack", "SETTLE", &format!("{} stake={} payout={}", outcome, stake, payout));
	}

	pub fn abandoned(stake: i64) {
		log("Blackjack", "ABANDON", &format!("hand left unfinished, stake {} forfeited", stake));
	}
}

pub mod race {
	use super::log;

	pub fn round_started(round: u64, reward: i64, streak: u32) {
		log("Race", "ROUND", &format!("#{} reward={} timeouts={}", round, reward, streak));
	}

	pub fn answer(verdict: &str, reward: i64) {
		log("Race", "ANSWER", &format!("{} (reward {})", verdict, reward));
	}

	pub fn stale_timer(round: u64) {
		log("Race", "TIMER", &format!("#{} superseded, ignored", round));
	}

	pub fn stopped(reason: &str) {
		log("Race", "STOP", reason);
	}
}

pub mod transport {
	use super::log;
	use crate::error::TransportError;

	pub fn failed(err: &TransportError) {
		log("Transport", "ERROR", &err.to_string());
	}
}
