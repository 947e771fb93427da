use std::sync::atomic::Ordering;

use chrono::TimeDelta;

use crate::error::CasinoError;
use crate::events::{Reply, UserId};
use crate::games::race::{self, AnswerVerdict, RaceRound};
use crate::games::{self, GameId};
use crate::logging;
use crate::session::{Phase, RACE_KEYS, Session};
use crate::timer::TimerPayload;

use super::Casino;

impl Casino {
	pub(super) fn start_race(&self, user: UserId) -> Result<Vec<Reply>, CasinoError> {
		let mut session = self.sessions.get(user);
		if session.phase != Phase::InGameMenu(GameId::AcademicRace) {
			return Err(CasinoError::StaleState("Open the race from the games menu first."));
		}

		let before = session.phase;
		let problem = self.next_round(user, &mut session, self.config.race.base_reward, 0);
		self.save(user, before, session);
		Ok(vec![Reply::send(problem, Vec::new())])
	}

	/// Swaps in a new round as a unit: answer, deadline, reward and a fresh
	/// timer, after cancelling the old one. Returns the problem text.
	fn next_round(&self, user: UserId, session: &mut Session, reward: i64, timeout_streak: u32) -> String {
		if let Some(timer) = session.race.as_ref().and_then(|r| r.timer) {
			self.scheduler.cancel(timer);
		}

		let problem = self.with_rng(|rng| race::generate(rng));
		let id = self.rounds.fetch_add(1, Ordering::SeqCst);
		let limit_secs = self.config.race.time_limit_secs;
		let deadline = self.clock.now() + TimeDelta::seconds(limit_secs as i64);
		let timer = self.scheduler.schedule_once(
			self.config.race.time_limit(),
			&race::timer_key(user),
			TimerPayload { user, round: id },
		);
		logging::race::round_started(id, reward, timeout_streak);

		let text = format!(
			"🧮 {}\n\nReward: {} ducats. You have {} seconds.",
			problem.question, reward, limit_secs
		);
		session.phase = Phase::AwaitingAnswer(GameId::AcademicRace);
		session.race = Some(RaceRound {
			id,
			problem,
			deadline,
			reward,
			timeout_streak,
			message: None,
			timer: Some(timer),
		});
		text
	}

	fn end_race(&self, user: UserId, session: &Session, reason: &str) {
		if let Some(timer) = session.race.as_ref().and_then(|r| r.timer) {
			self.scheduler.cancel(timer);
		}
		logging::race::stopped(reason);
		self.clear(user, session.phase, RACE_KEYS);
	}

	/// A late answer is turned away without touching the round. A malformed
	/// one forfeits like a wrong one.
	pub(super) fn race_answer(&self, user: UserId, text: &str) -> Result<Vec<Reply>, CasinoError> {
		let mut session = self.sessions.get(user);
		let round = session
			.race
			.clone()
			.ok_or(CasinoError::StaleState("There is no problem waiting for an answer."))?;

		let verdict = race::judge(&round, text, self.clock.now());
		logging::race::answer(verdict.as_str(), round.reward);

		match verdict {
			AnswerVerdict::Late => Err(CasinoError::StaleState("Too late, this round is already over.")),
			AnswerVerdict::Correct => {
				let balance = self.bank.credit(user, round.reward);
				let reward = race::grow_reward(round.reward, self.config.race.reward_growth);
				let before = session.phase;
				let problem = self.next_round(user, &mut session, reward, 0);
				self.save(user, before, session);
				Ok(vec![Reply::send(
					format!(
						"✅ Correct! +{} ducats, balance {}.\n\n{}",
						round.reward, balance, problem
					),
					Vec::new(),
				)])
			}
			AnswerVerdict::Malformed | AnswerVerdict::Wrong => {
				self.end_race(user, &session, "wrong answer");
				Ok(vec![Reply::send(
					format!(
						"❌ Wrong! {} = {}. The race is over.",
						round.problem.question, round.problem.answer
					),
					games::replay_controls(GameId::AcademicRace),
				)])
			}
		}
	}

	/// Timer callback. Anything but the live round of an active race is a
	/// leftover and ignored.
	pub(super) fn race_timeout(&self, payload: TimerPayload) -> Result<Vec<Reply>, CasinoError> {
		let user = payload.user;
		let mut session = self.sessions.get(user);
		let round = match (session.phase, &session.race) {
			(Phase::AwaitingAnswer(GameId::AcademicRace), Some(round)) if round.id == payload.round => {
				round.clone()
			}
			_ => {
				logging::race::stale_timer(payload.round);
				return Ok(Vec::new());
			}
		};

		let mut replies = Vec::new();
		if let Some(message) = round.message {
			replies.push(Reply::show(
				Some(message),
				format!(
					"⌛ {}\nTime is up! The answer was {}.",
					round.problem.question, round.problem.answer
				),
				Vec::new(),
			));
		}

		let streak = round.timeout_streak + 1;
		if streak >= self.config.race.max_timeouts {
			self.end_race(user, &session, "timeout limit reached");
			replies.push(Reply::send(
				format!("⌛ {} timeouts in a row. The race is over.", streak),
				games::replay_controls(GameId::AcademicRace),
			));
		} else {
			let base = self.config.race.base_reward;
			let before = session.phase;
			let problem = self.next_round(user, &mut session, base, streak);
			self.save(user, before, session);
			replies.push(Reply::send(
				format!("⌛ Time is up! The reward is back to {} ducats.\n\n{}", base, problem),
				Vec::new(),
			));
		}
		Ok(replies)
	}
}
