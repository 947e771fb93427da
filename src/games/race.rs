use chrono::{DateTime, Utc};
use rand::Rng;

use crate::events::{MessageId, UserId};
use crate::timer::TimerHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
	pub question: String,
	pub answer: i64,
}

/// One of four arithmetic templates, picked uniformly.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Problem {
	match rng.random_range(0..4) {
		0 => {
			let a: i64 = rng.random_range(10..=50);
			let b: i64 = rng.random_range(10..=50);
			let c: i64 = rng.random_range(2..=9);
			Problem {
				question: format!("({} + {}) × {}", a, b, c),
				answer: (a + b) * c,
			}
		}
		1 => {
			let a: i64 = rng.random_range(20..=60);
			let b: i64 = rng.random_range(2..=9);
			let c: i64 = rng.random_range(10..=100);
			Problem {
				question: format!("{} × {} − {}", a, b, c),
				answer: a * b - c,
			}
		}
		2 => {
			let root: i64 = rng.random_range(2..=15);
			let b: i64 = rng.random_range(10..=30);
			Problem {
				question: format!("√{} + {}", root * root, b),
				answer: root + b,
			}
		}
		_ => {
			let a: i64 = rng.random_range(2..=10);
			let x: i64 = rng.random_range(10..=50);
			Problem {
				question: format!("x × {} = {}, x = ?", a, a * x),
				answer: x,
			}
		}
	}
}

/// The live state of a race between two answers.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceRound {
	/// Distinguishes this round's timer from ones already superseded.
	pub id: u64,
	pub problem: Problem,
	pub deadline: DateTime<Utc>,
	pub reward: i64,
	pub timeout_streak: u32,
	/// Message the problem was delivered in, once the transport reports it.
	pub message: Option<MessageId>,
	pub timer: Option<TimerHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerVerdict {
	Late,
	Malformed,
	Correct,
	Wrong,
}

impl AnswerVerdict {
	pub fn as_str(self) -> &'static str {
		match self {
			AnswerVerdict::Late => "late",
			AnswerVerdict::Malformed => "malformed",
			AnswerVerdict::Correct => "correct",
			AnswerVerdict::Wrong => "wrong",
		}
	}
}

/// An answer exactly at the deadline still counts.
pub fn judge(round: &RaceRound, text: &str, now: DateTime<Utc>) -> AnswerVerdict {
	if now > round.deadline {
		return AnswerVerdict::Late;
	}
	match text.trim().parse::<i64>() {
		Err(_) => AnswerVerdict::Malformed,
		Ok(answer) if answer == round.problem.answer => AnswerVerdict::Correct,
		Ok(_) => AnswerVerdict::Wrong,
	}
}

/// Floors the grown reward and caps it at `i64::MAX`.
pub fn grow_reward(reward: i64, factor: f64) -> i64 {
	let grown = (reward as f64 * factor).floor();
	if grown >= i64::MAX as f64 { i64::MAX } else { grown as i64 }
}

pub fn timer_key(user: UserId) -> String {
	format!("race:{}", user)
}

pub fn rules(time_limit_secs: u64, base_reward: i64, max_timeouts: u32) -> String {
	format!(
		"🧮 Academic Race\n\
		Solve each problem within {} seconds.\n\
		• A correct answer pays the current reward, starting at {} ducats, and grows it ×3.14\n\
		• A wrong answer ends the race\n\
		• Running out of time restarts at the base reward; {} timeouts in a row end the race\n\n\
		No bet required.",
		time_limit_secs, base_reward, max_timeouts
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeDelta;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn round(answer: i64) -> RaceRound {
		RaceRound {
			id: 1,
			problem: Problem {
				question: "2 + 2".to_string(),
				answer,
			},
			deadline: DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(10),
			reward: 100,
			timeout_streak: 0,
			message: None,
			timer: None,
		}
	}

	#[test]
	fn test_generated_answers_match_templates() {
		let mut rng = StdRng::seed_from_u64(11);
		for _ in 0..2000 {
			let problem = generate(&mut rng);
			let q = &problem.question;
			if let Some(rest) = q.strip_prefix('√') {
				let parts: Vec<&str> = rest.split(" + ").collect();
				let square: i64 = parts[0].parse().unwrap();
				let b: i64 = parts[1].parse().unwrap();
				let root = (square as f64).sqrt() as i64;
				assert_eq!(root * root, square);
				assert!((4..=225).contains(&square));
				assert!((10..=30).contains(&b));
				assert_eq!(problem.answer, root + b);
			} else if q.starts_with("x × ") {
				assert!((10..=50).contains(&problem.answer));
			} else if q.starts_with('(') {
				assert!(problem.answer >= 40 && problem.answer <= 900);
			} else {
				assert!(problem.answer >= 40 - 100 && problem.answer <= 540 - 10);
			}
		}
	}

	#[test]
	fn test_all_templates_appear() {
		let mut rng = StdRng::seed_from_u64(5);
		let mut seen = [false; 4];
		for _ in 0..400 {
			let q = generate(&mut rng).question;
			let idx = if q.starts_with('(') {
				0
			} else if q.starts_with('√') {
				2
			} else if q.starts_with("x") {
				3
			} else {
				1
			};
			seen[idx] = true;
		}
		assert!(seen.iter().all(|&s| s));
	}

	#[test]
	fn test_judge() {
		let r = round(4);
		let on_time = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(10);
		assert_eq!(judge(&r, " 4 ", on_time), AnswerVerdict::Correct);
		assert_eq!(judge(&r, "5", on_time), AnswerVerdict::Wrong);
		assert_eq!(judge(&r, "four", on_time), AnswerVerdict::Malformed);
		assert_eq!(judge(&r, "4", on_time + TimeDelta::milliseconds(1)), AnswerVerdict::Late);
	}

	#[test]
	fn test_reward_growth_floors() {
		assert_eq!(grow_reward(100, 3.14), 314);
		assert_eq!(grow_reward(314, 3.14), 985);
	}

	#[test]
	fn test_reward_growth_caps_at_max() {
		assert_eq!(grow_reward(i64::MAX / 2, 3.14), i64::MAX);
		assert_eq!(grow_reward(i64::MAX, 3.14), i64::MAX);
	}
}
