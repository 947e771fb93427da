use serde::{Deserialize, Serialize};

use crate::events::Action;
use crate::timer::TimerPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Transport-assigned identifier of a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
	Text(String),
	Button(Action),
	Timer(TimerPayload),
}

/// One unit of work for the casino: who sent it, which message it came
/// from (for button presses), and what it was.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
	pub user: UserId,
	pub message: Option<MessageId>,
	pub inbound: Inbound,
}

impl Envelope {
	pub fn text(user: UserId, text: impl Into<String>) -> Self {
		Self {
			user,
			message: None,
			inbound: Inbound::Text(text.into()),
		}
	}

	pub fn button(user: UserId, message: Option<MessageId>, action: Action) -> Self {
		Self {
			user,
			message,
			inbound: Inbound::Button(action),
		}
	}

	pub fn timer(payload: TimerPayload) -> Self {
		Self {
			user: payload.user,
			message: None,
			inbound: Inbound::Timer(payload),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Button {
	pub label: String,
	pub action: Action,
}

impl Button {
	pub fn new(label: impl Into<String>, action: Action) -> Self {
		Self {
			label: label.into(),
			action,
		}
	}
}

pub type Controls = Vec<Vec<Button>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum ReplyKind {
	/// Short popup acknowledging a button press; never carries controls.
	Notice,
	Send,
	Edit(MessageId),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reply {
	pub kind: ReplyKind,
	pub text: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub controls: Controls,
}

impl Reply {
	pub fn notice(text: impl Into<String>) -> Self {
		Self {
			kind: ReplyKind::Notice,
			text: text.into(),
			controls: Vec::new(),
		}
	}

	pub fn send(text: impl Into<String>, controls: Controls) -> Self {
		Self {
			kind: ReplyKind::Send,
			text: text.into(),
			controls,
		}
	}

	/// Edits `message` in place when there is one, otherwise sends fresh.
	pub fn show(message: Option<MessageId>, text: impl Into<String>, controls: Controls) -> Self {
		Self {
			kind: match message {
				Some(id) => ReplyKind::Edit(id),
				None => ReplyKind::Send,
			},
			text: text.into(),
			controls,
		}
	}

	pub fn is_notice(&self) -> bool {
		self.kind == ReplyKind::Notice
	}

	pub fn actions(&self) -> impl Iterator<Item = &Action> {
		self.controls.iter().flatten().map(|b| &b.action)
	}
}
