mod action;
mod types;

pub use action::{Action, BetChange, Choice};
pub use types::{Button, Controls, Envelope, Inbound, MessageId, Reply, ReplyKind, UserId};
