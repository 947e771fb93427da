#![allow(clippy::collapsible_if)]
#![allow(clippy::large_enum_variant)]
#![allow(clippy::approx_constant)]

use std::sync::{Mutex, MutexGuard};

pub mod bank;
pub mod clock;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod events;
pub mod games;
pub mod logging;
pub mod menu;
pub mod server;
pub mod session;
pub mod timer;
pub mod transport;

pub(crate) fn lock_mutex<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|e| e.into_inner())
}
