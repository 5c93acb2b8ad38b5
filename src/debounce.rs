//! Trailing-edge coalescing for rapid field input.
//!
//! The quiet window is tracked against an injected clock instead of a
//! spawned timer, so the contract is deterministic: push replaces any
//! pending value and restarts the window, poll emits once the window has
//! elapsed, flush emits immediately (Enter must not lose the last edit).

use std::time::{Duration, Instant};

/// Quiet window used by text widgets for live model publication.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

#[derive(Debug)]
pub struct Debouncer<T> {
	window: Duration,
	pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
	pub fn new(window: Duration) -> Self {
		Self {
			window,
			pending: None,
		}
	}

	/// Stage a value, replacing any pending one and restarting the window.
	pub fn push(&mut self, value: T, now: Instant) {
		self.pending = Some((value, now));
	}

	/// Emit the pending value once the quiet window has elapsed.
	pub fn poll(&mut self, now: Instant) -> Option<T> {
		match &self.pending {
			Some((_, since)) if now.duration_since(*since) >= self.window => {
				self.pending.take().map(|(value, _)| value)
			}
			_ => None,
		}
	}

	/// Emit the pending value immediately, if any.
	pub fn flush(&mut self) -> Option<T> {
		self.pending.take().map(|(value, _)| value)
	}

	pub fn is_pending(&self) -> bool {
		self.pending.is_some()
	}
}

impl<T> Default for Debouncer<T> {
	fn default() -> Self {
		Self::new(DEFAULT_DEBOUNCE_WINDOW)
	}
}
