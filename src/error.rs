//! Recoverable error kinds (§7).
//!
//! Internal errors never escape task execution (§7 "Propagation policy");
//! these types are for the handful of calls that can legitimately be
//! rejected by the caller: `setMode`, `addListener`, and a `Context`'s
//! `complete`/`failed` outside their valid state.

use std::sync::Arc;

/// A failure captured from a `Service::start` attempt (§7 item 1), stored
/// in [`crate::counters::CounterBlock::start_exception`] and surfaced to
/// listeners and [`crate::controller::ServiceController::status`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct StartError {
	pub message: Arc<str>,
}

impl StartError {
	#[must_use]
	pub fn new(message: impl Into<Arc<str>>) -> Self {
		StartError { message: message.into() }
	}
}

/// Rejection of a `setMode`/`compareAndSetMode` call; re-exported from
/// [`crate::mode`] since it is the only place that constructs it.
pub use crate::mode::ModeError;

/// Rejection of `addListener` (§7 item 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ListenerError {
	#[error("listener is already registered on this controller")]
	AlreadyRegistered,
}

/// Misuse of a lifecycle [`crate::service::Context`] (§7 item 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
	#[error("complete() called outside ASYNC (current phase: {current:?})")]
	CompleteOutsideAsync { current: crate::service::Phase },
	#[error("failed() called outside ASYNC (current phase: {current:?})")]
	FailedOutsideAsync { current: crate::service::Phase },
}

/// `retry()` called while the controller is not in the `START_FAILED`
/// coarse state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("retry() is only valid while the controller is START_FAILED")]
pub struct RetryError;

/// `getValue()` called while the controller's service is not currently
/// started (§4.3 `getValue`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("service value is not available outside the UP state")]
pub struct ValueUnavailable;
