//! The fine-grained per-controller state and its coarse projection.

use core::fmt::{self, Display, Formatter};

/// Fine-grained controller state.
///
/// Substates are grouped into six coarse [`State`]s for the benefit of
/// listeners and status queries; see [`Substate::coarse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Substate {
	/// Freshly constructed by the builder, not yet committed.
	New,
	/// Removed before installation ever completed.
	Cancelled,
	Down,
	WontStart,
	Problem,
	StartRequested,
	Removing,
	StartInitiating,
	Starting,
	Up,
	StopRequested,
	Stopping,
	StartFailed,
	/// Terminal: all counters are frozen, listeners cleared.
	Removed,
}

impl Substate {
	/// Projects this substate onto the coarse six-valued [`State`] used by
	/// listeners and [`crate::controller::ServiceController::status`].
	///
	/// `New` (pre-commit) counts as `Down`; `Cancelled` counts as `Removed`.
	#[must_use]
	pub fn coarse(self) -> State {
		use Substate::{
			Down, New, Problem, Removed, Removing, StartFailed, StartInitiating, StartRequested,
			Starting, Stopping, StopRequested, Up, WontStart,
		};
		match self {
			New | Down | WontStart | Problem | StartRequested | Removing => State::Down,
			StartInitiating | Starting => State::Starting,
			Up | StopRequested => State::Up,
			Stopping => State::Stopping,
			StartFailed => State::StartFailed,
			Substate::Cancelled | Removed => State::Removed,
		}
	}

	/// Whether this substate has no outgoing transitions ([`Substate::Removed`]
	/// and [`Substate::Cancelled`]).
	#[must_use]
	pub fn is_terminal(self) -> bool {
		matches!(self, Substate::Removed | Substate::Cancelled)
	}
}

impl Display for Substate {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		Display::fmt(
			match self {
				Substate::New => "NEW",
				Substate::Cancelled => "CANCELLED",
				Substate::Down => "DOWN",
				Substate::WontStart => "WONT_START",
				Substate::Problem => "PROBLEM",
				Substate::StartRequested => "START_REQUESTED",
				Substate::Removing => "REMOVING",
				Substate::StartInitiating => "START_INITIATING",
				Substate::Starting => "STARTING",
				Substate::Up => "UP",
				Substate::StopRequested => "STOP_REQUESTED",
				Substate::Stopping => "STOPPING",
				Substate::StartFailed => "START_FAILED",
				Substate::Removed => "REMOVED",
			},
			f,
		)
	}
}

/// Coarse, six-valued projection of [`Substate`] exposed to listeners and
/// status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
	Down,
	Starting,
	Up,
	Stopping,
	StartFailed,
	Removed,
}

impl Display for State {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		Display::fmt(
			match self {
				State::Down => "DOWN",
				State::Starting => "STARTING",
				State::Up => "UP",
				State::Stopping => "STOPPING",
				State::StartFailed => "START_FAILED",
				State::Removed => "REMOVED",
			},
			f,
		)
	}
}
