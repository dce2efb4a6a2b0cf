//! User-facing policy (`Mode`) and the mode-transition table of §4.3.

use core::fmt::{self, Display, Formatter};

use crate::listener::ListenerEvent;
use crate::task::Task;

/// User-facing policy governing whether a service is permitted or desired to
/// run. `Remove` is terminal: once reached, no further mode change is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
	Never,
	OnDemand,
	Passive,
	Active,
	Remove,
}

impl Display for Mode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		Display::fmt(
			match self {
				Mode::Never => "NEVER",
				Mode::OnDemand => "ON_DEMAND",
				Mode::Passive => "PASSIVE",
				Mode::Active => "ACTIVE",
				Mode::Remove => "REMOVE",
			},
			f,
		)
	}
}

/// Contribution of a mode (and demand state) to `upperCount`.
///
/// `Active`/`Passive` contribute unconditionally; `OnDemand` contributes only
/// while demanded; `Never`/`Remove` never contribute. §3 asserts this always
/// lands in `{0, 1}`.
#[must_use]
pub(crate) fn upper_contribution(mode: Mode, demanded: bool) -> u8 {
	match mode {
		Mode::Active | Mode::Passive => 1,
		Mode::OnDemand if demanded => 1,
		Mode::OnDemand | Mode::Never | Mode::Remove => 0,
	}
}

/// Outcome of a legal `setMode`/`compareAndSetMode` step: the new mode to
/// store, plus the demand-propagation tasks the mode-transition table of
/// §4.3 prescribes (`DemandParents`/`UndemandParents`, `REMOVE_REQUESTED`).
pub(crate) struct ModeTransition {
	pub(crate) new_mode: Mode,
	pub(crate) tasks: Vec<Task>,
}

/// Failure mode for an illegal `setMode` call (§7 item 6 and the `REMOVE`
/// row of the mode-transition table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
	/// The container is shutting down and only `Remove` is accepted.
	#[error("cannot set mode to {attempted} while the container is shutting down")]
	ShuttingDown { attempted: Mode },
	/// The controller's mode is already `Remove`, which is terminal.
	#[error("cannot change mode: controller is already REMOVE")]
	AlreadyRemoved,
}

/// Computes the effect of moving `from` to `to`, per the mode-transition
/// table of §4.3. Demand propagation tasks are emitted only when `demanded`
/// (the controller's current `demandedByCount>0`) makes them observable;
/// the table is otherwise independent of any other counter.
///
/// Returns `Err` for the `REMOVE` row (every cell is `error`) and is the
/// only place that enforces "rejects any change once mode is `REMOVE`".
pub(crate) fn mode_transition(from: Mode, to: Mode, demanded: bool) -> Result<ModeTransition, ModeError> {
	use Mode::{Active, Never, OnDemand, Passive, Remove};

	if from == Remove {
		return Err(ModeError::AlreadyRemoved);
	}
	if from == to {
		return Ok(ModeTransition {
			new_mode: to,
			tasks: Vec::new(),
		});
	}

	let mut tasks = Vec::new();
	match (from, to) {
		(Never, OnDemand) | (Never, Passive) => {
			if demanded {
				tasks.push(Task::DemandParents);
			}
		}
		(Never, Active) => tasks.push(Task::DemandParents),
		(Never, Remove) => tasks.push(Task::Listener(ListenerEvent::RemoveRequested)),

		(OnDemand, Never) => {
			if demanded {
				tasks.push(Task::UndemandParents);
			}
		}
		(OnDemand, Passive) => {}
		(OnDemand, Active) => tasks.push(Task::DemandParents),
		(OnDemand, Remove) => {
			tasks.push(Task::Listener(ListenerEvent::RemoveRequested));
			if demanded {
				tasks.push(Task::UndemandParents);
			}
		}

		(Passive, Never) => {
			if demanded {
				tasks.push(Task::UndemandParents);
			}
		}
		(Passive, OnDemand) => {}
		(Passive, Active) => tasks.push(Task::DemandParents),
		(Passive, Remove) => {
			tasks.push(Task::Listener(ListenerEvent::RemoveRequested));
			if demanded {
				tasks.push(Task::UndemandParents);
			}
		}

		(Active, Never) => tasks.push(Task::UndemandParents),
		(Active, OnDemand) => {
			if !demanded {
				tasks.push(Task::UndemandParents);
			}
		}
		(Active, Passive) => {
			if !demanded {
				tasks.push(Task::UndemandParents);
			}
		}
		// `ACTIVE`'s own `→NEVER` cell is unconditional (mode.rs above), so
		// its NEVER-arm here is unconditional too, unlike the ON_DEMAND and
		// PASSIVE rows above whose `→NEVER` cells are themselves guarded on
		// `demanded`.
		(Active, Remove) => {
			tasks.push(Task::Listener(ListenerEvent::RemoveRequested));
			tasks.push(Task::UndemandParents);
		}

		(Remove, _) => unreachable!("handled by the from == Remove check above"),
		// Every (_, _) pair with from == to, including (Remove, Remove), was
		// handled by the from == to check above; the match is otherwise
		// exhaustive over the five-by-five table.
		(Never, Never) | (OnDemand, OnDemand) | (Passive, Passive) | (Active, Active) => {
			unreachable!("handled by the from == to check above")
		}
	}

	Ok(ModeTransition { new_mode: to, tasks })
}
