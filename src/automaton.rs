//! Pure substate transition table (§4.2).
//!
//! [`transition`] is the `(counters, mode) → next_substate` function plus
//! the side-effect task list each transition emits. It never mutates
//! anything; callers apply the returned substate and task list themselves,
//! under the controller lock, only when `asyncTasks == 0` (invariant 3, §3).

use std::sync::Arc;

use crate::counters::CounterBlock;
use crate::listener::ListenerEvent;
use crate::mode::Mode;
use crate::substate::Substate;
use crate::task::Task;

/// Result of one automaton step: the substate to store and the tasks to
/// submit after the lock is released.
pub struct Outcome {
	pub substate: Substate,
	pub tasks: Vec<Task>,
}

/// Computes the next substate and its emitted tasks from a counter
/// snapshot. `listeners_empty` is passed separately because the listener
/// set lives behind its own monitor (§5 "Shared-resource policy"), not in
/// [`CounterBlock`].
///
/// Must only be called when `counters.async_tasks == 0`.
#[must_use]
pub fn transition(counters: &CounterBlock, listeners_empty: bool) -> Outcome {
	let from = counters.substate;
	let has_problem = counters.has_problem();
	let to = next_substate(counters, listeners_empty, has_problem);
	let tasks = emit_tasks(from, to, counters);
	Outcome { substate: to, tasks }
}

fn next_substate(counters: &CounterBlock, listeners_empty: bool, has_problem: bool) -> Substate {
	let mode = counters.mode;
	let upper = counters.upper_count;
	let down_deps = counters.down_dependencies;

	match counters.substate {
		Substate::Down => down_like(mode, upper, down_deps, listeners_empty, has_problem).unwrap_or(Substate::Down),

		Substate::WontStart => {
			if mode == Mode::Never {
				Substate::WontStart
			} else {
				down_like(mode, upper, down_deps, listeners_empty, has_problem).unwrap_or(Substate::Down)
			}
		}

		Substate::StartRequested => {
			if has_problem {
				Substate::Problem
			} else if down_deps == 0 {
				Substate::StartInitiating
			} else if mode == Mode::Never {
				Substate::WontStart
			} else if mode == Mode::Remove && listeners_empty {
				Substate::Removing
			} else if upper > 0 && mode != Mode::Passive {
				// Still ready, just waiting on a dependency; park here rather
				// than bouncing back to DOWN, which would immediately
				// re-derive START_REQUESTED from DOWN's own "listeners
				// non-empty" arm and loop forever.
				Substate::StartRequested
			} else {
				Substate::Down
			}
		}

		Substate::Problem => {
			if upper == 0 {
				match mode {
					Mode::Remove => Substate::Removing,
					Mode::Never => Substate::WontStart,
					_ => Substate::Down,
				}
			} else if !has_problem {
				if down_deps > 0 {
					Substate::StartRequested
				} else {
					Substate::StartInitiating
				}
			} else {
				Substate::Problem
			}
		}

		Substate::StartInitiating => Substate::Starting,

		Substate::Starting => {
			if counters.start_exception.is_some() {
				Substate::StartFailed
			} else {
				Substate::Up
			}
		}

		Substate::Up => {
			if upper == 0 || down_deps > 0 {
				Substate::StopRequested
			} else {
				Substate::Up
			}
		}

		Substate::StopRequested => {
			if upper > 0 && down_deps == 0 {
				Substate::Up
			} else if counters.running_dependents == 0 {
				Substate::Stopping
			} else {
				Substate::StopRequested
			}
		}

		Substate::Stopping => {
			if mode == Mode::Never {
				Substate::WontStart
			} else {
				Substate::Down
			}
		}

		Substate::StartFailed => {
			if counters.start_exception.is_none() && upper > 0 && down_deps == 0 {
				Substate::Starting
			} else if mode == Mode::Never {
				Substate::WontStart
			} else if upper == 0 || down_deps > 0 {
				Substate::Down
			} else {
				Substate::StartFailed
			}
		}

		Substate::Removing => Substate::Removed,

		Substate::New | Substate::Cancelled | Substate::Removed => counters.substate,
	}
}

/// Shared decision for `DOWN` and the "ready to leave `WONT_START`" half of
/// `WONT_START` (§4.2: "WONT_START mirrors DOWN"). Returns `None` when
/// nothing is ready to happen yet; `WONT_START`'s caller substitutes `DOWN`
/// in that case, `DOWN`'s caller stays put.
fn down_like(
	mode: Mode,
	upper: u8,
	down_deps: u32,
	listeners_empty: bool,
	has_problem: bool,
) -> Option<Substate> {
	if mode == Mode::Remove {
		return Some(Substate::Removing);
	}
	if mode == Mode::Never {
		return Some(Substate::WontStart);
	}
	let ready = upper > 0 && (mode != Mode::Passive || down_deps == 0);
	if !ready {
		return None;
	}
	if listeners_empty {
		if has_problem {
			Some(Substate::Problem)
		} else if down_deps == 0 {
			Some(Substate::StartInitiating)
		} else {
			None
		}
	} else {
		Some(Substate::StartRequested)
	}
}

fn emit_tasks(from: Substate, to: Substate, counters: &CounterBlock) -> Vec<Task> {
	if from == to {
		return Vec::new();
	}
	let mut tasks = Vec::new();

	let (from_coarse, to_coarse) = (from.coarse(), to.coarse());
	if from_coarse != to_coarse {
		tasks.push(Task::Listener(ListenerEvent::StateChanged(to_coarse)));
	}

	if to == Substate::WontStart {
		tasks.push(Task::Listener(ListenerEvent::ServiceUnavailable));
	}
	if from == Substate::WontStart {
		tasks.push(Task::Listener(ListenerEvent::ServiceAvailable));
	}

	if to == Substate::Problem {
		for name in &counters.immediate_unavailable_dependencies {
			tasks.push(Task::Listener(ListenerEvent::ImmediateDependencyUnavailable(
				Arc::clone(name),
			)));
		}
		if counters.transitive_unavailable_dep_count > 0 {
			tasks.push(Task::Listener(ListenerEvent::TransitiveDependencyUnavailable));
		}
		if counters.fail_count > 0 {
			tasks.push(Task::Listener(ListenerEvent::DependencyFailure));
		}
		tasks.push(Task::Listener(ListenerEvent::DependencyProblem));
	}
	if from == Substate::Problem {
		tasks.push(Task::Listener(ListenerEvent::DependencyProblemClear));
	}

	// The "canonical" list below is deliberately non-exhaustive in the spec
	// text; the two `NotifyDependents*Immediate*` arms close the loop the
	// overview describes (a dependency's UP/DOWN edge must reach its
	// dependents' `downDependencies`, or the graph never propagates at all).
	match (from, to) {
		(Substate::StartInitiating, Substate::Starting) => {
			tasks.push(Task::Listener(ListenerEvent::ServiceStarting));
			tasks.push(Task::Start);
		}

		(Substate::Starting, Substate::Up) => {
			tasks.push(Task::Listener(ListenerEvent::ServiceStarted));
			tasks.push(Task::NotifyDependentsImmediateUp);
			tasks.push(Task::NotifyDependenciesStarted);
		}

		(Substate::StartFailed, Substate::Down) => {
			tasks.push(Task::Listener(ListenerEvent::FailedStopped));
			tasks.push(Task::NotifyDependentsCleared);
			tasks.push(Task::Stop { only_uninject: true });
			tasks.push(Task::NotifyDependenciesStopped);
		}

		(Substate::Starting, Substate::StartFailed) => {
			tasks.push(Task::InvalidateChildren);
			tasks.push(Task::RemoveChildren);
			tasks.push(Task::NotifyDependentsFailed);
		}

		// `retry()` re-enters STARTING directly rather than looping back
		// through START_INITIATING, but it still has to invoke `start()`
		// again and it still clears the same startException a dependent
		// was told about via `NotifyDependentsFailed` (§8 scenario 3: "D
		// receives dependencyFailureCleared and then immediateDependencyUp").
		(Substate::StartFailed, Substate::Starting) => {
			tasks.push(Task::Listener(ListenerEvent::ServiceStarting));
			tasks.push(Task::NotifyDependentsCleared);
			tasks.push(Task::Start);
		}

		(Substate::StopRequested, Substate::Stopping) => {
			tasks.push(Task::Listener(ListenerEvent::ServiceStopping));
			tasks.push(Task::InvalidateChildren);
			tasks.push(Task::RemoveChildren);
			tasks.push(Task::Stop { only_uninject: false });
			tasks.push(Task::NotifyDependenciesStopped);
		}

		(Substate::Up, Substate::StopRequested) => {
			tasks.push(Task::NotifyDependentsImmediateDown);
		}

		(Substate::Stopping, Substate::Down | Substate::WontStart) => {
			tasks.push(Task::Listener(ListenerEvent::ServiceStopped));
		}

		(Substate::Removing, Substate::Removed) => {
			tasks.push(Task::Listener(ListenerEvent::Removed));
		}

		_ => {}
	}

	tasks
}
