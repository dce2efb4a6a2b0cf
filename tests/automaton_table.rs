//! Exercises `automaton::transition` directly against representative rows
//! of the substate table, independent of any controller or executor.

use std::collections::BTreeSet;
use std::sync::Arc;

use trellis::automaton::transition;
use trellis::counters::CounterBlock;
use trellis::listener::ListenerEvent;
use trellis::mode::Mode;
use trellis::substate::{State, Substate};
use trellis::task::Task;

fn counters(substate: Substate, mode: Mode) -> CounterBlock {
	let mut c = CounterBlock::new();
	c.substate = substate;
	c.mode = mode;
	c
}

#[test]
fn down_stays_down_without_demand() {
	let c = counters(Substate::Down, Mode::OnDemand);
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::Down);
	assert!(outcome.tasks.is_empty());
}

#[test]
fn down_to_start_initiating_when_demanded_and_no_listeners() {
	let mut c = counters(Substate::Down, Mode::Active);
	c.upper_count = 1;
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::StartInitiating);
	assert!(matches!(outcome.tasks.as_slice(), [Task::Listener(ListenerEvent::StateChanged(State::Starting))]));
}

#[test]
fn down_to_start_requested_when_listeners_present() {
	let mut c = counters(Substate::Down, Mode::Active);
	c.upper_count = 1;
	let outcome = transition(&c, false);
	assert_eq!(outcome.substate, Substate::StartRequested);
}

#[test]
fn down_to_wont_start_on_never() {
	let c = counters(Substate::Down, Mode::Never);
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::WontStart);
	assert!(matches!(
		outcome.tasks.as_slice(),
		[Task::Listener(ListenerEvent::ServiceUnavailable)]
	));
}

#[test]
fn down_to_removing_on_remove() {
	let c = counters(Substate::Down, Mode::Remove);
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::Removing);
}

#[test]
fn down_with_problem_goes_to_problem_and_names_the_cause() {
	let mut c = counters(Substate::Down, Mode::Active);
	c.upper_count = 1;
	c.fail_count = 1;
	let name: Arc<str> = Arc::from("dep-a");
	c.immediate_unavailable_dependencies.insert(Arc::clone(&name));
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::Problem);
	assert!(outcome
		.tasks
		.iter()
		.any(|t| matches!(t, Task::Listener(ListenerEvent::ImmediateDependencyUnavailable(n)) if *n == name)));
	assert!(outcome
		.tasks
		.iter()
		.any(|t| matches!(t, Task::Listener(ListenerEvent::DependencyFailure))));
	assert!(outcome
		.tasks
		.iter()
		.any(|t| matches!(t, Task::Listener(ListenerEvent::DependencyProblem))));
}

#[test]
fn start_initiating_always_advances_to_starting_and_emits_start() {
	let c = counters(Substate::StartInitiating, Mode::Active);
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::Starting);
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::Listener(ListenerEvent::ServiceStarting))));
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::Start)));
}

#[test]
fn starting_without_exception_reaches_up_and_notifies_dependents() {
	let c = counters(Substate::Starting, Mode::Active);
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::Up);
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::Listener(ListenerEvent::ServiceStarted))));
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::NotifyDependentsImmediateUp)));
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::NotifyDependenciesStarted)));
}

#[test]
fn starting_with_exception_fails_and_invalidates_children() {
	let mut c = counters(Substate::Starting, Mode::Active);
	c.start_exception = Some(Arc::from("boom"));
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::StartFailed);
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::InvalidateChildren)));
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::RemoveChildren)));
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::NotifyDependentsFailed)));
}

#[test]
fn up_drops_to_stop_requested_when_upper_count_withdraws() {
	let mut c = counters(Substate::Up, Mode::Active);
	c.upper_count = 0;
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::StopRequested);
	assert!(matches!(outcome.tasks.as_slice(), [Task::NotifyDependentsImmediateDown]));
}

#[test]
fn up_stays_up_while_nothing_withdraws() {
	let mut c = counters(Substate::Up, Mode::Active);
	c.upper_count = 1;
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::Up);
	assert!(outcome.tasks.is_empty());
}

#[test]
fn stop_requested_recovers_to_up_when_conditions_return() {
	let mut c = counters(Substate::StopRequested, Mode::Active);
	c.upper_count = 1;
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::Up);
	assert!(outcome.tasks.is_empty());
}

#[test]
fn stop_requested_waits_for_running_dependents() {
	let mut c = counters(Substate::StopRequested, Mode::Active);
	c.running_dependents = 2;
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::StopRequested);
	assert!(outcome.tasks.is_empty());
}

#[test]
fn stop_requested_proceeds_to_stopping_once_dependents_drain() {
	let c = counters(Substate::StopRequested, Mode::Active);
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::Stopping);
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::Listener(ListenerEvent::ServiceStopping))));
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::Stop { only_uninject: false })));
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::NotifyDependenciesStopped)));
}

#[test]
fn stopping_lands_on_down_and_notifies_stopped() {
	let c = counters(Substate::Stopping, Mode::Active);
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::Down);
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::Listener(ListenerEvent::ServiceStopped))));
}

#[test]
fn stopping_lands_on_wont_start_under_never() {
	let c = counters(Substate::Stopping, Mode::Never);
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::WontStart);
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::Listener(ListenerEvent::ServiceStopped))));
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::Listener(ListenerEvent::ServiceUnavailable))));
}

#[test]
fn start_failed_cleans_up_once_conditions_leave_it_up() {
	let mut c = counters(Substate::StartFailed, Mode::Active);
	c.upper_count = 0;
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::Down);
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::Listener(ListenerEvent::FailedStopped))));
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::NotifyDependentsCleared)));
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::Stop { only_uninject: true })));
}

#[test]
fn start_failed_retries_once_exception_clears() {
	let mut c = counters(Substate::StartFailed, Mode::Active);
	c.upper_count = 1;
	c.start_exception = None;
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::Starting);
}

#[test]
fn removing_always_advances_to_removed() {
	let c = counters(Substate::Removing, Mode::Remove);
	let outcome = transition(&c, true);
	assert_eq!(outcome.substate, Substate::Removed);
	assert!(outcome.tasks.iter().any(|t| matches!(t, Task::Listener(ListenerEvent::Removed))));
	assert!(outcome
		.tasks
		.iter()
		.any(|t| matches!(t, Task::Listener(ListenerEvent::StateChanged(State::Removed)))));
}

#[test]
fn terminal_substates_never_move() {
	for substate in [Substate::New, Substate::Cancelled, Substate::Removed] {
		let c = counters(substate, Mode::Active);
		let outcome = transition(&c, true);
		assert_eq!(outcome.substate, substate);
		assert!(outcome.tasks.is_empty());
	}
}
