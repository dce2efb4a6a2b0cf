//! Deferred, off-lock work items (§5 "Out of scope: executor").
//!
//! A [`Task`] is pure data describing one unit of work a controller's
//! automaton or mode-transition table decided needs to happen outside the
//! lock that decided it (§4.2, §4.3, §5 ordering guarantee 3). The
//! controller builds these while holding its lock and hands them to the
//! configured [`crate::executor::Executor`] only after releasing it.
//!
//! Grouping every deferred effect into one enum, rather than one method call
//! per effect, keeps the lock-holding code a single match arm per transition
//! and keeps the "what happens off-lock" surface auditable in one place.

use std::sync::Arc;

use crate::listener::ListenerEvent;

/// One deferred unit of work produced while a controller's lock was held.
#[derive(Debug, Clone)]
pub enum Task {
	/// Invoke [`crate::service::Service::start`] (§4.2 `START_INITIATING→STARTING`).
	Start,
	/// Invoke [`crate::service::Service::stop`] (§4.2 `STOPPING`).
	///
	/// `only_uninject` is set when the stop is a cleanup of a failed start
	/// that never reached `UP` (§4.2 `START_FAILED` entry); such a stop may
	/// skip a real shutdown sequence and only needs to release injected
	/// dependency values.
	Stop { only_uninject: bool },
	/// Deliver `event` to every listener currently registered on this
	/// controller (§6 "Listener"), in registration order (§9 Open Question:
	/// listener order resolved as emission order).
	Listener(ListenerEvent),
	/// Call [`crate::dependency::Dependency::add_demand`] on every
	/// dependency of this controller (mode-transition table of §4.3).
	DemandParents,
	/// Call [`crate::dependency::Dependency::remove_demand`] on every
	/// dependency of this controller (mode-transition table of §4.3).
	UndemandParents,
	/// Call [`crate::dependency::Dependent::immediate_dependency_up`] or
	/// `_down` on every dependent of this controller (§4.4).
	NotifyDependentsImmediateUp,
	NotifyDependentsImmediateDown,
	/// Call [`crate::dependency::Dependent::immediate_dependency_available`]
	/// or `_unavailable` on every dependent, identifying this controller by
	/// `name` (§4.4).
	NotifyDependentsAvailable { name: Arc<str> },
	NotifyDependentsUnavailable { name: Arc<str> },
	/// Call [`crate::dependency::Dependent::transitive_dependency_available`]
	/// or `_unavailable` on every dependent (§4.4).
	NotifyDependentsTransitiveAvailable,
	NotifyDependentsTransitiveUnavailable,
	/// Call [`crate::dependency::Dependent::dependency_failed`] or
	/// `_cleared` on every dependent (§4.4).
	NotifyDependentsFailed,
	NotifyDependentsCleared,
	/// Call [`crate::dependency::Dependency::dependent_started`] or
	/// `_stopped` on every dependency of this controller (§3
	/// `runningDependents`).
	NotifyDependenciesStarted,
	NotifyDependenciesStopped,
	/// Invalidate the placeholder count this controller's children hold
	/// against it, re-evaluating whether each child may now leave
	/// `STARTING`/`STOP_REQUESTED` (§4.2 `STARTING→START_FAILED` and
	/// `STOP_REQUESTED→STOPPING` bullets on child cascades).
	InvalidateChildren,
	/// Request removal of every child controller, cascading a `REMOVE`
	/// mode change downward (§4.2 `REMOVING` entry).
	RemoveChildren,
}
