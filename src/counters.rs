//! The counter block (§3, §4.1): the bag of integers and flags a controller
//! mutates only under its own lock, from which the automaton computes the
//! next substate.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::mode::Mode;
use crate::substate::Substate;

/// Per-controller readiness bookkeeping (§3 "Counter block").
///
/// Every field here is mutated only while the owning controller's lock is
/// held; the automaton in [`crate::automaton`] reads a snapshot of this
/// block and never mutates it directly — callers apply the counter deltas
/// §4.2/§4.4 describe, then call [`crate::automaton::transition`].
#[derive(Debug, Clone)]
pub struct CounterBlock {
	pub mode: Mode,
	pub substate: Substate,
	/// Readiness contributed by `mode`; always `0` or `1` (invariant 1, §3).
	pub upper_count: u8,
	/// Immediate dependencies (plus the parent, if any) not currently up.
	pub down_dependencies: u32,
	/// Dependents currently demanding this service.
	pub demanded_by_count: u32,
	/// Dependents currently in a running state holding this service up.
	pub running_dependents: u32,
	/// Unresolved start failures on this subtree (self or dependencies).
	pub fail_count: u32,
	/// Unresolved unavailable transitive dependencies.
	pub transitive_unavailable_dep_count: u32,
	/// Names of immediate dependencies currently absent.
	pub immediate_unavailable_dependencies: BTreeSet<Arc<str>>,
	/// Outstanding tasks: executor-queued work, in-flight listener
	/// invocations, and placeholder tokens (§5 "Placeholder tokens"). A
	/// transition may be computed only when this is zero (invariant 3).
	pub async_tasks: u64,
	/// Captured failure from the last start attempt; `None` unless the
	/// substate is `START_FAILED` or a `PROBLEM` caused by this controller's
	/// own start.
	pub start_exception: Option<Arc<str>>,
	/// Monotonic nanosecond timestamp of the most recent lifecycle-initiating
	/// transition (`UP→STOP_REQUESTED`, start initiation), for profiling.
	pub lifecycle_time: u64,
}

impl CounterBlock {
	/// A fresh block for a controller that has not yet been committed:
	/// substate `NEW`, mode `NEVER`, every counter zeroed.
	#[must_use]
	pub fn new() -> Self {
		CounterBlock {
			mode: Mode::Never,
			substate: Substate::New,
			upper_count: 0,
			down_dependencies: 0,
			demanded_by_count: 0,
			running_dependents: 0,
			fail_count: 0,
			transitive_unavailable_dep_count: 0,
			immediate_unavailable_dependencies: BTreeSet::new(),
			async_tasks: 0,
			start_exception: None,
			lifecycle_time: 0,
		}
	}

	/// `hasProblem() := !immediateUnavailableDependencies.empty ∨
	/// transitiveUnavailableDepCount>0 ∨ failCount>0` (§4.1).
	#[must_use]
	pub fn has_problem(&self) -> bool {
		!self.immediate_unavailable_dependencies.is_empty()
			|| self.transitive_unavailable_dep_count > 0
			|| self.fail_count > 0
	}

	/// Whether this controller currently demands its own dependencies, i.e.
	/// whether `DemandParents` has logically been applied (mirrors `mode`
	/// and `demandedByCount` per the mode-transition table of §4.3 — used by
	/// callers deciding whether a mode change's demand deltas are
	/// observable).
	#[must_use]
	pub fn is_demanded(&self) -> bool {
		self.demanded_by_count > 0
	}
}

impl Default for CounterBlock {
	fn default() -> Self {
		Self::new()
	}
}
