//! The `Service` callback contract (§6 "Service callback") and the
//! per-invocation contexts given to `start`/`stop`.
//!
//! `start`/`stop` are user code; the core only ever treats them as opaque
//! callbacks with either synchronous or asynchronous completion (§1). The
//! exception-driven `StartException` of the source becomes the explicit
//! [`StartOutcome`] sum type here (§9 design note).

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{ContextError, StartError};
use crate::executor::Executor;

/// User-supplied lifecycle logic for one service.
///
/// Implementations must not hold the controller lock (they have no access
/// to it) and should push genuinely long-running work onto
/// [`StartContext::execute`]/[`StopContext::execute`] rather than blocking
/// the calling executor thread.
pub trait Service: Send + Sync {
	/// The value this service contributes while `UP`, returned by
	/// [`crate::controller::ServiceController::value`].
	type Value: Send + Sync + 'static;

	fn start(&self, ctx: &Arc<StartContext<Self::Value>>) -> StartOutcome<Self::Value>;
	fn stop(&self, ctx: &Arc<StopContext>) -> StopOutcome;
}

/// Result of a (possibly still in-flight) `start` call.
pub enum StartOutcome<V> {
	/// The service is up; `0` is the value dependents and `getValue()` see.
	Complete(V),
	/// `ctx` will receive [`StartContext::complete`] or
	/// [`StartContext::failed`] later, possibly from another thread. The
	/// controller keeps one `asyncTasks` token outstanding until then.
	Async,
	Failed(StartError),
}

/// Result of a (possibly still in-flight) `stop` call. A synchronous
/// failure is logged and treated as completion (§7 item 2) — there is no
/// `Failed` variant.
pub enum StopOutcome {
	Complete,
	Async,
}

/// Lifecycle phase of one context, tracked so a late or duplicate
/// `complete`/`failed` call is rejected rather than silently accepted (§7
/// item 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Sync,
	Async,
	Complete,
	Failed,
}

/// Common fields shared by [`StartContext`] and [`StopContext`].
struct ContextCore {
	phase: Mutex<Phase>,
	lifecycle_time: u64,
	now: u64,
	executor: Arc<dyn Executor>,
	/// Invoked exactly once, after `complete`/`failed` records its outcome,
	/// so the controller can reacquire its lock and continue the automaton.
	/// Left unset for a context whose call completed synchronously.
	on_settle: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ContextCore {
	fn new(lifecycle_time: u64, now: u64, executor: Arc<dyn Executor>) -> Self {
		ContextCore {
			phase: Mutex::new(Phase::Sync),
			lifecycle_time,
			now,
			executor,
			on_settle: Mutex::new(None),
		}
	}

	fn elapsed(&self) -> Duration {
		Duration::from_nanos(self.now.saturating_sub(self.lifecycle_time))
	}

	fn execute(&self, job: Box<dyn FnOnce() + Send>) {
		self.executor.execute(job);
	}

	fn mark_async(&self, on_settle: Box<dyn FnOnce() + Send>) {
		*self.phase.lock() = Phase::Async;
		*self.on_settle.lock() = Some(on_settle);
	}

	fn phase(&self) -> Phase {
		*self.phase.lock()
	}

	fn fire_on_settle(&self) {
		if let Some(job) = self.on_settle.lock().take() {
			job();
		}
	}
}

/// Handle passed to [`Service::start`] (§6).
pub struct StartContext<V> {
	core: ContextCore,
	child_target: Option<Arc<dyn ChildTarget>>,
	value_slot: Mutex<Option<V>>,
	error_slot: Mutex<Option<StartError>>,
}

impl<V> StartContext<V> {
	pub(crate) fn new(
		child_target: Option<Arc<dyn ChildTarget>>,
		lifecycle_time: u64,
		now: u64,
		executor: Arc<dyn Executor>,
	) -> Self {
		StartContext {
			core: ContextCore::new(lifecycle_time, now, executor),
			child_target,
			value_slot: Mutex::new(None),
			error_slot: Mutex::new(None),
		}
	}

	/// A handle for installing child services during `start` (§6
	/// `getChildTarget`). `None` for controllers without a builder hookup.
	#[must_use]
	pub fn child_target(&self) -> Option<&Arc<dyn ChildTarget>> {
		self.child_target.as_ref()
	}

	/// Time elapsed since this start's lifecycle-initiating transition (§6
	/// `getElapsedTime`).
	#[must_use]
	pub fn elapsed(&self) -> Duration {
		self.core.elapsed()
	}

	/// Schedules `job` on the same executor the controller uses (§6
	/// `execute`).
	pub fn execute(&self, job: Box<dyn FnOnce() + Send>) {
		self.core.execute(job);
	}

	pub(crate) fn mark_async(&self, on_settle: Box<dyn FnOnce() + Send>) {
		self.core.mark_async(on_settle);
	}

	pub(crate) fn phase(&self) -> Phase {
		self.core.phase()
	}

	pub(crate) fn take_value(&self) -> Option<V> {
		self.value_slot.lock().take()
	}

	pub(crate) fn take_error(&self) -> Option<StartError> {
		self.error_slot.lock().take()
	}

	/// Signals asynchronous start completion with `value` (§5 "Context
	/// object"). Only legal while the phase is `Async`.
	pub fn complete(&self, value: V) -> Result<(), ContextError> {
		{
			let mut phase = self.core.phase.lock();
			if *phase != Phase::Async {
				return Err(ContextError::CompleteOutsideAsync { current: *phase });
			}
			*self.value_slot.lock() = Some(value);
			*phase = Phase::Complete;
		}
		self.core.fire_on_settle();
		Ok(())
	}

	/// Signals asynchronous start failure (§6 `failed(StartException)`).
	/// Only legal while the phase is `Async`.
	pub fn failed(&self, error: StartError) -> Result<(), ContextError> {
		{
			let mut phase = self.core.phase.lock();
			if *phase != Phase::Async {
				return Err(ContextError::FailedOutsideAsync { current: *phase });
			}
			*self.error_slot.lock() = Some(error);
			*phase = Phase::Failed;
		}
		self.core.fire_on_settle();
		Ok(())
	}
}

/// Handle passed to [`Service::stop`] (§6). Stop has no `failed()`: a stop
/// failure is logged and the controller proceeds to `DOWN` regardless (§7
/// item 2).
pub struct StopContext {
	core: ContextCore,
}

impl StopContext {
	pub(crate) fn new(lifecycle_time: u64, now: u64, executor: Arc<dyn Executor>) -> Self {
		StopContext {
			core: ContextCore::new(lifecycle_time, now, executor),
		}
	}

	#[must_use]
	pub fn elapsed(&self) -> Duration {
		self.core.elapsed()
	}

	pub fn execute(&self, job: Box<dyn FnOnce() + Send>) {
		self.core.execute(job);
	}

	pub(crate) fn mark_async(&self, on_settle: Box<dyn FnOnce() + Send>) {
		self.core.mark_async(on_settle);
	}

	pub(crate) fn phase(&self) -> Phase {
		self.core.phase()
	}

	/// Signals asynchronous stop completion. Only legal while the phase is
	/// `Async`.
	pub fn complete(&self) -> Result<(), ContextError> {
		{
			let mut phase = self.core.phase.lock();
			if *phase != Phase::Async {
				return Err(ContextError::CompleteOutsideAsync { current: *phase });
			}
			*phase = Phase::Complete;
		}
		self.core.fire_on_settle();
		Ok(())
	}
}

/// Opaque hook for installing child services during `start` (§6
/// `getChildTarget`). The concrete builder API that interprets this handle
/// is out of scope (§1); the core only stores and forwards it.
pub trait ChildTarget: Send + Sync {}
