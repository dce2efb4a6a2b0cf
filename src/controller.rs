//! The controller (§4.3, §4.4): owns the counter block, the per-service
//! lock, the listener and dependent sets, and schedules every deferred
//! [`Task`] the automaton emits. 45% of this crate by the original budget —
//! every other module exists to serve this one.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::automaton;
use crate::container::ContainerContext;
use crate::counters::CounterBlock;
use crate::dependency::{Dependency, Dependent};
use crate::error::{ListenerError, ModeError, RetryError, ValueUnavailable};
use crate::listener::{Listener, ListenerEvent};
use crate::mode::{mode_transition, Mode};
use crate::service::{Phase, Service, StartContext, StartOutcome, StopContext, StopOutcome};
use crate::substate::{State, Substate};
use crate::task::Task;

/// A controller's owned child, notified of cascading removal (§3
/// "Parent/child edge", §4.2 `STARTING→START_FAILED`/`STOP_REQUESTED→STOPPING`
/// child-invalidation bullets).
pub trait ChildHandle: Send + Sync {
	/// Requests removal, invoking `on_removed` once this child reaches
	/// `REMOVED` (immediately, if it already has).
	fn request_remove(&self, on_removed: Box<dyn FnOnce() + Send>);
}

struct Inner<V> {
	counters: CounterBlock,
	value: Option<Arc<V>>,
}

/// The per-service state machine (§2).
///
/// Constructed via [`ServiceController::new`], wired to its dependencies
/// and listeners, then finalized with [`ServiceController::commit`] (§3
/// invariant 8). Every mutating operation acquires [`Self::inner`]'s lock,
/// updates counters, runs the automaton, and submits the resulting tasks
/// only after releasing the lock.
pub struct ServiceController<S: Service> {
	name: Arc<str>,
	aliases: Vec<Arc<str>>,
	service: S,
	/// Outbound dependency edges, in builder order, with the parent (if
	/// any) appended last (§3 "Parent/child edge": "a child... contributes
	/// +1 to downDependencies until the parent is up").
	dependencies: Vec<Arc<dyn Dependency>>,
	/// Dependents registered on this controller via its own [`Dependency`]
	/// impl — i.e. who depends on this service.
	dependents: Mutex<Vec<Arc<dyn Dependent>>>,
	children: Mutex<Vec<Arc<dyn ChildHandle>>>,
	listeners: Mutex<Vec<Arc<dyn Listener>>>,
	/// Fired once each, in order, when this controller reaches `REMOVED`;
	/// drained by the `REMOVING→REMOVED` listener task.
	on_removed: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
	inner: Mutex<Inner<S::Value>>,
	container: Arc<dyn ContainerContext>,
	/// Handle for installing child services during `start` (§6
	/// `getChildTarget`), forwarded into every [`StartContext`] this
	/// controller builds. Opaque to the core: only the builder that supplied
	/// it knows how to interpret it (§1 "Out of scope").
	child_target: Option<Arc<dyn crate::service::ChildTarget>>,
	self_weak: Weak<ServiceController<S>>,
}

/// Everything [`ServiceController::new`] needs from the builder (§6
/// "Builder-supplied inputs"). `service value, location` map to `service`
/// and `name`; forward/out injections are represented by `dependencies`
/// (the core only needs edges, not injection targets, which are out of
/// scope, §1).
pub struct Registration<S: Service> {
	pub name: Arc<str>,
	pub aliases: Vec<Arc<str>>,
	pub service: S,
	pub dependencies: Vec<Arc<dyn Dependency>>,
	pub parent: Option<Arc<dyn Dependency>>,
	pub initial_listeners: Vec<Arc<dyn Listener>>,
	pub container: Arc<dyn ContainerContext>,
	/// Handle the builder supplies for installing child services during
	/// `start` (§6 `getChildTarget`); `None` if this service never installs
	/// children.
	pub child_target: Option<Arc<dyn crate::service::ChildTarget>>,
}

impl<S: Service + 'static> ServiceController<S> {
	/// Builder step `startInstallation` + wiring (§3 invariant 8). The
	/// controller starts in [`Substate::New`]; call [`Self::commit`] to
	/// finalize it.
	#[must_use]
	pub fn new(reg: Registration<S>) -> Arc<Self> {
		let mut dependencies = reg.dependencies;
		if let Some(parent) = reg.parent {
			dependencies.push(parent);
		}
		let down_dependencies = dependencies.len() as u32;

		Arc::new_cyclic(|self_weak| {
			let mut counters = CounterBlock::new();
			counters.down_dependencies = down_dependencies;
			ServiceController {
				name: reg.name,
				aliases: reg.aliases,
				service: reg.service,
				dependencies,
				dependents: Mutex::new(Vec::new()),
				children: Mutex::new(Vec::new()),
				listeners: Mutex::new(reg.initial_listeners),
				on_removed: Mutex::new(Vec::new()),
				inner: Mutex::new(Inner { counters, value: None }),
				container: reg.container,
				child_target: reg.child_target,
				self_weak: self_weak.clone(),
			}
		})
	}

	#[must_use]
	pub fn name(&self) -> &Arc<str> {
		&self.name
	}

	#[must_use]
	pub fn aliases(&self) -> &[Arc<str>] {
		&self.aliases
	}

	/// Registers `child` as owned by this controller; it is cascaded to
	/// `REMOVE` when this controller leaves `UP` (§3 "Parent/child edge").
	pub fn add_child(&self, child: Arc<dyn ChildHandle>) {
		self.children.lock().push(child);
	}

	/// `commitInstallation(initialMode)` (§3 invariant 8, §4.3): atomically
	/// seeds the automaton. Must be called exactly once, before any other
	/// public operation except [`Self::add_listener`] (which, pre-commit,
	/// only stores the listener).
	pub fn commit(self: &Arc<Self>, initial_mode: Mode) {
		let mut inner = self.inner.lock();
		inner.counters.substate = Substate::Down;
		inner.counters.mode = initial_mode;
		inner.counters.upper_count = crate::mode::upper_contribution(initial_mode, inner.counters.demanded_by_count > 0);
		let listeners_empty = self.listeners.lock().is_empty();
		let mut tasks = self.run_transition(&mut inner.counters, listeners_empty);
		// Listeners passed in as part of the initial set were stored silently
		// while still NEW (§4.3 addListener: "stored only"); commit is the
		// first point past NEW, so they are caught up here, ahead of whatever
		// the automaton above already decided (matching scenario order: `L`
		// sees `listenerAdded` before `serviceStarting`).
		if !listeners_empty {
			inner.counters.async_tasks += 1;
			tasks.insert(0, Task::Listener(ListenerEvent::ListenerAdded));
		}
		drop(inner);
		self.dispatch_tasks(tasks);
	}

	/// Removes this controller before installation ever completed:
	/// `NEW→CANCELLED`. No-op if already committed.
	pub fn cancel(&self) {
		let mut inner = self.inner.lock();
		if inner.counters.substate == Substate::New {
			inner.counters.substate = Substate::Cancelled;
		}
	}

	// ---- §4.3 public contract ----

	/// `setMode(newMode)` (§4.3).
	pub fn set_mode(self: &Arc<Self>, new_mode: Mode) -> Result<(), ModeError> {
		if self.container.is_shutdown() && new_mode != Mode::Remove {
			return Err(ModeError::ShuttingDown { attempted: new_mode });
		}
		let mut inner = self.inner.lock();
		let demanded = inner.counters.demanded_by_count > 0;
		let result = mode_transition(inner.counters.mode, new_mode, demanded)?;
		inner.counters.mode = new_mode;
		inner.counters.upper_count = crate::mode::upper_contribution(new_mode, demanded);
		let mut tasks = result.tasks;
		inner.counters.async_tasks += tasks.len() as u64;
		let listeners_empty = self.listeners.lock().is_empty();
		tasks.extend(self.run_transition(&mut inner.counters, listeners_empty));
		drop(inner);
		self.dispatch_tasks(tasks);
		Ok(())
	}

	/// `compareAndSetMode(expected, new)` (§4.3): no-op if current mode
	/// differs from `expected`.
	pub fn compare_and_set_mode(self: &Arc<Self>, expected: Mode, new_mode: Mode) -> Result<bool, ModeError> {
		{
			let inner = self.inner.lock();
			if inner.counters.mode != expected {
				return Ok(false);
			}
		}
		self.set_mode(new_mode).map(|()| true)
	}

	/// `addListener` (§4.3): duplicates are rejected; a pre-commit listener
	/// is stored only, otherwise it is notified `ListenerAdded` and, if
	/// already terminal, the terminal-state notification too. Re-entrant
	/// calls during removal are allowed (§9 Open Question c).
	pub fn add_listener(&self, listener: Arc<dyn Listener>) -> Result<(), ListenerError> {
		let substate = { self.inner.lock().counters.substate };
		{
			let mut listeners = self.listeners.lock();
			if listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
				return Err(ListenerError::AlreadyRegistered);
			}
			listeners.push(Arc::clone(&listener));
		}
		if substate != Substate::New {
			listener.on_event(&self.name, &ListenerEvent::ListenerAdded);
			if substate == Substate::Removed {
				listener.on_event(&self.name, &ListenerEvent::Removed);
			}
		}
		Ok(())
	}

	/// `removeListener` (§4.3).
	pub fn remove_listener(&self, listener: &Arc<dyn Listener>) {
		self.listeners.lock().retain(|l| !Arc::ptr_eq(l, listener));
	}

	/// `retry()` (§4.3): only legal while coarse state is `START_FAILED`.
	pub fn retry(self: &Arc<Self>) -> Result<(), RetryError> {
		let mut inner = self.inner.lock();
		if inner.counters.substate != Substate::StartFailed {
			return Err(RetryError);
		}
		debug_assert!(inner.counters.fail_count > 0, "START_FAILED implies fail_count>0");
		inner.counters.fail_count -= 1;
		inner.counters.start_exception = None;
		let listeners_empty = self.listeners.lock().is_empty();
		let tasks = self.run_transition(&mut inner.counters, listeners_empty);
		drop(inner);
		self.dispatch_tasks(tasks);
		Ok(())
	}

	/// `getValue()` (§4.3): the running service's value, or an error when
	/// not currently started.
	pub fn value(&self) -> Result<Arc<S::Value>, ValueUnavailable> {
		let inner = self.inner.lock();
		match (&inner.value, inner.counters.substate) {
			(Some(v), Substate::Up | Substate::StopRequested) => Ok(Arc::clone(v)),
			_ => Err(ValueUnavailable),
		}
	}

	#[must_use]
	pub fn mode(&self) -> Mode {
		self.inner.lock().counters.mode
	}

	#[must_use]
	pub fn substate(&self) -> Substate {
		self.inner.lock().counters.substate
	}

	#[must_use]
	pub fn state(&self) -> State {
		self.substate().coarse()
	}

	#[must_use]
	pub fn immediate_unavailable_dependencies(&self) -> Vec<Arc<str>> {
		self.inner
			.lock()
			.counters
			.immediate_unavailable_dependencies
			.iter()
			.cloned()
			.collect()
	}

	// ---- automaton driving ----

	/// Runs the automaton until quiescence or until a transition produces
	/// tasks (invariant 3, §3): `asyncTasks==0` is the only precondition,
	/// so a chain of task-free transitions (e.g. `STOP_REQUESTED`'s
	/// recovery arm) is driven all the way through in one lock hold.
	fn run_transition(&self, counters: &mut CounterBlock, listeners_empty: bool) -> Vec<Task> {
		let mut tasks = Vec::new();
		loop {
			if counters.async_tasks != 0 || counters.substate.is_terminal() {
				break;
			}
			let from = counters.substate;
			let outcome = automaton::transition(counters, listeners_empty);
			if outcome.substate == from {
				break;
			}
			self.apply_counter_side_effects(counters, from, outcome.substate);
			log::debug!("{}: {from} -> {} ({} task(s))", self.name, outcome.substate, outcome.tasks.len());
			counters.substate = outcome.substate;
			counters.async_tasks += outcome.tasks.len() as u64;
			tasks.extend(outcome.tasks);
		}
		tasks
	}

	/// Counter mutations tied to specific transitions that are not
	/// themselves tasks (§4.2: "clear startException, decrement failCount";
	/// "stamp lifecycleTime").
	fn apply_counter_side_effects(&self, counters: &mut CounterBlock, from: Substate, to: Substate) {
		match (from, to) {
			(Substate::StartFailed, Substate::Down) => {
				counters.start_exception = None;
				counters.fail_count = counters.fail_count.saturating_sub(1);
			}
			(_, Substate::StartInitiating) | (Substate::Up, Substate::StopRequested) => {
				counters.lifecycle_time = self.container.now_nanos();
			}
			_ => {}
		}
	}

	fn dispatch_tasks(self: &Arc<Self>, tasks: Vec<Task>) {
		for task in tasks {
			log::trace!("{}: dispatching {task:?}", self.name);
			let this = Arc::clone(self);
			self.container.executor().execute(Box::new(move || this.run_task(task)));
		}
	}

	/// One deferred task, running off the controller lock (§5).
	fn run_task(self: Arc<Self>, task: Task) {
		match task {
			Task::Start => self.do_start(),
			Task::Stop { only_uninject } => self.do_stop(only_uninject),
			Task::RemoveChildren => self.do_remove_children(),
			other => {
				// `complete_task` must run even if `run_simple_task` panics
				// (e.g. a misbehaving `Dependent` impl reached through
				// `for_each_dependent`) — otherwise `asyncTasks` never
				// reconciles and this controller is stuck forever (§7
				// "Propagation policy").
				let this = scopeguard::guard(self, |this| this.complete_task());
				this.run_simple_task(other);
			}
		}
	}

	fn run_simple_task(&self, task: Task) {
		match task {
			Task::Listener(event) => {
				self.notify_listeners(&event);
				if matches!(event, ListenerEvent::Removed) {
					self.listeners.lock().clear();
					let callbacks = std::mem::take(&mut *self.on_removed.lock());
					for cb in callbacks {
						cb();
					}
				}
			}
			Task::DemandParents => {
				for dep in &self.dependencies {
					dep.add_demand();
				}
			}
			Task::UndemandParents => {
				for dep in &self.dependencies {
					dep.remove_demand();
				}
			}
			Task::NotifyDependentsImmediateUp => self.for_each_dependent(|d| d.immediate_dependency_up()),
			Task::NotifyDependentsImmediateDown => self.for_each_dependent(|d| d.immediate_dependency_down()),
			Task::NotifyDependentsAvailable { name } => {
				self.for_each_dependent(move |d| d.immediate_dependency_available(Arc::clone(&name)));
			}
			Task::NotifyDependentsUnavailable { name } => {
				self.for_each_dependent(move |d| d.immediate_dependency_unavailable(Arc::clone(&name)));
			}
			Task::NotifyDependentsTransitiveAvailable => {
				self.for_each_dependent(|d| d.transitive_dependency_available());
			}
			Task::NotifyDependentsTransitiveUnavailable => {
				self.for_each_dependent(|d| d.transitive_dependency_unavailable());
			}
			Task::NotifyDependentsFailed => self.for_each_dependent(|d| d.dependency_failed()),
			Task::NotifyDependentsCleared => self.for_each_dependent(|d| d.dependency_cleared()),
			Task::NotifyDependenciesStarted => {
				for dep in &self.dependencies {
					dep.dependent_started();
				}
			}
			Task::NotifyDependenciesStopped => {
				for dep in &self.dependencies {
					dep.dependent_stopped();
				}
			}
			// The child target handle itself belongs to the out-of-scope
			// builder (§1); this controller only owns the child list
			// (`ChildHandle`), which `RemoveChildren` below already drains.
			Task::InvalidateChildren => {}
			Task::Start | Task::Stop { .. } | Task::RemoveChildren => {
				unreachable!("handled directly in run_task")
			}
		}
	}

	fn for_each_dependent(&self, f: impl Fn(Arc<dyn Dependent>)) {
		let dependents = self.dependents.lock().clone();
		for d in dependents {
			f(d);
		}
	}

	fn notify_listeners(&self, event: &ListenerEvent) {
		let listeners = self.listeners.lock().clone();
		let start_offset = self.container.now_nanos().saturating_sub(self.container.start_nanos());
		for listener in listeners {
			let name = Arc::clone(&self.name);
			let event = event.clone();
			let started_at = self.container.now_nanos();
			crate::executor::run_catching(Box::new(move || listener.on_event(&name, &event)));
			self.container.record_profile(crate::profile::ProfileEvent {
				name: Arc::clone(&self.name),
				kind: crate::profile::ProfileKind::Listener,
				start_offset_nanos: start_offset,
				duration_nanos: self.container.now_nanos().saturating_sub(started_at),
			});
		}
	}

	/// Decrements `asyncTasks` for one finished task and re-runs the
	/// automaton, submitting any further tasks it produces.
	fn complete_task(&self) {
		log::trace!("{}: task completed", self.name);
		let listeners_empty = self.listeners.lock().is_empty();
		let mut inner = self.inner.lock();
		inner.counters.async_tasks = inner.counters.async_tasks.saturating_sub(1);
		let tasks = self.run_transition(&mut inner.counters, listeners_empty);
		drop(inner);
		if let Some(this) = self.self_weak.upgrade() {
			this.dispatch_tasks(tasks);
		}
	}

	fn do_start(self: Arc<Self>) {
		let (lifecycle_time, now) = {
			let inner = self.inner.lock();
			(inner.counters.lifecycle_time, self.container.now_nanos())
		};
		let ctx = Arc::new(StartContext::new(
			self.child_target.clone(),
			lifecycle_time,
			now,
			self.container.executor(),
		));
		let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.service.start(&ctx)))
			.unwrap_or_else(|payload| {
				log::error!("service {} panicked in start(): {}", self.name, panic_message(&payload));
				StartOutcome::Failed(crate::error::StartError::new("start() panicked"))
			});
		match outcome {
			StartOutcome::Complete(value) => {
				self.finish_start(Ok(value), lifecycle_time, now);
				self.complete_task();
			}
			StartOutcome::Failed(err) => {
				self.finish_start(Err(err), lifecycle_time, now);
				self.complete_task();
			}
			StartOutcome::Async => {
				let this = Arc::clone(&self);
				let ctx_for_settle = Arc::clone(&ctx);
				ctx.mark_async(Box::new(move || {
					let result = match ctx_for_settle.phase() {
						Phase::Complete => Ok(ctx_for_settle.take_value().expect("value set on complete")),
						Phase::Failed => Err(ctx_for_settle.take_error().expect("error set on failed")),
						phase => unreachable!("settled context in phase {phase:?}"),
					};
					this.finish_start(result, lifecycle_time, now);
					this.complete_task();
				}));
			}
		}
	}

	/// Records the `S`/`X` profile line (§6 `getProfileOutput`) for this
	/// start attempt, then applies its outcome to the counters.
	fn finish_start(&self, result: Result<S::Value, crate::error::StartError>, lifecycle_time: u64, started_at: u64) {
		let kind = match &result {
			Ok(_) => crate::profile::ProfileKind::Start,
			Err(_) => crate::profile::ProfileKind::StartFailed,
		};
		self.container.record_profile(crate::profile::ProfileEvent {
			name: Arc::clone(&self.name),
			kind,
			start_offset_nanos: lifecycle_time.saturating_sub(self.container.start_nanos()),
			duration_nanos: self.container.now_nanos().saturating_sub(started_at),
		});
		let mut inner = self.inner.lock();
		match result {
			Ok(value) => {
				inner.value = Some(Arc::new(value));
				inner.counters.start_exception = None;
			}
			Err(err) => {
				inner.counters.fail_count += 1;
				inner.counters.start_exception = Some(err.message);
			}
		}
	}

	fn do_stop(self: Arc<Self>, only_uninject: bool) {
		if only_uninject {
			self.inner.lock().value = None;
			self.complete_task();
			return;
		}
		let (lifecycle_time, now) = {
			let inner = self.inner.lock();
			(inner.counters.lifecycle_time, self.container.now_nanos())
		};
		let ctx = Arc::new(StopContext::new(lifecycle_time, now, self.container.executor()));
		let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.service.stop(&ctx)));
		let panicked = result.is_err();
		let outcome = result.unwrap_or_else(|payload| {
			log::error!("service {} panicked in stop(): {}", self.name, panic_message(&payload));
			StopOutcome::Complete
		});
		if panicked {
			self.container.record_profile(crate::profile::ProfileEvent {
				name: Arc::clone(&self.name),
				kind: crate::profile::ProfileKind::StopFailed,
				start_offset_nanos: lifecycle_time.saturating_sub(self.container.start_nanos()),
				duration_nanos: self.container.now_nanos().saturating_sub(now),
			});
		}
		match outcome {
			StopOutcome::Complete => {
				self.inner.lock().value = None;
				self.complete_task();
			}
			StopOutcome::Async => {
				let this = Arc::clone(&self);
				ctx.mark_async(Box::new(move || {
					this.inner.lock().value = None;
					this.complete_task();
				}));
			}
		}
	}

	fn do_remove_children(self: Arc<Self>) {
		let children = self.children.lock().clone();
		if children.is_empty() {
			self.complete_task();
			return;
		}
		let remaining = Arc::new(AtomicUsize::new(children.len()));
		for child in children {
			let remaining = Arc::clone(&remaining);
			let this = Arc::clone(&self);
			child.request_remove(Box::new(move || {
				if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
					this.complete_task();
				}
			}));
		}
	}
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> &str {
	payload
		.downcast_ref::<&str>()
		.copied()
		.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
		.unwrap_or("<non-string panic payload>")
}

impl<S: Service + 'static> ChildHandle for ServiceController<S> {
	fn request_remove(&self, on_removed: Box<dyn FnOnce() + Send>) {
		let already_removed = self.inner.lock().counters.substate == Substate::Removed;
		if already_removed {
			on_removed();
			return;
		}
		self.on_removed.lock().push(on_removed);
		if let Some(this) = self.self_weak.upgrade() {
			let _ = this.set_mode(Mode::Remove);
		}
	}
}

impl<S: Service + 'static> Dependency for ServiceController<S> {
	fn add_dependent(&self, dependent: Arc<dyn Dependent>) {
		self.dependents.lock().push(dependent);
	}

	fn remove_dependent(&self, dependent: &Arc<dyn Dependent>) {
		self.dependents.lock().retain(|d| !Arc::ptr_eq(d, dependent));
	}

	fn add_demand(&self) {
		let Some(this) = self.self_weak.upgrade() else { return };
		let mut inner = self.inner.lock();
		inner.counters.demanded_by_count += 1;
		let demanded = inner.counters.demanded_by_count > 0;
		inner.counters.upper_count = crate::mode::upper_contribution(inner.counters.mode, demanded);
		let listeners_empty = self.listeners.lock().is_empty();
		let tasks = self.run_transition(&mut inner.counters, listeners_empty);
		drop(inner);
		this.dispatch_tasks(tasks);
	}

	fn remove_demand(&self) {
		let Some(this) = self.self_weak.upgrade() else { return };
		let mut inner = self.inner.lock();
		debug_assert!(inner.counters.demanded_by_count > 0, "removeDemand without matching addDemand");
		inner.counters.demanded_by_count = inner.counters.demanded_by_count.saturating_sub(1);
		let demanded = inner.counters.demanded_by_count > 0;
		inner.counters.upper_count = crate::mode::upper_contribution(inner.counters.mode, demanded);
		let listeners_empty = self.listeners.lock().is_empty();
		let tasks = self.run_transition(&mut inner.counters, listeners_empty);
		drop(inner);
		this.dispatch_tasks(tasks);
	}

	fn dependent_started(&self) {
		self.inner.lock().counters.running_dependents += 1;
	}

	fn dependent_stopped(&self) {
		let Some(this) = self.self_weak.upgrade() else { return };
		let mut inner = self.inner.lock();
		debug_assert!(inner.counters.running_dependents > 0, "dependentStopped without matching dependentStarted");
		inner.counters.running_dependents -= 1;
		if inner.counters.running_dependents == 0 {
			let listeners_empty = self.listeners.lock().is_empty();
			let tasks = self.run_transition(&mut inner.counters, listeners_empty);
			drop(inner);
			this.dispatch_tasks(tasks);
		}
	}

	fn name(&self) -> Arc<str> {
		Arc::clone(&self.name)
	}

	fn value(&self) -> Result<Arc<dyn std::any::Any + Send + Sync>, ValueUnavailable> {
		self.value().map(|v| v as Arc<dyn std::any::Any + Send + Sync>)
	}
}

/// §4.4 "Inbound protocol (Dependent)": each callback acquires the lock,
/// updates counters, runs the automaton only on the edge-triggered
/// condition the bullet describes, and forwards to this controller's own
/// dependents via a task.
impl<S: Service + 'static> Dependent for ServiceController<S> {
	fn immediate_dependency_up(self: Arc<Self>) {
		let mut inner = self.inner.lock();
		debug_assert!(inner.counters.down_dependencies > 0);
		inner.counters.down_dependencies -= 1;
		if inner.counters.down_dependencies == 0 {
			let listeners_empty = self.listeners.lock().is_empty();
			let tasks = self.run_transition(&mut inner.counters, listeners_empty);
			drop(inner);
			self.dispatch_tasks(tasks);
		}
	}

	fn immediate_dependency_down(self: Arc<Self>) {
		let mut inner = self.inner.lock();
		inner.counters.down_dependencies += 1;
		if inner.counters.down_dependencies == 1 {
			let listeners_empty = self.listeners.lock().is_empty();
			let tasks = self.run_transition(&mut inner.counters, listeners_empty);
			drop(inner);
			self.dispatch_tasks(tasks);
		}
	}

	fn immediate_dependency_available(self: Arc<Self>, name: Arc<str>) {
		let mut inner = self.inner.lock();
		let was_in_problem = inner.counters.substate == Substate::Problem;
		inner.counters.immediate_unavailable_dependencies.remove(&name);
		let mut tasks = Vec::new();
		if was_in_problem {
			tasks.push(Task::Listener(ListenerEvent::ImmediateDependencyAvailable(Arc::clone(&name))));
			if !inner.counters.has_problem() {
				tasks.push(Task::Listener(ListenerEvent::DependencyProblemClear));
			}
		}
		if inner.counters.immediate_unavailable_dependencies.is_empty() && inner.counters.transitive_unavailable_dep_count == 0 {
			tasks.push(Task::NotifyDependentsAvailable { name });
		}
		inner.counters.async_tasks += tasks.len() as u64;
		let listeners_empty = self.listeners.lock().is_empty();
		tasks.extend(self.run_transition(&mut inner.counters, listeners_empty));
		drop(inner);
		self.dispatch_tasks(tasks);
	}

	fn immediate_dependency_unavailable(self: Arc<Self>, name: Arc<str>) {
		let mut inner = self.inner.lock();
		let was_in_problem = inner.counters.substate == Substate::Problem;
		let rose_from_empty = inner.counters.immediate_unavailable_dependencies.is_empty();
		inner.counters.immediate_unavailable_dependencies.insert(Arc::clone(&name));
		let mut tasks = Vec::new();
		if rose_from_empty && inner.counters.transitive_unavailable_dep_count == 0 {
			tasks.push(Task::NotifyDependentsUnavailable { name: Arc::clone(&name) });
		}
		if was_in_problem {
			tasks.push(Task::Listener(ListenerEvent::ImmediateDependencyUnavailable(name)));
		}
		inner.counters.async_tasks += tasks.len() as u64;
		let listeners_empty = self.listeners.lock().is_empty();
		tasks.extend(self.run_transition(&mut inner.counters, listeners_empty));
		drop(inner);
		self.dispatch_tasks(tasks);
	}

	fn transitive_dependency_available(self: Arc<Self>) {
		let mut inner = self.inner.lock();
		debug_assert!(inner.counters.transitive_unavailable_dep_count > 0);
		let was_in_problem = inner.counters.substate == Substate::Problem;
		inner.counters.transitive_unavailable_dep_count -= 1;
		let mut tasks = Vec::new();
		if inner.counters.transitive_unavailable_dep_count == 0 {
			if was_in_problem {
				tasks.push(Task::Listener(ListenerEvent::TransitiveDependencyAvailable));
				if !inner.counters.has_problem() {
					tasks.push(Task::Listener(ListenerEvent::DependencyProblemClear));
				}
			}
			if inner.counters.immediate_unavailable_dependencies.is_empty() {
				tasks.push(Task::NotifyDependentsTransitiveAvailable);
			}
		}
		inner.counters.async_tasks += tasks.len() as u64;
		let listeners_empty = self.listeners.lock().is_empty();
		tasks.extend(self.run_transition(&mut inner.counters, listeners_empty));
		drop(inner);
		self.dispatch_tasks(tasks);
	}

	fn transitive_dependency_unavailable(self: Arc<Self>) {
		let mut inner = self.inner.lock();
		let was_in_problem = inner.counters.substate == Substate::Problem;
		let rose_from_zero = inner.counters.transitive_unavailable_dep_count == 0;
		inner.counters.transitive_unavailable_dep_count += 1;
		let mut tasks = Vec::new();
		if rose_from_zero {
			if inner.counters.immediate_unavailable_dependencies.is_empty() {
				tasks.push(Task::NotifyDependentsTransitiveUnavailable);
			}
			if was_in_problem {
				tasks.push(Task::Listener(ListenerEvent::TransitiveDependencyUnavailable));
			}
		}
		inner.counters.async_tasks += tasks.len() as u64;
		let listeners_empty = self.listeners.lock().is_empty();
		tasks.extend(self.run_transition(&mut inner.counters, listeners_empty));
		drop(inner);
		self.dispatch_tasks(tasks);
	}

	fn dependency_failed(self: Arc<Self>) {
		let mut inner = self.inner.lock();
		let was_in_problem = inner.counters.substate == Substate::Problem;
		let rose_from_zero = inner.counters.fail_count == 0;
		inner.counters.fail_count += 1;
		let mut tasks = Vec::new();
		if rose_from_zero {
			tasks.push(Task::NotifyDependentsFailed);
			if was_in_problem {
				tasks.push(Task::Listener(ListenerEvent::DependencyFailure));
			}
		}
		inner.counters.async_tasks += tasks.len() as u64;
		let listeners_empty = self.listeners.lock().is_empty();
		tasks.extend(self.run_transition(&mut inner.counters, listeners_empty));
		drop(inner);
		self.dispatch_tasks(tasks);
	}

	fn dependency_cleared(self: Arc<Self>) {
		let mut inner = self.inner.lock();
		debug_assert!(inner.counters.fail_count > 0);
		let was_in_problem = inner.counters.substate == Substate::Problem;
		inner.counters.fail_count -= 1;
		let mut tasks = Vec::new();
		if inner.counters.fail_count == 0 {
			tasks.push(Task::NotifyDependentsCleared);
			if was_in_problem {
				tasks.push(Task::Listener(ListenerEvent::DependencyFailureCleared));
				if !inner.counters.has_problem() {
					tasks.push(Task::Listener(ListenerEvent::DependencyProblemClear));
				}
			}
		}
		inner.counters.async_tasks += tasks.len() as u64;
		let listeners_empty = self.listeners.lock().is_empty();
		tasks.extend(self.run_transition(&mut inner.counters, listeners_empty));
		drop(inner);
		self.dispatch_tasks(tasks);
	}
}
