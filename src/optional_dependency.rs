//! The optional-dependency adapter (§4.5): presents a [`Dependency`] surface
//! to a dependent while acting as a [`Dependent`] of a real, possibly
//! not-yet-registered dependency.
//!
//! Invariant: from the outer dependent's point of view, a real dependency
//! that is not registered appears **up**; once it registers and the
//! dependent has not demanded it, the wrapper silently starts forwarding
//! the real dependency's signals; if the dependent demands the wrapper
//! before the real dependency registers, no demand is forwarded onward
//! until the dependent releases it.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::dependency::{Dependency, Dependent};
use crate::error::ValueUnavailable;

/// Last notification this wrapper has seen from the real dependency,
/// ordered `Missing < Installed < Failed, Up` so `state >= Installed` reads
/// naturally at each call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum RealState {
	/// The real dependency is not registered yet.
	Missing,
	Installed,
	Failed,
	Up,
}

struct Inner {
	real: Option<Arc<dyn Dependency>>,
	state: RealState,
	/// Remembers an outstanding `transitiveDependencyUnavailable` so it can
	/// be replayed to a dependent that registers (or starts forwarding)
	/// while it is active.
	transitive_unavailable: bool,
	demanded_by_dependent: bool,
	/// Whether real-dependency signals are currently passed through to
	/// `dependent` rather than being swallowed by the "appears up while
	/// missing" rule.
	forwarding: bool,
	dependent: Option<Arc<dyn Dependent>>,
	/// Set when a `dependentStarted` was forwarded to the real dependency,
	/// so the matching `dependentStopped` is forwarded too even if
	/// `forwarding` changed in between (§4.5 last bullet).
	started_forwarded: bool,
}

/// Adapter for an edge declared optional at install time (§4.5).
pub struct OptionalDependency {
	name: Arc<str>,
	inner: Mutex<Inner>,
}

impl OptionalDependency {
	/// Creates a wrapper for a dependency not yet registered.
	#[must_use]
	pub fn new(name: impl Into<Arc<str>>) -> Arc<Self> {
		Arc::new(OptionalDependency {
			name: name.into(),
			inner: Mutex::new(Inner {
				real: None,
				state: RealState::Missing,
				transitive_unavailable: false,
				demanded_by_dependent: false,
				forwarding: false,
				dependent: None,
				started_forwarded: false,
			}),
		})
	}

	/// Registers the real dependency (container/registry event, out of
	/// scope mechanism; §4.5 "immediateDependencyInstalled").
	pub fn install(self: &Arc<Self>, real: Arc<dyn Dependency>) {
		let mut inner = self.inner.lock();
		real.add_dependent(Arc::clone(self) as Arc<dyn Dependent>);
		inner.real = Some(real);
		inner.state = RealState::Installed;
		if !inner.demanded_by_dependent && !inner.forwarding {
			inner.forwarding = true;
			if let Some(d) = inner.dependent.clone() {
				d.immediate_dependency_down();
			}
		}
	}

	/// Deregisters the real dependency (§4.5 "immediateDependencyUninstalled").
	pub fn uninstall(self: &Arc<Self>) {
		let mut inner = self.inner.lock();
		if inner.forwarding {
			if let Some(d) = inner.dependent.clone() {
				if inner.state == RealState::Failed {
					d.dependency_cleared();
				}
				if inner.transitive_unavailable {
					d.transitive_dependency_available();
				}
				d.immediate_dependency_up();
			}
			if inner.demanded_by_dependent {
				if let Some(real) = &inner.real {
					real.remove_demand();
				}
			}
		}
		inner.forwarding = false;
		inner.state = RealState::Missing;
		inner.transitive_unavailable = false;
		inner.real = None;
	}
}

impl Dependency for OptionalDependency {
	fn add_dependent(&self, dependent: Arc<dyn Dependent>) {
		let mut inner = self.inner.lock();
		inner.forwarding = inner.state >= RealState::Installed;
		if inner.forwarding {
			match inner.state {
				RealState::Failed => dependent.clone().dependency_failed(),
				RealState::Up => dependent.clone().immediate_dependency_up(),
				_ => {}
			}
			if inner.transitive_unavailable {
				dependent.clone().transitive_dependency_unavailable();
			}
		} else {
			dependent.clone().immediate_dependency_up();
		}
		inner.dependent = Some(dependent);
	}

	fn remove_dependent(&self, dependent: &Arc<dyn Dependent>) {
		let mut inner = self.inner.lock();
		if inner
			.dependent
			.as_ref()
			.is_some_and(|d| Arc::ptr_eq(d, dependent))
		{
			inner.dependent = None;
		}
	}

	fn add_demand(&self) {
		let mut inner = self.inner.lock();
		inner.demanded_by_dependent = true;
		if inner.forwarding {
			if let Some(real) = &inner.real {
				real.add_demand();
			}
		}
	}

	fn remove_demand(&self) {
		let mut inner = self.inner.lock();
		if !inner.forwarding {
			if inner.state >= RealState::Installed {
				inner.forwarding = true;
				if let Some(d) = inner.dependent.clone() {
					match inner.state {
						RealState::Installed => d.immediate_dependency_down(),
						RealState::Failed => d.dependency_failed(),
						_ => {}
					}
				}
			}
		} else if let Some(real) = &inner.real {
			real.remove_demand();
		}
		inner.demanded_by_dependent = false;
	}

	fn dependent_started(&self) {
		let mut inner = self.inner.lock();
		if inner.forwarding {
			if let Some(real) = &inner.real {
				real.dependent_started();
				inner.started_forwarded = true;
			}
		}
	}

	fn dependent_stopped(&self) {
		let mut inner = self.inner.lock();
		if inner.started_forwarded {
			if let Some(real) = &inner.real {
				real.dependent_stopped();
			}
			inner.started_forwarded = false;
		}
	}

	fn name(&self) -> Arc<str> {
		Arc::clone(&self.name)
	}

	fn value(&self) -> Result<Arc<dyn std::any::Any + Send + Sync>, ValueUnavailable> {
		let inner = self.inner.lock();
		match &inner.real {
			Some(real) if inner.forwarding => real.value(),
			_ => Err(ValueUnavailable),
		}
	}
}

impl Dependent for OptionalDependency {
	fn immediate_dependency_up(self: Arc<Self>) {
		let mut inner = self.inner.lock();
		inner.state = RealState::Up;
		if inner.forwarding {
			if let Some(d) = inner.dependent.clone() {
				d.immediate_dependency_up();
			}
		}
	}

	fn immediate_dependency_down(self: Arc<Self>) {
		let mut inner = self.inner.lock();
		inner.state = RealState::Installed;
		if inner.forwarding {
			if let Some(d) = inner.dependent.clone() {
				d.immediate_dependency_down();
			}
		}
	}

	fn immediate_dependency_available(self: Arc<Self>, name: Arc<str>) {
		let inner = self.inner.lock();
		if inner.forwarding {
			if let Some(d) = inner.dependent.clone() {
				d.immediate_dependency_available(name);
			}
		}
	}

	fn immediate_dependency_unavailable(self: Arc<Self>, name: Arc<str>) {
		let inner = self.inner.lock();
		if inner.forwarding {
			if let Some(d) = inner.dependent.clone() {
				d.immediate_dependency_unavailable(name);
			}
		}
	}

	fn transitive_dependency_available(self: Arc<Self>) {
		let mut inner = self.inner.lock();
		inner.transitive_unavailable = false;
		if inner.forwarding {
			if let Some(d) = inner.dependent.clone() {
				d.transitive_dependency_available();
			}
		}
	}

	fn transitive_dependency_unavailable(self: Arc<Self>) {
		let mut inner = self.inner.lock();
		inner.transitive_unavailable = true;
		if inner.forwarding {
			if let Some(d) = inner.dependent.clone() {
				d.transitive_dependency_unavailable();
			}
		}
	}

	fn dependency_failed(self: Arc<Self>) {
		let mut inner = self.inner.lock();
		inner.state = RealState::Failed;
		if inner.forwarding {
			if let Some(d) = inner.dependent.clone() {
				d.dependency_failed();
			}
		}
	}

	fn dependency_cleared(self: Arc<Self>) {
		let mut inner = self.inner.lock();
		inner.state = RealState::Installed;
		if inner.forwarding {
			if let Some(d) = inner.dependent.clone() {
				d.dependency_cleared();
			}
		}
	}
}
