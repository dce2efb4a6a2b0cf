//! The `Dependency`/`Dependent` edge protocol of §3 and §4.4.
//!
//! A [`Dependency`] is an outbound reference from controller `C` to
//! dependency `D` (§3 "Dependency edge"). A [`Dependent`] is the inverse
//! callback surface `D` uses to notify `C`; [`ServiceController`] implements
//! [`Dependent`] for itself (§2), and [`crate::optional_dependency::OptionalDependency`]
//! implements both by adapting a single real edge.
//!
//! [`ServiceController`]: crate::controller::ServiceController

use std::any::Any;
use std::sync::Arc;

use crate::error::ValueUnavailable;

/// The outbound side of a dependency edge (§3 "Dependency edge").
///
/// Implemented by [`ServiceController`](crate::controller::ServiceController)
/// (a plain dependency on another service) and by
/// [`OptionalDependency`](crate::optional_dependency::OptionalDependency)
/// (an edge whose missing-vs-up semantics are inverted for the dependent).
pub trait Dependency: Send + Sync {
	/// Registers `dependent` to receive the inbound callbacks of §4.4.
	fn add_dependent(&self, dependent: Arc<dyn Dependent>);
	/// Reverses [`Dependency::add_dependent`].
	fn remove_dependent(&self, dependent: &Arc<dyn Dependent>);
	/// Raises this dependency's demanded-by count by one (§3
	/// `demandedByCount`), potentially contributing to its `upperCount` if
	/// it is `ON_DEMAND`.
	fn add_demand(&self);
	/// Reverses [`Dependency::add_demand`].
	fn remove_demand(&self);
	/// Notifies this dependency that a dependent entered a running state
	/// holding it up (§3 `runningDependents`).
	fn dependent_started(&self);
	/// Reverses [`Dependency::dependent_started`]; on the last matching
	/// call, enables `STOP_REQUESTED→STOPPING` on this dependency.
	fn dependent_stopped(&self);
	/// The dependency's interned name, for `immediateUnavailableDependencies`
	/// bookkeeping and profiling output.
	fn name(&self) -> Arc<str>;
	/// The dependency's current service value (§4.3 `getValue`), type-erased
	/// since a dependency edge crosses from the dependent's `Arc<dyn
	/// Dependency>` into the dependency's own `Service::Value`. Callers
	/// downcast via [`Any::downcast_ref`]/[`Any::downcast`] to the concrete
	/// `Service::Value` they know the edge carries.
	///
	/// `Err(ValueUnavailable)` whenever the dependency is not currently `UP`
	/// (or `STOP_REQUESTED`, which still holds the last value).
	fn value(&self) -> Result<Arc<dyn Any + Send + Sync>, ValueUnavailable>;
}

/// The inbound side of a dependency edge: the callbacks a [`Dependency`]
/// invokes on each of its registered dependents (§2, §4.4).
///
/// All callbacks acquire the receiving controller's lock, update counters,
/// and return — any further propagation happens via tasks the callback
/// enqueues, never synchronously within the callback itself (§5 ordering
/// guarantee 3).
pub trait Dependent: Send + Sync {
	fn immediate_dependency_up(self: Arc<Self>);
	fn immediate_dependency_down(self: Arc<Self>);
	fn immediate_dependency_available(self: Arc<Self>, name: Arc<str>);
	fn immediate_dependency_unavailable(self: Arc<Self>, name: Arc<str>);
	fn transitive_dependency_available(self: Arc<Self>);
	fn transitive_dependency_unavailable(self: Arc<Self>);
	fn dependency_failed(self: Arc<Self>);
	fn dependency_cleared(self: Arc<Self>);
}
