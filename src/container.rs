//! The container-side contract a controller consumes (§6 "Container
//! callbacks consumed"). The container/registry itself — name interning,
//! builder wiring, management introspection — is out of scope (§1); this
//! is only the narrow surface a controller calls into.

use std::sync::Arc;

use crate::executor::Executor;
use crate::profile::ProfileEvent;

/// Host-provided services a controller needs beyond its own state.
///
/// A single implementation is normally shared by every controller in one
/// container (§9 "Global-ish singleton... becomes a configuration field on
/// the container, passed in explicitly").
pub trait ContainerContext: Send + Sync {
	/// The executor controllers submit deferred tasks to (§6 `getExecutor`).
	fn executor(&self) -> Arc<dyn Executor>;

	/// Whether the container is shutting down; while `true`, `setMode` to
	/// anything but `REMOVE` is rejected (§7 item 6).
	fn is_shutdown(&self) -> bool;

	/// Monotonic nanosecond timestamp the container started at (§6
	/// `getStart`), the origin `lifecycleTime`/`elapsed()` values are
	/// measured from.
	fn start_nanos(&self) -> u64;

	/// Current monotonic nanosecond clock reading. Exists so the core never
	/// calls a wall-clock API directly; tests can supply a deterministic
	/// clock.
	fn now_nanos(&self) -> u64;

	/// Records one profile event (§6 `getProfileOutput`). A no-op
	/// implementation disables profiling entirely.
	fn record_profile(&self, event: ProfileEvent);
}
