//! Profiling output (§6 `getProfileOutput`): a tab-separated line per
//! lifecycle event, `<name>\t<S|X|F|L>\t<startOffsetNanos>\t<durationNanos>`.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Which lifecycle phase a [`ProfileEvent`] reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
	/// Successful start (`S`).
	Start,
	/// Failed start (`X`).
	StartFailed,
	/// Failed stop (`F`).
	StopFailed,
	/// Listener invocation (`L`).
	Listener,
}

impl Display for ProfileKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			ProfileKind::Start => "S",
			ProfileKind::StartFailed => "X",
			ProfileKind::StopFailed => "F",
			ProfileKind::Listener => "L",
		})
	}
}

/// One profiled lifecycle event, ready to be written as a tab-separated
/// line by a [`crate::container::ContainerContext::record_profile`]
/// implementation.
#[derive(Debug, Clone)]
pub struct ProfileEvent {
	pub name: Arc<str>,
	pub kind: ProfileKind,
	/// Nanoseconds between container start and this event's initiation.
	pub start_offset_nanos: u64,
	/// Nanoseconds the event itself took.
	pub duration_nanos: u64,
}

impl Display for ProfileEvent {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}\t{}\t{}\t{}",
			self.name, self.kind, self.start_offset_nanos, self.duration_nanos
		)
	}
}
