#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod automaton;
pub mod container;
pub mod controller;
pub mod counters;
pub mod dependency;
pub mod error;
pub mod executor;
pub mod listener;
pub mod mode;
pub mod optional_dependency;
pub mod profile;
pub mod service;
pub mod substate;
pub mod task;

pub use controller::{ChildHandle, Registration, ServiceController};
pub use dependency::{Dependency, Dependent};
pub use listener::{Listener, ListenerEvent};
pub use mode::Mode;
pub use optional_dependency::OptionalDependency;
pub use service::{Service, StartContext, StartOutcome, StopContext, StopOutcome};
pub use substate::{State, Substate};
