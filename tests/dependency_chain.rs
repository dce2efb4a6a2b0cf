//! `B` depends on `A`; both `ACTIVE`. `A` must reach `UP` before `B`'s
//! `downDependencies` can drop to zero, and dropping `A` back to `NEVER`
//! must drain `B` first.

mod _support;

use std::sync::Arc;

use trellis::controller::{Registration, ServiceController};
use trellis::mode::Mode;
use trellis::substate::State;
use trellis::{Dependency, Dependent};

use _support::{init_logging, ImmediateService, TestContainer};

#[test]
fn b_reaches_up_only_after_a_does() {
	init_logging();
	let container = TestContainer::new();

	let a = ServiceController::new(Registration {
		name: Arc::from("a"),
		aliases: Vec::new(),
		service: ImmediateService,
		dependencies: Vec::new(),
		parent: None,
		initial_listeners: Vec::new(),
		container: container.clone(),
		child_target: None,
	});

	let b = ServiceController::new(Registration {
		name: Arc::from("b"),
		aliases: Vec::new(),
		service: ImmediateService,
		dependencies: vec![Arc::clone(&a) as Arc<dyn Dependency>],
		parent: None,
		initial_listeners: Vec::new(),
		container,
		child_target: None,
	});

	// Wiring (builder responsibility, §1) must happen before either side
	// commits: a dependency only learns of new dependents going forward, it
	// never replays its current state to a dependent registered late.
	a.add_dependent(Arc::clone(&b) as Arc<dyn Dependent>);

	b.commit(Mode::Active);
	assert_eq!(b.state(), State::Down, "b parks until a is up");

	a.commit(Mode::Active);

	assert_eq!(a.state(), State::Up);
	assert_eq!(b.state(), State::Up, "a reaching up must drain b's downDependencies");
}

#[test]
fn b_stops_before_a_can_leave_stop_requested() {
	init_logging();
	let container = TestContainer::new();

	let a = ServiceController::new(Registration {
		name: Arc::from("a"),
		aliases: Vec::new(),
		service: ImmediateService,
		dependencies: Vec::new(),
		parent: None,
		initial_listeners: Vec::new(),
		container: container.clone(),
		child_target: None,
	});
	let b = ServiceController::new(Registration {
		name: Arc::from("b"),
		aliases: Vec::new(),
		service: ImmediateService,
		dependencies: vec![Arc::clone(&a) as Arc<dyn Dependency>],
		parent: None,
		initial_listeners: Vec::new(),
		container,
		child_target: None,
	});
	a.add_dependent(Arc::clone(&b) as Arc<dyn Dependent>);
	b.commit(Mode::Active);
	a.commit(Mode::Active);
	assert_eq!(a.state(), State::Up);
	assert_eq!(b.state(), State::Up);

	a.set_mode(Mode::Never).unwrap();

	// The inline executor drives both controllers to quiescence before
	// `set_mode` returns, so by now the whole chain has settled.
	assert_eq!(b.state(), State::Down, "b must have stopped");
	assert_eq!(a.state(), State::Down, "a only proceeds once b has drained");
}
