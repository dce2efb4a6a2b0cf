//! A lone `ACTIVE` service with no dependencies reaches `UP` on commit and
//! reaches `DOWN` again once its mode drops to `NEVER`.

mod _support;

use std::sync::Arc;

use trellis::controller::{Registration, ServiceController};
use trellis::listener::ListenerEvent;
use trellis::mode::Mode;
use trellis::substate::State;

use _support::{init_logging, ImmediateService, Recorder, TestContainer};

#[test]
fn starts_on_commit_and_notifies_in_order() {
	init_logging();
	let container = TestContainer::new();
	let recorder = Recorder::new();

	let controller = ServiceController::new(Registration {
		name: Arc::from("a"),
		aliases: Vec::new(),
		service: ImmediateService,
		dependencies: Vec::new(),
		parent: None,
		initial_listeners: vec![recorder.clone() as Arc<dyn trellis::listener::Listener>],
		container: container.clone(),
		child_target: None,
	});

	controller.commit(Mode::Active);

	assert_eq!(controller.state(), State::Up);

	let events: Vec<ListenerEvent> = recorder.events().into_iter().map(|(_, e)| e).collect();
	let starting_at = events.iter().position(|e| matches!(e, ListenerEvent::ServiceStarting)).unwrap();
	let started_at = events.iter().position(|e| matches!(e, ListenerEvent::ServiceStarted)).unwrap();
	let added_at = events.iter().position(|e| matches!(e, ListenerEvent::ListenerAdded)).unwrap();
	assert!(added_at < starting_at, "listenerAdded must precede serviceStarting");
	assert!(starting_at < started_at);
	assert!(controller.value().is_ok(), "UP implies a value is available");
}

#[test]
fn stops_when_mode_drops_to_never() {
	init_logging();
	let container = TestContainer::new();
	let recorder = Recorder::new();

	let controller = ServiceController::new(Registration {
		name: Arc::from("a"),
		aliases: Vec::new(),
		service: ImmediateService,
		dependencies: Vec::new(),
		parent: None,
		initial_listeners: vec![recorder.clone() as Arc<dyn trellis::listener::Listener>],
		container,
		child_target: None,
	});
	controller.commit(Mode::Active);
	assert_eq!(controller.state(), State::Up);
	recorder.clear();

	controller.set_mode(Mode::Never).unwrap();

	assert_eq!(controller.state(), State::Down);
	assert!(controller.value().is_err());
	let events: Vec<ListenerEvent> = recorder.events().into_iter().map(|(_, e)| e).collect();
	assert!(events.iter().any(|e| matches!(e, ListenerEvent::ServiceStopping)));
	assert!(events.iter().any(|e| matches!(e, ListenerEvent::ServiceStopped)));
	assert!(events.iter().any(|e| matches!(e, ListenerEvent::ServiceUnavailable)));
}

#[test]
fn on_demand_service_never_starts_without_demand() {
	init_logging();
	let container = TestContainer::new();
	let controller = ServiceController::new(Registration {
		name: Arc::from("a"),
		aliases: Vec::new(),
		service: ImmediateService,
		dependencies: Vec::new(),
		parent: None,
		initial_listeners: Vec::new(),
		container,
		child_target: None,
	});

	controller.commit(Mode::OnDemand);

	assert_eq!(controller.state(), State::Down);
	assert!(controller.value().is_err());
}
