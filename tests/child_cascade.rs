//! `G` owns a child service `H`. Removing `G` cascades `REMOVE` to `H` and
//! `G` is held in `STOPPING` until `H` actually finishes removing; only
//! then does `G` itself fall through to `REMOVED`.

mod _support;

use std::sync::Arc;

use trellis::controller::{ChildHandle, Registration, ServiceController};
use trellis::mode::Mode;
use trellis::substate::State;

use _support::{init_logging, AsyncService, ImmediateService, TestContainer};

#[test]
fn removing_the_parent_waits_on_the_child_before_settling() {
	init_logging();
	let container = TestContainer::new();

	let h_service = Arc::new(AsyncService::new());
	let h = ServiceController::new(Registration {
		name: Arc::from("h"),
		aliases: Vec::new(),
		service: AsyncServiceHandle(Arc::clone(&h_service)),
		dependencies: Vec::new(),
		parent: None,
		initial_listeners: Vec::new(),
		container: container.clone(),
		child_target: None,
	});
	h.commit(Mode::Active);
	h_service.settle_start_ok();
	assert_eq!(h.state(), State::Up);

	let g = ServiceController::new(Registration {
		name: Arc::from("g"),
		aliases: Vec::new(),
		service: ImmediateService,
		dependencies: Vec::new(),
		parent: None,
		initial_listeners: Vec::new(),
		container,
		child_target: None,
	});
	g.add_child(Arc::clone(&h) as Arc<dyn ChildHandle>);
	g.commit(Mode::Active);
	assert_eq!(g.state(), State::Up);

	g.set_mode(Mode::Remove).unwrap();

	// g's own stop() is synchronous and already ran, but removeChildren
	// cascaded a REMOVE onto h, whose stop() is async and still pending; g
	// cannot leave STOPPING until that child handle reports removed.
	assert_eq!(g.state(), State::Stopping, "g must wait on h before settling further");
	assert_eq!(h.state(), State::Stopping, "h's own stop is what g is waiting on");

	h_service.settle_stop();

	assert_eq!(h.state(), State::Removed, "h finishes its own removal");
	assert_eq!(g.state(), State::Removed, "g can only now fall through to removed");
}

struct AsyncServiceHandle(Arc<AsyncService>);

impl trellis::Service for AsyncServiceHandle {
	type Value = ();

	fn start(&self, ctx: &Arc<trellis::StartContext<()>>) -> trellis::StartOutcome<()> {
		self.0.start(ctx)
	}

	fn stop(&self, ctx: &Arc<trellis::StopContext>) -> trellis::StopOutcome {
		self.0.stop(ctx)
	}
}
