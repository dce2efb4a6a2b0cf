//! Shared scaffolding for the scenario tests: a synchronous executor, a
//! deterministic clock, an event recorder, and a couple of stock `Service`
//! impls. Running everything on an inline executor means a `commit`/
//! `set_mode` call drives the whole cascade it triggers to quiescence before
//! returning, so assertions can run immediately after without sleeps.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use trellis::container::ContainerContext;
use trellis::error::StartError;
use trellis::executor::Executor;
use trellis::listener::{Listener, ListenerEvent};
use trellis::profile::ProfileEvent;
use trellis::service::{Service, StartContext, StartOutcome, StopContext, StopOutcome};

pub fn init_logging() {
	let _ = env_logger::builder().is_test(true).try_init();
}

/// Runs every submitted job immediately, on the calling thread.
pub struct InlineExecutor;

impl Executor for InlineExecutor {
	fn try_execute(&self, job: Box<dyn FnOnce() + Send>) -> Result<(), Box<dyn FnOnce() + Send>> {
		job();
		Ok(())
	}
}

/// A [`ContainerContext`] with an inline executor, a monotonically
/// incrementing fake clock, and profile events collected for inspection.
pub struct TestContainer {
	executor: Arc<dyn Executor>,
	shutdown: std::sync::atomic::AtomicBool,
	clock: AtomicU64,
	pub profile: Mutex<Vec<ProfileEvent>>,
}

impl TestContainer {
	#[must_use]
	pub fn new() -> Arc<Self> {
		Arc::new(TestContainer {
			executor: Arc::new(InlineExecutor),
			shutdown: std::sync::atomic::AtomicBool::new(false),
			clock: AtomicU64::new(0),
			profile: Mutex::new(Vec::new()),
		})
	}

	pub fn shut_down(&self) {
		self.shutdown.store(true, Ordering::SeqCst);
	}
}

impl ContainerContext for TestContainer {
	fn executor(&self) -> Arc<dyn Executor> {
		Arc::clone(&self.executor)
	}

	fn is_shutdown(&self) -> bool {
		self.shutdown.load(Ordering::SeqCst)
	}

	fn start_nanos(&self) -> u64 {
		0
	}

	fn now_nanos(&self) -> u64 {
		self.clock.fetch_add(1, Ordering::SeqCst)
	}

	fn record_profile(&self, event: ProfileEvent) {
		self.profile.lock().unwrap().push(event);
	}
}

/// Captures every `(service_name, event)` pair delivered to it, in delivery
/// order, for assertion via [`Recorder::events`].
pub struct Recorder {
	events: Mutex<Vec<(String, ListenerEvent)>>,
}

impl Recorder {
	#[must_use]
	pub fn new() -> Arc<Self> {
		Arc::new(Recorder { events: Mutex::new(Vec::new()) })
	}

	#[must_use]
	pub fn events(&self) -> Vec<(String, ListenerEvent)> {
		self.events.lock().unwrap().clone()
	}

	pub fn clear(&self) {
		self.events.lock().unwrap().clear();
	}
}

impl Listener for Recorder {
	fn on_event(&self, service_name: &str, event: &ListenerEvent) {
		self.events.lock().unwrap().push((service_name.to_string(), event.clone()));
	}
}

/// A service that starts and stops synchronously and successfully.
pub struct ImmediateService;

impl Service for ImmediateService {
	type Value = ();

	fn start(&self, _ctx: &Arc<StartContext<()>>) -> StartOutcome<()> {
		StartOutcome::Complete(())
	}

	fn stop(&self, _ctx: &Arc<StopContext>) -> StopOutcome {
		StopOutcome::Complete
	}
}

/// A service whose `start` always fails synchronously with `message`.
pub struct FailingService {
	pub message: &'static str,
}

impl Service for FailingService {
	type Value = ();

	fn start(&self, _ctx: &Arc<StartContext<()>>) -> StartOutcome<()> {
		StartOutcome::Failed(StartError::new(self.message))
	}

	fn stop(&self, _ctx: &Arc<StopContext>) -> StopOutcome {
		StopOutcome::Complete
	}
}

/// A service that starts successfully on the first attempt and fails on
/// every attempt after that, for exercising `retry()` into a second failure.
pub struct FlakyService {
	pub attempts: AtomicU64,
	pub succeed_on_attempt: u64,
}

impl FlakyService {
	#[must_use]
	pub fn new(succeed_on_attempt: u64) -> Self {
		FlakyService { attempts: AtomicU64::new(0), succeed_on_attempt }
	}
}

impl Service for FlakyService {
	type Value = ();

	fn start(&self, _ctx: &Arc<StartContext<()>>) -> StartOutcome<()> {
		let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
		if attempt >= self.succeed_on_attempt {
			StartOutcome::Complete(())
		} else {
			StartOutcome::Failed(StartError::new("not yet"))
		}
	}

	fn stop(&self, _ctx: &Arc<StopContext>) -> StopOutcome {
		StopOutcome::Complete
	}
}

/// A service whose `start`/`stop` settle asynchronously once [`AsyncService::settle_start`]
/// or [`AsyncService::settle_stop`] is called, for exercising the `Async` outcomes.
pub struct AsyncService {
	start_ctx: Mutex<Option<Arc<StartContext<()>>>>,
	stop_ctx: Mutex<Option<Arc<StopContext>>>,
}

impl AsyncService {
	#[must_use]
	pub fn new() -> Self {
		AsyncService { start_ctx: Mutex::new(None), stop_ctx: Mutex::new(None) }
	}

	pub fn settle_start_ok(&self) {
		if let Some(ctx) = self.start_ctx.lock().unwrap().take() {
			ctx.complete(()).expect("start context still ASYNC");
		}
	}

	pub fn settle_start_err(&self, message: &'static str) {
		if let Some(ctx) = self.start_ctx.lock().unwrap().take() {
			ctx.failed(StartError::new(message)).expect("start context still ASYNC");
		}
	}

	pub fn settle_stop(&self) {
		if let Some(ctx) = self.stop_ctx.lock().unwrap().take() {
			ctx.complete().expect("stop context still ASYNC");
		}
	}
}

impl Service for AsyncService {
	type Value = ();

	fn start(&self, ctx: &Arc<StartContext<()>>) -> StartOutcome<()> {
		*self.start_ctx.lock().unwrap() = Some(Arc::clone(ctx));
		StartOutcome::Async
	}

	fn stop(&self, ctx: &Arc<StopContext>) -> StopOutcome {
		*self.stop_ctx.lock().unwrap() = Some(Arc::clone(ctx));
		StopOutcome::Async
	}
}
