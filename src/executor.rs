//! The executor contract (§5 "Scheduling model", §6 "Container callbacks
//! consumed: `getExecutor()`").
//!
//! The core treats the executor purely as a place to run deferred
//! [`crate::task::Task`]s off the thread that produced them; it never
//! blocks on submission and falls back to running inline on rejection (§5
//! "Shared-resource policy", §7 item 4).

use std::panic::{self, AssertUnwindSafe};

/// A place to run boxed work off the calling thread.
///
/// Implementations must not panic out of `execute` itself; a panic raised
/// by `job` is the caller's concern (the controller catches it at the task
/// boundary, §7 item 3).
pub trait Executor: Send + Sync {
	/// Submits `job` for execution, returning `Err(job)` if the executor
	/// cannot accept more work (e.g. it is shutting down). Callers run the
	/// returned job inline (§7 item 4).
	fn try_execute(&self, job: Box<dyn FnOnce() + Send>) -> Result<(), Box<dyn FnOnce() + Send>>;

	/// Submits `job`, running it on the calling thread immediately if the
	/// executor rejects it.
	fn execute(&self, job: Box<dyn FnOnce() + Send>) {
		if let Err(job) = self.try_execute(job) {
			log::warn!("executor rejected a task, running it inline");
			run_catching(job);
		}
	}
}

/// Runs `job`, catching and logging any panic rather than letting it
/// propagate (§7 item 3: listener/task panics never escape).
pub(crate) fn run_catching(job: Box<dyn FnOnce() + Send>) {
	if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
		let message = payload
			.downcast_ref::<&str>()
			.copied()
			.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
			.unwrap_or("<non-string panic payload>");
		log::error!("task panicked: {message}");
	}
}

#[cfg(feature = "jobsteal_executor")]
mod jobsteal_pool {
	use super::Executor;
	use jobsteal::make_pool;
	use std::sync::mpsc::{self, Sender};
	use std::thread;

	/// Default [`Executor`] backed by a [`jobsteal`] work-stealing thread
	/// pool, the same pool family the rest of this workspace's runtimes use
	/// for off-lock work.
	///
	/// `jobsteal::Pool` only exposes a blocking fork-join scope
	/// (`Pool::scope`, which returns once every job submitted to it has
	/// run), not a bare `'static` submission a caller can fire and forget.
	/// To honor `try_execute`'s never-blocks contract, the pool itself lives
	/// on a dedicated driver thread inside one long-lived `scope` call for
	/// the executor's whole lifetime; `try_execute` only ever does a
	/// non-blocking channel send to hand the job to that thread.
	pub struct JobStealExecutor {
		sender: Sender<Box<dyn FnOnce() + Send>>,
	}

	impl JobStealExecutor {
		/// Builds a pool with `workers` threads (in addition to the driver
		/// thread, which also participates in stealing) and starts the
		/// driver thread that owns it.
		pub fn new(workers: usize) -> Result<Self, jobsteal::PoolCreationError> {
			let mut pool = make_pool(workers)?;
			let (sender, receiver) = mpsc::channel::<Box<dyn FnOnce() + Send>>();
			thread::Builder::new()
				.name("trellis-jobsteal-driver".into())
				.spawn(move || {
					pool.scope(|spawner| {
						while let Ok(job) = receiver.recv() {
							spawner.submit(job);
						}
					});
				})
				.expect("failed to spawn jobsteal driver thread");
			Ok(JobStealExecutor { sender })
		}
	}

	impl Executor for JobStealExecutor {
		fn try_execute(&self, job: Box<dyn FnOnce() + Send>) -> Result<(), Box<dyn FnOnce() + Send>> {
			self.sender.send(job).map_err(|e| e.0)
		}
	}
}

#[cfg(feature = "jobsteal_executor")]
pub use jobsteal_pool::JobStealExecutor;
