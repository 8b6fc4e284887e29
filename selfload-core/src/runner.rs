use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::runtime::{Builder, Runtime};

/// Name given to the threads of a pooled [`AsyncRunner`].
pub const THREAD_NAME: &str = "selfload-async";

/// Executes cache loads off the calling thread.
///
/// Tasks are fire-and-forget: there is no channel back to whoever submitted a task. A task
/// that panics is caught and logged; it never takes the pool down. The runner is cheap to
/// clone, all clones share the same pool.
///
/// Two flavours exist:
///
/// - [`AsyncRunner::new`] runs tasks on the blocking pool of a dedicated `tokio` runtime,
/// - [`AsyncRunner::inline`] runs each task right away on the submitting thread. This keeps
///   tests deterministic and serves as fallback if no runtime can be started.
///
/// # Examples
///
/// ```
/// use selfload_core::AsyncRunner;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let runner = AsyncRunner::new(2).unwrap();
/// let counter = Arc::new(AtomicUsize::new(0));
///
/// for _ in 0..10 {
///     let counter = Arc::clone(&counter);
///     runner.execute(move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///     });
/// }
///
/// assert!(runner.wait_idle(Duration::from_secs(5)));
/// assert_eq!(counter.load(Ordering::SeqCst), 10);
/// ```
#[derive(Clone)]
pub struct AsyncRunner {
    inner: Arc<RunnerInner>,
}

struct RunnerInner {
    runtime: Option<Runtime>,
    pending: Mutex<usize>,
    idle: Condvar,
}

impl Drop for RunnerInner {
    fn drop(&mut self) {
        // The last handle may be released by one of the pool's own threads, where a
        // blocking shutdown would panic.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl AsyncRunner {
    /// Creates a runner executing up to `threads` tasks in parallel (at least one).
    pub fn new(threads: usize) -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(threads.max(1))
            .thread_name(THREAD_NAME)
            .build()?;

        Ok(Self::with_runtime(Some(runtime)))
    }

    /// Creates a runner which executes every task immediately on the calling thread.
    pub fn inline() -> Self {
        Self::with_runtime(None)
    }

    fn with_runtime(runtime: Option<Runtime>) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                runtime,
                pending: Mutex::new(0),
                idle: Condvar::new(),
            }),
        }
    }

    /// Returns true if tasks run on the submitting thread.
    pub fn is_inline(&self) -> bool {
        self.inner.runtime.is_none()
    }

    /// Submits a task. Its outcome is only observable through its own side effects and logs.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let pending = PendingTask::register(Arc::clone(&self.inner));
        match &self.inner.runtime {
            Some(runtime) => {
                let _ = runtime.spawn_blocking(move || {
                    let _pending = pending;
                    run_logged(task);
                });
            }
            None => {
                let _pending = pending;
                run_logged(task);
            }
        }
    }

    /// Returns the number of submitted tasks which have not completed yet.
    pub fn pending(&self) -> usize {
        *self.inner.pending.lock()
    }

    /// Blocks until no task is pending or the timeout elapsed.
    ///
    /// Returns true if the runner became idle in time.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut pending = self.inner.pending.lock();
        while *pending > 0 {
            if self
                .inner
                .idle
                .wait_until(&mut pending, deadline)
                .timed_out()
            {
                return *pending == 0;
            }
        }

        true
    }
}

/// Tracks a submitted task until it is dropped, which happens even if the task panicked.
struct PendingTask {
    runner: Arc<RunnerInner>,
}

impl PendingTask {
    fn register(runner: Arc<RunnerInner>) -> Self {
        *runner.pending.lock() += 1;
        Self { runner }
    }
}

impl Drop for PendingTask {
    fn drop(&mut self) {
        let mut pending = self.runner.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.runner.idle.notify_all();
        }
    }
}

fn run_logged<F: FnOnce()>(task: F) {
    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(task)) {
        log::error!("An async cache task panicked: {}", panic_message(&*panic));
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown cause"
    }
}
