use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::AsyncRunner;

static GLOBAL_CONTEXT: Lazy<CacheContext> = Lazy::new(|| {
    let threads = num_cpus::get();
    let runner = match AsyncRunner::new(threads) {
        Ok(runner) => runner,
        Err(err) => {
            log::error!(
                "Failed to start the async cache runner, loads will run inline: {}",
                err
            );
            AsyncRunner::inline()
        }
    };
    CacheContext::new(runner)
});

/// Shared state of a group of caches: the disable switch and the async runner.
///
/// Every [`SelfLoadingCache`](crate::SelfLoadingCache) is bound to exactly one context. Caches
/// created without an explicit context share [`CacheContext::global`]; tests usually create
/// their own context so that toggling the switch doesn't leak into other tests.
///
/// Cloning a context is cheap, clones share the same switch and runner.
///
/// # Examples
///
/// ```
/// use selfload_core::{AsyncRunner, CacheContext};
///
/// let context = CacheContext::new(AsyncRunner::inline());
/// let shared = context.clone();
///
/// context.disable_all();
/// assert!(shared.is_disabled());
///
/// shared.enable_all();
/// assert!(!context.is_disabled());
/// ```
#[derive(Clone)]
pub struct CacheContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    disabled: AtomicBool,
    runner: AsyncRunner,
}

impl CacheContext {
    pub fn new(runner: AsyncRunner) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                disabled: AtomicBool::new(false),
                runner,
            }),
        }
    }

    /// Returns the process-wide context, creating it on first use.
    ///
    /// Its runner uses one thread per CPU. If that runtime can't be started, the failure is
    /// logged and tasks run inline instead.
    pub fn global() -> &'static CacheContext {
        &GLOBAL_CONTEXT
    }

    /// Disables every cache bound to this context. Lookups go straight to the data provider.
    pub fn disable_all(&self) {
        self.inner.disabled.store(true, Ordering::Release);
    }

    pub fn enable_all(&self) {
        self.inner.disabled.store(false, Ordering::Release);
    }

    pub fn is_disabled(&self) -> bool {
        self.inner.disabled.load(Ordering::Acquire)
    }

    pub fn runner(&self) -> &AsyncRunner {
        &self.inner.runner
    }
}

impl fmt::Debug for CacheContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheContext")
            .field("disabled", &self.is_disabled())
            .field("inline", &self.inner.runner.is_inline())
            .finish()
    }
}
