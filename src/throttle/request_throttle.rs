//! A FIFO queue that dispatches async operations against a per-window call quota.

use crate::throttle::error::ThrottleError;
use futures_util::future::BoxFuture;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::{sleep, Instant};

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Quota settings for a [`RequestThrottle`].
///
/// Defaults to 100 calls per 60 seconds with dispatches spaced `window / quota`
/// apart (600ms), so the full quota is never burst at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    #[serde(default = "default_quota")]
    pub quota: u32,

    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Overrides the derived `window / quota` spacing between dispatches.
    #[serde(default)]
    pub spacing_ms: Option<u64>,
}

const fn default_quota() -> u32 {
    100
}

const fn default_window_ms() -> u64 {
    60_000
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            quota: default_quota(),
            window_ms: default_window_ms(),
            spacing_ms: None,
        }
    }
}

impl ThrottleConfig {
    pub fn with_quota(quota: u32) -> Self {
        Self {
            quota,
            ..Self::default()
        }
    }

    pub fn quota(&self) -> u32 {
        self.quota.max(1)
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn spacing(&self) -> Duration {
        match self.spacing_ms {
            Some(ms) => Duration::from_millis(ms),
            None => self.window() / self.quota(),
        }
    }
}

/// Snapshot of the throttle's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleStats {
    pub call_count: u32,
    pub quota: u32,
    pub ms_until_reset: u64,
    pub queued: usize,
    pub processing: bool,
}

struct State {
    queue: VecDeque<Job>,
    processing: bool,
    call_count: u32,
    window_start: Option<Instant>,
}

impl State {
    fn roll_window(&mut self, now: Instant, window: Duration) {
        let expired = self
            .window_start
            .map_or(true, |start| now.duration_since(start) >= window);
        if expired {
            self.window_start = Some(now);
            self.call_count = 0;
        }
    }

    fn until_reset(&self, now: Instant, window: Duration) -> Duration {
        self.window_start
            .map(|start| (start + window).saturating_duration_since(now))
            .unwrap_or_default()
    }
}

struct Inner {
    config: ThrottleConfig,
    state: Mutex<State>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Step {
    Run(Job),
    Wait(Duration),
}

/// Serializes async operations so that at most `quota` of them start within a
/// window, with a fixed spacing between consecutive starts.
///
/// Cloning a `RequestThrottle` yields another handle to the same queue. Tasks
/// run one at a time in submission order. A task's output, including its
/// error, goes only to the caller that submitted it.
///
/// `submit` spawns the processing loop on the current tokio runtime. Outside a
/// runtime the task is not queued and its future yields
/// [`ThrottleError::NoRuntime`].
///
/// # Examples
///
/// ```
/// use meteo_insights::{RequestThrottle, ThrottleConfig};
///
/// # #[tokio::main]
/// # async fn main() {
/// let throttle = RequestThrottle::new(ThrottleConfig::with_quota(100));
/// let answer = throttle.submit(|| async { 6 * 7 }).await;
/// assert_eq!(answer, Ok(42));
/// # }
/// ```
#[derive(Clone)]
pub struct RequestThrottle {
    inner: Arc<Inner>,
}

impl RequestThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    processing: false,
                    call_count: 0,
                    window_start: None,
                }),
            }),
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.inner.config
    }

    /// Queues `task` and returns a future resolving to its output once it has run.
    ///
    /// The task is enqueued before this function returns, so FIFO order follows
    /// the order of `submit` calls, not the order in which the returned futures
    /// are polled.
    ///
    /// # Errors
    ///
    /// The returned future yields [`ThrottleError::Dropped`] if the task never
    /// delivered a result, e.g. because it panicked, and
    /// [`ThrottleError::NoRuntime`] if `submit` was called outside a tokio runtime.
    pub fn submit<F, Fut, T>(
        &self,
        task: F,
    ) -> impl Future<Output = Result<T, ThrottleError>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let queued = match Handle::try_current() {
            Ok(runtime) => Ok(self.enqueue(&runtime, task)),
            Err(_) => {
                warn!("Refusing throttled task: no tokio runtime");
                Err(ThrottleError::NoRuntime)
            }
        };

        async move { queued?.await.map_err(|_| ThrottleError::Dropped) }
    }

    fn enqueue<F, Fut, T>(&self, runtime: &Handle, task: F) -> oneshot::Receiver<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                // The caller may have stopped waiting; the task still counts as dispatched.
                let _ = sender.send(task().await);
            })
        });

        let start_loop = {
            let mut state = self.inner.lock();
            state.queue.push_back(job);
            !std::mem::replace(&mut state.processing, true)
        };
        if start_loop {
            runtime.spawn(Self::process(Arc::clone(&self.inner)));
        }
        receiver
    }

    pub fn stats(&self) -> ThrottleStats {
        let window = self.inner.config.window();
        let now = Instant::now();
        let state = self.inner.lock();
        let live = state
            .window_start
            .is_some_and(|start| now.duration_since(start) < window);
        ThrottleStats {
            call_count: if live { state.call_count } else { 0 },
            quota: self.inner.config.quota(),
            ms_until_reset: if live {
                state.until_reset(now, window).as_millis() as u64
            } else {
                0
            },
            queued: state.queue.len(),
            processing: state.processing,
        }
    }

    async fn process(inner: Arc<Inner>) {
        let quota = inner.config.quota();
        let window = inner.config.window();
        let spacing = inner.config.spacing();

        loop {
            let step = {
                let mut state = inner.lock();
                let now = Instant::now();
                if state.queue.is_empty() {
                    state.processing = false;
                    return;
                }
                state.roll_window(now, window);
                if state.call_count >= quota {
                    Step::Wait(state.until_reset(now, window))
                } else if let Some(job) = state.queue.pop_front() {
                    state.call_count += 1;
                    debug!(
                        "Dispatching throttled call {}/{} ({} queued)",
                        state.call_count,
                        quota,
                        state.queue.len()
                    );
                    Step::Run(job)
                } else {
                    continue;
                }
            };

            match step {
                Step::Wait(delay) => {
                    debug!("Throttle quota of {} reached, waiting {:?}", quota, delay);
                    sleep(delay).await;
                }
                Step::Run(job) => {
                    // Run on its own task so a panicking job cannot take the loop down with it.
                    if let Err(e) = tokio::spawn(job()).await {
                        warn!("Throttled task failed to complete: {}", e);
                    }
                    sleep(spacing).await;
                }
            }
        }
    }
}
