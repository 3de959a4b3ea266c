//! Confined executor: one dedicated thread, one FIFO queue.
//!
//! A [`ConfinedExecutor`] owns a single worker thread and runs every submitted
//! task on it, strictly in submission order and never two at a time. It is the
//! building block for resources that must only ever be touched from one
//! thread, such as a native rendering context.
//!
//! Submission is fire-and-forget: [`ConfinedExecutor::submit`] never blocks and
//! never reports back. Once [`ConfinedExecutor::shutdown`] has been called,
//! new tasks are dropped while tasks that were already queued drain before the
//! worker exits.
//!
//! A panic inside a task only ends that task. The worker logs the fault and
//! carries on with the next queued task.
//!
//! # Example
//!
//! ```no_run
//! use ember_core::executor::{ConfinedExecutor, ThreadPriority};
//!
//! let executor = ConfinedExecutor::new("GLRenderer-001", ThreadPriority::Default)?;
//!
//! executor.submit(|| println!("runs on GLRenderer-001"));
//! executor.submit(|| println!("runs after the first task"));
//!
//! // Drain the queue and stop the worker.
//! executor.shutdown();
//! executor.join();
//! # Ok::<(), ember_core::ExecutorError>(())
//! ```

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::error::{ExecutorError, Result};
use crate::logging::{span_names, targets};

/// Default name for executor worker threads.
const DEFAULT_EXECUTOR_NAME: &str = "ember-executor";

/// Scheduling priority hint for a worker thread.
///
/// Levels are ordered from least to most urgent and carry the conventional
/// Unix nice value for that level. The executor records the hint and reports
/// it in its diagnostics; it does not change the OS scheduling class itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ThreadPriority {
    /// Work nobody is waiting for.
    Lowest,
    /// Background processing.
    Background,
    /// Default priority for application threads.
    #[default]
    Default,
    /// Threads that produce display content.
    Display,
    /// Time-critical display work.
    UrgentDisplay,
}

impl ThreadPriority {
    /// Nice value conventionally associated with this level.
    pub fn nice_value(self) -> i32 {
        match self {
            Self::Lowest => 19,
            Self::Background => 10,
            Self::Default => 0,
            Self::Display => -4,
            Self::UrgentDisplay => -8,
        }
    }
}

/// Configuration for creating a [`ConfinedExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Name for the worker thread.
    pub name: String,
    /// Scheduling priority hint.
    pub priority: ThreadPriority,
    /// Stack size for the worker thread in bytes. `None` uses the default.
    pub stack_size: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_EXECUTOR_NAME.to_string(),
            priority: ThreadPriority::default(),
            stack_size: None,
        }
    }
}

impl ExecutorConfig {
    /// Create a new configuration with the given thread name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Builder for creating executors with custom configuration.
#[derive(Debug, Default)]
pub struct ExecutorBuilder {
    config: ExecutorConfig,
}

impl ExecutorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the thread name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the scheduling priority hint.
    pub fn priority(mut self, priority: ThreadPriority) -> Self {
        self.config.priority = priority;
        self
    }

    /// Set the stack size for the worker thread.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    /// Spawn the worker and return the executor.
    pub fn build(self) -> Result<ConfinedExecutor> {
        ConfinedExecutor::with_config(self.config)
    }
}

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A unit of work on the queue.
enum Job {
    /// Run a task.
    Run(Task),
    /// Terminal marker; the worker exits when it reaches it.
    Shutdown,
}

/// State shared between the executor handle and its worker thread.
struct ExecutorState {
    /// False once shutdown has been requested.
    running: AtomicBool,
    /// Tasks accepted but not yet finished.
    pending_tasks: AtomicUsize,
    /// Tasks that panicked.
    faulted_tasks: AtomicUsize,
    /// Set by the worker right before it exits.
    exited: Mutex<bool>,
    exit_condvar: Condvar,
}

impl ExecutorState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            pending_tasks: AtomicUsize::new(0),
            faulted_tasks: AtomicUsize::new(0),
            exited: Mutex::new(false),
            exit_condvar: Condvar::new(),
        }
    }

    fn mark_exited(&self) {
        self.running.store(false, Ordering::Release);
        let mut exited = self.exited.lock();
        *exited = true;
        self.exit_condvar.notify_all();
    }
}

/// A single dedicated worker thread with a FIFO task queue.
///
/// # Thread Safety
///
/// `ConfinedExecutor` is `Send + Sync`; any thread may submit tasks. Tasks
/// submitted from one thread run in the order they were submitted. Tasks
/// submitted concurrently from different threads each run atomically, in
/// some interleaving.
pub struct ConfinedExecutor {
    name: String,
    priority: ThreadPriority,
    /// `None` once shutdown has been requested.
    sender: RwLock<Option<Sender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    state: Arc<ExecutorState>,
}

static_assertions::assert_impl_all!(ConfinedExecutor: Send, Sync);

impl ConfinedExecutor {
    /// Spawn a worker thread named `name` with the given priority hint.
    ///
    /// The worker starts immediately and parks until the first task arrives.
    /// The priority is recorded and logged only; it does not change how the
    /// OS schedules the thread.
    ///
    /// Returns [`ExecutorError::InvalidName`] if `name` contains a NUL byte.
    pub fn new(name: impl Into<String>, priority: ThreadPriority) -> Result<Self> {
        Self::with_config(ExecutorConfig {
            name: name.into(),
            priority,
            stack_size: None,
        })
    }

    /// Spawn a worker thread from an explicit configuration.
    pub fn with_config(config: ExecutorConfig) -> Result<Self> {
        if config.name.contains('\0') {
            return Err(ExecutorError::InvalidName { name: config.name });
        }

        let (sender, receiver) = unbounded();
        let state = Arc::new(ExecutorState::new());
        let thread_state = Arc::clone(&state);
        let priority = config.priority;

        let mut builder = thread::Builder::new().name(config.name.clone());
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let handle = builder
            .spawn(move || {
                let span = tracing::debug_span!(
                    target: targets::EXECUTOR,
                    "worker",
                    kind = span_names::WORKER,
                    ?priority,
                    nice = priority.nice_value()
                );
                let _entered = span.enter();
                tracing::debug!(target: targets::EXECUTOR, "worker started");
                worker_loop(&receiver, &thread_state);
                tracing::debug!(target: targets::EXECUTOR, "worker exiting");
                thread_state.mark_exited();
            })
            .map_err(|source| ExecutorError::Spawn {
                name: config.name.clone(),
                source,
            })?;

        let worker_id = handle.thread().id();
        tracing::debug!(
            target: targets::EXECUTOR,
            name = %config.name,
            ?priority,
            "spawned confined executor"
        );

        Ok(Self {
            name: config.name,
            priority,
            sender: RwLock::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
            worker_id,
            state,
        })
    }

    /// Enqueue `task` to run on the worker thread.
    ///
    /// Returns immediately. If shutdown has already been requested the task is
    /// dropped without running.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.read();
        let Some(sender) = sender.as_ref() else {
            tracing::debug!(
                target: targets::EXECUTOR,
                executor = %self.name,
                "executor is shut down, dropping task"
            );
            return;
        };

        self.state.pending_tasks.fetch_add(1, Ordering::AcqRel);
        if sender.send(Job::Run(Box::new(task))).is_err() {
            self.state.pending_tasks.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!(
                target: targets::EXECUTOR,
                executor = %self.name,
                "worker has exited, dropping task"
            );
        }
    }

    /// Request the worker to stop after the tasks already queued.
    ///
    /// Non-blocking and idempotent. Tasks submitted after this call are
    /// dropped. Use [`join`](Self::join) to wait for the worker to exit.
    /// Calling it from inside a task on this executor is allowed.
    pub fn shutdown(&self) {
        let Some(sender) = self.sender.write().take() else {
            return;
        };
        self.state.running.store(false, Ordering::Release);
        tracing::debug!(
            target: targets::EXECUTOR,
            executor = %self.name,
            pending = self.pending_tasks(),
            "shutdown requested"
        );
        // The worker may already be gone; nothing left to tell it then.
        let _ = sender.send(Job::Shutdown);
    }

    /// Wait for the worker thread to exit.
    ///
    /// Call [`shutdown`](Self::shutdown) first, otherwise this blocks forever.
    /// Returns `false` if the worker was already joined, if it could not be
    /// joined, or if called from the worker thread itself.
    pub fn join(&self) -> bool {
        if self.is_worker_thread() {
            tracing::warn!(
                target: targets::EXECUTOR,
                executor = %self.name,
                "join called from the worker thread, ignoring"
            );
            return false;
        }

        let handle = self.handle.lock().take();
        match handle {
            Some(handle) => handle.join().is_ok(),
            None => false,
        }
    }

    /// Wait for the worker to exit, giving up after `timeout`.
    ///
    /// Returns `true` if the worker has exited.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut exited = self.state.exited.lock();
        if !*exited {
            self.state
                .exit_condvar
                .wait_while_for(&mut exited, |exited| !*exited, timeout);
        }
        *exited
    }

    /// Name of the worker thread.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scheduling priority hint the executor was created with.
    pub fn priority(&self) -> ThreadPriority {
        self.priority
    }

    /// Whether the executor still accepts tasks.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    /// Tasks accepted but not yet finished.
    pub fn pending_tasks(&self) -> usize {
        self.state.pending_tasks.load(Ordering::Acquire)
    }

    /// Tasks that panicked on the worker so far.
    pub fn faulted_tasks(&self) -> usize {
        self.state.faulted_tasks.load(Ordering::Acquire)
    }

    /// Thread ID of the worker.
    pub fn worker_thread_id(&self) -> ThreadId {
        self.worker_id
    }

    /// Whether the caller is running on the worker thread.
    pub fn is_worker_thread(&self) -> bool {
        thread::current().id() == self.worker_id
    }
}

impl fmt::Debug for ConfinedExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfinedExecutor")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("running", &self.is_running())
            .field("pending_tasks", &self.pending_tasks())
            .field("faulted_tasks", &self.faulted_tasks())
            .finish()
    }
}

impl Drop for ConfinedExecutor {
    fn drop(&mut self) {
        // Don't block in drop, just let the queue drain.
        self.shutdown();
    }
}

/// Runs jobs until the terminal marker arrives or every sender is gone.
fn worker_loop(receiver: &Receiver<Job>, state: &ExecutorState) {
    while let Ok(job) = receiver.recv() {
        match job {
            Job::Run(task) => {
                run_guarded(task, state);
                state.pending_tasks.fetch_sub(1, Ordering::AcqRel);
            }
            Job::Shutdown => break,
        }
    }
}

/// Runs one task, containing any panic to that task.
fn run_guarded(task: Task, state: &ExecutorState) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        state.faulted_tasks.fetch_add(1, Ordering::AcqRel);
        tracing::error!(
            target: targets::EXECUTOR,
            panic = panic_message(payload.as_ref()),
            "task panicked, worker continues with the next task"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}
