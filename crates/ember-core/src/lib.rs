//! Core systems for Ember.
//!
//! This crate provides the thread-confinement primitives the renderer is built
//! on:
//!
//! - **Confined Executor**: a single dedicated worker thread with a FIFO task
//!   queue, fire-and-forget submission and a draining shutdown
//! - **Thread Affinity**: runtime checks that a confined resource is only
//!   touched from its owning thread
//! - **Logging**: `tracing` targets and span names used across the workspace
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use ember_core::{ConfinedExecutor, ThreadPriority};
//!
//! let executor = ConfinedExecutor::new("example-worker", ThreadPriority::Default)?;
//! let counter = Arc::new(AtomicUsize::new(0));
//!
//! for _ in 0..3 {
//!     let counter = counter.clone();
//!     executor.submit(move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     });
//! }
//!
//! executor.shutdown();
//! executor.join();
//! assert_eq!(counter.load(Ordering::SeqCst), 3);
//! # Ok::<(), ember_core::ExecutorError>(())
//! ```

mod error;
pub mod executor;
pub mod logging;
pub mod thread_check;

pub use error::{ExecutorError, Result};
pub use executor::{ConfinedExecutor, ExecutorBuilder, ExecutorConfig, ThreadPriority};
pub use logging::PerfSpan;
pub use thread_check::ThreadAffinity;
