//! Renderer lifecycle controller.
//!
//! [`ConfinedRenderer`] is the single front door to one native rendering
//! context. Every public operation is wrapped as a task and handed to the
//! renderer's own [`ConfinedExecutor`], so the native context is created,
//! bound, drawn and destroyed on one worker thread for its whole life, no
//! matter which thread the calls come from.
//!
//! No operation blocks or returns a result. Effects are observed
//! asynchronously and in order: a redraw requested after
//! [`attach_output_surface`](ConfinedRenderer::attach_output_surface) returned
//! always sees that surface bound.
//!
//! # Example
//!
//! ```no_run
//! use ember_render::{ConfinedRenderer, HeadlessGraphics, HeadlessSurface};
//!
//! let renderer = ConfinedRenderer::new(HeadlessGraphics::new())?;
//!
//! renderer.attach_output_surface(HeadlessSurface::new(1, 1280, 720));
//! renderer.invalidate_surface();
//!
//! // Destroys the context once the frame above has been drawn.
//! renderer.shutdown();
//! # Ok::<(), ember_render::RenderError>(())
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use ember_core::logging::{span_names, targets};
use ember_core::{ConfinedExecutor, ExecutorConfig, PerfSpan, ThreadAffinity, ThreadPriority};
use parking_lot::Mutex;

use crate::error::{RenderError, RenderResult};
use crate::headless::HeadlessGraphics;
use crate::native::{NativeContextHandle, NativeGraphics};
use crate::surface::SurfaceEvent;

/// Default prefix for renderer worker-thread names.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "GLRenderer";

/// Process-wide count of renderers ever created, used to name their workers.
static RENDERER_COUNT: AtomicU32 = AtomicU32::new(0);

fn next_worker_name(prefix: &str) -> String {
    let instance = RENDERER_COUNT.fetch_add(1, Ordering::Relaxed) + 1;
    format!("{prefix}-{instance:03}")
}

/// Configuration for creating a [`ConfinedRenderer`].
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Prefix of the worker-thread name; a per-process instance number is appended.
    pub thread_name_prefix: String,
    /// Scheduling priority hint for the worker.
    pub priority: ThreadPriority,
    /// Stack size for the worker thread in bytes. `None` uses the default.
    pub stack_size: Option<usize>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            priority: ThreadPriority::Default,
            stack_size: None,
        }
    }
}

/// Builder for creating renderers with custom configuration.
#[derive(Debug, Default)]
pub struct RendererBuilder {
    config: RendererConfig,
}

impl RendererBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker-thread name prefix.
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Set the worker scheduling priority hint.
    pub fn priority(mut self, priority: ThreadPriority) -> Self {
        self.config.priority = priority;
        self
    }

    /// Set the stack size for the worker thread.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    /// Start a renderer driving `backend`.
    pub fn build<B: NativeGraphics>(self, backend: B) -> RenderResult<ConfinedRenderer<B>> {
        ConfinedRenderer::with_config(backend, self.config)
    }
}

/// Snapshot of what a renderer's worker has done so far.
///
/// Native failures never reach the caller; these counters are the passive
/// way to notice them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    /// Surface binds the native side accepted.
    pub binds_succeeded: u64,
    /// Surface binds the native side rejected.
    pub binds_failed: u64,
    /// Frames the native side rendered.
    pub frames_rendered: u64,
    /// Frames the native side failed to render.
    pub frames_failed: u64,
    /// Whether a valid native context was created.
    pub context_created: bool,
    /// Whether that context has been destroyed.
    pub context_destroyed: bool,
}

#[derive(Debug, Default)]
struct StatsCounters {
    binds_succeeded: AtomicU64,
    binds_failed: AtomicU64,
    frames_rendered: AtomicU64,
    frames_failed: AtomicU64,
    context_created: AtomicBool,
    context_destroyed: AtomicBool,
}

impl StatsCounters {
    fn snapshot(&self) -> RendererStats {
        RendererStats {
            binds_succeeded: self.binds_succeeded.load(Ordering::Acquire),
            binds_failed: self.binds_failed.load(Ordering::Acquire),
            frames_rendered: self.frames_rendered.load(Ordering::Acquire),
            frames_failed: self.frames_failed.load(Ordering::Acquire),
            context_created: self.context_created.load(Ordering::Acquire),
            context_destroyed: self.context_destroyed.load(Ordering::Acquire),
        }
    }
}

/// The native backend plus the one handle it produced.
///
/// Only worker tasks lock this, so the mutex is never contended; it exists to
/// move the slot between the tasks that run one after another.
struct ContextSlot<B: NativeGraphics> {
    backend: B,
    handle: NativeContextHandle,
    affinity: ThreadAffinity,
}

impl<B: NativeGraphics> ContextSlot<B> {
    fn create(&mut self, stats: &StatsCounters) {
        self.affinity.checked_assert_same_thread();
        if self.handle.is_valid() {
            tracing::warn!(target: targets::RENDERER, context = %self.handle, "context already created");
            return;
        }

        let handle = self.backend.create_context();
        if handle.is_valid() {
            stats.context_created.store(true, Ordering::Release);
            tracing::info!(target: targets::RENDERER, context = %handle, "native context created");
        } else {
            tracing::warn!(target: targets::RENDERER, "native context creation failed");
        }
        self.handle = handle;
    }

    /// The live handle, or `None` (logged) if there is nothing to operate on.
    fn live_handle(&self, operation: &'static str) -> Option<NativeContextHandle> {
        self.affinity.checked_assert_same_thread();
        if self.handle.is_valid() {
            Some(self.handle)
        } else {
            tracing::warn!(target: targets::RENDERER, operation, "no live native context, skipping");
            None
        }
    }

    fn bind(&mut self, surface: B::Surface, stats: &StatsCounters) {
        let Some(handle) = self.live_handle("bind_surface") else {
            return;
        };

        if self.backend.bind_surface(handle, surface) {
            stats.binds_succeeded.fetch_add(1, Ordering::AcqRel);
            tracing::debug!(target: targets::RENDERER, context = %handle, "surface bound");
        } else {
            stats.binds_failed.fetch_add(1, Ordering::AcqRel);
            tracing::warn!(target: targets::RENDERER, context = %handle, "failed to bind surface");
        }
    }

    fn render(&mut self, stats: &StatsCounters) {
        let Some(handle) = self.live_handle("render_frame") else {
            return;
        };

        let _span = PerfSpan::new(span_names::FRAME);
        if self.backend.render_frame(handle) {
            stats.frames_rendered.fetch_add(1, Ordering::AcqRel);
            tracing::trace!(target: targets::RENDERER, context = %handle, "frame rendered");
        } else {
            stats.frames_failed.fetch_add(1, Ordering::AcqRel);
            tracing::warn!(target: targets::RENDERER, context = %handle, "failed to render frame");
        }
    }

    fn texture_name(&mut self) -> Option<u32> {
        let handle = self.live_handle("query_texture_name")?;
        Some(self.backend.query_texture_name(handle))
    }

    fn close(&mut self, stats: &StatsCounters) {
        let Some(handle) = self.live_handle("destroy_context") else {
            return;
        };

        self.backend.destroy_context(handle);
        self.handle = NativeContextHandle::INVALID;
        stats.context_destroyed.store(true, Ordering::Release);
        tracing::info!(target: targets::RENDERER, context = %handle, "native context destroyed");
    }
}

/// Owns one native rendering context and confines it to a dedicated thread.
///
/// All methods may be called from any thread and return immediately.
pub struct ConfinedRenderer<B: NativeGraphics> {
    executor: ConfinedExecutor,
    slot: Arc<Mutex<ContextSlot<B>>>,
    stats: Arc<StatsCounters>,
    closed: AtomicBool,
}

static_assertions::assert_impl_all!(ConfinedRenderer<HeadlessGraphics>: Send, Sync);

impl<B: NativeGraphics> ConfinedRenderer<B> {
    /// Start a renderer with the default configuration.
    ///
    /// Creation of the native context is queued before this returns, so it
    /// precedes every other operation on the renderer.
    pub fn new(backend: B) -> RenderResult<Self> {
        Self::with_config(backend, RendererConfig::default())
    }

    /// Start a renderer from an explicit configuration.
    pub fn with_config(backend: B, config: RendererConfig) -> RenderResult<Self> {
        let prefix = config.thread_name_prefix;
        if prefix.is_empty() {
            return Err(RenderError::InvalidThreadName(prefix));
        }

        let executor = ConfinedExecutor::with_config(ExecutorConfig {
            name: next_worker_name(&prefix),
            priority: config.priority,
            stack_size: config.stack_size,
        })?;

        let slot = ContextSlot {
            backend,
            handle: NativeContextHandle::INVALID,
            affinity: ThreadAffinity::for_thread(executor.worker_thread_id()),
        };
        let renderer = Self {
            executor,
            slot: Arc::new(Mutex::new(slot)),
            stats: Arc::new(StatsCounters::default()),
            closed: AtomicBool::new(false),
        };

        renderer.submit_to_slot(|slot, stats| slot.create(stats));
        tracing::info!(
            target: targets::RENDERER,
            renderer = renderer.name(),
            priority = ?renderer.executor.priority(),
            "renderer started"
        );
        Ok(renderer)
    }

    /// Queue a bind of the native context to `surface`.
    ///
    /// Bind failures are logged and counted, never reported to the caller.
    pub fn attach_output_surface(&self, surface: B::Surface) {
        tracing::debug!(target: targets::RENDERER, renderer = self.name(), "attach_output_surface");
        self.submit_to_slot(move |slot, stats| slot.bind(surface, stats));
    }

    /// Queue one redraw pass.
    pub fn invalidate_surface(&self) {
        tracing::trace!(target: targets::RENDERER, renderer = self.name(), "invalidate_surface");
        self.submit_to_slot(|slot, stats| slot.render(stats));
    }

    /// Queue a query of the context's texture name.
    ///
    /// `callback` runs on the worker thread with `None` if there is no live
    /// context. It should hand the value off rather than do heavy work there.
    /// After shutdown the callback never runs.
    pub fn with_texture_name<C>(&self, callback: C)
    where
        C: FnOnce(Option<u32>) + Send + 'static,
    {
        self.submit_to_slot(move |slot, _| callback(slot.texture_name()));
    }

    /// Queue destruction of the native context and stop the worker after it.
    ///
    /// Idempotent. Operations submitted afterwards are accepted and dropped.
    #[tracing::instrument(skip(self), target = "ember_render::renderer", level = "debug", fields(renderer = self.name()))]
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(target: targets::RENDERER, "already shut down");
            return;
        }

        self.submit_to_slot(|slot, stats| slot.close(stats));
        self.executor.shutdown();
    }

    /// Route a platform surface notification.
    ///
    /// Availability attaches the surface and redraw requests invalidate it.
    /// Geometry changes and destruction are not forwarded to the native
    /// context: the bound surface stays as it is until a new one arrives.
    pub fn handle_surface_event(&self, event: SurfaceEvent<B::Surface>) {
        match event {
            SurfaceEvent::Available(surface) => self.attach_output_surface(surface),
            SurfaceEvent::RedrawNeeded => self.invalidate_surface(),
            SurfaceEvent::GeometryChanged { width, height } => {
                tracing::debug!(
                    target: targets::SURFACE,
                    renderer = self.name(),
                    width,
                    height,
                    "surface geometry change not forwarded"
                );
            }
            SurfaceEvent::Destroyed => {
                tracing::debug!(
                    target: targets::SURFACE,
                    renderer = self.name(),
                    "surface destruction not forwarded"
                );
            }
        }
    }

    /// Name of the worker thread, e.g. `GLRenderer-001`.
    pub fn name(&self) -> &str {
        self.executor.name()
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Counters describing what the worker has done so far.
    pub fn stats(&self) -> RendererStats {
        self.stats.snapshot()
    }

    /// Tasks that panicked on the worker, native calls included.
    pub fn faulted_tasks(&self) -> usize {
        self.executor.faulted_tasks()
    }

    /// Block until the worker has exited after [`shutdown`](Self::shutdown).
    ///
    /// Never needed for correct operation; meant for orderly process
    /// teardown. Returns `false` if already joined or called from the worker.
    pub fn join(&self) -> bool {
        self.executor.join()
    }

    /// Wait for the worker to exit, giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.executor.wait_timeout(timeout)
    }

    fn submit_to_slot<F>(&self, task: F)
    where
        F: FnOnce(&mut ContextSlot<B>, &StatsCounters) + Send + 'static,
    {
        let slot = Arc::clone(&self.slot);
        let stats = Arc::clone(&self.stats);
        self.executor.submit(move || {
            let mut slot = slot.lock();
            task(&mut *slot, &*stats);
        });
    }
}

impl<B: NativeGraphics> fmt::Debug for ConfinedRenderer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfinedRenderer")
            .field("name", &self.name())
            .field("shut_down", &self.is_shut_down())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<B: NativeGraphics> Drop for ConfinedRenderer<B> {
    fn drop(&mut self) {
        // Non-blocking: the worker destroys the context and exits on its own.
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessSurface;
    use ember_core::ExecutorError;

    #[test]
    fn test_worker_names_are_unique_and_padded() {
        let first = next_worker_name("Unit");
        let second = next_worker_name("Unit");

        assert_ne!(first, second);
        for name in [&first, &second] {
            let number = name.strip_prefix("Unit-").unwrap();
            assert!(number.len() >= 3);
            assert!(number.parse::<u32>().unwrap() >= 1);
        }
    }

    #[test]
    fn test_builder_sets_prefix_and_priority() {
        let renderer = RendererBuilder::new()
            .thread_name_prefix("Preview")
            .priority(ThreadPriority::Display)
            .build(HeadlessGraphics::new())
            .unwrap();

        assert!(renderer.name().starts_with("Preview-"));
        assert_eq!(renderer.executor.priority(), ThreadPriority::Display);
        renderer.shutdown();
        assert!(renderer.join());
    }

    #[test]
    fn test_invalid_prefix_is_rejected() {
        let empty = RendererBuilder::new()
            .thread_name_prefix("")
            .build(HeadlessGraphics::new());
        assert!(matches!(empty, Err(RenderError::InvalidThreadName(_))));

        let nul = RendererBuilder::new()
            .thread_name_prefix("GL\0Renderer")
            .build(HeadlessGraphics::new());
        assert!(matches!(
            nul,
            Err(RenderError::Executor(ExecutorError::InvalidName { .. }))
        ));
    }

    #[test]
    fn test_headless_lifecycle_stats() {
        let graphics = HeadlessGraphics::new();
        let report = graphics.report();
        let renderer = ConfinedRenderer::new(graphics).unwrap();

        renderer.attach_output_surface(HeadlessSurface::new(7, 320, 240));
        renderer.invalidate_surface();
        renderer.invalidate_surface();
        renderer.shutdown();
        assert!(renderer.join());

        assert_eq!(
            renderer.stats(),
            RendererStats {
                binds_succeeded: 1,
                binds_failed: 0,
                frames_rendered: 2,
                frames_failed: 0,
                context_created: true,
                context_destroyed: true,
            }
        );
        assert_eq!(report.frames_presented(), 2);
        assert_eq!(report.contexts_destroyed(), 1);
    }

    #[test]
    fn test_shutdown_flag() {
        let renderer = ConfinedRenderer::new(HeadlessGraphics::new()).unwrap();
        assert!(!renderer.is_shut_down());
        renderer.shutdown();
        assert!(renderer.is_shut_down());
        assert!(renderer.wait_timeout(Duration::from_secs(5)));
    }
}
