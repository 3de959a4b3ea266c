//! A native graphics backend without a GPU.
//!
//! [`HeadlessGraphics`] implements [`NativeGraphics`] with plain bookkeeping:
//! contexts are slots in a table, surfaces are plain descriptions, and frames
//! are counted rather than drawn. It is what the renderer runs on in CI and on
//! machines without a display, and it mirrors the native contract closely:
//!
//! - binding a surface first releases whatever surface was bound before, then
//!   fails for a zero-sized surface;
//! - rendering without a bound surface succeeds against an offscreen target
//!   but is not counted as presented;
//! - every context gets its own texture name.
//!
//! A shared [`HeadlessReport`] lets other threads observe what happened.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ember_core::logging::targets;
use parking_lot::Mutex;
use slotmap::{Key, KeyData, SlotMap, new_key_type};

use crate::native::{NativeContextHandle, NativeGraphics};

new_key_type! {
    /// Slot of a headless context.
    struct ContextKey;
}

/// Description of a drawable target for [`HeadlessGraphics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadlessSurface {
    /// Caller-chosen identifier.
    pub id: u64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl HeadlessSurface {
    /// Create a surface description.
    pub fn new(id: u64, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }

    fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Counters shared between a [`HeadlessGraphics`] and its observers.
#[derive(Debug, Default)]
pub struct HeadlessReport {
    contexts_created: AtomicU64,
    contexts_destroyed: AtomicU64,
    surfaces_bound: AtomicU64,
    frames_rendered: AtomicU64,
    frames_presented: AtomicU64,
    last_surface: Mutex<Option<HeadlessSurface>>,
}

impl HeadlessReport {
    /// Contexts created so far.
    pub fn contexts_created(&self) -> u64 {
        self.contexts_created.load(Ordering::Acquire)
    }

    /// Contexts destroyed so far.
    pub fn contexts_destroyed(&self) -> u64 {
        self.contexts_destroyed.load(Ordering::Acquire)
    }

    /// Successful surface binds.
    pub fn surfaces_bound(&self) -> u64 {
        self.surfaces_bound.load(Ordering::Acquire)
    }

    /// Frames rendered, presented or offscreen.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Acquire)
    }

    /// Frames rendered while a window surface was bound.
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented.load(Ordering::Acquire)
    }

    /// The most recently bound surface.
    pub fn last_surface(&self) -> Option<HeadlessSurface> {
        *self.last_surface.lock()
    }
}

#[derive(Debug)]
struct HeadlessContext {
    surface: Option<HeadlessSurface>,
    texture_name: u32,
}

/// GPU-free implementation of the native graphics boundary.
#[derive(Debug)]
pub struct HeadlessGraphics {
    contexts: SlotMap<ContextKey, HeadlessContext>,
    next_texture_name: u32,
    report: Arc<HeadlessReport>,
}

impl Default for HeadlessGraphics {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessGraphics {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self {
            contexts: SlotMap::with_key(),
            next_texture_name: 1,
            report: Arc::new(HeadlessReport::default()),
        }
    }

    /// Shared counters, readable from any thread.
    pub fn report(&self) -> Arc<HeadlessReport> {
        Arc::clone(&self.report)
    }

    /// Number of contexts currently alive.
    pub fn live_contexts(&self) -> usize {
        self.contexts.len()
    }

    fn key(context: NativeContextHandle) -> Option<ContextKey> {
        // A zero token would decode to the first slot, so reject it up front.
        context
            .is_valid()
            .then(|| ContextKey::from(KeyData::from_ffi(context.as_raw())))
    }

    fn context_mut(&mut self, context: NativeContextHandle) -> Option<&mut HeadlessContext> {
        let key = Self::key(context)?;
        let found = self.contexts.get_mut(key);
        if found.is_none() {
            tracing::warn!(target: targets::HEADLESS, %context, "unknown context");
        }
        found
    }
}

impl NativeGraphics for HeadlessGraphics {
    type Surface = HeadlessSurface;

    fn create_context(&mut self) -> NativeContextHandle {
        let texture_name = self.next_texture_name;
        self.next_texture_name = self.next_texture_name.wrapping_add(1).max(1);

        let key = self.contexts.insert(HeadlessContext {
            surface: None,
            texture_name,
        });
        let handle = NativeContextHandle::from_raw(key.data().as_ffi());
        self.report.contexts_created.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(target: targets::HEADLESS, context = %handle, texture_name, "context created");
        handle
    }

    fn bind_surface(&mut self, context: NativeContextHandle, surface: HeadlessSurface) -> bool {
        let Some(entry) = self.context_mut(context) else {
            return false;
        };

        if let Some(previous) = entry.surface.take() {
            tracing::debug!(target: targets::HEADLESS, %context, previous = previous.id, "released previous surface");
        }
        if surface.is_empty() {
            tracing::warn!(
                target: targets::HEADLESS,
                %context,
                surface = surface.id,
                width = surface.width,
                height = surface.height,
                "cannot bind an empty surface"
            );
            return false;
        }

        entry.surface = Some(surface);
        self.report.surfaces_bound.fetch_add(1, Ordering::AcqRel);
        *self.report.last_surface.lock() = Some(surface);
        true
    }

    fn query_texture_name(&mut self, context: NativeContextHandle) -> u32 {
        self.context_mut(context)
            .map_or(0, |entry| entry.texture_name)
    }

    fn render_frame(&mut self, context: NativeContextHandle) -> bool {
        let Some(entry) = self.context_mut(context) else {
            return false;
        };
        let presented = entry.surface.is_some();

        self.report.frames_rendered.fetch_add(1, Ordering::AcqRel);
        if presented {
            self.report.frames_presented.fetch_add(1, Ordering::AcqRel);
        }
        true
    }

    fn destroy_context(&mut self, context: NativeContextHandle) {
        let removed = Self::key(context).and_then(|key| self.contexts.remove(key));
        match removed {
            Some(_) => {
                self.report.contexts_destroyed.fetch_add(1, Ordering::AcqRel);
                tracing::debug!(target: targets::HEADLESS, %context, "context destroyed");
            }
            None => {
                tracing::warn!(target: targets::HEADLESS, %context, "destroy of unknown context");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_returns_distinct_valid_handles() {
        let mut graphics = HeadlessGraphics::new();
        let first = graphics.create_context();
        let second = graphics.create_context();

        assert!(first.is_valid());
        assert!(second.is_valid());
        assert_ne!(first, second);
        assert_ne!(
            graphics.query_texture_name(first),
            graphics.query_texture_name(second)
        );
        assert_eq!(graphics.live_contexts(), 2);
    }

    #[test]
    fn test_render_counts_presented_only_with_surface() {
        let mut graphics = HeadlessGraphics::new();
        let report = graphics.report();
        let context = graphics.create_context();

        assert!(graphics.render_frame(context));
        assert!(graphics.bind_surface(context, HeadlessSurface::new(1, 640, 480)));
        assert!(graphics.render_frame(context));

        assert_eq!(report.frames_rendered(), 2);
        assert_eq!(report.frames_presented(), 1);
        assert_eq!(report.last_surface(), Some(HeadlessSurface::new(1, 640, 480)));
    }

    #[test]
    fn test_empty_surface_releases_previous_binding() {
        let mut graphics = HeadlessGraphics::new();
        let report = graphics.report();
        let context = graphics.create_context();

        assert!(graphics.bind_surface(context, HeadlessSurface::new(1, 640, 480)));
        assert!(!graphics.bind_surface(context, HeadlessSurface::new(2, 0, 480)));
        assert!(graphics.render_frame(context));

        assert_eq!(report.surfaces_bound(), 1);
        assert_eq!(report.frames_presented(), 0);
    }

    #[test]
    fn test_invalid_and_stale_handles() {
        let mut graphics = HeadlessGraphics::new();
        let context = graphics.create_context();

        assert!(!graphics.render_frame(NativeContextHandle::INVALID));
        assert_eq!(graphics.query_texture_name(NativeContextHandle::INVALID), 0);

        graphics.destroy_context(context);
        assert_eq!(graphics.live_contexts(), 0);
        assert!(!graphics.render_frame(context));
        assert!(!graphics.bind_surface(context, HeadlessSurface::new(1, 1, 1)));

        // A second destroy is reported, not double-counted.
        graphics.destroy_context(context);
        assert_eq!(graphics.report().contexts_destroyed(), 1);
    }

    #[test]
    fn test_slot_reuse_does_not_revive_stale_handle() {
        let mut graphics = HeadlessGraphics::new();
        let stale = graphics.create_context();
        graphics.destroy_context(stale);

        let fresh = graphics.create_context();
        assert_ne!(stale, fresh);
        assert!(!graphics.render_frame(stale));
        assert!(graphics.render_frame(fresh));
    }
}
