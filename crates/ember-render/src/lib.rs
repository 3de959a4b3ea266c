//! Thread-confined lifecycle control for a native rendering context.
//!
//! Native graphics APIs (EGL/OpenGL ES and friends) bind a context to the
//! thread that made it current. This crate keeps that promise for you: a
//! [`ConfinedRenderer`] owns exactly one native context and routes every
//! operation on it through a dedicated worker thread, while callers (usually
//! the UI or event thread) only ever enqueue.
//!
//! # Getting Started
//!
//! Implement [`NativeGraphics`] for your native library, or use the bundled
//! [`HeadlessGraphics`] backend:
//!
//! ```
//! use ember_render::{ConfinedRenderer, HeadlessGraphics, HeadlessSurface, SurfaceEvent};
//!
//! let graphics = HeadlessGraphics::new();
//! let report = graphics.report();
//! let renderer = ConfinedRenderer::new(graphics)?;
//!
//! // Typically forwarded from the windowing system.
//! renderer.handle_surface_event(SurfaceEvent::Available(HeadlessSurface::new(1, 800, 600)));
//! renderer.handle_surface_event(SurfaceEvent::RedrawNeeded);
//!
//! renderer.shutdown();
//! renderer.join();
//! assert_eq!(report.frames_presented(), 1);
//! assert_eq!(report.contexts_destroyed(), 1);
//! # Ok::<(), ember_render::RenderError>(())
//! ```
//!
//! # winit Integration
//!
//! [`SurfaceEvent::from_window_event`] turns the relevant `WindowEvent`s into
//! surface notifications, so an `ApplicationHandler` can forward them as-is.

mod error;
pub mod headless;
pub mod native;
pub mod renderer;
pub mod surface;

pub use error::{RenderError, RenderResult};
pub use headless::{HeadlessGraphics, HeadlessReport, HeadlessSurface};
pub use native::{NativeContextHandle, NativeGraphics};
pub use renderer::{
    ConfinedRenderer, DEFAULT_THREAD_NAME_PREFIX, RendererBuilder, RendererConfig, RendererStats,
};
pub use surface::SurfaceEvent;

// Re-export the executor types callers configure renderers with.
pub use ember_core::{ConfinedExecutor, ExecutorError, ThreadPriority};
