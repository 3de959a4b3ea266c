//! Logging facilities for Ember.
//!
//! Ember is instrumented with the `tracing` crate and never installs a
//! subscriber itself. To see logs, install one in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! Every event is emitted under one of the [`targets`], so a directive such as
//! `RUST_LOG=ember_core::executor=debug,ember_render=info` isolates the
//! worker lifecycle from per-frame noise.

/// Span names used throughout Ember for tracing.
pub mod span_names {
    /// Lifetime of a confined worker thread.
    pub const WORKER: &str = "ember::worker";
    /// One render/present pass on the worker.
    pub const FRAME: &str = "ember::frame";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "ember_core";
    /// Confined executor target.
    pub const EXECUTOR: &str = "ember_core::executor";
    /// Renderer lifecycle target.
    pub const RENDERER: &str = "ember_render::renderer";
    /// Surface event dispatch target.
    pub const SURFACE: &str = "ember_render::surface";
    /// Headless backend target.
    pub const HEADLESS: &str = "ember_render::headless";
    /// Performance spans.
    pub const PERF: &str = "ember::perf";
}

/// A guard that keeps a tracing span entered until it is dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_are_namespaced() {
        assert!(targets::EXECUTOR.starts_with(targets::CORE));
        assert!(targets::RENDERER.starts_with("ember_render"));
        assert!(targets::SURFACE.starts_with("ember_render"));
        assert!(targets::PERF.starts_with("ember"));
    }

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new(span_names::FRAME);
    }
}
