//! Platform surface notifications.
//!
//! The windowing system pushes these to the application shell, which forwards
//! them to [`ConfinedRenderer::handle_surface_event`](crate::ConfinedRenderer::handle_surface_event).
//! Only availability and redraw requests reach the native context; geometry
//! changes and destruction are deliberately left unhandled.

use winit::event::WindowEvent;

/// A surface lifecycle notification carrying surfaces of type `S`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent<S> {
    /// A surface became available for rendering.
    Available(S),
    /// The surface changed size or format.
    GeometryChanged {
        /// New width in physical pixels.
        width: u32,
        /// New height in physical pixels.
        height: u32,
    },
    /// The surface is about to be destroyed or already was.
    Destroyed,
    /// The windowing system wants a fresh frame.
    RedrawNeeded,
}

impl<S> SurfaceEvent<S> {
    /// Translate a winit window event.
    ///
    /// winit has no per-window "surface available" event; shells create
    /// [`SurfaceEvent::Available`] themselves from `resumed` or window creation.
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::Resized(size) => Some(Self::GeometryChanged {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::RedrawRequested => Some(Self::RedrawNeeded),
            WindowEvent::Destroyed => Some(Self::Destroyed),
            _ => None,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Available(_) => "available",
            Self::GeometryChanged { .. } => "geometry_changed",
            Self::Destroyed => "destroyed",
            Self::RedrawNeeded => "redraw_needed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    #[test]
    fn test_resize_maps_to_geometry_change() {
        let event = WindowEvent::Resized(PhysicalSize::new(800, 600));
        assert_eq!(
            SurfaceEvent::<()>::from_window_event(&event),
            Some(SurfaceEvent::GeometryChanged {
                width: 800,
                height: 600
            })
        );
    }

    #[test]
    fn test_redraw_and_destroy_map() {
        assert_eq!(
            SurfaceEvent::<()>::from_window_event(&WindowEvent::RedrawRequested),
            Some(SurfaceEvent::RedrawNeeded)
        );
        assert_eq!(
            SurfaceEvent::<()>::from_window_event(&WindowEvent::Destroyed),
            Some(SurfaceEvent::Destroyed)
        );
    }

    #[test]
    fn test_unrelated_events_are_ignored() {
        assert_eq!(
            SurfaceEvent::<()>::from_window_event(&WindowEvent::CloseRequested),
            None
        );
        assert_eq!(
            SurfaceEvent::<()>::from_window_event(&WindowEvent::Focused(true)),
            None
        );
    }

    #[test]
    fn test_kind() {
        assert_eq!(SurfaceEvent::Available(1u8).kind(), "available");
        assert_eq!(SurfaceEvent::<u8>::RedrawNeeded.kind(), "redraw_needed");
    }
}
