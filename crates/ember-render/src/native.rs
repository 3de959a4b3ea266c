//! The boundary to the native graphics implementation.
//!
//! Everything behind [`NativeGraphics`] is a black box: context creation,
//! shader and texture setup, draw calls and buffer presentation. The renderer
//! only moves an opaque [`NativeContextHandle`] across this boundary and
//! guarantees every call happens on its worker thread.

use std::fmt;

/// Opaque token identifying a live native rendering context.
///
/// Zero is the sentinel for "not created" and is also what a failed
/// [`NativeGraphics::create_context`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativeContextHandle(u64);

impl NativeContextHandle {
    /// The sentinel handle.
    pub const INVALID: Self = Self(0);

    /// Wrap a raw token produced by the native side.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw token, for handing back to the native side.
    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Whether this handle refers to a created context.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for NativeContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "ctx:{:#x}", self.0)
        } else {
            write!(f, "ctx:<invalid>")
        }
    }
}

/// The five primitive operations a native rendering implementation provides.
///
/// Implementations are moved onto the renderer's worker thread and are only
/// ever called from there, so they need to be `Send` but not `Sync`. Failures
/// are reported in-band (sentinel handle, `false`) and never panic across
/// this boundary by contract; a panic is still contained to the task that
/// made the call.
pub trait NativeGraphics: Send + 'static {
    /// Platform surface the context can be bound to.
    type Surface: Send + 'static;

    /// Allocate a rendering context, returning [`NativeContextHandle::INVALID`]
    /// on failure.
    fn create_context(&mut self) -> NativeContextHandle;

    /// Bind `context` to `surface`, replacing any surface bound before.
    fn bind_surface(&mut self, context: NativeContextHandle, surface: Self::Surface) -> bool;

    /// Name of the texture the context renders into, for external composition.
    fn query_texture_name(&mut self, context: NativeContextHandle) -> u32;

    /// Render and present one frame.
    fn render_frame(&mut self, context: NativeContextHandle) -> bool;

    /// Release every native resource held by `context`.
    ///
    /// Called at most once per handle.
    fn destroy_context(&mut self, context: NativeContextHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_handle() {
        assert!(!NativeContextHandle::INVALID.is_valid());
        assert_eq!(NativeContextHandle::default(), NativeContextHandle::INVALID);
        assert_eq!(NativeContextHandle::INVALID.to_string(), "ctx:<invalid>");
    }

    #[test]
    fn test_raw_roundtrip_and_display() {
        let handle = NativeContextHandle::from_raw(0x2a);
        assert!(handle.is_valid());
        assert_eq!(handle.as_raw(), 0x2a);
        assert_eq!(handle.to_string(), "ctx:0x2a");
    }
}
