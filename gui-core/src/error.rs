//! Error kinds surfaced to callers of the core's public surface.
//!
//! Construction errors are returned and must be torn down by the caller;
//! per-frame failures (a failed BLT, an unreadable pointer packet) are not
//! surfaced through this type at all — they are swallowed at the call site.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiError {
    /// No output device, or no input device at all, is available.
    Unsupported,
    /// Allocation failed (back buffer, image buffer).
    OutOfResources,
    /// The PNG decoder rejected its input.
    InvalidData,
}

impl fmt::Display for GuiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuiError::Unsupported => write!(f, "required device unavailable"),
            GuiError::OutOfResources => write!(f, "allocation failed"),
            GuiError::InvalidData => write!(f, "invalid image data"),
        }
    }
}
