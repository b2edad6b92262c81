//! External collaborator interfaces.
//!
//! The core is generic over these traits; it never talks to hardware
//! directly. A pre-boot integration crate implements them against real
//! devices, and a test build can implement them against fakes.

use crate::pixel::Pixel;

/// Resolution and pixel format reported by the output device. The wire
/// format is always pre-multiplied BGRA, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputInfo {
    pub horizontal_resolution: u32,
    pub vertical_resolution: u32,
}

/// The single externally-supplied block-transfer primitive. `src` is a
/// `width * height`-pixel-wide slice of the back buffer starting at
/// `(src_x, src_y)` with a row stride of `src_stride` pixels; the device
/// copies it to `(dst_x, dst_y)`.
pub trait OutputDevice {
    fn info(&self) -> OutputInfo;

    #[allow(clippy::too_many_arguments)]
    fn block_transfer(
        &mut self,
        src: &[Pixel],
        src_x: u32,
        src_y: u32,
        dst_x: u32,
        dst_y: u32,
        width: u32,
        height: u32,
        src_stride: usize,
    );
}

/// Current pointer-device sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerState {
    pub x: u32,
    pub y: u32,
    pub primary_down: bool,
}

pub trait PointerDevice {
    /// Clears any buffered motion/button state (called once per `DrawLoop`
    /// entry, mirroring the reference's pre-loop `GuiPointerReset`).
    fn reset(&mut self);

    /// Returns the latest sample, or `None` if no new state is available
    /// this iteration (treated as "no event" and swallowed by the caller).
    fn state(&mut self) -> Option<PointerState>;
}

/// A single decoded key event. Only one is read per main-loop iteration
/// by design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputKey {
    pub scancode: u16,
    pub unicode_char: Option<char>,
}

pub trait KeyDevice {
    fn reset(&mut self);
    fn read(&mut self) -> Option<InputKey>;
}

/// PNG decoding is explicitly out of scope for the core; this trait exists
/// only so [`crate::image::png_to_image`] can be exercised against a fake
/// decoder in tests. No concrete implementation ships with this crate.
///
/// The decoded buffer is raw, straight-alpha (non-premultiplied) channel
/// bytes, four per pixel, row-major with no padding. `png_to_image`
/// documents the exact channel order it assumes.
pub trait PngDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<(alloc::vec::Vec<u8>, u32, u32), crate::error::GuiError>;
}

/// Monotonic time source used for frame pacing.
pub trait Clock {
    /// Reads the time-stamp counter (or equivalent monotonic tick source).
    fn read_tsc(&self) -> u64;
    /// Ticks per second of [`Clock::read_tsc`].
    fn tsc_frequency(&self) -> u64;
    /// Yields briefly during a busy-wait (`pause`/`spin_loop` equivalent).
    fn cpu_pause(&self);
}

/// Raises/lowers interrupt priority and masks/restores maskable interrupts
/// around the frame pump's pacing wait and transfer batch. On a
/// hosted test build this is a no-op.
pub trait InterruptGuard {
    /// Disables interrupts, returning whatever state is needed to restore
    /// them, and runs `f` before restoring.
    fn without_interrupts<R>(&self, f: &mut dyn FnMut() -> R) -> R;
}
