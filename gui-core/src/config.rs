//! Compile-time tunables for the compositor core.

/// Target refresh rate in frames per second.
pub const TARGET_FPS: u64 = 60;

/// Maximum number of coalesced dirty rectangles the tracker holds between
/// flushes.
pub const MAX_DIRTY_RECTS: usize = 4;

/// Fractional bits of the interpolation engine's fixed-point time factor
/// (`2^12`).
pub const INTERPOL_FP_SHIFT: u32 = 12;

/// Fixed-point unit corresponding to one quarter circle in the sine
/// approximation's input domain (`2^13`).
pub const SIN_QUARTER_CIRCLE_SHIFT: u32 = 13;

/// Side length of the pointer cursor's damage margin padding, matching the
/// reference's `CURSOR_SIZE`-style slack used when unioning old/new cursor
/// rectangles. Unused unless a concrete cursor image reports a size of 0,
/// which the cursor stage treats defensively.
pub const MIN_CURSOR_EXTENT: u32 = 1;
