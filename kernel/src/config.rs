//! Kernel configuration constants.
//!
//! This module contains compile-time configuration for the kernel.
//! Values here affect memory layout and hardware timing.

/// Page size (4 KB).
pub const PAGE_SIZE: usize = 4096;

/// Large page size (2 MB).
pub const LARGE_PAGE_SIZE: usize = 2 * 1024 * 1024;

/// APIC timer frequency in Hz, also the tick rate TSC calibration samples
/// against.
pub const TIMER_FREQUENCY: u32 = 1000;

/// Serial port for debug output (COM1).
pub const DEBUG_SERIAL_PORT: u16 = 0x3F8;

/// Enable kernel debugging features based on build profile.
pub const DEBUG_ENABLED: bool = cfg!(debug_assertions);
