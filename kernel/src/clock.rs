//! [`Clock`] and [`InterruptGuard`] adapters over the TSC and the existing
//! interrupt-masking primitive.

use gui_core::collab::{Clock, InterruptGuard};

use crate::arch;
use crate::interrupts;

/// Busy-waits for one APIC timer tick to pass (to align to a tick boundary),
/// then measures how many TSC ticks elapse over the next `sample_ticks`
/// timer ticks. The APIC timer must already be running at `timer_hz` and
/// interrupts must be enabled, or this spins forever.
pub fn calibrate_tsc_frequency(timer_hz: u32, sample_ticks: u64) -> u64 {
    let start_tick = interrupts::timer_ticks();
    while interrupts::timer_ticks() == start_tick {
        core::hint::spin_loop();
    }

    let start_tsc = arch::rdtsc();
    let target_tick = interrupts::timer_ticks() + sample_ticks;
    while interrupts::timer_ticks() < target_tick {
        core::hint::spin_loop();
    }
    let end_tsc = arch::rdtsc();

    (end_tsc - start_tsc) * timer_hz as u64 / sample_ticks
}

pub struct TscClock {
    frequency: u64,
}

impl TscClock {
    pub fn new(frequency: u64) -> Self {
        Self { frequency }
    }
}

impl Clock for TscClock {
    fn read_tsc(&self) -> u64 {
        arch::rdtsc()
    }

    fn tsc_frequency(&self) -> u64 {
        self.frequency
    }

    fn cpu_pause(&self) {
        core::hint::spin_loop();
    }
}

/// Masks maskable interrupts for the duration of `f`, reusing the same
/// critical section `interrupts::without_interrupts` already provides
/// elsewhere in the kernel.
pub struct X86InterruptGuard;

impl InterruptGuard for X86InterruptGuard {
    fn without_interrupts<R>(&self, f: &mut dyn FnMut() -> R) -> R {
        interrupts::without_interrupts(move || f())
    }
}
