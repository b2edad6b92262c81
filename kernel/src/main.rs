//! Pre-boot GUI compositor kernel.
//!
//! Boots to a single-threaded scene graph and frame pump driven directly
//! by the bootloader-provided framebuffer and PS/2 input, with no
//! scheduler, filesystem, or network stack: those concerns sit outside
//! this crate's scope. See `gui-core` for the compositor itself.
//!
//! # Boot sequence
//!
//! 1. UEFI firmware initializes
//! 2. bootloader loads the kernel and sets up the GOP framebuffer
//! 3. bootloader jumps to `kernel_main`
//! 4. serial -> GDT -> IDT -> memory/heap -> APIC timer + TSC calibration
//!    -> PS/2 keyboard/mouse -> `GuiEngine::construct` -> `draw_loop`

#![no_std]
#![no_main]
#![feature(abi_x86_interrupt)]
#![feature(alloc_error_handler)]
#![feature(custom_test_frameworks)]
#![test_runner(crate::test::test_runner)]
#![reexport_test_harness_main = "test_main"]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

mod allocator;
mod arch;
mod clock;
mod config;
mod drivers;
mod gdt;
mod gui_demo;
mod interrupts;
mod logger;
mod memory;
mod panic;
mod serial;

#[cfg(test)]
mod test;

use alloc::boxed::Box;
use bootloader_api::{entry_point, BootInfo, BootloaderConfig};
use gui_core::pixel::{Image, Pixel};
use gui_core::GuiEngine;

/// Bootloader configuration.
///
/// - Physical memory mapping: Dynamic (bootloader chooses offset)
/// - Framebuffer: Enabled for the compositor's output device
pub static BOOTLOADER_CONFIG: BootloaderConfig = {
    let mut config = BootloaderConfig::new_default();
    config.mappings.physical_memory = Some(bootloader_api::config::Mapping::Dynamic);
    config
};

entry_point!(kernel_main, config = &BOOTLOADER_CONFIG);

/// Number of APIC timer ticks to sample while calibrating the TSC.
const TSC_CALIBRATION_TICKS: u64 = 8;

fn kernel_main(boot_info: &'static mut BootInfo) -> ! {
    serial::init();
    logger::init(log::LevelFilter::Info);
    serial_println!("[KPIO] booting");

    gdt::init();
    interrupts::init();
    arch::init();
    serial_println!("[KPIO] GDT/IDT loaded, CPU features enabled");

    let phys_mem_offset = boot_info
        .physical_memory_offset
        .into_option()
        .expect("bootloader must map physical memory (BOOTLOADER_CONFIG.mappings.physical_memory)");
    memory::validate_physical_memory_offset(phys_mem_offset);

    let mut mapper = unsafe { memory::init(phys_mem_offset) };
    let mut frame_allocator =
        unsafe { memory::BootInfoFrameAllocator::new(boot_info.memory_regions.into_iter()) };
    allocator::init_heap(&mut mapper, &mut frame_allocator).expect("heap mapping failed");
    serial_println!("[KPIO] heap ready ({} MiB)", allocator::HEAP_SIZE / (1024 * 1024));

    let fb = boot_info
        .framebuffer
        .as_mut()
        .expect("bootloader must provide a framebuffer (BOOTLOADER_CONFIG.frame_buffer)");
    let (fb_width, fb_height) = (fb.info().width as u32, fb.info().height as u32);
    let output: Box<dyn gui_core::collab::OutputDevice> =
        Box::new(drivers::display::framebuffer::KernelFramebuffer::new(fb));
    serial_println!("[KPIO] framebuffer {}x{}", fb_width, fb_height);

    unsafe { interrupts::init_apic(phys_mem_offset) };
    interrupts::start_apic_timer(config::TIMER_FREQUENCY);
    interrupts::enable();

    let tsc_frequency = clock::calibrate_tsc_frequency(config::TIMER_FREQUENCY, TSC_CALIBRATION_TICKS);
    serial_println!("[KPIO] TSC calibrated at {} Hz", tsc_frequency);
    let clock: Box<dyn gui_core::collab::Clock> = Box::new(clock::TscClock::new(tsc_frequency));
    let interrupt_guard: Box<dyn gui_core::collab::InterruptGuard> = Box::new(clock::X86InterruptGuard);

    drivers::input::keyboard::init();
    drivers::input::mouse::init(fb_width, fb_height);
    let pointer: Box<dyn gui_core::collab::PointerDevice> = Box::new(drivers::input::mouse::Ps2PointerDevice);
    let key: Box<dyn gui_core::collab::KeyDevice> = Box::new(drivers::input::keyboard::Ps2KeyDevice);
    serial_println!("[KPIO] PS/2 input ready");

    let cursor_sprite = Image::new(8, 8, alloc::vec![Pixel::opaque(0xFF, 0xFF, 0xFF); 64]);

    let mut engine = GuiEngine::construct(
        output,
        Some(pointer),
        Some(key),
        clock,
        interrupt_guard,
        fb_width / 2,
        fb_height / 2,
        cursor_sprite.clone(),
    )
    .expect("engine construction failed: zero-size output or no input device");

    gui_demo::install_background(&mut engine, Pixel::opaque(0x20, 0x20, 0x20));
    gui_demo::install_cursor_image(&mut engine, cursor_sprite);
    engine.view_initialize(gui_demo::screen_draw, gui_demo::screen_ptr_event, gui_demo::screen_key_event);

    serial_println!("[KPIO] entering draw loop");
    gui_core::pump::draw_loop(&mut engine, gui_demo::exit_never, gui_demo::cursor_image);
}
