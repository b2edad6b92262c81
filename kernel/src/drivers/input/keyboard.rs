//! PS/2 keyboard [`KeyDevice`] adapter.
//!
//! Scancode-to-character translation already happens inside
//! `interrupts::keyboard_interrupt_handler`; this module only registers a
//! callback that buffers the latest decoded key for polling, rather than
//! duplicating the scancode tables.

use gui_core::collab::{InputKey, KeyDevice};
use spin::Mutex;

static LATEST_KEY: Mutex<Option<InputKey>> = Mutex::new(None);

fn on_key_event(unicode_char: char, scancode: u8, pressed: bool) {
    if !pressed {
        return;
    }
    let unicode_char = if unicode_char == '\0' { None } else { Some(unicode_char) };
    *LATEST_KEY.lock() = Some(InputKey { scancode: scancode as u16, unicode_char });
}

/// Registers this adapter's callback with the keyboard interrupt handler.
/// Must run after `interrupts::init` but can run before interrupts are
/// enabled.
pub fn init() {
    crate::interrupts::register_key_callback(on_key_event);
}

pub struct Ps2KeyDevice;

impl KeyDevice for Ps2KeyDevice {
    fn reset(&mut self) {
        *LATEST_KEY.lock() = None;
    }

    fn read(&mut self) -> Option<InputKey> {
        LATEST_KEY.lock().take()
    }
}
