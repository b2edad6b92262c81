//! PS/2 mouse: controller init, packet decoding, and the
//! [`PointerDevice`] adapter.
//!
//! The controller handshake (enable the aux port, unmask its IRQ, put the
//! mouse into streaming mode) follows the same command sequence as a
//! standard PS/2 controller driver; packet decoding follows the usual
//! 3-byte PS/2 mouse protocol (status byte, signed dx, signed dy).

use gui_core::collab::{PointerDevice, PointerState};
use spin::Mutex;
use x86_64::instructions::port::Port;

const PS2_DATA: u16 = 0x60;
const PS2_STATUS: u16 = 0x64;
const PS2_COMMAND: u16 = 0x64;

const CMD_READ_CONFIG: u8 = 0x20;
const CMD_WRITE_CONFIG: u8 = 0x60;
const CMD_ENABLE_MOUSE: u8 = 0xA8;
const CMD_MOUSE_PREFIX: u8 = 0xD4;
const MOUSE_SET_DEFAULTS: u8 = 0xF6;
const MOUSE_ENABLE_STREAMING: u8 = 0xF4;

const STATUS_OUTPUT_FULL: u8 = 0x01;
const STATUS_INPUT_FULL: u8 = 0x02;

fn wait_write() {
    let mut status: Port<u8> = Port::new(PS2_STATUS);
    for _ in 0..10_000 {
        if unsafe { status.read() } & STATUS_INPUT_FULL == 0 {
            return;
        }
        core::hint::spin_loop();
    }
}

fn wait_read() -> bool {
    let mut status: Port<u8> = Port::new(PS2_STATUS);
    for _ in 0..10_000 {
        if unsafe { status.read() } & STATUS_OUTPUT_FULL != 0 {
            return true;
        }
        core::hint::spin_loop();
    }
    false
}

fn write_command(cmd: u8) {
    wait_write();
    let mut port: Port<u8> = Port::new(PS2_COMMAND);
    unsafe { port.write(cmd) };
}

fn write_data(data: u8) {
    wait_write();
    let mut port: Port<u8> = Port::new(PS2_DATA);
    unsafe { port.write(data) };
}

fn read_data() -> Option<u8> {
    if !wait_read() {
        return None;
    }
    let mut port: Port<u8> = Port::new(PS2_DATA);
    Some(unsafe { port.read() })
}

fn mouse_write(cmd: u8) -> Option<u8> {
    write_command(CMD_MOUSE_PREFIX);
    write_data(cmd);
    read_data()
}

/// Assembles raw PS/2 mouse bytes into 3-byte packets and tracks the
/// cursor's absolute position, clamped to the screen.
struct PacketState {
    phase: u8,
    status_byte: u8,
    dx_byte: u8,
    x: u32,
    y: u32,
    screen_width: u32,
    screen_height: u32,
    primary_down: bool,
    dirty: bool,
}

impl PacketState {
    fn handle_byte(&mut self, byte: u8) {
        match self.phase {
            0 => {
                // Bit 3 is always set on a packet's first byte; resync on
                // anything else.
                if byte & 0x08 == 0 {
                    return;
                }
                self.status_byte = byte;
                self.phase = 1;
            }
            1 => {
                self.dx_byte = byte;
                self.phase = 2;
            }
            _ => {
                self.phase = 0;
                self.process_packet(self.status_byte, self.dx_byte, byte);
            }
        }
    }

    fn process_packet(&mut self, status: u8, dx_raw: u8, dy_raw: u8) {
        if status & 0xC0 != 0 {
            // Overflow on either axis: drop the packet rather than jump the
            // cursor.
            return;
        }

        let mut dx = dx_raw as i32;
        let mut dy = dy_raw as i32;
        if status & 0x10 != 0 {
            dx -= 256;
        }
        if status & 0x20 != 0 {
            dy -= 256;
        }

        let new_x = (self.x as i32 + dx).clamp(0, self.screen_width as i32 - 1);
        // PS/2 reports +dy as "up"; screen y grows downward.
        let new_y = (self.y as i32 - dy).clamp(0, self.screen_height as i32 - 1);
        self.x = new_x as u32;
        self.y = new_y as u32;
        self.primary_down = status & 0x01 != 0;
        self.dirty = true;
    }
}

static MOUSE: Mutex<Option<PacketState>> = Mutex::new(None);

fn on_mouse_byte(byte: u8) {
    if let Some(state) = MOUSE.lock().as_mut() {
        state.handle_byte(byte);
    }
}

/// Performs the PS/2 controller handshake to enable the aux (mouse) port
/// and put it into streaming mode, then registers the byte callback with
/// the mouse interrupt handler. `screen_width`/`screen_height` bound the
/// cursor position the packet decoder tracks.
pub fn init(screen_width: u32, screen_height: u32) {
    *MOUSE.lock() = Some(PacketState {
        phase: 0,
        status_byte: 0,
        dx_byte: 0,
        x: screen_width / 2,
        y: screen_height / 2,
        screen_width,
        screen_height,
        primary_down: false,
        dirty: false,
    });

    write_command(CMD_ENABLE_MOUSE);

    write_command(CMD_READ_CONFIG);
    let config = read_data().unwrap_or(0);
    // Bit 1 enables the aux port's IRQ; bit 5 enables its clock line.
    let new_config = (config | 0x02) & !0x20;
    write_command(CMD_WRITE_CONFIG);
    write_data(new_config);

    mouse_write(MOUSE_SET_DEFAULTS);
    mouse_write(MOUSE_ENABLE_STREAMING);

    crate::interrupts::register_mouse_callback(on_mouse_byte);
}

pub struct Ps2PointerDevice;

impl PointerDevice for Ps2PointerDevice {
    fn reset(&mut self) {
        if let Some(state) = MOUSE.lock().as_mut() {
            state.dirty = false;
        }
    }

    fn state(&mut self) -> Option<PointerState> {
        let mut guard = MOUSE.lock();
        let state = guard.as_mut()?;
        if !state.dirty {
            return None;
        }
        state.dirty = false;
        Some(PointerState { x: state.x, y: state.y, primary_down: state.primary_down })
    }
}
