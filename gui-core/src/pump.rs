//! The frame pump: pacing and flushing dirty rectangles to the output
//! device each frame, and the top-level loop that dispatches pointer/key
//! input, advances animations, and calls it every iteration.

use alloc::vec::Vec;

use crate::animation::AnimationList;
use crate::collab::Clock;
use crate::cursor::redraw_pointer;
use crate::damage::DirtyRect;
use crate::engine::GuiEngine;
use crate::pixel::ImageId;
use crate::scene::{delegate_ptr_event, PointerEvent};

/// Restores/redraws the cursor, paces to the target frame period under an
/// interrupt mask, and hands every merged dirty rectangle to the output
/// device's block-transfer primitive.
pub fn flush(engine: &mut GuiEngine) {
    redraw_pointer(engine);

    let rects: Vec<DirtyRect> = engine.dirty.drain().collect();
    let start_tsc = engine.start_tsc;
    let delta_target = engine.delta_tsc_target;
    let stride = engine.screen_width as usize;

    let back_buffer = &engine.back_buffer;
    let output = &mut engine.output;
    let clock = &engine.clock;
    let interrupts = &engine.interrupts;

    let mut end_tsc = start_tsc;
    interrupts.without_interrupts(&mut || {
        end_tsc = pace(clock.as_ref(), start_tsc, delta_target);
        for rect in &rects {
            output.block_transfer(
                back_buffer,
                rect.min_x,
                rect.min_y,
                rect.min_x,
                rect.min_y,
                rect.width(),
                rect.height(),
                stride,
            );
        }
    });

    engine.start_tsc = end_tsc;
}

/// Busy-waits (yielding via [`Clock::cpu_pause`]) until `delta_target` ticks
/// have elapsed since `start_tsc`, or returns immediately if they already
/// have. Returns the TSC value the wait actually reached.
fn pace(clock: &dyn Clock, start_tsc: u64, delta_target: u64) -> u64 {
    loop {
        let now = clock.read_tsc();
        if now.wrapping_sub(start_tsc) >= delta_target {
            return now;
        }
        clock.cpu_pause();
    }
}

/// Forces a full-screen redraw, resets the pacing clock to now, then
/// flushes. Used once before entering [`draw_loop`] so the first frame
/// always paints the whole screen.
pub fn redraw_and_flush(engine: &mut GuiEngine) {
    engine.start_tsc = engine.clock.read_tsc();
    let (width, height) = (engine.screen_width(), engine.screen_height());
    crate::raster::draw_screen(engine, 0, 0, width, height, true);
    flush(engine);
}

/// Runs the input-dispatch/animation/flush loop until `exit_fn` returns
/// true. `cursor_image` is polled once per iteration to resolve which
/// sprite the cursor should currently show.
pub fn draw_loop(
    engine: &mut GuiEngine,
    exit_fn: fn(&GuiEngine) -> bool,
    cursor_image: fn(&mut GuiEngine) -> ImageId,
) {
    if let Some(pointer) = engine.pointer.as_deref_mut() {
        pointer.reset();
    }
    if let Some(key) = engine.key.as_deref_mut() {
        key.reset();
    }

    redraw_and_flush(engine);

    let mut last_cursor_image: Option<ImageId> = None;
    let mut frame_time: u64 = 0;

    loop {
        poll_pointer(engine);
        poll_key(engine);

        frame_time = frame_time.wrapping_add(1);
        engine.frame_time = frame_time;
        AnimationList::advance(engine, frame_time);

        let image_id = cursor_image(engine);
        if last_cursor_image != Some(image_id) {
            let image = engine.image(image_id).clone();
            engine.cursor.set_image(image);
            last_cursor_image = Some(image_id);
        }

        flush(engine);

        if exit_fn(engine) {
            break;
        }
    }
}

fn poll_pointer(engine: &mut GuiEngine) {
    let Some(state) = engine.pointer.as_mut().and_then(|p| p.state()) else {
        return;
    };

    engine.cursor.set_position(state.x, state.y);

    match (engine.hold_object, state.primary_down) {
        (None, true) => {
            let screen = engine.screen_id();
            let x = state.x as i64;
            let y = state.y as i64;
            engine.hold_object =
                delegate_ptr_event(engine, screen, PointerEvent::PrimaryDown, 0, 0, x, y);
        }
        (Some(held), down) => {
            let (base_x, base_y) = engine.base_coords(held);
            let ptr_event = engine.node(held).ptr_event;
            let offset_x = state.x as i64 - base_x;
            let offset_y = state.y as i64 - base_y;
            let event = if down { PointerEvent::PrimaryHold } else { PointerEvent::PrimaryUp };
            ptr_event(engine, held, event, base_x, base_y, offset_x, offset_y);
            if !down {
                engine.hold_object = None;
            }
        }
        (None, false) => {}
    }
}

fn poll_key(engine: &mut GuiEngine) {
    let Some(key) = engine.key.as_mut().and_then(|k| k.read()) else {
        return;
    };
    let screen = engine.screen_id();
    let key_event = engine.node(screen).key_event;
    key_event(engine, screen, &key);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::fake_engine;

    #[test]
    fn redraw_and_flush_runs_without_a_hold_object() {
        let mut engine = fake_engine(16, 16);
        redraw_and_flush(&mut engine);
        assert!(engine.hold_object.is_none());
    }

    #[test]
    fn draw_loop_exits_immediately_when_exit_fn_is_always_true() {
        let mut engine = fake_engine(16, 16);
        let cursor_image = engine.add_image(crate::pixel::Image::fill(crate::pixel::Pixel::opaque(0, 0, 0)));
        fn always_exit(_engine: &GuiEngine) -> bool {
            true
        }
        fn cursor(_engine: &mut GuiEngine) -> ImageId {
            ImageId(0)
        }
        let _ = cursor_image;
        draw_loop(&mut engine, always_exit, cursor);
    }
}
