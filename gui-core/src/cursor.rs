//! Pointer cursor compositing: redrawing whatever the cursor previously
//! covered, then stamping the cursor image back on top, without the
//! cursor's own paint ever contributing a dirty rectangle.

use crate::pixel::Image;
use crate::raster::{draw_screen, draw_to_buffer, DrawSource};

/// Tracks the cursor's current and previously-drawn position/image so
/// [`redraw_pointer`] can restore exactly the region the cursor used to
/// cover.
pub struct CursorStage {
    pub x: u32,
    pub y: u32,
    image: Image,
    image_changed: bool,
    last_x: u32,
    last_y: u32,
    last_width: u32,
    last_height: u32,
    primed: bool,
}

impl CursorStage {
    pub fn new(x: u32, y: u32, image: Image) -> Self {
        Self {
            x,
            y,
            image,
            image_changed: true,
            last_x: x,
            last_y: y,
            last_width: 0,
            last_height: 0,
            primed: false,
        }
    }

    pub fn set_position(&mut self, x: u32, y: u32) {
        self.x = x;
        self.y = y;
    }

    pub fn set_image(&mut self, image: Image) {
        self.image = image;
        self.image_changed = true;
    }

    pub fn image(&self) -> &Image {
        &self.image
    }
}

/// Restores the area the cursor previously covered, unions it with the
/// area the cursor will now cover, requests a redraw of that union only
/// when something about the cursor changed (or nothing else was drawn
/// this frame, to keep the output device invoked every frame for steady
/// pacing), then stamps the cursor on top without adding its own dirty
/// rectangle.
pub fn redraw_pointer(engine: &mut crate::engine::GuiEngine) {
    let (cursor_x, cursor_y) = (engine.cursor.x, engine.cursor.y);
    let (image_width, image_height) =
        (engine.cursor.image.width, engine.cursor.image.height);

    let moved = !engine.cursor.primed || cursor_x != engine.cursor.last_x || cursor_y != engine.cursor.last_y;
    let request_draw = moved || engine.cursor.image_changed || engine.dirty.is_empty();

    let (min_x, delta_x) = if engine.cursor.last_x < cursor_x {
        (engine.cursor.last_x, cursor_x - engine.cursor.last_x)
    } else {
        (cursor_x, engine.cursor.last_x - cursor_x)
    };
    let (min_y, delta_y) = if engine.cursor.last_y < cursor_y {
        (engine.cursor.last_y, cursor_y - engine.cursor.last_y)
    } else {
        (cursor_y, engine.cursor.last_y - cursor_y)
    };

    let union_width = engine.cursor.last_width.max(image_width) + delta_x;
    let union_height = engine.cursor.last_height.max(image_height) + delta_y;

    draw_screen(engine, min_x as i64, min_y as i64, union_width, union_height, request_draw);

    draw_to_buffer(
        engine,
        DrawSource::Cursor,
        0xFF,
        false,
        cursor_x as i64,
        cursor_y as i64,
        0,
        0,
        image_width,
        image_height,
        false,
    );

    if request_draw {
        engine.cursor.last_x = cursor_x;
        engine.cursor.last_y = cursor_y;
        engine.cursor.last_width = image_width;
        engine.cursor.last_height = image_height;
        engine.cursor.image_changed = false;
        engine.cursor.primed = true;
    } else {
        debug_assert_eq!(engine.cursor.last_x, cursor_x);
        debug_assert_eq!(engine.cursor.last_y, cursor_y);
        debug_assert_eq!(engine.cursor.last_width, image_width);
        debug_assert_eq!(engine.cursor.last_height, image_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::fake_engine;

    #[test]
    fn first_redraw_always_requests_draw() {
        let mut engine = fake_engine(64, 64);
        engine.cursor.set_position(10, 10);
        redraw_pointer(&mut engine);
        assert_eq!(engine.cursor.last_x, 10);
        assert_eq!(engine.cursor.last_y, 10);
    }

    #[test]
    fn stationary_cursor_does_not_move_tracked_position() {
        let mut engine = fake_engine(64, 64);
        engine.cursor.set_position(5, 5);
        redraw_pointer(&mut engine);
        engine.dirty.submit(crate::damage::DirtyRect::from_origin_extent(0, 0, 4, 4));
        redraw_pointer(&mut engine);
        assert_eq!(engine.cursor.last_x, 5);
        assert_eq!(engine.cursor.last_y, 5);
    }
}
