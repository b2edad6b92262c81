//! The screen root's draw callback and the small set of plain `fn`
//! pointers `GuiEngine::view_initialize`/`draw_loop` require.
//!
//! Widget-level content is out of scope for this integration layer; the
//! root simply paints a solid background and delegates to whatever
//! children have been attached to it.

use gui_core::collab::InputKey;
use gui_core::engine::GuiEngine;
use gui_core::pixel::{Image, ImageId, Pixel};
use gui_core::raster::{draw_delegate, draw_to_buffer, DrawSource};
use gui_core::scene::{ObjectId, PointerEvent};
use spin::Mutex;

static BACKGROUND_IMAGE: Mutex<Option<ImageId>> = Mutex::new(None);

/// Registers the solid background color as an image and returns its id;
/// must run once, before `view_initialize`.
pub fn install_background(engine: &mut GuiEngine, color: Pixel) -> ImageId {
    let id = engine.add_image(Image::fill(color));
    *BACKGROUND_IMAGE.lock() = Some(id);
    id
}

pub fn screen_draw(
    engine: &mut GuiEngine,
    this: ObjectId,
    base_x: i64,
    base_y: i64,
    offset_x: u32,
    offset_y: u32,
    width: u32,
    height: u32,
    request_draw: bool,
) {
    let background = BACKGROUND_IMAGE.lock().expect("install_background not called");
    draw_to_buffer(
        engine,
        DrawSource::Image(background),
        0xFF,
        true,
        base_x,
        base_y,
        offset_x,
        offset_y,
        width,
        height,
        request_draw,
    );
    draw_delegate(engine, this, base_x, base_y, offset_x, offset_y, width, height, request_draw);
}

pub fn screen_ptr_event(
    engine: &mut GuiEngine,
    this: ObjectId,
    event: PointerEvent,
    base_x: i64,
    base_y: i64,
    offset_x: i64,
    offset_y: i64,
) -> Option<ObjectId> {
    gui_core::scene::delegate_ptr_event(engine, this, event, base_x, base_y, offset_x, offset_y)
}

pub fn screen_key_event(_engine: &mut GuiEngine, _this: ObjectId, _key: &InputKey) {}

pub fn exit_never(_engine: &GuiEngine) -> bool {
    false
}

static CURSOR_IMAGE: Mutex<Option<ImageId>> = Mutex::new(None);

pub fn install_cursor_image(engine: &mut GuiEngine, image: Image) -> ImageId {
    let id = engine.add_image(image);
    *CURSOR_IMAGE.lock() = Some(id);
    id
}

pub fn cursor_image(_engine: &mut GuiEngine) -> ImageId {
    CURSOR_IMAGE.lock().expect("install_cursor_image not called")
}
