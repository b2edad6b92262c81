//! Retained-mode scene graph: arena-backed objects, draw delegation,
//! pointer hit-testing, and the base-coordinate walk.
//!
//! `Draw`, `PtrEvent` and `KeyEvent` are modeled as plain function
//! pointers rather than a `dyn Trait` — this sidesteps the self-referential
//! borrow that a boxed trait object stored inside the same arena the
//! callback needs to mutate would otherwise require. Concrete widgets
//! (buttons, labels, menus) are out of scope for this crate; callers
//! needing per-object state beyond geometry attach it through
//! [`ObjectNode::user_data`].

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;

use crate::clip::clip_child_bounds;
use crate::collab::InputKey;
use crate::engine::GuiEngine;

/// Index into [`GuiEngine`]'s object arena. The screen root is always
/// index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub usize);

/// A pointer event addressed to an object during hit-testing or capture
/// hold/release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    PrimaryDown,
    PrimaryHold,
    PrimaryUp,
}

pub type DrawFn = fn(
    engine: &mut GuiEngine,
    this: ObjectId,
    base_x: i64,
    base_y: i64,
    offset_x: u32,
    offset_y: u32,
    width: u32,
    height: u32,
    request_draw: bool,
);

pub type PtrEventFn = fn(
    engine: &mut GuiEngine,
    this: ObjectId,
    event: PointerEvent,
    base_x: i64,
    base_y: i64,
    offset_x: i64,
    offset_y: i64,
) -> Option<ObjectId>;

pub type KeyEventFn = fn(engine: &mut GuiEngine, this: ObjectId, key: &InputKey);

fn noop_ptr_event(
    _engine: &mut GuiEngine,
    _this: ObjectId,
    _event: PointerEvent,
    _base_x: i64,
    _base_y: i64,
    _offset_x: i64,
    _offset_y: i64,
) -> Option<ObjectId> {
    None
}

fn noop_key_event(_engine: &mut GuiEngine, _this: ObjectId, _key: &InputKey) {}

/// A node in the scene graph arena.
///
/// Ownership: the parent exclusively owns its children; `parent` is a
/// non-owning back-reference used solely by [`GuiEngine::base_coords`].
/// Draw order over `children` is the insertion order; delegation walks it
/// in *reverse* for painting (back-to-front) and *forward* for pointer
/// hit-testing (front-to-back).
pub struct ObjectNode {
    pub width: u32,
    pub height: u32,
    pub offset_x: i64,
    pub offset_y: i64,
    pub parent: Option<ObjectId>,
    pub children: Vec<ObjectId>,
    pub draw: DrawFn,
    pub ptr_event: PtrEventFn,
    pub key_event: KeyEventFn,
    pub user_data: Option<Box<dyn Any>>,
}

impl ObjectNode {
    pub fn leaf(width: u32, height: u32, offset_x: i64, offset_y: i64, draw: DrawFn) -> Self {
        Self {
            width,
            height,
            offset_x,
            offset_y,
            parent: None,
            children: Vec::new(),
            draw,
            ptr_event: noop_ptr_event,
            key_event: noop_key_event,
            user_data: None,
        }
    }
}

/// Draws children of `this` in back-to-front order, clipping each child's
/// request against the incoming sub-rectangle.
pub fn draw_delegate(
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
    debug_assert!(engine.node(this).width as u64 > offset_x as u64);
    debug_assert!(engine.node(this).height as u64 > offset_y as u64);

    let children = engine.node(this).children.clone();

    for &child_id in children.iter().rev() {
        let (child_offset_x, child_offset_y, child_width_extent, child_height_extent, child_draw) = {
            let child = engine.node(child_id);
            (child.offset_x, child.offset_y, child.width, child.height, child.draw)
        };

        let Some((child_draw_x, child_draw_w)) =
            clip_child_bounds(child_offset_x, child_width_extent, offset_x, width)
        else {
            continue;
        };
        let Some((child_draw_y, child_draw_h)) =
            clip_child_bounds(child_offset_y, child_height_extent, offset_y, height)
        else {
            continue;
        };

        child_draw(
            engine,
            child_id,
            base_x + child_offset_x,
            base_y + child_offset_y,
            child_draw_x,
            child_draw_y,
            child_draw_w,
            child_draw_h,
            request_draw,
        );
    }
}

/// Hit-tests children of `this` front-to-back; the first child whose
/// rectangle contains `(offset_x, offset_y)` receives the event. Returns
/// whichever object the child's `PtrEvent` handler returned (the new
/// pointer-capture target), or `None`.
pub fn delegate_ptr_event(
    engine: &mut GuiEngine,
    this: ObjectId,
    event: PointerEvent,
    base_x: i64,
    base_y: i64,
    offset_x: i64,
    offset_y: i64,
) -> Option<ObjectId> {
    debug_assert!((engine.node(this).width as i64) > offset_x);
    debug_assert!((engine.node(this).height as i64) > offset_y);

    let children = engine.node(this).children.clone();

    for child_id in children {
        let (child_offset_x, child_offset_y, child_width, child_height, child_ptr_event) = {
            let child = engine.node(child_id);
            (child.offset_x, child.offset_y, child.width, child.height, child.ptr_event)
        };

        if offset_x < child_offset_x
            || offset_x >= child_offset_x + child_width as i64
            || offset_y < child_offset_y
            || offset_y >= child_offset_y + child_height as i64
        {
            continue;
        }

        let result = child_ptr_event(
            engine,
            child_id,
            event,
            base_x + child_offset_x,
            base_y + child_offset_y,
            offset_x - child_offset_x,
            offset_y - child_offset_y,
        );
        if result.is_some() {
            return result;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::fake_engine;

    fn paint_nothing(
        _e: &mut GuiEngine,
        _this: ObjectId,
        _bx: i64,
        _by: i64,
        _ox: u32,
        _oy: u32,
        _w: u32,
        _h: u32,
        _req: bool,
    ) {
    }

    #[test]
    fn base_coords_walk_sums_offsets_to_screen() {
        let mut engine = fake_engine(100, 100);
        let screen = engine.screen_id();

        let mid = engine.add_child(screen, ObjectNode::leaf(50, 50, 10, 10, paint_nothing));
        let leaf = engine.add_child(mid, ObjectNode::leaf(10, 10, 5, 5, paint_nothing));

        let (x, y) = engine.base_coords(leaf);
        assert_eq!((x, y), (15, 15));
    }

    #[test]
    fn draw_delegate_skips_clipped_children() {
        let mut engine = fake_engine(20, 20);
        let screen = engine.screen_id();
        // A child fully outside the requested sub-rectangle is skipped
        // without panicking (clip_child_bounds returns None on both axes).
        let _far_child = engine.add_child(screen, ObjectNode::leaf(5, 5, 100, 100, paint_nothing));

        draw_delegate(&mut engine, screen, 0, 0, 0, 0, 20, 20, false);
    }
}
