//! Process-wide compositor state: the back buffer, scene arena, dirty
//! tracker, cursor stage, animation list and the collaborator handles
//! everything above is driven through.
//!
//! Collaborators are stored as trait objects so [`GuiEngine`] stays a
//! single concrete, non-generic value that the integration layer
//! constructs once at boot and threads through the whole session.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use crate::animation::AnimationList;
use crate::collab::{Clock, InterruptGuard, KeyDevice, OutputDevice, PointerDevice};
use crate::cursor::CursorStage;
use crate::damage::DirtySet;
use crate::error::GuiError;
use crate::pixel::{Image, ImageId, Pixel};
use crate::scene::{KeyEventFn, ObjectId, ObjectNode, PtrEventFn};

pub type ExitLoopFn = fn(&GuiEngine) -> bool;

/// The top-level engine value. One per session.
pub struct GuiEngine {
    pub(crate) output: Box<dyn OutputDevice>,
    pub(crate) pointer: Option<Box<dyn PointerDevice>>,
    pub(crate) key: Option<Box<dyn KeyDevice>>,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) interrupts: Box<dyn InterruptGuard>,

    pub(crate) screen_width: u32,
    pub(crate) screen_height: u32,
    pub(crate) back_buffer: Vec<Pixel>,

    pub(crate) dirty: DirtySet,
    pub(crate) arena: Vec<ObjectNode>,
    pub(crate) images: Vec<Image>,
    pub(crate) cursor: CursorStage,
    pub(crate) animations: AnimationList,
    pub(crate) hold_object: Option<ObjectId>,

    pub(crate) start_tsc: u64,
    pub(crate) delta_tsc_target: u64,
    pub(crate) frame_time: u64,
}

impl GuiEngine {
    /// Constructs the engine against live collaborators. Fails only if no
    /// output device is available, or neither a pointer nor a key device
    /// is available (mirroring the reference's "need at least one input
    /// source" requirement).
    #[allow(clippy::too_many_arguments)]
    pub fn construct(
        output: Box<dyn OutputDevice>,
        pointer: Option<Box<dyn PointerDevice>>,
        key: Option<Box<dyn KeyDevice>>,
        clock: Box<dyn Clock>,
        interrupts: Box<dyn InterruptGuard>,
        cursor_default_x: u32,
        cursor_default_y: u32,
        cursor_image: Image,
    ) -> Result<Self, GuiError> {
        if pointer.is_none() && key.is_none() {
            return Err(GuiError::Unsupported);
        }

        let info = output.info();
        let width = info.horizontal_resolution;
        let height = info.vertical_resolution;
        if width == 0 || height == 0 {
            return Err(GuiError::Unsupported);
        }

        let buffer_len = (width as usize) * (height as usize);
        let back_buffer = vec![Pixel::default(); buffer_len];

        let cursor_x = cursor_default_x.min(width - 1);
        let cursor_y = cursor_default_y.min(height - 1);

        let tsc_frequency = clock.tsc_frequency();
        let delta_tsc_target = tsc_frequency / crate::config::TARGET_FPS;

        Ok(Self {
            output,
            pointer,
            key,
            clock,
            interrupts,
            screen_width: width,
            screen_height: height,
            back_buffer,
            dirty: DirtySet::new(),
            arena: Vec::new(),
            images: Vec::new(),
            cursor: CursorStage::new(cursor_x, cursor_y, cursor_image),
            animations: AnimationList::new(),
            hold_object: None,
            start_tsc: 0,
            delta_tsc_target,
            frame_time: 0,
        })
    }

    /// Installs the screen root object (arena index 0) sized to the
    /// output device's resolution, discarding any prior arena content.
    pub fn view_initialize(
        &mut self,
        draw: crate::scene::DrawFn,
        ptr_event: PtrEventFn,
        key_event: KeyEventFn,
    ) -> ObjectId {
        self.arena.clear();
        self.arena.push(ObjectNode {
            width: self.screen_width,
            height: self.screen_height,
            offset_x: 0,
            offset_y: 0,
            parent: None,
            children: Vec::new(),
            draw,
            ptr_event,
            key_event,
            user_data: None,
        });
        ObjectId(0)
    }

    pub fn screen_id(&self) -> ObjectId {
        ObjectId(0)
    }

    pub fn node(&self, id: ObjectId) -> &ObjectNode {
        &self.arena[id.0]
    }

    pub fn node_mut(&mut self, id: ObjectId) -> &mut ObjectNode {
        &mut self.arena[id.0]
    }

    /// Allocates `node` as a new child of `parent`, appended after any
    /// existing children (drawn frontmost).
    pub fn add_child(&mut self, parent: ObjectId, mut node: ObjectNode) -> ObjectId {
        node.parent = Some(parent);
        self.arena.push(node);
        let id = ObjectId(self.arena.len() - 1);
        self.arena[parent.0].children.push(id);
        id
    }

    /// Sums offsets from `id` up to the screen root.
    pub fn base_coords(&self, id: ObjectId) -> (i64, i64) {
        let screen = self.screen_id();
        let mut x = 0i64;
        let mut y = 0i64;
        let mut current = id;
        while current.0 != screen.0 {
            let node = self.node(current);
            x += node.offset_x;
            y += node.offset_y;
            current = node.parent.expect("non-screen object must have a parent");
        }
        (x, y)
    }

    pub fn screen_width(&self) -> u32 {
        self.screen_width
    }

    pub fn screen_height(&self) -> u32 {
        self.screen_height
    }

    pub fn back_buffer(&self) -> &[Pixel] {
        &self.back_buffer
    }

    pub fn back_buffer_mut(&mut self) -> &mut [Pixel] {
        &mut self.back_buffer
    }

    /// Stores `image` in the engine's image table, returning a stable id
    /// widget draw callbacks can hold onto without borrowing the engine.
    pub fn add_image(&mut self, image: Image) -> ImageId {
        self.images.push(image);
        ImageId(self.images.len() - 1)
    }

    pub fn image(&self, id: ImageId) -> &Image {
        &self.images[id.0]
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use crate::collab::{OutputInfo, PointerState};

    struct FakeOutput {
        width: u32,
        height: u32,
    }

    impl OutputDevice for FakeOutput {
        fn info(&self) -> OutputInfo {
            OutputInfo { horizontal_resolution: self.width, vertical_resolution: self.height }
        }

        fn block_transfer(
            &mut self,
            _src: &[Pixel],
            _src_x: u32,
            _src_y: u32,
            _dst_x: u32,
            _dst_y: u32,
            _width: u32,
            _height: u32,
            _src_stride: usize,
        ) {
        }
    }

    struct FakePointer;

    impl PointerDevice for FakePointer {
        fn reset(&mut self) {}
        fn state(&mut self) -> Option<PointerState> {
            None
        }
    }

    struct FakeClock;

    impl Clock for FakeClock {
        fn read_tsc(&self) -> u64 {
            0
        }
        fn tsc_frequency(&self) -> u64 {
            60_000_000
        }
        fn cpu_pause(&self) {}
    }

    struct FakeInterruptGuard;

    impl InterruptGuard for FakeInterruptGuard {
        fn without_interrupts<R>(&self, f: &mut dyn FnMut() -> R) -> R {
            f()
        }
    }

    fn noop_draw(
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

    fn noop_ptr_event(
        _e: &mut GuiEngine,
        _this: ObjectId,
        _ev: crate::scene::PointerEvent,
        _bx: i64,
        _by: i64,
        _ox: i64,
        _oy: i64,
    ) -> Option<ObjectId> {
        None
    }

    fn noop_key_event(_e: &mut GuiEngine, _this: ObjectId, _key: &crate::collab::InputKey) {}

    /// Builds a fully-wired engine over no-op fakes, for scene/raster/pump
    /// unit tests that don't care about real hardware output.
    pub fn fake_engine(width: u32, height: u32) -> GuiEngine {
        let mut engine = GuiEngine::construct(
            alloc::boxed::Box::new(FakeOutput { width, height }),
            Some(alloc::boxed::Box::new(FakePointer)),
            None,
            alloc::boxed::Box::new(FakeClock),
            alloc::boxed::Box::new(FakeInterruptGuard),
            0,
            0,
            Image::fill(Pixel::opaque(0, 0, 0)),
        )
        .unwrap();
        engine.view_initialize(noop_draw, noop_ptr_event, noop_key_event);
        engine
    }
}
