//! PS/2 input device drivers: the [`gui_core::collab::PointerDevice`] and
//! [`gui_core::collab::KeyDevice`] adapters fed into `GuiEngine::construct`.

pub mod keyboard;
pub mod mouse;
