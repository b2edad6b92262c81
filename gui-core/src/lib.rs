//! Scene compositor and frame pump for a pre-boot graphical shell.
//!
//! This crate is the hardware-free core described by the workspace's
//! design notes: a retained-mode object hierarchy, an alpha-blended CPU
//! rasterizer writing into an off-screen back buffer, a rectangle-coalescing
//! dirty tracker, a time-locked flush loop, a pointer/key dispatcher, and a
//! fixed-point animation engine. Every hardware collaborator — the output
//! device, pointer/key devices, the PNG decoder, the TSC clock, interrupt
//! masking — is a trait in [`collab`]; `#![no_std]` and zero knowledge of
//! real hardware keep this crate portable between the bare-metal `kernel`
//! integration layer and a hosted test build.
#![no_std]

extern crate alloc;

pub mod animation;
pub mod clip;
pub mod collab;
pub mod config;
pub mod cursor;
pub mod damage;
pub mod engine;
pub mod error;
pub mod image;
pub mod pixel;
pub mod pump;
pub mod raster;
pub mod scene;

pub use engine::GuiEngine;
pub use error::GuiError;
