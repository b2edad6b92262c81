//! [`OutputDevice`] adapter over the bootloader-provided GOP framebuffer.
//!
//! Blending already happened in `gui-core`'s rasterizer; this only copies
//! already-blended BGRA pixels into the hardware buffer's own channel
//! order and bit depth.

use bootloader_api::info::{FrameBuffer, PixelFormat};
use gui_core::collab::{OutputDevice, OutputInfo};
use gui_core::pixel::Pixel;

pub struct KernelFramebuffer {
    fb: &'static mut FrameBuffer,
}

impl KernelFramebuffer {
    pub fn new(fb: &'static mut FrameBuffer) -> Self {
        Self { fb }
    }
}

impl OutputDevice for KernelFramebuffer {
    fn info(&self) -> OutputInfo {
        let info = self.fb.info();
        OutputInfo {
            horizontal_resolution: info.width as u32,
            vertical_resolution: info.height as u32,
        }
    }

    fn block_transfer(
        &mut self,
        src: &[Pixel],
        src_x: u32,
        src_y: u32,
        dst_x: u32,
        dst_y: u32,
        width: u32,
        height: u32,
        src_stride: usize,
    ) {
        let info = self.fb.info();
        let (bpp, stride, format) = (info.bytes_per_pixel, info.stride, info.pixel_format);
        let buffer = self.fb.buffer_mut();

        for row in 0..height as usize {
            let src_row_start = (src_y as usize + row) * src_stride + src_x as usize;
            let dst_row_start = (dst_y as usize + row) * stride + dst_x as usize;

            for col in 0..width as usize {
                let pixel = src[src_row_start + col];
                let offset = (dst_row_start + col) * bpp;
                if offset + bpp > buffer.len() {
                    continue;
                }

                let channels: [u8; 4] = match format {
                    PixelFormat::Rgb => [pixel.r, pixel.g, pixel.b, pixel.a],
                    PixelFormat::Bgr => [pixel.b, pixel.g, pixel.r, pixel.a],
                    _ => [pixel.b, pixel.g, pixel.r, pixel.a],
                };
                let n = bpp.min(4);
                buffer[offset..offset + n].copy_from_slice(&channels[..n]);
            }
        }
    }
}
