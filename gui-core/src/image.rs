//! PNG decode-to-image conversion and the highlighted/click-image variants
//! used for button-style widgets.

use alloc::vec::Vec;

use crate::collab::PngDecoder;
use crate::error::GuiError;
use crate::pixel::{blend_pixel, ClickImage, Image, Pixel};

fn premultiply(channel: u8, alpha: u8) -> u8 {
    ((channel as u32 * alpha as u32) / 0xFF) as u8
}

/// Decodes `bytes` via `decoder` and converts the result to a pre-multiplied
/// [`Image`].
///
/// The decoded bytes are read positionally as `(b, g, r, a)` per pixel, each
/// color channel is premultiplied by that pixel's alpha, and only then are
/// the b/r channels swapped. This ordering is taken straight from the
/// algorithm this was distilled from: if the injected decoder actually
/// produces straight RGBA (the common case for PNG decoders), the swap
/// lands the bytes correctly in this engine's BGRA wire format; if the
/// decoder instead emits BGRA already, the swap corrupts it. Decoding
/// itself is out of scope here, so this is preserved as-is rather than
/// guessed at — see DESIGN.md.
pub fn png_to_image(decoder: &dyn PngDecoder, bytes: &[u8]) -> Result<Image, GuiError> {
    let (raw, width, height) = decoder.decode(bytes)?;

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or(GuiError::InvalidData)?;
    if raw.len() != expected {
        return Err(GuiError::InvalidData);
    }

    let mut buffer = Vec::with_capacity((width as usize) * (height as usize));
    for chunk in raw.chunks_exact(4) {
        let a = chunk[3];
        let mut pixel = Pixel::new(
            premultiply(chunk[0], a),
            premultiply(chunk[1], a),
            premultiply(chunk[2], a),
            a,
        );
        core::mem::swap(&mut pixel.b, &mut pixel.r);
        buffer.push(pixel);
    }

    Ok(Image::new(width, height, buffer))
}

/// Builds the "held" variant of `src`: every pixel with nonzero alpha is
/// blended with `highlight` at full opacity, and any fully-transparent gap
/// between two non-fully-transparent pixels on the same row (an
/// antialiased outline's interior) is filled solid with `highlight`.
/// Leading/trailing transparent runs on a row (the outline's exterior
/// gutter) are left untouched.
pub fn create_highlighted_image(src: &Image, highlight: Pixel) -> Image {
    let (width, height) = (src.width, src.height);
    let mut buffer = src.buffer.clone();

    for row in 0..height {
        let row_start = (row * width) as usize;

        for col in 0..width {
            let idx = row_start + col as usize;
            if src.buffer[idx].a != 0 {
                let mut pixel = src.buffer[idx];
                blend_pixel(&mut pixel, &highlight, 0xFF);
                buffer[idx] = pixel;
            }
        }

        let mut first_opaque = None;
        let mut last_opaque = None;
        for col in 0..width {
            if src.buffer[row_start + col as usize].a != 0 {
                first_opaque.get_or_insert(col);
                last_opaque = Some(col);
            }
        }

        if let (Some(first), Some(last)) = (first_opaque, last_opaque) {
            for col in first..=last {
                let idx = row_start + col as usize;
                if src.buffer[idx].a == 0 {
                    buffer[idx] = highlight;
                }
            }
        }
    }

    Image { width, height, buffer }
}

/// Decodes `bytes` and bundles it with its highlighted variant for a
/// click-style widget.
pub fn png_to_click_image(
    decoder: &dyn PngDecoder,
    bytes: &[u8],
    highlight: Pixel,
) -> Result<ClickImage, GuiError> {
    let base = png_to_image(decoder, bytes)?;
    let held = create_highlighted_image(&base, highlight);
    Ok(ClickImage { base, held })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    struct FakeDecoder {
        pixels: Vec<u8>,
        width: u32,
        height: u32,
    }

    impl PngDecoder for FakeDecoder {
        fn decode(&self, _bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), GuiError> {
            Ok((self.pixels.clone(), self.width, self.height))
        }
    }

    #[test]
    fn straight_rgba_input_converts_to_correct_bgra() {
        // One fully-opaque red pixel, straight RGBA bytes: (255, 0, 0, 255).
        let decoder = FakeDecoder { pixels: vec![255, 0, 0, 255], width: 1, height: 1 };
        let image = png_to_image(&decoder, &[]).unwrap();
        assert_eq!(image.buffer[0], Pixel::opaque(0, 0, 255));
    }

    #[test]
    fn mismatched_length_is_invalid_data() {
        let decoder = FakeDecoder { pixels: vec![0, 0, 0], width: 1, height: 1 };
        assert!(matches!(png_to_image(&decoder, &[]), Err(GuiError::InvalidData)));
    }

    #[test]
    fn highlight_preserves_dimensions_and_leaves_gutters_alone() {
        let transparent = Pixel::new(0, 0, 0, 0);
        let opaque = Pixel::opaque(10, 10, 10);
        // Row: gutter, opaque, transparent gap, opaque, gutter
        let src = Image::new(5, 1, vec![transparent, opaque, transparent, opaque, transparent]);
        let highlight = Pixel::opaque(200, 200, 200);
        let held = create_highlighted_image(&src, highlight);

        assert_eq!(held.width, 5);
        assert_eq!(held.height, 1);
        assert_eq!(held.buffer[0], transparent, "left gutter must stay untouched");
        assert_eq!(held.buffer[4], transparent, "right gutter must stay untouched");
        assert_eq!(held.buffer[2], highlight, "interior gap must be filled");
        assert_ne!(held.buffer[1].a, 0, "opaque pixels stay non-transparent");
    }

    #[test]
    fn click_image_bundles_base_and_held() {
        let decoder = FakeDecoder { pixels: vec![0, 0, 0, 0xFF], width: 1, height: 1 };
        let click = png_to_click_image(&decoder, &[], Pixel::opaque(1, 1, 1)).unwrap();
        assert_eq!(click.base.width, 1);
        assert_eq!(click.held.width, 1);
    }
}
