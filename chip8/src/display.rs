//! Monochrome display buffer and sprite drawing.
use std::fmt::{self, Write};

use crate::constants::*;

pub type Chip8DisplayBuffer<'a> = &'a [bool; DISPLAY_BUFFER_SIZE];

/// XOR a sprite onto the display buffer, at coordinate (x, y).
///
/// Each byte of `sprite` is one row of 8 pixels, most significant bit
/// leftmost. The origin is wrapped to the display size, and so are pixels
/// that fall off the right or bottom edge.
///
/// Returns `true` if any lit pixel was erased, which is a collision.
pub(crate) fn draw_sprite(
    display: &mut [bool; DISPLAY_BUFFER_SIZE],
    x: u8,
    y: u8,
    sprite: &[u8],
) -> bool {
    let (x, y) = (x as usize, y as usize);
    let mut is_erased = false;

    for (r, row) in sprite.iter().enumerate() {
        // Each row is 8 bits representing the 8 pixels of the sprite.
        for c in 0..8 {
            let d = ((x + c) & DISPLAY_WIDTH_MASK) + ((y + r) & DISPLAY_HEIGHT_MASK) * DISPLAY_WIDTH;

            let old_px = display[d];
            let new_px = (row >> (7 - c) & 1) != 0;

            // XOR erases a pixel when both the old and new values are both 1.
            is_erased |= old_px && new_px;

            display[d] = old_px ^ new_px;
        }
    }

    is_erased
}

/// Expand the display into 32-bit ARGB pixels, row by row.
///
/// Writes at most `out.len()` pixels.
pub(crate) fn write_argb(display: &[bool; DISPLAY_BUFFER_SIZE], out: &mut [u32]) {
    for (px, color) in display.iter().zip(out.iter_mut()) {
        *color = if *px { PIXEL_ON } else { PIXEL_OFF };
    }
}

/// Render the display as text, `#` for lit pixels and `.` for unlit.
pub(crate) fn dump(display: &[bool; DISPLAY_BUFFER_SIZE]) -> Result<String, fmt::Error> {
    let mut buf = String::with_capacity(DISPLAY_BUFFER_SIZE + DISPLAY_HEIGHT);

    for row in display.chunks(DISPLAY_WIDTH) {
        for px in row {
            buf.write_char(if *px { '#' } else { '.' })?;
        }
        writeln!(buf)?;
    }

    Ok(buf)
}

#[cfg(test)]
mod test {
    use super::*;

    fn blank() -> Box<[bool; DISPLAY_BUFFER_SIZE]> {
        Box::new([false; DISPLAY_BUFFER_SIZE])
    }

    #[test]
    fn test_draw_row() {
        let mut display = blank();
        let erased = draw_sprite(&mut display, 0, 0, &[0xFF]);
        assert!(!erased);
        assert_eq!(display.iter().filter(|px| **px).count(), 8);
        assert!(display[0..8].iter().all(|px| *px));
    }

    #[test]
    fn test_draw_wraps() {
        let mut display = blank();
        // 4 pixels on the right edge, 4 wrapped to the left edge, one row down wrapped to the top.
        draw_sprite(&mut display, 60, 31, &[0xFF, 0x80]);

        let bottom = 31 * DISPLAY_WIDTH;
        assert!(display[bottom + 60..bottom + 64].iter().all(|px| *px));
        assert!(display[bottom..bottom + 4].iter().all(|px| *px));
        assert!(display[60]);
        assert_eq!(display.iter().filter(|px| **px).count(), 9);
    }

    #[test]
    fn test_origin_wraps() {
        let mut display = blank();
        draw_sprite(&mut display, 64 + 2, 32 + 1, &[0x80]);
        assert!(display[DISPLAY_WIDTH + 2]);
    }

    #[test]
    fn test_draw_collision() {
        let mut display = blank();

        // Draw two pixels next to each other.
        // The zero bits of the second draw must not erase
        // the pixels of the first draw
        assert!(!draw_sprite(&mut display, 4, 0, &[0b11110000]));
        assert!(!draw_sprite(&mut display, 0, 0, &[0b11110000]));
        assert!(display[0..8].iter().all(|px| *px));

        // Overlap on a later row still reports a collision.
        assert!(!draw_sprite(&mut display, 0, 0, &[0x00, 0x00, 0x00]));
        assert!(!draw_sprite(&mut display, 0, 0, &[0x00, 0x01]));
        assert!(draw_sprite(&mut display, 0, 0, &[0x00, 0x01]));
    }

    #[test]
    fn test_argb() {
        let mut display = blank();
        display[1] = true;
        let mut out = vec![0; DISPLAY_BUFFER_SIZE];
        write_argb(&display, &mut out);
        assert_eq!(out[0], PIXEL_OFF);
        assert_eq!(out[1], PIXEL_ON);
    }

    #[test]
    fn test_dump() {
        let mut display = blank();
        display[0] = true;
        let text = dump(&display).unwrap();
        let first = text.lines().next().unwrap();
        assert_eq!(first.len(), DISPLAY_WIDTH);
        assert!(first.starts_with("#."));
        assert_eq!(text.lines().count(), DISPLAY_HEIGHT);
    }
}
