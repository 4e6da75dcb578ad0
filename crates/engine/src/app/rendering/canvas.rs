const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;

pub type Rgba = [u8; 4];

/// Borrowed RGBA8 frame with clipped drawing primitives.
///
/// Every write is bounds-checked; drawing partially or fully outside the frame
/// is silently clipped.
pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn clear(&mut self, color: Rgba) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, rect_width: i32, rect_height: i32, color: Rgba) {
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = x.saturating_add(rect_width).min(self.width as i32);
        let end_y = y.saturating_add(rect_height).min(self.height as i32);
        if end_x <= start_x || end_y <= start_y {
            return;
        }

        for py in start_y..end_y {
            for px in start_x..end_x {
                self.write_pixel(px as usize, py as usize, color);
            }
        }
    }

    pub fn outline_rect(&mut self, x: i32, y: i32, rect_width: i32, rect_height: i32, color: Rgba) {
        if rect_width <= 1 || rect_height <= 1 {
            return;
        }
        self.fill_rect(x, y, rect_width, 1, color);
        self.fill_rect(x, y + rect_height - 1, rect_width, 1, color);
        self.fill_rect(x, y, 1, rect_height, color);
        self.fill_rect(x + rect_width - 1, y, 1, rect_height, color);
    }

    /// Draws `text` with its top-left corner at `(x, y)`. Lowercase letters are
    /// drawn as uppercase; characters outside the font draw as blanks.
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, scale: i32, color: Rgba) {
        let scale = scale.max(1);
        let mut cursor_x = x;
        for ch in text.chars() {
            if let Some(rows) = glyph_rows(ch.to_ascii_uppercase()) {
                self.draw_glyph(cursor_x, y, rows, scale, color);
            }
            cursor_x += glyph_advance(scale);
        }
    }

    /// Draws `text` horizontally centred on the frame.
    pub fn draw_text_centered(&mut self, y: i32, text: &str, scale: i32, color: Rgba) {
        let x = (self.width as i32 - text_width(text, scale)) / 2;
        self.draw_text(x, y, text, scale, color);
    }

    fn draw_glyph(&mut self, x: i32, y: i32, rows: [u8; 5], scale: i32, color: Rgba) {
        for (row_index, row_bits) in rows.iter().enumerate() {
            let glyph_y = y + row_index as i32 * scale;
            for col in 0..GLYPH_WIDTH {
                if (row_bits & (1 << (GLYPH_WIDTH - 1 - col))) == 0 {
                    continue;
                }
                self.fill_rect(x + col * scale, glyph_y, scale, scale, color);
            }
        }
    }

    fn write_pixel(&mut self, x: usize, y: usize, color: Rgba) {
        let Some(pixel_offset) = y
            .checked_mul(self.width as usize)
            .and_then(|row| row.checked_add(x))
        else {
            return;
        };
        let Some(byte_offset) = pixel_offset.checked_mul(4) else {
            return;
        };
        let Some(end) = byte_offset.checked_add(4) else {
            return;
        };
        if end > self.frame.len() {
            return;
        }

        self.frame[byte_offset..end].copy_from_slice(&color);
    }
}

pub fn glyph_advance(scale: i32) -> i32 {
    (GLYPH_WIDTH + 1) * scale.max(1)
}

pub fn line_advance(scale: i32) -> i32 {
    (GLYPH_HEIGHT + 2) * scale.max(1)
}

pub fn text_width(text: &str, scale: i32) -> i32 {
    text.chars().count() as i32 * glyph_advance(scale)
}

const FONT: &[(char, [u8; 5])] = &[
    ('!', [0b010, 0b010, 0b010, 0b000, 0b010]),
    ('#', [0b101, 0b111, 0b101, 0b111, 0b101]),
    ('%', [0b101, 0b001, 0b010, 0b100, 0b101]),
    ('\'', [0b010, 0b010, 0b000, 0b000, 0b000]),
    ('(', [0b001, 0b010, 0b010, 0b010, 0b001]),
    (')', [0b100, 0b010, 0b010, 0b010, 0b100]),
    ('+', [0b000, 0b010, 0b111, 0b010, 0b000]),
    (',', [0b000, 0b000, 0b000, 0b010, 0b100]),
    ('-', [0b000, 0b000, 0b111, 0b000, 0b000]),
    ('.', [0b000, 0b000, 0b000, 0b000, 0b010]),
    ('/', [0b001, 0b001, 0b010, 0b100, 0b100]),
    ('0', [0b111, 0b101, 0b101, 0b101, 0b111]),
    ('1', [0b010, 0b110, 0b010, 0b010, 0b111]),
    ('2', [0b111, 0b001, 0b111, 0b100, 0b111]),
    ('3', [0b111, 0b001, 0b111, 0b001, 0b111]),
    ('4', [0b101, 0b101, 0b111, 0b001, 0b001]),
    ('5', [0b111, 0b100, 0b111, 0b001, 0b111]),
    ('6', [0b111, 0b100, 0b111, 0b101, 0b111]),
    ('7', [0b111, 0b001, 0b010, 0b010, 0b010]),
    ('8', [0b111, 0b101, 0b111, 0b101, 0b111]),
    ('9', [0b111, 0b101, 0b111, 0b001, 0b111]),
    (':', [0b000, 0b010, 0b000, 0b010, 0b000]),
    ('<', [0b001, 0b010, 0b100, 0b010, 0b001]),
    ('>', [0b100, 0b010, 0b001, 0b010, 0b100]),
    ('?', [0b111, 0b001, 0b011, 0b000, 0b010]),
    ('A', [0b010, 0b101, 0b111, 0b101, 0b101]),
    ('B', [0b110, 0b101, 0b110, 0b101, 0b110]),
    ('C', [0b111, 0b100, 0b100, 0b100, 0b111]),
    ('D', [0b110, 0b101, 0b101, 0b101, 0b110]),
    ('E', [0b111, 0b100, 0b110, 0b100, 0b111]),
    ('F', [0b111, 0b100, 0b110, 0b100, 0b100]),
    ('G', [0b111, 0b100, 0b101, 0b101, 0b111]),
    ('H', [0b101, 0b101, 0b111, 0b101, 0b101]),
    ('I', [0b111, 0b010, 0b010, 0b010, 0b111]),
    ('J', [0b111, 0b001, 0b001, 0b101, 0b111]),
    ('K', [0b101, 0b101, 0b110, 0b101, 0b101]),
    ('L', [0b100, 0b100, 0b100, 0b100, 0b111]),
    ('M', [0b101, 0b111, 0b111, 0b101, 0b101]),
    ('N', [0b101, 0b111, 0b111, 0b111, 0b101]),
    ('O', [0b111, 0b101, 0b101, 0b101, 0b111]),
    ('P', [0b110, 0b101, 0b110, 0b100, 0b100]),
    ('Q', [0b111, 0b101, 0b101, 0b111, 0b001]),
    ('R', [0b110, 0b101, 0b110, 0b101, 0b101]),
    ('S', [0b111, 0b100, 0b111, 0b001, 0b111]),
    ('T', [0b111, 0b010, 0b010, 0b010, 0b010]),
    ('U', [0b101, 0b101, 0b101, 0b101, 0b111]),
    ('V', [0b101, 0b101, 0b101, 0b101, 0b010]),
    ('W', [0b101, 0b101, 0b111, 0b111, 0b101]),
    ('X', [0b101, 0b101, 0b010, 0b101, 0b101]),
    ('Y', [0b101, 0b101, 0b010, 0b010, 0b010]),
    ('Z', [0b111, 0b001, 0b010, 0b100, 0b111]),
    ('_', [0b000, 0b000, 0b000, 0b000, 0b111]),
];

fn glyph_rows(ch: char) -> Option<[u8; 5]> {
    FONT.iter()
        .find(|(glyph_char, _)| *glyph_char == ch)
        .map(|(_, rows)| *rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba = [255, 255, 255, 255];

    fn frame(width: u32, height: u32) -> Vec<u8> {
        vec![0; (width * height * 4) as usize]
    }

    #[test]
    fn digits_and_timer_punctuation_have_glyphs() {
        for ch in "0123456789:.".chars() {
            assert!(glyph_rows(ch).is_some(), "missing glyph for {ch:?}");
        }
    }

    #[test]
    fn lowercase_text_draws_like_uppercase() {
        let mut lower = frame(32, 8);
        let mut upper = frame(32, 8);
        Canvas::new(&mut lower, 32, 8).draw_text(0, 0, "still", 1, WHITE);
        Canvas::new(&mut upper, 32, 8).draw_text(0, 0, "STILL", 1, WHITE);
        assert_eq!(lower, upper);
    }

    #[test]
    fn drawing_outside_the_frame_is_clipped() {
        let mut pixels = frame(4, 4);
        let mut canvas = Canvas::new(&mut pixels, 4, 4);
        canvas.draw_text(-10, -10, "88", 3, WHITE);
        canvas.draw_text(100, 100, "88", 3, WHITE);
        canvas.fill_rect(2, 2, 100, 100, WHITE);
        assert_eq!(&pixels[(2 * 4 + 2) * 4..(2 * 4 + 3) * 4], &WHITE);
    }

    #[test]
    fn zero_sized_frame_never_panics() {
        let mut pixels = Vec::new();
        let mut canvas = Canvas::new(&mut pixels, 0, 0);
        canvas.clear(WHITE);
        canvas.draw_text_centered(0, "00:00.00", 4, WHITE);
        canvas.outline_rect(0, 0, 10, 10, WHITE);
    }

    #[test]
    fn text_width_follows_scale() {
        assert_eq!(text_width("12:34", 1), 5 * 4);
        assert_eq!(text_width("12:34", 3), 5 * 12);
        assert_eq!(line_advance(2), 14);
    }
}
