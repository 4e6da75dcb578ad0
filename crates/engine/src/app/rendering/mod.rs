mod canvas;
mod renderer;

pub use canvas::{glyph_advance, line_advance, text_width, Canvas, Rgba};
pub use renderer::Renderer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}
