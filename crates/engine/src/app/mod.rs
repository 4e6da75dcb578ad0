mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::{InputEvent, Key, PointerPosition};
pub use loop_runner::{run_app, AppError, LoopConfig, MAX_FPS_ENV_VAR};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{glyph_advance, line_advance, text_width, Canvas, Renderer, Rgba, Viewport};
pub use scene::{Scene, SceneCommand};
