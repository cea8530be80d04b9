mod renderer;
mod text;
mod transform;

pub use renderer::Renderer;
pub use transform::WorldView;

pub const CANVAS_WIDTH: u32 = 1280;
pub const CANVAS_HEIGHT: u32 = 960;
