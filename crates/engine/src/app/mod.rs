mod audio;
mod draw;
mod input;
mod loop_runner;
mod rendering;
mod scene;
mod ui;

pub use audio::{SoundCue, SoundQueue};
pub use draw::{text_size, Color, DrawCommand, DrawList};
pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig, DEFAULT_TRANSITION};
pub use rendering::{Renderer, WorldView, CANVAS_HEIGHT, CANVAS_WIDTH};
pub use scene::{
    Camera2D, Circle, InputSnapshot, Rect, Scene, SceneBuildError, SceneCommand, SceneContext,
    SceneData, SceneKey, SceneRegistry, Vec2,
};
pub use ui::{Button, ButtonSound, HitRegion, Popup, PopupButtons, PopupChoice, PopupStyle};
