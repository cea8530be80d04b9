use crate::app::{Camera2D, Rect, Vec2};

/// Maps world space into a screen-space area. The camera center lands on the
/// center of `area`; world y grows downward like screen y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldView {
    pub camera: Camera2D,
    pub area: Rect,
}

impl WorldView {
    pub fn new(camera: Camera2D, area: Rect) -> Self {
        Self { camera, area }
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        self.area.center() + (world - self.camera.center) * self.camera.scale
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        self.camera.center + (screen - self.area.center()) * self.camera.scale.recip()
    }

    pub fn world_rect_to_screen(&self, world: Rect) -> Rect {
        let top_left = self.world_to_screen(Vec2::new(world.x, world.y));
        Rect::new(
            top_left.x,
            top_left.y,
            world.w * self.camera.scale,
            world.h * self.camera.scale,
        )
    }
}
