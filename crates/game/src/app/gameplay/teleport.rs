use engine::{Circle, Color, DrawList, Vec2, WorldView};

pub(crate) const TELEPORT_DURATION_SECONDS: f32 = 0.8;
pub(crate) const TELEPORT_FRAME_COUNT: u32 = 8;

const RING_COLOR: Color = [150, 220, 255, 200];
const CORE_COLOR: Color = [235, 250, 255, 160];

/// Beam-out effect shown over a rescued target or the leaving player.
#[derive(Debug, Clone, Default)]
pub(crate) struct TeleportAnim {
    position: Option<Vec2>,
    timer: f32,
}

impl TeleportAnim {
    pub(crate) fn start(&mut self, position: Vec2) {
        self.position = Some(position);
        self.timer = 0.0;
    }

    /// Returns true on the tick the animation completes.
    pub(crate) fn update(&mut self, dt_seconds: f32) -> bool {
        if self.position.is_none() {
            return false;
        }
        self.timer += dt_seconds;
        self.timer >= TELEPORT_DURATION_SECONDS
    }

    pub(crate) fn reset(&mut self) {
        self.position = None;
        self.timer = 0.0;
    }

    #[cfg(test)]
    pub(crate) fn is_active(&self) -> bool {
        self.position.is_some()
    }

    pub(crate) fn frame(&self) -> u32 {
        let progress = (self.timer / TELEPORT_DURATION_SECONDS).clamp(0.0, 1.0);
        ((progress * TELEPORT_FRAME_COUNT as f32) as u32).min(TELEPORT_FRAME_COUNT - 1)
    }

    pub(crate) fn render(&self, view: &WorldView, draw: &mut DrawList) {
        let Some(position) = self.position else {
            return;
        };
        let center = view.world_to_screen(position);
        let frame = self.frame() as f32;
        let scale = view.camera.scale;
        draw.fill_circle(
            Circle {
                center,
                radius: (4.0 + frame) * scale,
            },
            CORE_COLOR,
        );
        draw.outline_circle(
            Circle {
                center,
                radius: (6.0 + frame * 3.0) * scale,
            },
            2.0,
            RING_COLOR,
        );
    }
}
