use engine::{
    Button, ButtonSound, Color, DrawList, InputAction, InputSnapshot, Rect, SoundQueue, Vec2,
    CANVAS_HEIGHT, CANVAS_WIDTH,
};

const OVERLAY: Color = [0, 0, 0, 150];
const PANEL: Color = [30, 34, 48, 255];
const PANEL_FRAME: Color = [200, 200, 220, 255];
const TITLE_COLOR: Color = [240, 240, 240, 255];
const PANEL_SIZE: Vec2 = Vec2::new(480.0, 420.0);
const BUTTON_SIZE: Vec2 = Vec2::new(320.0, 70.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PauseChoice {
    Close,
    StageSelect,
    Title,
}

/// Overlay shown while the stage is paused.
#[derive(Debug, Clone)]
pub(crate) struct PauseMenu {
    buttons: [(PauseChoice, Button); 3],
}

impl PauseMenu {
    pub(crate) fn new() -> Self {
        let panel = panel_rect();
        let button = |row: usize, label: &str| {
            Button::rect(
                Rect::new(
                    panel.center().x - BUTTON_SIZE.x * 0.5,
                    panel.y + 110.0 + row as f32 * (BUTTON_SIZE.y + 20.0),
                    BUTTON_SIZE.x,
                    BUTTON_SIZE.y,
                ),
                label,
            )
        };
        Self {
            buttons: [
                (
                    PauseChoice::Close,
                    button(0, "CLOSE").with_hotkey(InputAction::Cancel),
                ),
                (PauseChoice::StageSelect, button(1, "STAGE SELECT")),
                (PauseChoice::Title, button(2, "TITLE")),
            ],
        }
    }

    pub(crate) fn update(
        &mut self,
        input: &InputSnapshot,
        sounds: &mut SoundQueue,
    ) -> Option<PauseChoice> {
        for (choice, button) in &mut self.buttons {
            button.update(input);
            if button.is_selected(ButtonSound::Ok, sounds) {
                return Some(*choice);
            }
        }
        None
    }

    pub(crate) fn button_center(&self, choice: PauseChoice) -> Option<Vec2> {
        self.buttons
            .iter()
            .find(|(candidate, _)| *candidate == choice)
            .map(|(_, button)| button.region().center())
    }

    pub(crate) fn render(&self, draw: &mut DrawList) {
        draw.fill_rect(
            Rect::new(0.0, 0.0, CANVAS_WIDTH as f32, CANVAS_HEIGHT as f32),
            OVERLAY,
        );
        let panel = panel_rect();
        draw.fill_rect(panel, PANEL);
        draw.outline_rect(panel, 3.0, PANEL_FRAME);
        draw.text_centered(
            Vec2::new(panel.center().x, panel.y + 55.0),
            "PAUSE",
            6,
            TITLE_COLOR,
        );
        for (_, button) in &self.buttons {
            button.render(draw);
        }
    }
}

fn panel_rect() -> Rect {
    Rect::from_center(
        Vec2::new(CANVAS_WIDTH as f32 * 0.5, CANVAS_HEIGHT as f32 * 0.5),
        PANEL_SIZE.x,
        PANEL_SIZE.y,
    )
}
