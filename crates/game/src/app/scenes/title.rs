use engine::{
    Button, ButtonSound, Color, DrawList, InputAction, InputSnapshot, Rect, Scene, SceneCommand,
    SceneContext, SceneData, SceneKey, Vec2, CANVAS_HEIGHT, CANVAS_WIDTH, DEFAULT_TRANSITION,
};

const STAGE_SELECT_BUTTON: Rect = Rect::new(100.0, 500.0, 300.0, 100.0);
const EXIT_BUTTON: Rect = Rect::new(100.0, 630.0, 300.0, 100.0);

const BACKGROUND: Color = [16, 20, 32, 255];
const TITLE_COLOR: Color = [250, 230, 160, 255];
const SUBTITLE_COLOR: Color = [180, 180, 200, 255];

pub(crate) struct TitleScene {
    stage_select: Button,
    exit: Button,
}

impl TitleScene {
    pub(crate) fn new() -> Self {
        Self {
            stage_select: Button::rect(STAGE_SELECT_BUTTON, "STAGE SELECT")
                .with_hotkey(InputAction::Confirm),
            exit: Button::rect(EXIT_BUTTON, "EXIT"),
        }
    }
}

impl Scene for TitleScene {
    fn update(
        &mut self,
        _fixed_dt_seconds: f32,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_>,
    ) -> SceneCommand {
        self.stage_select.update(input);
        self.exit.update(input);

        let target = if self.stage_select.is_selected(ButtonSound::Ok, ctx.sounds) {
            SceneKey::StageSelect
        } else if self.exit.is_selected(ButtonSound::Ok, ctx.sounds) {
            SceneKey::Exit
        } else {
            return SceneCommand::None;
        };
        SceneCommand::ChangeTo {
            scene: target,
            transition: DEFAULT_TRANSITION,
        }
    }

    fn render(&self, _data: &SceneData, draw: &mut DrawList) {
        draw.fill_rect(
            Rect::new(0.0, 0.0, CANVAS_WIDTH as f32, CANVAS_HEIGHT as f32),
            BACKGROUND,
        );
        draw.text(Vec2::new(100.0, 200.0), "RESCUE DUNGEON", 12, TITLE_COLOR);
        draw.text(
            Vec2::new(104.0, 310.0),
            "FIND THE LOST. DODGE THE PATROLS.",
            3,
            SUBTITLE_COLOR,
        );
        self.stage_select.render(draw);
        self.exit.render(draw);
    }

    fn debug_title(&self) -> Option<String> {
        Some("Rescue Dungeon | title".to_string())
    }
}
