use engine::{
    Button, ButtonSound, Color, DrawList, InputAction, InputSnapshot, Rect, Scene, SceneCommand,
    SceneContext, SceneData, SceneKey, SoundCue, SoundQueue, Vec2, CANVAS_HEIGHT, CANVAS_WIDTH,
    DEFAULT_TRANSITION,
};
use tracing::info;

use crate::app::progress::{progress_path, Progress, StageRecord};

const COLUMNS: usize = 4;
const GRID_ORIGIN: Vec2 = Vec2::new(100.0, 200.0);
const CELL_SIZE: Vec2 = Vec2::new(250.0, 140.0);
const CELL_GAP: f32 = 30.0;
const BACK_BUTTON: Rect = Rect::new(100.0, 820.0, 240.0, 90.0);
const CURSOR_MARGIN: f32 = 6.0;

const BACKGROUND: Color = [16, 20, 32, 255];
const HEADING: Color = [250, 230, 160, 255];
const CURSOR: Color = [250, 220, 60, 255];
const CLEARED: Color = [120, 220, 130, 255];
const UNCLEARED: Color = [170, 170, 180, 255];

struct StageEntry {
    no: u32,
    record: StageRecord,
    button: Button,
}

impl StageEntry {
    fn mark(&self) -> String {
        if self.record.cleared {
            format!(
                "CLEAR {}/{}",
                self.record.best_rescued, self.record.total_targets
            )
        } else {
            "NEW".to_string()
        }
    }
}

/// Grid of compiled stages with their saved clear marks.
pub(crate) struct StageSelectScene {
    entries: Vec<StageEntry>,
    cursor: usize,
    hovered: Option<usize>,
    back: Button,
}

impl StageSelectScene {
    pub(crate) fn new(data: &SceneData) -> Self {
        let progress = Progress::load_or_default(&progress_path(&data.paths.cache_dir));
        let entries: Vec<StageEntry> = data
            .stages
            .iter()
            .flat_map(|stages| stages.stages())
            .enumerate()
            .map(|(index, stage)| StageEntry {
                no: stage.no,
                record: progress.record(stage.no),
                button: Button::rect(
                    cell_rect(index),
                    format!("{} {}", stage.no, stage.name.to_uppercase()),
                ),
            })
            .collect();
        let cursor = entries
            .iter()
            .position(|entry| entry.no == data.stage_no)
            .unwrap_or(0);
        Self {
            entries,
            cursor,
            hovered: None,
            back: Button::rect(BACK_BUTTON, "BACK").with_hotkey(InputAction::Cancel),
        }
    }

    fn move_cursor(&mut self, input: &InputSnapshot, sounds: &mut SoundQueue) {
        let Some(last) = self.entries.len().checked_sub(1) else {
            return;
        };
        let cursor = self.cursor;
        let next = if input.was_pressed(InputAction::MoveLeft) {
            cursor.saturating_sub(1)
        } else if input.was_pressed(InputAction::MoveRight) {
            (cursor + 1).min(last)
        } else if input.was_pressed(InputAction::MoveUp) {
            cursor.checked_sub(COLUMNS).unwrap_or(cursor)
        } else if input.was_pressed(InputAction::MoveDown) {
            if cursor + COLUMNS <= last {
                cursor + COLUMNS
            } else {
                cursor
            }
        } else {
            return;
        };
        if next != cursor {
            self.cursor = next;
            sounds.play(SoundCue::Select);
        }
    }

    fn choose(&self, index: usize, data: &mut SceneData) -> SceneCommand {
        let Some(entry) = self.entries.get(index) else {
            return SceneCommand::None;
        };
        data.stage_no = entry.no;
        info!(stage = entry.no, "stage_selected");
        SceneCommand::ChangeTo {
            scene: SceneKey::Game,
            transition: DEFAULT_TRANSITION,
        }
    }
}

impl Scene for StageSelectScene {
    fn update(
        &mut self,
        _fixed_dt_seconds: f32,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_>,
    ) -> SceneCommand {
        for entry in &mut self.entries {
            entry.button.update(input);
        }
        self.back.update(input);
        let hovered = self
            .entries
            .iter()
            .position(|entry| entry.button.is_hovered());
        if hovered != self.hovered {
            if let Some(index) = hovered {
                self.cursor = index;
            }
            self.hovered = hovered;
        }

        if self.back.is_selected(ButtonSound::Ok, ctx.sounds) {
            return SceneCommand::ChangeTo {
                scene: SceneKey::Title,
                transition: DEFAULT_TRANSITION,
            };
        }
        let clicked = self
            .entries
            .iter()
            .position(|entry| entry.button.is_selected(ButtonSound::Ok, ctx.sounds));
        if let Some(index) = clicked {
            self.cursor = index;
            return self.choose(index, ctx.data);
        }
        if input.was_pressed(InputAction::Confirm) && !self.entries.is_empty() {
            ctx.sounds.play(SoundCue::Ok);
            return self.choose(self.cursor, ctx.data);
        }
        self.move_cursor(input, ctx.sounds);
        SceneCommand::None
    }

    fn render(&self, _data: &SceneData, draw: &mut DrawList) {
        draw.fill_rect(
            Rect::new(0.0, 0.0, CANVAS_WIDTH as f32, CANVAS_HEIGHT as f32),
            BACKGROUND,
        );
        draw.text(Vec2::new(100.0, 90.0), "STAGE SELECT", 8, HEADING);
        if self.entries.is_empty() {
            draw.text(Vec2::new(100.0, 220.0), "NO STAGES FOUND", 4, UNCLEARED);
        }
        for (index, entry) in self.entries.iter().enumerate() {
            let cell = cell_rect(index);
            if index == self.cursor {
                draw.outline_rect(
                    Rect::new(
                        cell.x - CURSOR_MARGIN,
                        cell.y - CURSOR_MARGIN,
                        cell.w + CURSOR_MARGIN * 2.0,
                        cell.h + CURSOR_MARGIN * 2.0,
                    ),
                    3.0,
                    CURSOR,
                );
            }
            entry.button.render(draw);
            let color = if entry.record.cleared {
                CLEARED
            } else {
                UNCLEARED
            };
            draw.text_centered(
                Vec2::new(cell.center().x, cell.bottom() - 22.0),
                entry.mark(),
                2,
                color,
            );
        }
        self.back.render(draw);
    }

    fn debug_title(&self) -> Option<String> {
        Some(format!(
            "Rescue Dungeon | stage select | cursor {}",
            self.cursor
        ))
    }
}

fn cell_rect(index: usize) -> Rect {
    let column = (index % COLUMNS) as f32;
    let row = (index / COLUMNS) as f32;
    Rect::new(
        GRID_ORIGIN.x + column * (CELL_SIZE.x + CELL_GAP),
        GRID_ORIGIN.y + row * (CELL_SIZE.y + CELL_GAP),
        CELL_SIZE.x,
        CELL_SIZE.y,
    )
}
