use super::audio::{SoundCue, SoundQueue};
use super::draw::{Color, DrawList};
use super::input::InputAction;
use super::rendering::{CANVAS_HEIGHT, CANVAS_WIDTH};
use super::scene::{Circle, InputSnapshot, Rect, Vec2};

const BUTTON_FILL: Color = [47, 79, 79, 255];
const BUTTON_FILL_HOVER: Color = [72, 112, 112, 255];
const BUTTON_FRAME: Color = [169, 169, 169, 255];
const BUTTON_TEXT: Color = [240, 240, 240, 255];
const BUTTON_TEXT_SCALE: u32 = 3;
const POPUP_DIM: Color = [0, 0, 0, 150];
const POPUP_PANEL: Color = [30, 42, 48, 255];
const POPUP_TEXT_SCALE: u32 = 3;
const POPUP_LINE_HEIGHT: f32 = 24.0;
const POPUP_PANEL_SIZE: Vec2 = Vec2::new(640.0, 280.0);
const POPUP_BUTTON_SIZE: Vec2 = Vec2::new(180.0, 60.0);
const POPUP_CROSS_SIZE: f32 = 48.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitRegion {
    Circle(Circle),
    Rect(Rect),
}

impl HitRegion {
    pub fn contains(&self, point: Vec2) -> bool {
        match self {
            HitRegion::Circle(circle) => circle.contains(point),
            HitRegion::Rect(rect) => rect.contains(point),
        }
    }

    pub fn center(&self) -> Vec2 {
        match self {
            HitRegion::Circle(circle) => circle.center,
            HitRegion::Rect(rect) => rect.center(),
        }
    }
}

/// Sound category played when a button reports a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonSound {
    Select,
    Ok,
}

impl ButtonSound {
    fn cue(self) -> SoundCue {
        match self {
            ButtonSound::Select => SoundCue::Select,
            ButtonSound::Ok => SoundCue::Ok,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Button {
    region: HitRegion,
    label: String,
    hotkey: Option<InputAction>,
    hovered: bool,
    selected: bool,
}

impl Button {
    pub fn new(region: HitRegion, label: impl Into<String>) -> Self {
        Self {
            region,
            label: label.into(),
            hotkey: None,
            hovered: false,
            selected: false,
        }
    }

    pub fn rect(rect: Rect, label: impl Into<String>) -> Self {
        Self::new(HitRegion::Rect(rect), label)
    }

    pub fn circle(circle: Circle, label: impl Into<String>) -> Self {
        Self::new(HitRegion::Circle(circle), label)
    }

    pub fn with_hotkey(mut self, action: InputAction) -> Self {
        self.hotkey = Some(action);
        self
    }

    pub fn region(&self) -> HitRegion {
        self.region
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    /// Latches whether this button was activated this tick.
    pub fn update(&mut self, input: &InputSnapshot) {
        self.hovered = input
            .cursor_position_px()
            .is_some_and(|cursor| self.region.contains(cursor));
        let clicked = input
            .click_position_px()
            .is_some_and(|click| self.region.contains(click));
        let hotkey = self.hotkey.is_some_and(|action| input.was_pressed(action));
        self.selected = clicked || hotkey;
    }

    pub fn is_selected(&self, sound: ButtonSound, sounds: &mut SoundQueue) -> bool {
        if self.selected {
            sounds.play(sound.cue());
        }
        self.selected
    }

    pub fn render(&self, draw: &mut DrawList) {
        let fill = if self.hovered {
            BUTTON_FILL_HOVER
        } else {
            BUTTON_FILL
        };
        match self.region {
            HitRegion::Rect(rect) => {
                draw.fill_rect(rect, fill);
                draw.outline_rect(rect, 2.0, BUTTON_FRAME);
            }
            HitRegion::Circle(circle) => {
                draw.fill_circle(circle, fill);
                draw.outline_circle(circle, 2.0, BUTTON_FRAME);
            }
        }
        if !self.label.is_empty() {
            draw.text_centered(
                self.region.center(),
                self.label.as_str(),
                BUTTON_TEXT_SCALE,
                BUTTON_TEXT,
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupButtons {
    YesNo,
    OnlyOk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupStyle {
    pub buttons: PopupButtons,
    pub cross: bool,
}

impl PopupStyle {
    pub const YES_NO_CROSS: PopupStyle = PopupStyle {
        buttons: PopupButtons::YesNo,
        cross: true,
    };
    pub const ONLY_OK: PopupStyle = PopupStyle {
        buttons: PopupButtons::OnlyOk,
        cross: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupChoice {
    Yes,
    No,
    Ok,
    Cross,
}

impl PopupChoice {
    /// Yes and Ok both confirm; No and Cross both decline.
    pub fn is_affirmative(self) -> bool {
        matches!(self, PopupChoice::Yes | PopupChoice::Ok)
    }
}

/// Modal message box. Produces a single terminal choice and then ignores input.
#[derive(Debug, Clone)]
pub struct Popup {
    style: PopupStyle,
    message: String,
    buttons: Vec<(PopupChoice, Button)>,
    choice: Option<PopupChoice>,
}

impl Popup {
    pub fn new(style: PopupStyle, message: impl Into<String>) -> Self {
        let panel = popup_panel_rect();
        let button_y = panel.bottom() - POPUP_BUTTON_SIZE.y - 30.0;
        let mut buttons = Vec::with_capacity(3);
        match style.buttons {
            PopupButtons::YesNo => {
                let yes = Rect::new(
                    panel.center().x - POPUP_BUTTON_SIZE.x - 40.0,
                    button_y,
                    POPUP_BUTTON_SIZE.x,
                    POPUP_BUTTON_SIZE.y,
                );
                let no = Rect::new(
                    panel.center().x + 40.0,
                    button_y,
                    POPUP_BUTTON_SIZE.x,
                    POPUP_BUTTON_SIZE.y,
                );
                buttons.push((
                    PopupChoice::Yes,
                    Button::rect(yes, "YES").with_hotkey(InputAction::Confirm),
                ));
                let no_button = Button::rect(no, "NO");
                buttons.push((
                    PopupChoice::No,
                    if style.cross {
                        no_button
                    } else {
                        no_button.with_hotkey(InputAction::Cancel)
                    },
                ));
            }
            PopupButtons::OnlyOk => {
                let ok = Rect::new(
                    panel.center().x - POPUP_BUTTON_SIZE.x * 0.5,
                    button_y,
                    POPUP_BUTTON_SIZE.x,
                    POPUP_BUTTON_SIZE.y,
                );
                buttons.push((
                    PopupChoice::Ok,
                    Button::rect(ok, "OK").with_hotkey(InputAction::Confirm),
                ));
            }
        }
        if style.cross {
            let cross = Rect::new(
                panel.right() - POPUP_CROSS_SIZE - 12.0,
                panel.y + 12.0,
                POPUP_CROSS_SIZE,
                POPUP_CROSS_SIZE,
            );
            buttons.push((
                PopupChoice::Cross,
                Button::rect(cross, "X").with_hotkey(InputAction::Cancel),
            ));
        }

        Self {
            style,
            message: message.into(),
            buttons,
            choice: None,
        }
    }

    pub fn style(&self) -> PopupStyle {
        self.style
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn choice(&self) -> Option<PopupChoice> {
        self.choice
    }

    pub fn button_center(&self, choice: PopupChoice) -> Option<Vec2> {
        self.buttons
            .iter()
            .find(|(candidate, _)| *candidate == choice)
            .map(|(_, button)| button.region().center())
    }

    pub fn update(&mut self, input: &InputSnapshot, sounds: &mut SoundQueue) {
        if self.choice.is_some() {
            return;
        }
        for (choice, button) in &mut self.buttons {
            button.update(input);
            let sound = if choice.is_affirmative() {
                ButtonSound::Ok
            } else {
                ButtonSound::Select
            };
            if button.is_selected(sound, sounds) {
                self.choice = Some(*choice);
                return;
            }
        }
    }

    pub fn render(&self, draw: &mut DrawList) {
        draw.fill_rect(
            Rect::new(0.0, 0.0, CANVAS_WIDTH as f32, CANVAS_HEIGHT as f32),
            POPUP_DIM,
        );
        let panel = popup_panel_rect();
        draw.fill_rect(panel, POPUP_PANEL);
        draw.outline_rect(panel, 3.0, BUTTON_FRAME);

        let lines = self.message.lines().collect::<Vec<_>>();
        let block_height = lines.len() as f32 * POPUP_LINE_HEIGHT;
        let first_line_y = panel.y + 90.0 - block_height * 0.5;
        for (index, line) in lines.iter().enumerate() {
            draw.text_centered(
                Vec2::new(
                    panel.center().x,
                    first_line_y + index as f32 * POPUP_LINE_HEIGHT,
                ),
                *line,
                POPUP_TEXT_SCALE,
                BUTTON_TEXT,
            );
        }
        for (_, button) in &self.buttons {
            button.render(draw);
        }
    }
}

fn popup_panel_rect() -> Rect {
    Rect::from_center(
        Vec2::new(CANVAS_WIDTH as f32 * 0.5, CANVAS_HEIGHT as f32 * 0.5),
        POPUP_PANEL_SIZE.x,
        POPUP_PANEL_SIZE.y,
    )
}
