use super::scene::{Circle, Rect, Vec2};

pub type Color = [u8; 4];

pub(crate) const GLYPH_COLUMNS: u32 = 3;
pub(crate) const GLYPH_ROWS: u32 = 5;
const GLYPH_SPACING: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect {
        rect: Rect,
        color: Color,
    },
    OutlineRect {
        rect: Rect,
        thickness: f32,
        color: Color,
    },
    FillCircle {
        circle: Circle,
        color: Color,
    },
    OutlineCircle {
        circle: Circle,
        thickness: f32,
        color: Color,
    },
    Text {
        top_left: Vec2,
        text: String,
        scale: u32,
        color: Color,
    },
    Sprite {
        key: String,
        source: Rect,
        dest: Rect,
        mirror: bool,
        fallback: Color,
    },
    PushClip(Rect),
    PopClip,
}

/// Screen-space draw commands for one frame, in painter's order.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
    fade: f32,
}

impl DrawList {
    pub fn clear(&mut self) {
        self.commands.clear();
        self.fade = 0.0;
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn fade(&self) -> f32 {
        self.fade
    }

    pub(crate) fn set_fade(&mut self, fade: f32) {
        self.fade = fade.clamp(0.0, 1.0);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    pub fn outline_rect(&mut self, rect: Rect, thickness: f32, color: Color) {
        self.commands.push(DrawCommand::OutlineRect {
            rect,
            thickness,
            color,
        });
    }

    pub fn fill_circle(&mut self, circle: Circle, color: Color) {
        self.commands.push(DrawCommand::FillCircle { circle, color });
    }

    pub fn outline_circle(&mut self, circle: Circle, thickness: f32, color: Color) {
        self.commands.push(DrawCommand::OutlineCircle {
            circle,
            thickness,
            color,
        });
    }

    pub fn text(&mut self, top_left: Vec2, text: impl Into<String>, scale: u32, color: Color) {
        self.commands.push(DrawCommand::Text {
            top_left,
            text: text.into(),
            scale: scale.max(1),
            color,
        });
    }

    pub fn text_centered(&mut self, center: Vec2, text: impl Into<String>, scale: u32, color: Color) {
        let text = text.into();
        let size = text_size(&text, scale);
        let top_left = Vec2::new(center.x - size.x * 0.5, center.y - size.y * 0.5);
        self.text(top_left, text, scale, color);
    }

    /// Blits `source` from the sprite sheet `key` into `dest`. When the sheet
    /// cannot be loaded the renderer fills `dest` with `fallback`.
    pub fn sprite(&mut self, key: &str, source: Rect, dest: Rect, mirror: bool, fallback: Color) {
        self.commands.push(DrawCommand::Sprite {
            key: key.to_string(),
            source,
            dest,
            mirror,
            fallback,
        });
    }

    pub fn push_clip(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::PushClip(rect));
    }

    pub fn pop_clip(&mut self) {
        self.commands.push(DrawCommand::PopClip);
    }
}

/// Pixel size of `text` drawn with the built-in font at `scale`.
pub fn text_size(text: &str, scale: u32) -> Vec2 {
    let scale = scale.max(1);
    let chars = text.chars().count() as u32;
    if chars == 0 {
        return Vec2::ZERO;
    }
    let width = chars * (GLYPH_COLUMNS + GLYPH_SPACING) - GLYPH_SPACING;
    Vec2::new((width * scale) as f32, (GLYPH_ROWS * scale) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_size_accounts_for_spacing_between_glyphs() {
        assert_eq!(text_size("", 4), Vec2::ZERO);
        assert_eq!(text_size("A", 2), Vec2::new(6.0, 10.0));
        assert_eq!(text_size("OK", 3), Vec2::new(21.0, 15.0));
    }

    #[test]
    fn centered_text_is_positioned_around_center() {
        let mut draw = DrawList::default();
        draw.text_centered(Vec2::new(100.0, 50.0), "OK", 2, [255; 4]);

        let Some(DrawCommand::Text { top_left, .. }) = draw.commands().first() else {
            panic!("expected text command");
        };
        assert_eq!(*top_left, Vec2::new(93.0, 45.0));
    }

    #[test]
    fn clear_drops_commands_and_fade() {
        let mut draw = DrawList::default();
        draw.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), [0, 0, 0, 255]);
        draw.set_fade(2.0);
        assert_eq!(draw.fade(), 1.0);

        draw.clear();
        assert!(draw.commands().is_empty());
        assert_eq!(draw.fade(), 0.0);
    }
}
