use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture, TextureError};
use tracing::warn;
use winit::window::Window;

use crate::app::{Circle, Color, DrawCommand, DrawList, Rect, Vec2};
use crate::validate_asset_key;

use super::text::{glyph, glyph_pixel};
use super::{CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::app::draw::{GLYPH_COLUMNS, GLYPH_ROWS};

const CLEAR_COLOR: Color = [18, 20, 26, 255];
const FADE_COLOR: Color = [0, 0, 0, 255];

pub(crate) struct LoadedSprite {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// Presents a [`DrawList`] on a fixed-size pixel canvas scaled to the window.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    sprite_root: PathBuf,
    sprite_cache: HashMap<String, Option<LoadedSprite>>,
    warned_sprite_keys: HashSet<String>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, sprite_root: PathBuf) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            sprite_root,
            sprite_cache: HashMap::new(),
            warned_sprite_keys: HashSet::new(),
        })
    }

    fn build_pixels(
        window: Arc<Window>,
        surface_width: u32,
        surface_height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(surface_width.max(1), surface_height.max(1), window);
        Pixels::new(CANVAS_WIDTH, CANVAS_HEIGHT, surface)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    /// Converts a physical window position into canvas pixels. Positions in the
    /// letterbox outside the canvas map to `None`.
    pub fn window_to_canvas(&self, x: f32, y: f32) -> Option<Vec2> {
        self.pixels
            .window_pos_to_pixel((x, y))
            .ok()
            .map(|(px, py)| Vec2::new(px as f32, py as f32))
    }

    pub fn render(&mut self, draw: &DrawList) -> Result<(), Error> {
        let mut canvas = Canvas::new(self.pixels.frame_mut(), CANVAS_WIDTH, CANVAS_HEIGHT);
        canvas.clear(CLEAR_COLOR);
        for command in draw.commands() {
            match command {
                DrawCommand::FillRect { rect, color } => canvas.fill_rect(*rect, *color),
                DrawCommand::OutlineRect {
                    rect,
                    thickness,
                    color,
                } => canvas.outline_rect(*rect, *thickness, *color),
                DrawCommand::FillCircle { circle, color } => canvas.fill_circle(*circle, *color),
                DrawCommand::OutlineCircle {
                    circle,
                    thickness,
                    color,
                } => canvas.outline_circle(*circle, *thickness, *color),
                DrawCommand::Text {
                    top_left,
                    text,
                    scale,
                    color,
                } => canvas.text(*top_left, text, *scale, *color),
                DrawCommand::Sprite {
                    key,
                    source,
                    dest,
                    mirror,
                    fallback,
                } => match resolve_cached_sprite(
                    &mut self.sprite_cache,
                    &mut self.warned_sprite_keys,
                    &self.sprite_root,
                    key,
                ) {
                    Some(sprite) => canvas.sprite(sprite, *source, *dest, *mirror),
                    None => canvas.fill_rect(*dest, *fallback),
                },
                DrawCommand::PushClip(rect) => canvas.push_clip(*rect),
                DrawCommand::PopClip => canvas.pop_clip(),
            }
        }
        canvas.fade(draw.fade());
        self.pixels.render()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl PixelRect {
    fn from_rect(rect: Rect) -> Self {
        Self {
            left: rect.x.round() as i32,
            top: rect.y.round() as i32,
            right: rect.right().round() as i32,
            bottom: rect.bottom().round() as i32,
        }
    }

    fn intersect(self, other: PixelRect) -> PixelRect {
        PixelRect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right).max(self.left.max(other.left)),
            bottom: self.bottom.min(other.bottom).max(self.top.max(other.top)),
        }
    }
}

/// Software rasterizer over an RGBA frame with a clip stack.
struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
    clips: Vec<PixelRect>,
}

impl<'a> Canvas<'a> {
    fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
            clips: Vec::new(),
        }
    }

    fn bounds(&self) -> PixelRect {
        PixelRect {
            left: 0,
            top: 0,
            right: self.width as i32,
            bottom: self.height as i32,
        }
    }

    fn clip(&self) -> PixelRect {
        self.clips.last().copied().unwrap_or_else(|| self.bounds())
    }

    fn push_clip(&mut self, rect: Rect) {
        let clip = self.clip().intersect(PixelRect::from_rect(rect));
        self.clips.push(clip);
    }

    fn pop_clip(&mut self) {
        self.clips.pop();
    }

    fn clear(&mut self, color: Color) {
        for pixel in self.frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: Color) {
        let clip = self.clip();
        if x < clip.left || x >= clip.right || y < clip.top || y >= clip.bottom {
            return;
        }
        blend_pixel_rgba_clipped(self.frame, self.width as usize, x, y, color);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let area = PixelRect::from_rect(rect).intersect(self.clip());
        for y in area.top..area.bottom {
            for x in area.left..area.right {
                blend_pixel_rgba_clipped(self.frame, self.width as usize, x, y, color);
            }
        }
    }

    fn outline_rect(&mut self, rect: Rect, thickness: f32, color: Color) {
        let t = thickness.max(1.0).min(rect.w * 0.5).min(rect.h * 0.5);
        self.fill_rect(Rect::new(rect.x, rect.y, rect.w, t), color);
        self.fill_rect(Rect::new(rect.x, rect.bottom() - t, rect.w, t), color);
        self.fill_rect(Rect::new(rect.x, rect.y + t, t, rect.h - t * 2.0), color);
        self.fill_rect(
            Rect::new(rect.right() - t, rect.y + t, t, rect.h - t * 2.0),
            color,
        );
    }

    fn fill_circle(&mut self, circle: Circle, color: Color) {
        self.circle_band(circle, 0.0, color);
    }

    fn outline_circle(&mut self, circle: Circle, thickness: f32, color: Color) {
        let inner = (circle.radius - thickness.max(1.0)).max(0.0);
        self.circle_band(circle, inner, color);
    }

    fn circle_band(&mut self, circle: Circle, inner_radius: f32, color: Color) {
        let bounds = PixelRect::from_rect(Rect::from_center(
            circle.center,
            circle.radius * 2.0 + 2.0,
            circle.radius * 2.0 + 2.0,
        ))
        .intersect(self.clip());
        for y in bounds.top..bounds.bottom {
            for x in bounds.left..bounds.right {
                let sample = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let distance = sample.distance(circle.center);
                let inside_inner = inner_radius > 0.0 && distance <= inner_radius;
                if distance <= circle.radius && !inside_inner {
                    blend_pixel_rgba_clipped(self.frame, self.width as usize, x, y, color);
                }
            }
        }
    }

    fn text(&mut self, top_left: Vec2, text: &str, scale: u32, color: Color) {
        let scale = scale.max(1) as i32;
        let origin_x = top_left.x.round() as i32;
        let origin_y = top_left.y.round() as i32;
        let advance = (GLYPH_COLUMNS as i32 + 1) * scale;
        for (index, ch) in text.chars().enumerate() {
            let shape = glyph(ch);
            let glyph_x = origin_x + index as i32 * advance;
            for row in 0..GLYPH_ROWS {
                for column in 0..GLYPH_COLUMNS {
                    if !glyph_pixel(shape, column, row) {
                        continue;
                    }
                    let block_x = glyph_x + column as i32 * scale;
                    let block_y = origin_y + row as i32 * scale;
                    for dy in 0..scale {
                        for dx in 0..scale {
                            self.blend_pixel(block_x + dx, block_y + dy, color);
                        }
                    }
                }
            }
        }
    }

    /// Nearest-neighbour blit of `source` (sprite pixels) into `dest` (canvas pixels).
    fn sprite(&mut self, sprite: &LoadedSprite, source: Rect, dest: Rect, mirror: bool) {
        if sprite.width == 0
            || sprite.height == 0
            || sprite.rgba.len() < sprite.width as usize * sprite.height as usize * 4
            || dest.w <= 0.0
            || dest.h <= 0.0
        {
            return;
        }
        let area = PixelRect::from_rect(dest).intersect(self.clip());
        let max_x = sprite.width as f32 - 1.0;
        let max_y = sprite.height as f32 - 1.0;
        for y in area.top..area.bottom {
            let v = (y as f32 + 0.5 - dest.y) / dest.h;
            let src_y = (source.y + v * source.h).floor().clamp(0.0, max_y) as usize;
            for x in area.left..area.right {
                let mut u = (x as f32 + 0.5 - dest.x) / dest.w;
                if mirror {
                    u = 1.0 - u;
                }
                let src_x = (source.x + u * source.w).floor().clamp(0.0, max_x) as usize;
                let offset = (src_y * sprite.width as usize + src_x) * 4;
                let color = [
                    sprite.rgba[offset],
                    sprite.rgba[offset + 1],
                    sprite.rgba[offset + 2],
                    sprite.rgba[offset + 3],
                ];
                if color[3] != 0 {
                    blend_pixel_rgba_clipped(self.frame, self.width as usize, x, y, color);
                }
            }
        }
    }

    fn fade(&mut self, level: f32) {
        let alpha = (level.clamp(0.0, 1.0) * 255.0).round() as u8;
        if alpha == 0 {
            return;
        }
        let color = [FADE_COLOR[0], FADE_COLOR[1], FADE_COLOR[2], alpha];
        for pixel in self.frame.chunks_exact_mut(4) {
            blend_into(pixel, color);
        }
    }
}

fn blend_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: Color) {
    if x < 0 || y < 0 || x as usize >= width {
        return;
    }
    let Some(pixel_offset) = (y as usize)
        .checked_mul(width)
        .and_then(|row| row.checked_add(x as usize))
    else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    blend_into(&mut frame[byte_offset..end], color);
}

fn blend_into(pixel: &mut [u8], color: Color) {
    let alpha = color[3] as u32;
    if alpha == 255 {
        pixel.copy_from_slice(&color);
        return;
    }
    for channel in 0..3 {
        let src = color[channel] as u32;
        let dst = pixel[channel] as u32;
        pixel[channel] = ((src * alpha + dst * (255 - alpha) + 127) / 255) as u8;
    }
    pixel[3] = 255;
}

fn resolve_cached_sprite<'a>(
    cache: &'a mut HashMap<String, Option<LoadedSprite>>,
    warned_keys: &mut HashSet<String>,
    sprite_root: &Path,
    key: &str,
) -> Option<&'a LoadedSprite> {
    if !cache.contains_key(key) {
        let sprite = match resolve_sprite_image_path(sprite_root, key) {
            Ok(path) => match load_sprite_rgba(&path) {
                Ok(sprite) => Some(sprite),
                Err(reason) => {
                    warn_sprite_load_once(warned_keys, key, Some(&path), &reason);
                    None
                }
            },
            Err(reason) => {
                warn_sprite_load_once(warned_keys, key, None, &reason);
                None
            }
        };
        cache.insert(key.to_string(), sprite);
    }
    cache.get(key).and_then(Option::as_ref)
}

fn resolve_sprite_image_path(sprite_root: &Path, key: &str) -> Result<PathBuf, String> {
    validate_asset_key(key).map_err(|error| format!("invalid_key:{error}"))?;
    Ok(sprite_root.join(format!("{key}.png")))
}

fn load_sprite_rgba(path: &Path) -> Result<LoadedSprite, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedSprite {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn warn_sprite_load_once(
    warned_keys: &mut HashSet<String>,
    key: &str,
    resolved_path: Option<&Path>,
    reason: &str,
) {
    if !warned_keys.insert(key.to_string()) {
        return;
    }
    let path_display = resolved_path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unresolved>".to_string());
    warn!(
        sprite_key = key,
        path = %path_display,
        reason = reason,
        "renderer_sprite_load_failed_using_fallback"
    );
}
