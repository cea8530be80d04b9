use std::collections::HashMap;
use std::ops::{Add, Mul, Sub};
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use super::audio::SoundQueue;
use super::draw::DrawList;
use super::input::{ActionStates, InputAction};
use crate::content::StageDatabase;
use crate::AppPaths;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn lerp(self, to: Vec2, t: f32) -> Vec2 {
        self + (to - self) * t
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle with a top-left origin; y grows downward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_center(center: Vec2, w: f32, h: f32) -> Self {
        Self::new(center.x - w * 0.5, center.y - h * 0.5, w, h)
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (right > left && bottom > top).then(|| Rect::new(left, top, right - left, bottom - top))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub const fn new(x: f32, y: f32, radius: f32) -> Self {
        Self {
            center: Vec2::new(x, y),
            radius,
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.center.distance(point) <= self.radius
    }
}

pub const CAMERA_FOLLOW_RATE: f32 = 10.0;
const CAMERA_SNAP_DISTANCE: f32 = 0.05;

/// Camera that eases its center toward a target center every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    pub center: Vec2,
    pub target_center: Vec2,
    pub scale: f32,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self::new(Vec2::ZERO, 1.0)
    }
}

impl Camera2D {
    pub fn new(center: Vec2, scale: f32) -> Self {
        Self {
            center,
            target_center: center,
            scale: if scale.is_finite() && scale > 0.0 {
                scale
            } else {
                1.0
            },
        }
    }

    pub fn set_target_center(&mut self, target: Vec2) {
        self.target_center = target;
    }

    pub fn jump_to(&mut self, center: Vec2) {
        self.center = center;
        self.target_center = center;
    }

    pub fn update(&mut self, dt_seconds: f32) {
        let blend = 1.0 - (-CAMERA_FOLLOW_RATE * dt_seconds.max(0.0)).exp();
        self.center = self.center.lerp(self.target_center, blend);
        if self.center.distance(self.target_center) < CAMERA_SNAP_DISTANCE {
            self.center = self.target_center;
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    cursor_position_px: Option<Vec2>,
    left_click_pressed: bool,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        cursor_position_px: Option<Vec2>,
        left_click_pressed: bool,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            cursor_position_px,
            left_click_pressed,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.actions.was_pressed(action)
    }

    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    pub fn left_click_pressed(&self) -> bool {
        self.left_click_pressed
    }

    /// Position of a click that landed this tick, if any.
    pub fn click_position_px(&self) -> Option<Vec2> {
        self.left_click_pressed
            .then_some(self.cursor_position_px)
            .flatten()
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set_down(action, is_down);
        self
    }

    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.actions.set_down(action, true);
        self.actions.set_pressed(action, true);
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Vec2>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_left_click_pressed(mut self, left_click_pressed: bool) -> Self {
        self.left_click_pressed = left_click_pressed;
        self
    }

    pub fn with_click_at(self, position_px: Vec2) -> Self {
        self.with_cursor_position_px(Some(position_px))
            .with_left_click_pressed(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneKey {
    Load,
    Title,
    StageSelect,
    Game,
    Exit,
}

/// State carried across scene changes.
#[derive(Debug, Clone)]
pub struct SceneData {
    pub stage_no: u32,
    pub next_scene: SceneKey,
    pub paths: AppPaths,
    pub stages: Option<StageDatabase>,
}

impl SceneData {
    pub fn new(paths: AppPaths, next_scene: SceneKey) -> Self {
        Self {
            stage_no: 0,
            next_scene,
            paths,
            stages: None,
        }
    }
}

pub struct SceneContext<'a> {
    pub data: &'a mut SceneData,
    pub sounds: &'a mut SoundQueue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    ChangeTo {
        scene: SceneKey,
        transition: Duration,
    },
    Quit,
}

pub trait Scene {
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_>,
    ) -> SceneCommand;
    fn render(&self, data: &SceneData, draw: &mut DrawList);
    fn unload(&mut self, _data: &mut SceneData) {}
    fn debug_title(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Error)]
pub enum SceneBuildError {
    #[error("no scene registered for {0:?}")]
    Unregistered(SceneKey),
    #[error("failed to build scene {scene:?}: {message}")]
    Failed { scene: SceneKey, message: String },
}

type SceneFactory = Box<dyn Fn(&SceneData) -> Result<Box<dyn Scene>, SceneBuildError>>;

/// Builds a fresh scene instance every time its key is entered.
#[derive(Default)]
pub struct SceneRegistry {
    factories: HashMap<SceneKey, SceneFactory>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, key: SceneKey, factory: F)
    where
        F: Fn(&SceneData) -> Result<Box<dyn Scene>, SceneBuildError> + 'static,
    {
        self.factories.insert(key, Box::new(factory));
    }

    pub fn contains(&self, key: SceneKey) -> bool {
        self.factories.contains_key(&key)
    }

    pub fn build(&self, key: SceneKey, data: &SceneData) -> Result<Box<dyn Scene>, SceneBuildError> {
        let factory = self
            .factories
            .get(&key)
            .ok_or(SceneBuildError::Unregistered(key))?;
        factory(data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MachineStatus {
    Running,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransitionPhase {
    FadeOut,
    FadeIn,
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    target: SceneKey,
    phase: TransitionPhase,
    elapsed_seconds: f32,
    half_seconds: f32,
}

struct ActiveScene {
    key: SceneKey,
    scene: Box<dyn Scene>,
}

pub(crate) struct SceneMachine {
    registry: SceneRegistry,
    data: SceneData,
    active: Option<ActiveScene>,
    transition: Option<Transition>,
    sounds: SoundQueue,
}

impl SceneMachine {
    pub(crate) fn new(registry: SceneRegistry, data: SceneData) -> Self {
        Self {
            registry,
            data,
            active: None,
            transition: None,
            sounds: SoundQueue::default(),
        }
    }

    pub(crate) fn start(&mut self, key: SceneKey) -> Result<(), SceneBuildError> {
        self.enter(key)
    }

    pub(crate) fn active_scene(&self) -> Option<SceneKey> {
        self.active.as_ref().map(|active| active.key)
    }

    #[cfg(test)]
    pub(crate) fn data(&self) -> &SceneData {
        &self.data
    }

    pub(crate) fn sounds_mut(&mut self) -> &mut SoundQueue {
        &mut self.sounds
    }

    pub(crate) fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    pub(crate) fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
    ) -> Result<MachineStatus, SceneBuildError> {
        if input.quit_requested() {
            self.shutdown();
            return Ok(MachineStatus::Exit);
        }
        if let Some(transition) = self.transition.take() {
            return self.advance_transition(transition, fixed_dt_seconds);
        }
        let Some(active) = self.active.as_mut() else {
            return Ok(MachineStatus::Exit);
        };

        let mut ctx = SceneContext {
            data: &mut self.data,
            sounds: &mut self.sounds,
        };
        match active.scene.update(fixed_dt_seconds, input, &mut ctx) {
            SceneCommand::None => Ok(MachineStatus::Running),
            SceneCommand::Quit => {
                info!(scene = ?active.key, "scene_requested_quit");
                self.shutdown();
                Ok(MachineStatus::Exit)
            }
            SceneCommand::ChangeTo { scene, transition } => self.begin_change(scene, transition),
        }
    }

    pub(crate) fn render(&self, draw: &mut DrawList) {
        if let Some(active) = &self.active {
            active.scene.render(&self.data, draw);
        }
        draw.set_fade(self.fade_level());
    }

    /// 0.0 is fully visible, 1.0 fully faded out.
    pub(crate) fn fade_level(&self) -> f32 {
        let Some(transition) = self.transition else {
            return 0.0;
        };
        let progress = if transition.half_seconds > 0.0 {
            (transition.elapsed_seconds / transition.half_seconds).clamp(0.0, 1.0)
        } else {
            1.0
        };
        match transition.phase {
            TransitionPhase::FadeOut => progress,
            TransitionPhase::FadeIn => 1.0 - progress,
        }
    }

    pub(crate) fn debug_title(&self) -> Option<String> {
        self.active
            .as_ref()
            .and_then(|active| active.scene.debug_title())
    }

    pub(crate) fn shutdown(&mut self) {
        self.transition = None;
        self.unload_active();
    }

    fn begin_change(
        &mut self,
        target: SceneKey,
        duration: Duration,
    ) -> Result<MachineStatus, SceneBuildError> {
        info!(
            from = ?self.active_scene(),
            to = ?target,
            transition_ms = duration.as_millis() as u64,
            "scene_change_requested"
        );
        let half_seconds = duration.as_secs_f32() * 0.5;
        if half_seconds <= 0.0 {
            return self.swap_to(target);
        }
        self.transition = Some(Transition {
            target,
            phase: TransitionPhase::FadeOut,
            elapsed_seconds: 0.0,
            half_seconds,
        });
        Ok(MachineStatus::Running)
    }

    fn advance_transition(
        &mut self,
        mut transition: Transition,
        fixed_dt_seconds: f32,
    ) -> Result<MachineStatus, SceneBuildError> {
        transition.elapsed_seconds += fixed_dt_seconds;
        if transition.elapsed_seconds < transition.half_seconds {
            self.transition = Some(transition);
            return Ok(MachineStatus::Running);
        }

        match transition.phase {
            TransitionPhase::FadeOut => {
                if self.swap_to(transition.target)? == MachineStatus::Exit {
                    return Ok(MachineStatus::Exit);
                }
                self.transition = Some(Transition {
                    phase: TransitionPhase::FadeIn,
                    elapsed_seconds: 0.0,
                    ..transition
                });
                Ok(MachineStatus::Running)
            }
            TransitionPhase::FadeIn => Ok(MachineStatus::Running),
        }
    }

    fn swap_to(&mut self, target: SceneKey) -> Result<MachineStatus, SceneBuildError> {
        self.unload_active();
        if target == SceneKey::Exit {
            info!("scene_exit_reached");
            return Ok(MachineStatus::Exit);
        }
        self.enter(target)?;
        Ok(MachineStatus::Running)
    }

    fn enter(&mut self, key: SceneKey) -> Result<(), SceneBuildError> {
        let scene = self.registry.build(key, &self.data)?;
        info!(scene = ?key, stage_no = self.data.stage_no, "scene_changed");
        self.active = Some(ActiveScene { key, scene });
        Ok(())
    }

    fn unload_active(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.scene.unload(&mut self.data);
        }
    }
}
