use engine::{AnimFrameDef, Direction, PatrolPattern, SoundCue, SoundQueue, Vec2};

pub(crate) const MOVE_DURATION_SECONDS: f32 = 0.4;
pub(crate) const FOOTSTEP_INTERVAL_SECONDS: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct UnitId(usize);

/// A movable actor. Moves are linear over a fixed duration and end exactly
/// on the target.
#[derive(Debug, Clone)]
pub(crate) struct Unit {
    position: Vec2,
    start: Vec2,
    target: Vec2,
    move_timer: f32,
    footstep_timer: f32,
    anim_timer: f32,
    frame_index: usize,
    frames: Vec<AnimFrameDef>,
    sprite: Option<String>,
    mirror: bool,
    enabled: bool,
}

impl Unit {
    pub(crate) fn new(position: Vec2, sprite: Option<String>, frames: Vec<AnimFrameDef>) -> Self {
        Self {
            position,
            start: position,
            target: position,
            move_timer: 0.0,
            footstep_timer: 0.0,
            anim_timer: 0.0,
            frame_index: 0,
            frames,
            sprite,
            mirror: false,
            enabled: true,
        }
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.position
    }

    #[cfg(test)]
    pub(crate) fn target(&self) -> Vec2 {
        self.target
    }

    pub(crate) fn set_target_pos(&mut self, target: Vec2) {
        self.start = self.position;
        self.target = target;
        self.move_timer = 0.0;
        self.footstep_timer = 0.0;
    }

    pub(crate) fn is_moving(&self) -> bool {
        self.position != self.target
    }

    /// Disabled units are frozen. The walk cycle only advances while moving.
    pub(crate) fn update(&mut self, dt_seconds: f32, sounds: &mut SoundQueue) {
        if !self.enabled || !self.is_moving() {
            return;
        }

        self.move_timer += dt_seconds;
        let t = self.move_timer / MOVE_DURATION_SECONDS;
        self.position = if t >= 1.0 {
            self.target
        } else {
            self.start.lerp(self.target, t)
        };

        self.footstep_timer += dt_seconds;
        while self.footstep_timer >= FOOTSTEP_INTERVAL_SECONDS {
            self.footstep_timer -= FOOTSTEP_INTERVAL_SECONDS;
            sounds.play(SoundCue::Footstep);
        }

        self.advance_animation(dt_seconds);
    }

    fn advance_animation(&mut self, dt_seconds: f32) {
        if self.frames.len() < 2 {
            return;
        }
        self.anim_timer += dt_seconds;
        while self.anim_timer >= self.frames[self.frame_index].seconds {
            self.anim_timer -= self.frames[self.frame_index].seconds;
            self.frame_index = (self.frame_index + 1) % self.frames.len();
        }
    }

    pub(crate) fn current_frame(&self) -> Option<&AnimFrameDef> {
        self.frames.get(self.frame_index)
    }

    pub(crate) fn sprite(&self) -> Option<&str> {
        self.sprite.as_deref()
    }

    pub(crate) fn is_mirrored(&self) -> bool {
        self.mirror
    }

    /// Left faces mirrored, right faces normal, vertical keeps the current facing.
    pub(crate) fn face(&mut self, direction: Direction) {
        match direction {
            Direction::Left => self.mirror = true,
            Direction::Right => self.mirror = false,
            Direction::Up | Direction::Down => {}
        }
    }

    pub(crate) fn set_enable(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn is_enable(&self) -> bool {
        self.enabled
    }
}

/// Owns every unit of a stage. Handles stay valid for the whole stage;
/// units are disabled, never removed.
#[derive(Debug, Clone, Default)]
pub(crate) struct Actors {
    units: Vec<Unit>,
}

impl Actors {
    pub(crate) fn spawn(&mut self, unit: Unit) -> UnitId {
        self.units.push(unit);
        UnitId(self.units.len() - 1)
    }

    pub(crate) fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id.0)
    }

    pub(crate) fn update_all(&mut self, dt_seconds: f32, sounds: &mut SoundQueue) {
        for unit in &mut self.units {
            unit.update(dt_seconds, sounds);
        }
    }

    pub(crate) fn any_moving(&self) -> bool {
        self.units
            .iter()
            .any(|unit| unit.is_enable() && unit.is_moving())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.units.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Enemy {
    pub unit: UnitId,
    pub move_type: PatrolPattern,
    pub move_direction: Direction,
}

impl Enemy {
    pub(crate) fn patrols(&self) -> bool {
        self.move_type != PatrolPattern::Stationary
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RescueTarget {
    pub unit: UnitId,
    pub rescued: bool,
}
