use engine::{
    Button, ButtonSound, Camera2D, Circle, Color, Direction, DrawList, InputAction,
    InputSnapshot, Popup, PopupChoice, PopupStyle, Rect, Scene, SceneCommand, SceneContext,
    SceneData, SceneKey, SoundCue, SoundQueue, Vec2, WorldView, CANVAS_HEIGHT, CANVAS_WIDTH,
    DEFAULT_TRANSITION,
};
use tracing::{debug, error, info};

use super::actor::{Unit, UnitId};
use super::item::HeldKeys;
use super::message_log::MessageLog;
use super::pause::{PauseChoice, PauseMenu};
use super::room::{RoomCoord, Travel};
use super::stage::{StageBuildError, StageWorld};
use super::step::GameStep;
use super::teleport::TeleportAnim;
use crate::app::progress::{record_stage_outcome, StageOutcome};

pub(crate) const CAMERA_SCALE: f32 = 1.9;

const BANNER_AREA: Rect = Rect::new(20.0, 20.0, 1240.0, 80.0);
const MAP_AREA: Rect = Rect::new(20.0, 120.0, 1240.0, 600.0);
const LOG_AREA: Rect = Rect::new(20.0, 740.0, 1020.0, 200.0);
const CONTROLLER: Circle = Circle::new(1160.0, 840.0, 100.0);
const CONTROL_RADIUS: f32 = 40.0;
const PAUSE_BUTTON: Rect = Rect::new(1000.0, 35.0, 110.0, 50.0);
const EXIT_BUTTON: Rect = Rect::new(1130.0, 35.0, 110.0, 50.0);

const BACKGROUND: Color = [12, 12, 18, 255];
const PANEL: Color = [28, 30, 44, 255];
const PANEL_FRAME: Color = [90, 96, 130, 255];
const TEXT: Color = [235, 235, 235, 255];
const VOID: Color = [6, 6, 10, 255];
const FLOOR: Color = [70, 62, 54, 255];
const WALL: Color = [150, 140, 120, 255];
const LOCKED_DOOR: Color = [210, 140, 40, 255];
const KEY_COLOR: Color = [250, 220, 60, 255];
const PLAYER_COLOR: Color = [70, 140, 240, 255];
const ENEMY_COLOR: Color = [220, 60, 60, 255];
const TARGET_COLOR: Color = [90, 210, 110, 255];
const GAME_OVER_COLOR: Color = [240, 60, 60, 255];

const WALL_THICKNESS: f32 = 4.0;
const DEFAULT_UNIT_SIZE: Vec2 = Vec2::new(16.0, 24.0);
const KEY_SIZE: f32 = 8.0;

const USE_KEY_MESSAGE: &str = "THE DOOR IS LOCKED.\nUSE A KEY TO OPEN IT?";
const NO_KEY_MESSAGE: &str = "THE DOOR IS LOCKED.\nFIND A KEY FIRST.";
const RESCUE_MESSAGE: &str = "RESCUE THIS PERSON?";
const RETURN_MESSAGE: &str = "SOME PEOPLE STILL NEED HELP.\nLEAVE THE STAGE?";
const ALL_RESCUED_MESSAGE: &str = "EVERYONE IS RESCUED!\nRETURNING TO BASE.";

enum PopupPoll {
    Waiting,
    Chosen(PopupChoice),
    Missing,
}

/// One playable stage: the map, its actors and the step machine that
/// drives them.
pub(crate) struct GameScene {
    world: StageWorld,
    step: GameStep,
    held_keys: HeldKeys,
    camera: Camera2D,
    controls: [(Direction, Button); 4],
    pause_button: Button,
    exit_button: Button,
    popup: Option<Popup>,
    pause_menu: Option<PauseMenu>,
    teleport: TeleportAnim,
    log: MessageLog,
    next_scene: Option<SceneKey>,
    outcome: Option<StageOutcome>,
    declined_rescue_room: Option<RoomCoord>,
    game_over: bool,
}

impl GameScene {
    pub(crate) fn new(world: StageWorld) -> Self {
        let camera_center = world
            .player_unit()
            .map(Unit::position)
            .unwrap_or_default();
        Self {
            world,
            step: GameStep::Assign,
            held_keys: HeldKeys::default(),
            camera: Camera2D::new(camera_center, CAMERA_SCALE),
            controls: controller_buttons(),
            pause_button: Button::rect(PAUSE_BUTTON, "PAUSE").with_hotkey(InputAction::Pause),
            exit_button: Button::rect(EXIT_BUTTON, "EXIT").with_hotkey(InputAction::ExitStage),
            popup: None,
            pause_menu: None,
            teleport: TeleportAnim::default(),
            log: MessageLog::default(),
            next_scene: None,
            outcome: None,
            declined_rescue_room: None,
            game_over: false,
        }
    }

    pub(crate) fn from_scene_data(data: &SceneData) -> Result<Self, StageBuildError> {
        let world = StageWorld::from_database(data.stages.as_ref(), data.stage_no)?;
        info!(
            stage = world.no,
            name = %world.name,
            width = world.map.width(),
            height = world.map.height(),
            enemies = world.enemies.len(),
            targets = world.targets.len(),
            keys = world.items.len(),
            "stage_loaded"
        );
        Ok(Self::new(world))
    }

    pub(crate) fn step(&self) -> GameStep {
        self.step
    }

    pub(crate) fn world(&self) -> &StageWorld {
        &self.world
    }

    pub(crate) fn held_keys(&self) -> &HeldKeys {
        &self.held_keys
    }

    pub(crate) fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub(crate) fn log(&self) -> &MessageLog {
        &self.log
    }

    pub(crate) fn next_scene(&self) -> Option<SceneKey> {
        self.next_scene
    }

    pub(crate) fn outcome(&self) -> Option<StageOutcome> {
        self.outcome
    }

    pub(crate) fn control_center(&self, direction: Direction) -> Option<Vec2> {
        self.controls
            .iter()
            .find(|(candidate, _)| *candidate == direction)
            .map(|(_, button)| button.region().center())
    }

    /// Advances the step machine by one fixed tick.
    pub(crate) fn tick(&mut self, dt_seconds: f32, input: &InputSnapshot, sounds: &mut SoundQueue) {
        let next = match self.step {
            GameStep::Assign => self.update_assign(),
            GameStep::Idle => self.update_idle(dt_seconds, input, sounds),
            GameStep::Move => self.update_move(dt_seconds, sounds),
            GameStep::Pause => self.update_pause(input, sounds),
            GameStep::UseKeyPopup { room, direction } => {
                self.update_use_key_popup(room, direction, input, sounds)
            }
            GameStep::RescuePopup { target } => self.update_rescue_popup(target, input, sounds),
            GameStep::ReturnPopup => self.update_return_popup(input, sounds),
            GameStep::CommonPopup => self.update_common_popup(input, sounds),
            GameStep::GameOver => self.finish(SceneKey::StageSelect),
            GameStep::RescueAnim => self.update_rescue_anim(dt_seconds),
            GameStep::ReturnAnim => self.update_return_anim(dt_seconds),
            GameStep::Result => self.update_result(sounds),
            GameStep::End => GameStep::End,
        };
        if next != self.step {
            debug!(
                stage = self.world.no,
                from = self.step.name(),
                to = next.name(),
                popup = next.is_popup(),
                "game_step_changed"
            );
            self.step = next;
        }
        self.follow_player(dt_seconds);
    }

    fn update_assign(&mut self) -> GameStep {
        let Some(position) = self.world.player_unit().map(Unit::position) else {
            return self.recover("stage started without a player");
        };
        self.camera.jump_to(position);
        self.log.push(format!("STAGE {} START", self.world.no));
        GameStep::Idle
    }

    fn update_idle(
        &mut self,
        dt_seconds: f32,
        input: &InputSnapshot,
        sounds: &mut SoundQueue,
    ) -> GameStep {
        self.world.actors.update_all(dt_seconds, sounds);
        for (_, button) in &mut self.controls {
            button.update(input);
        }
        self.pause_button.update(input);
        self.exit_button.update(input);

        if self.pause_button.is_selected(ButtonSound::Ok, sounds) {
            self.pause_menu = Some(PauseMenu::new());
            return GameStep::Pause;
        }
        if self.exit_button.is_selected(ButtonSound::Ok, sounds) {
            return self.open_return_popup();
        }

        let Some(room) = self.world.player_room() else {
            return self.recover("idle without a player");
        };
        if self
            .declined_rescue_room
            .is_some_and(|declined| declined != room)
        {
            self.declined_rescue_room = None;
        }

        self.pick_up_key(room, sounds);

        if self.enemy_in_room(room).is_some() {
            sounds.play(SoundCue::GameOver);
            self.log.push("CAUGHT BY AN ENEMY!");
            self.game_over = true;
            info!(stage = self.world.no, x = room.x, y = room.y, "stage_game_over");
            return GameStep::GameOver;
        }

        if self.declined_rescue_room.is_none() {
            if let Some(target) = self.unrescued_target_in(room) {
                self.popup = Some(Popup::new(PopupStyle::YES_NO_CROSS, RESCUE_MESSAGE));
                return GameStep::RescuePopup { target };
            }
        }

        let mut requested = None;
        for (direction, button) in &self.controls {
            if button.is_selected(ButtonSound::Select, sounds) {
                requested = Some(*direction);
                break;
            }
        }
        match requested {
            Some(direction) => self.try_move(room, direction),
            None => GameStep::Idle,
        }
    }

    fn pick_up_key(&mut self, room: RoomCoord, sounds: &mut SoundQueue) {
        let Some(player) = self.world.player else {
            return;
        };
        let Some(index) = self
            .world
            .items
            .iter()
            .position(|item| !item.is_owned() && item.room == room)
        else {
            return;
        };
        self.world.items[index].owner = Some(player);
        self.held_keys.add(index);
        sounds.play(SoundCue::KeyPickup);
        self.log.push("PICKED UP A KEY.");
        info!(
            stage = self.world.no,
            item = index,
            held = self.held_keys.count(),
            "key_picked_up"
        );
    }

    fn try_move(&mut self, from: RoomCoord, direction: Direction) -> GameStep {
        if let Some(player) = self.player_unit_mut() {
            player.face(direction);
        }

        match self.world.map.travel(from, direction) {
            Travel::Blocked => GameStep::Idle,
            Travel::Locked {
                room,
                direction: door,
            } => {
                if self.held_keys.is_empty() {
                    self.log.push("THE DOOR IS LOCKED.");
                    self.popup = Some(Popup::new(PopupStyle::ONLY_OK, NO_KEY_MESSAGE));
                    GameStep::CommonPopup
                } else {
                    self.popup = Some(Popup::new(PopupStyle::YES_NO_CROSS, USE_KEY_MESSAGE));
                    GameStep::UseKeyPopup {
                        room,
                        direction: door,
                    }
                }
            }
            Travel::Open(destination) => {
                let mut advanced = None;
                if let Some(index) = self.enemy_in_room(destination) {
                    let enemy = self.world.enemies[index];
                    let head_on = enemy.patrols() && enemy.move_direction == direction.opposite();
                    if !head_on {
                        return GameStep::Idle;
                    }
                    self.step_enemy(index);
                    advanced = Some(index);
                }

                let target = self.world.map.room_center(destination);
                let Some(player) = self.player_unit_mut() else {
                    return self.recover("move without a player");
                };
                player.set_target_pos(target);
                self.enemy_move(advanced);
                debug!(
                    stage = self.world.no,
                    direction = direction.name(),
                    x = destination.x,
                    y = destination.y,
                    "player_move"
                );
                GameStep::Move
            }
        }
    }

    /// Steps every patrolling enemy once. `skip` already stepped this move.
    fn enemy_move(&mut self, skip: Option<usize>) {
        for index in 0..self.world.enemies.len() {
            if Some(index) == skip {
                continue;
            }
            let enemy = self.world.enemies[index];
            if !enemy.patrols() || !self.unit_enabled(enemy.unit) {
                continue;
            }
            self.step_enemy(index);
        }
    }

    fn step_enemy(&mut self, index: usize) {
        let enemy = self.world.enemies[index];
        let Some(room) = self.world.unit_room(enemy.unit) else {
            return;
        };
        if !self.reverse_if_blocked(index, room) {
            return;
        }
        let direction = self.world.enemies[index].move_direction;
        let target = self.world.map.room_center(room.step(direction));
        if let Some(unit) = self.world.actors.get_mut(enemy.unit) {
            unit.set_target_pos(target);
        }
    }

    /// Turns the enemy around when the way ahead is shut. Returns whether it
    /// can step afterwards.
    fn reverse_if_blocked(&mut self, index: usize, room: RoomCoord) -> bool {
        let current = self.world.enemies[index].move_direction;
        if matches!(self.world.map.travel(room, current), Travel::Open(_)) {
            return true;
        }
        let reversed = current.opposite();
        let enemy = &mut self.world.enemies[index];
        enemy.move_direction = reversed;
        let unit_id = enemy.unit;
        if let Some(unit) = self.world.actors.get_mut(unit_id) {
            unit.face(reversed);
        }
        if matches!(self.world.map.travel(room, reversed), Travel::Open(_)) {
            return true;
        }
        invariant_violated("patrolling enemy is boxed in");
        false
    }

    fn settle_enemies(&mut self) {
        for index in 0..self.world.enemies.len() {
            let enemy = self.world.enemies[index];
            if !enemy.patrols() || !self.unit_enabled(enemy.unit) {
                continue;
            }
            if let Some(room) = self.world.unit_room(enemy.unit) {
                self.reverse_if_blocked(index, room);
            }
        }
    }

    fn update_move(&mut self, dt_seconds: f32, sounds: &mut SoundQueue) -> GameStep {
        self.world.actors.update_all(dt_seconds, sounds);
        if self.world.actors.any_moving() {
            return GameStep::Move;
        }
        self.settle_enemies();
        GameStep::Idle
    }

    fn update_pause(&mut self, input: &InputSnapshot, sounds: &mut SoundQueue) -> GameStep {
        let Some(menu) = self.pause_menu.as_mut() else {
            return self.recover("pause without a menu");
        };
        let Some(choice) = menu.update(input, sounds) else {
            return GameStep::Pause;
        };
        self.pause_menu = None;
        match choice {
            PauseChoice::Close => GameStep::Idle,
            PauseChoice::StageSelect => self.finish(SceneKey::StageSelect),
            PauseChoice::Title => self.finish(SceneKey::Title),
        }
    }

    fn poll_popup(&mut self, input: &InputSnapshot, sounds: &mut SoundQueue) -> PopupPoll {
        let Some(popup) = self.popup.as_mut() else {
            return PopupPoll::Missing;
        };
        popup.update(input, sounds);
        match popup.choice() {
            Some(choice) => {
                self.popup = None;
                PopupPoll::Chosen(choice)
            }
            None => PopupPoll::Waiting,
        }
    }

    fn update_use_key_popup(
        &mut self,
        room: RoomCoord,
        direction: Direction,
        input: &InputSnapshot,
        sounds: &mut SoundQueue,
    ) -> GameStep {
        match self.poll_popup(input, sounds) {
            PopupPoll::Waiting => self.step,
            PopupPoll::Missing => self.recover("use-key popup missing"),
            PopupPoll::Chosen(choice) => {
                if choice.is_affirmative() {
                    if self.world.map.unlock(room, direction) {
                        sounds.play(SoundCue::Unlock);
                        self.log.push("UNLOCKED THE DOOR.");
                        info!(
                            stage = self.world.no,
                            x = room.x,
                            y = room.y,
                            direction = direction.name(),
                            "door_unlocked"
                        );
                    } else {
                        invariant_violated("unlock outside the map");
                    }
                }
                GameStep::Idle
            }
        }
    }

    fn update_rescue_popup(
        &mut self,
        target: usize,
        input: &InputSnapshot,
        sounds: &mut SoundQueue,
    ) -> GameStep {
        match self.poll_popup(input, sounds) {
            PopupPoll::Waiting => self.step,
            PopupPoll::Missing => self.recover("rescue popup missing"),
            PopupPoll::Chosen(choice) if choice.is_affirmative() => {
                if self.rescue(target, sounds) {
                    GameStep::RescueAnim
                } else {
                    GameStep::Idle
                }
            }
            PopupPoll::Chosen(_) => {
                self.declined_rescue_room = self.world.player_room();
                GameStep::Idle
            }
        }
    }

    fn rescue(&mut self, target: usize, sounds: &mut SoundQueue) -> bool {
        let Some(record) = self.world.targets.get_mut(target) else {
            invariant_violated("rescue target out of range");
            return false;
        };
        if record.rescued {
            return false;
        }
        record.rescued = true;
        let unit_id = record.unit;
        let Some(unit) = self.world.actors.get_mut(unit_id) else {
            invariant_violated("rescue target has no unit");
            return false;
        };
        unit.set_enable(false);
        let position = unit.position();
        self.teleport.start(position);
        sounds.play(SoundCue::Teleport);

        let rescued = self.world.rescued_count();
        let total = self.world.targets.len();
        self.log.push(format!("RESCUED A SURVIVOR. ({rescued}/{total})"));
        info!(stage = self.world.no, target, rescued, total, "target_rescued");
        true
    }

    fn update_rescue_anim(&mut self, dt_seconds: f32) -> GameStep {
        if !self.teleport.update(dt_seconds) {
            return GameStep::RescueAnim;
        }
        self.teleport.reset();
        if self.world.all_rescued() {
            self.open_return_popup()
        } else {
            GameStep::Idle
        }
    }

    fn open_return_popup(&mut self) -> GameStep {
        let popup = if self.world.all_rescued() {
            Popup::new(PopupStyle::ONLY_OK, ALL_RESCUED_MESSAGE)
        } else {
            Popup::new(PopupStyle::YES_NO_CROSS, RETURN_MESSAGE)
        };
        self.popup = Some(popup);
        GameStep::ReturnPopup
    }

    fn update_return_popup(&mut self, input: &InputSnapshot, sounds: &mut SoundQueue) -> GameStep {
        match self.poll_popup(input, sounds) {
            PopupPoll::Waiting => GameStep::ReturnPopup,
            PopupPoll::Missing => self.recover("return popup missing"),
            PopupPoll::Chosen(choice) if choice.is_affirmative() => {
                let Some(player_id) = self.world.player.take() else {
                    return self.recover("return without a player");
                };
                let Some(player) = self.world.actors.get_mut(player_id) else {
                    return self.recover("player handle has no unit");
                };
                player.set_enable(false);
                let position = player.position();
                self.teleport.start(position);
                sounds.play(SoundCue::Teleport);
                GameStep::ReturnAnim
            }
            PopupPoll::Chosen(_) => GameStep::Idle,
        }
    }

    fn update_common_popup(&mut self, input: &InputSnapshot, sounds: &mut SoundQueue) -> GameStep {
        match self.poll_popup(input, sounds) {
            PopupPoll::Waiting => GameStep::CommonPopup,
            PopupPoll::Missing => self.recover("common popup missing"),
            PopupPoll::Chosen(_) => GameStep::Idle,
        }
    }

    fn update_return_anim(&mut self, dt_seconds: f32) -> GameStep {
        if !self.teleport.update(dt_seconds) {
            return GameStep::ReturnAnim;
        }
        self.teleport.reset();
        GameStep::Result
    }

    fn update_result(&mut self, sounds: &mut SoundQueue) -> GameStep {
        let outcome = StageOutcome {
            stage_no: self.world.no,
            rescued: self.world.rescued_count() as u32,
            total: self.world.targets.len() as u32,
        };
        sounds.play(SoundCue::StageClear);
        self.log.push("STAGE CLEAR!");
        info!(
            stage = outcome.stage_no,
            rescued = outcome.rescued,
            total = outcome.total,
            "stage_result"
        );
        self.outcome = Some(outcome);
        self.finish(SceneKey::StageSelect)
    }

    fn finish(&mut self, next_scene: SceneKey) -> GameStep {
        self.next_scene = Some(next_scene);
        GameStep::End
    }

    /// Release-build fallback for broken internal state.
    fn recover(&mut self, what: &'static str) -> GameStep {
        invariant_violated(what);
        self.popup = None;
        self.pause_menu = None;
        if self.world.player.is_some() {
            GameStep::Idle
        } else {
            self.finish(SceneKey::StageSelect)
        }
    }

    fn enemy_in_room(&self, room: RoomCoord) -> Option<usize> {
        self.world.enemies.iter().position(|enemy| {
            self.unit_enabled(enemy.unit) && self.world.unit_room(enemy.unit) == Some(room)
        })
    }

    fn unrescued_target_in(&self, room: RoomCoord) -> Option<usize> {
        self.world.targets.iter().position(|target| {
            !target.rescued && self.world.unit_room(target.unit) == Some(room)
        })
    }

    fn unit_enabled(&self, id: UnitId) -> bool {
        self.world.actors.get(id).is_some_and(Unit::is_enable)
    }

    fn player_unit_mut(&mut self) -> Option<&mut Unit> {
        let id = self.world.player?;
        self.world.actors.get_mut(id)
    }

    fn follow_player(&mut self, dt_seconds: f32) {
        if let Some(position) = self.world.player_unit().map(Unit::position) {
            self.camera.set_target_center(position);
        }
        self.camera.update(dt_seconds);
    }

    fn render_banner(&self, draw: &mut DrawList) {
        draw.fill_rect(BANNER_AREA, PANEL);
        draw.outline_rect(BANNER_AREA, 2.0, PANEL_FRAME);
        draw.text(
            Vec2::new(BANNER_AREA.x + 20.0, BANNER_AREA.y + 28.0),
            format!("STAGE {}  {}", self.world.no, self.world.name),
            4,
            TEXT,
        );
        draw.text(
            Vec2::new(BANNER_AREA.x + 560.0, BANNER_AREA.y + 32.0),
            format!(
                "KEYS {}  RESCUED {}/{}",
                self.held_keys.count(),
                self.world.rescued_count(),
                self.world.targets.len()
            ),
            3,
            TEXT,
        );
        self.pause_button.render(draw);
        self.exit_button.render(draw);
    }

    fn render_map(&self, draw: &mut DrawList) {
        let view = WorldView::new(self.camera, MAP_AREA);
        let map = &self.world.map;
        draw.fill_rect(MAP_AREA, VOID);
        draw.push_clip(MAP_AREA);

        let chip = map.chip_size() as f32;
        for coord in map.coords() {
            let Some(room) = map.room(coord) else {
                continue;
            };
            let rect = view.world_rect_to_screen(map.room_bounds(coord));
            if room.passable().is_empty() {
                continue;
            }
            match &self.world.tileset {
                Some(key) => draw.sprite(key, Rect::new(0.0, 0.0, chip, chip), rect, false, FLOOR),
                None => draw.fill_rect(rect, FLOOR),
            }
            draw.outline_rect(rect, WALL_THICKNESS, WALL);
            for direction in Direction::ALL {
                if room.can_pass(direction) {
                    let color = if room.is_locked(direction) {
                        LOCKED_DOOR
                    } else {
                        FLOOR
                    };
                    draw.fill_rect(door_rect(rect, direction), color);
                }
            }
        }

        for item in self.world.items.iter().filter(|item| !item.is_owned()) {
            let rect = view.world_rect_to_screen(Rect::from_center(item.position, KEY_SIZE, KEY_SIZE));
            draw.sprite(
                item.kind.sprite_key(),
                Rect::new(0.0, 0.0, 16.0, 16.0),
                rect,
                false,
                KEY_COLOR,
            );
        }

        for target in &self.world.targets {
            self.render_unit(&view, target.unit, TARGET_COLOR, draw);
        }
        for enemy in &self.world.enemies {
            self.render_unit(&view, enemy.unit, ENEMY_COLOR, draw);
        }
        if let Some(player) = self.world.player {
            self.render_unit(&view, player, PLAYER_COLOR, draw);
        }
        self.teleport.render(&view, draw);

        if self.game_over {
            draw.text_centered(MAP_AREA.center(), "GAME OVER", 10, GAME_OVER_COLOR);
        }
        draw.pop_clip();
    }

    fn render_unit(&self, view: &WorldView, id: UnitId, fallback: Color, draw: &mut DrawList) {
        let Some(unit) = self.world.actors.get(id).filter(|unit| unit.is_enable()) else {
            return;
        };
        let (source, size) = match unit.current_frame() {
            Some(frame) => (
                Rect::new(frame.x as f32, frame.y as f32, frame.w as f32, frame.h as f32),
                Vec2::new(frame.w as f32, frame.h as f32),
            ),
            None => (
                Rect::new(0.0, 0.0, DEFAULT_UNIT_SIZE.x, DEFAULT_UNIT_SIZE.y),
                DEFAULT_UNIT_SIZE,
            ),
        };
        let dest = view.world_rect_to_screen(Rect::from_center(unit.position(), size.x, size.y));
        match unit.sprite() {
            Some(key) => draw.sprite(key, source, dest, unit.is_mirrored(), fallback),
            None => draw.fill_rect(dest, fallback),
        }
    }

    fn render_log(&self, draw: &mut DrawList) {
        draw.fill_rect(LOG_AREA, PANEL);
        draw.outline_rect(LOG_AREA, 2.0, PANEL_FRAME);
        for (row, line) in self.log.lines().enumerate() {
            draw.text(
                Vec2::new(LOG_AREA.x + 20.0, LOG_AREA.y + 16.0 + row as f32 * 36.0),
                line,
                4,
                TEXT,
            );
        }
    }

    fn render_controller(&self, draw: &mut DrawList) {
        draw.fill_circle(CONTROLLER, PANEL);
        draw.outline_circle(CONTROLLER, 2.0, PANEL_FRAME);
        for (_, button) in &self.controls {
            button.render(draw);
        }
    }
}

impl Scene for GameScene {
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_>,
    ) -> SceneCommand {
        self.tick(fixed_dt_seconds, input, ctx.sounds);
        if self.step != GameStep::End {
            return SceneCommand::None;
        }
        if let Some(outcome) = self.outcome.take() {
            record_stage_outcome(&ctx.data.paths.cache_dir, outcome);
        }
        match self.next_scene.take() {
            Some(scene) => {
                ctx.data.next_scene = scene;
                SceneCommand::ChangeTo {
                    scene,
                    transition: DEFAULT_TRANSITION,
                }
            }
            None => SceneCommand::None,
        }
    }

    fn render(&self, _data: &SceneData, draw: &mut DrawList) {
        draw.fill_rect(
            Rect::new(0.0, 0.0, CANVAS_WIDTH as f32, CANVAS_HEIGHT as f32),
            BACKGROUND,
        );
        self.render_banner(draw);
        self.render_map(draw);
        self.render_log(draw);
        self.render_controller(draw);
        if let Some(popup) = &self.popup {
            popup.render(draw);
        }
        if let Some(menu) = &self.pause_menu {
            menu.render(draw);
        }
    }

    fn debug_title(&self) -> Option<String> {
        Some(format!(
            "Rescue Dungeon | stage {} | {} | {}",
            self.world.no,
            self.step.name(),
            self.log.last().unwrap_or("")
        ))
    }
}

fn controller_buttons() -> [(Direction, Button); 4] {
    let center = CONTROLLER.center;
    let control = |dx: f32, dy: f32, label: &str, hotkey: InputAction| {
        Button::circle(
            Circle::new(center.x + dx, center.y + dy, CONTROL_RADIUS),
            label,
        )
        .with_hotkey(hotkey)
    };
    [
        (Direction::Up, control(0.0, -70.0, "UP", InputAction::MoveUp)),
        (Direction::Down, control(0.0, 60.0, "DN", InputAction::MoveDown)),
        (Direction::Left, control(-70.0, 0.0, "LT", InputAction::MoveLeft)),
        (Direction::Right, control(70.0, 0.0, "RT", InputAction::MoveRight)),
    ]
}

fn door_rect(room: Rect, direction: Direction) -> Rect {
    let span = room.w * 0.3;
    let depth = WALL_THICKNESS + 2.0;
    let center = room.center();
    match direction {
        Direction::Up => Rect::new(center.x - span * 0.5, room.y - 1.0, span, depth),
        Direction::Down => Rect::new(center.x - span * 0.5, room.bottom() - depth + 1.0, span, depth),
        Direction::Left => Rect::new(room.x - 1.0, center.y - span * 0.5, depth, span),
        Direction::Right => Rect::new(room.right() - depth + 1.0, center.y - span * 0.5, depth, span),
    }
}

fn invariant_violated(what: &'static str) {
    if cfg!(debug_assertions) {
        panic!("game scene invariant violated: {what}");
    }
    error!(what, "game_scene_invariant_violated");
}
