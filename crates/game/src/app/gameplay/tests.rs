use engine::{
    ActorSpawnDef, AppPaths, Direction, EnemySpawnDef, InputAction, InputSnapshot, KeySpawnDef,
    PatrolPattern, PopupStyle, RoomDef, Route, Scene, SceneCommand, SceneContext, SceneData,
    SceneKey, SoundCue, SoundQueue, StageDatabase, StageDef, Vec2, DEFAULT_CHIP_SIZE,
    DEFAULT_TRANSITION,
};
use tempfile::TempDir;

use super::game_scene::GameScene;
use super::pause::{PauseChoice, PauseMenu};
use super::room::RoomCoord;
use super::stage::{StageBuildError, StageWorld};
use super::step::GameStep;
use crate::app::progress::{progress_path, Progress};

const DT: f32 = 0.125;

fn room(passable: Route, locked: Route) -> RoomDef {
    RoomDef { passable, locked }
}

fn closed() -> RoomDef {
    room(Route::empty(), Route::empty())
}

fn spawn(x: u32, y: u32) -> ActorSpawnDef {
    ActorSpawnDef {
        x,
        y,
        sprite: None,
        frames: Vec::new(),
    }
}

fn enemy(x: u32, y: u32, pattern: PatrolPattern, direction: Direction) -> EnemySpawnDef {
    EnemySpawnDef {
        spawn: spawn(x, y),
        pattern,
        direction,
    }
}

fn stage(width: u32, height: u32, rooms: Vec<RoomDef>, player: ActorSpawnDef) -> StageDef {
    StageDef {
        no: 0,
        name: "Test".to_string(),
        tileset: None,
        chip_size: DEFAULT_CHIP_SIZE,
        width,
        height,
        rooms,
        player,
        enemies: Vec::new(),
        targets: Vec::new(),
        keys: Vec::new(),
    }
}

/// 2x3: (0,0) top room behind a door locked from the hub at (0,1), a side
/// room at (1,1) and the start room at (0,2).
fn tutorial() -> StageDef {
    stage(
        2,
        3,
        vec![
            room(Route::DOWN, Route::empty()),
            closed(),
            room(Route::UP | Route::RIGHT | Route::DOWN, Route::UP),
            room(Route::LEFT, Route::empty()),
            room(Route::UP, Route::empty()),
            closed(),
        ],
        spawn(0, 2),
    )
}

/// Three rooms in a row; the player starts on the left.
fn corridor(enemy_direction: Direction) -> StageDef {
    let mut def = stage(
        3,
        1,
        vec![
            room(Route::RIGHT, Route::empty()),
            room(Route::LEFT | Route::RIGHT, Route::empty()),
            room(Route::LEFT, Route::empty()),
        ],
        spawn(0, 0),
    );
    def.enemies
        .push(enemy(1, 0, PatrolPattern::LeftRight, enemy_direction));
    def
}

struct Harness {
    scene: GameScene,
    sounds: SoundQueue,
}

impl Harness {
    fn new(def: StageDef) -> Self {
        let world = StageWorld::from_def(&def).expect("stage");
        let mut harness = Self {
            scene: GameScene::new(world),
            sounds: SoundQueue::default(),
        };
        assert_eq!(harness.scene.step(), GameStep::Assign);
        assert_eq!(harness.idle(), GameStep::Idle);
        harness
    }

    fn tick(&mut self, input: InputSnapshot) -> GameStep {
        self.scene.tick(DT, &input, &mut self.sounds);
        self.scene.step()
    }

    fn idle(&mut self) -> GameStep {
        self.tick(InputSnapshot::empty())
    }

    fn press(&mut self, action: InputAction) -> GameStep {
        self.tick(InputSnapshot::empty().with_action_pressed(action))
    }

    fn settle(&mut self) -> GameStep {
        for _ in 0..20 {
            if self.idle() != GameStep::Move {
                break;
            }
        }
        self.scene.step()
    }

    fn walk(&mut self, action: InputAction) {
        assert_eq!(self.press(action), GameStep::Move, "walk {action:?}");
        assert_eq!(self.settle(), GameStep::Idle);
    }

    fn player_room(&self) -> RoomCoord {
        self.scene.world().player_room().expect("player")
    }

    fn enemy_room(&self, index: usize) -> RoomCoord {
        let enemy = self.scene.world().enemies[index];
        self.scene.world().unit_room(enemy.unit).expect("enemy")
    }

    fn heard(&mut self, cue: SoundCue) -> bool {
        self.sounds.drain().any(|heard| heard == cue)
    }

    fn popup_style(&self) -> PopupStyle {
        self.scene.popup().expect("popup").style()
    }

    fn popup_message(&self) -> &str {
        self.scene.popup().expect("popup").message()
    }
}

#[test]
fn moving_up_lands_on_the_room_center_and_returns_to_idle() {
    let mut h = Harness::new(tutorial());
    assert_eq!(h.player_room(), RoomCoord::new(0, 2));

    assert_eq!(h.press(InputAction::MoveUp), GameStep::Move);
    let player = h.scene.world().player_unit().expect("player");
    assert_eq!(player.target(), Vec2::new(40.0, 120.0));

    for _ in 0..3 {
        assert_eq!(h.idle(), GameStep::Move);
    }
    assert_eq!(h.idle(), GameStep::Idle);
    let player = h.scene.world().player_unit().expect("player");
    assert_eq!(player.position(), Vec2::new(40.0, 120.0));
    assert!(h.heard(SoundCue::Footstep));
}

#[test]
fn clicking_a_control_moves_like_its_key() {
    let mut h = Harness::new(tutorial());
    let up = h.scene.control_center(Direction::Up).expect("up control");
    assert_eq!(
        h.tick(InputSnapshot::empty().with_click_at(up)),
        GameStep::Move
    );
    assert!(h.heard(SoundCue::Select));
}

#[test]
fn walls_block_movement() {
    let mut h = Harness::new(tutorial());
    assert_eq!(h.press(InputAction::MoveRight), GameStep::Idle);
    assert_eq!(h.press(InputAction::MoveDown), GameStep::Idle);
    assert_eq!(h.player_room(), RoomCoord::new(0, 2));
    assert!(h.scene.popup().is_none());
}

#[test]
fn only_the_first_control_in_order_is_honored() {
    let mut h = Harness::new(tutorial());
    let input = InputSnapshot::empty()
        .with_action_pressed(InputAction::MoveRight)
        .with_action_pressed(InputAction::MoveUp);
    assert_eq!(h.tick(input), GameStep::Move);
    h.settle();
    assert_eq!(h.player_room(), RoomCoord::new(0, 1));
}

#[test]
fn locked_door_without_key_shows_notice_and_stays_put() {
    let mut h = Harness::new(tutorial());
    h.walk(InputAction::MoveUp);

    assert_eq!(h.press(InputAction::MoveUp), GameStep::CommonPopup);
    assert_eq!(h.popup_style(), PopupStyle::ONLY_OK);
    assert!(h.popup_message().contains("FIND A KEY"), "{}", h.popup_message());
    assert_eq!(h.scene.log().last(), Some("THE DOOR IS LOCKED."));

    assert_eq!(h.idle(), GameStep::CommonPopup);
    assert_eq!(h.press(InputAction::Confirm), GameStep::Idle);
    assert!(h.scene.popup().is_none());
    assert_eq!(h.player_room(), RoomCoord::new(0, 1));
}

#[test]
fn key_unlocks_the_door_without_moving_or_being_used_up() {
    let mut def = tutorial();
    def.keys.push(KeySpawnDef { x: 1, y: 1 });
    let mut h = Harness::new(def);
    h.walk(InputAction::MoveUp);
    h.walk(InputAction::MoveRight);

    assert_eq!(h.idle(), GameStep::Idle);
    assert_eq!(h.scene.held_keys().count(), 1);
    assert!(h.scene.world().items[0].is_owned());
    assert!(h.heard(SoundCue::KeyPickup));

    h.walk(InputAction::MoveLeft);
    let hub = RoomCoord::new(0, 1);
    assert_eq!(
        h.press(InputAction::MoveUp),
        GameStep::UseKeyPopup {
            room: hub,
            direction: Direction::Up
        }
    );
    assert_eq!(h.popup_style(), PopupStyle::YES_NO_CROSS);
    assert!(h.popup_message().contains("USE A KEY"), "{}", h.popup_message());
    assert_eq!(h.press(InputAction::Confirm), GameStep::Idle);
    assert!(h.heard(SoundCue::Unlock));

    let door = h.scene.world().map.room(hub).expect("hub");
    assert!(!door.is_locked(Direction::Up));
    assert!(door.passable().contains(door.locked()));
    assert_eq!(h.player_room(), hub);

    h.walk(InputAction::MoveUp);
    assert_eq!(h.player_room(), RoomCoord::new(0, 0));
    assert_eq!(h.scene.held_keys().count(), 1);
}

#[test]
fn declining_the_key_keeps_the_door_locked() {
    let mut def = tutorial();
    def.keys.push(KeySpawnDef { x: 0, y: 1 });
    let mut h = Harness::new(def);
    h.walk(InputAction::MoveUp);
    assert_eq!(h.idle(), GameStep::Idle);
    assert_eq!(h.scene.held_keys().count(), 1);

    assert!(matches!(
        h.press(InputAction::MoveUp),
        GameStep::UseKeyPopup { .. }
    ));
    assert_eq!(h.press(InputAction::Cancel), GameStep::Idle);
    let hub = h.scene.world().map.room(RoomCoord::new(0, 1)).expect("hub");
    assert!(hub.is_locked(Direction::Up));
}

#[test]
fn key_opens_a_door_locked_from_the_far_side() {
    // Start in the top room; its door down is locked on the hub's side.
    let mut def = tutorial();
    def.player = spawn(0, 0);
    def.keys.push(KeySpawnDef { x: 0, y: 0 });
    let mut h = Harness::new(def);
    h.idle();
    assert_eq!(h.scene.held_keys().count(), 1);

    let top = RoomCoord::new(0, 0);
    let hub = RoomCoord::new(0, 1);
    assert_eq!(
        h.press(InputAction::MoveDown),
        GameStep::UseKeyPopup {
            room: hub,
            direction: Direction::Up
        }
    );
    assert_eq!(h.press(InputAction::Confirm), GameStep::Idle);
    assert!(h.heard(SoundCue::Unlock));
    assert!(!h
        .scene
        .world()
        .map
        .room(hub)
        .expect("hub")
        .is_locked(Direction::Up));
    assert_eq!(h.player_room(), top);

    h.walk(InputAction::MoveDown);
    assert_eq!(h.player_room(), hub);
}

/// 1x2: the start room at (0,1) has a locked opening up into a closed room.
fn door_into_wall() -> StageDef {
    stage(
        1,
        2,
        vec![closed(), room(Route::UP, Route::UP)],
        spawn(0, 1),
    )
}

#[test]
fn locked_door_into_a_wall_still_asks_for_a_key() {
    let mut h = Harness::new(door_into_wall());
    assert_eq!(h.press(InputAction::MoveUp), GameStep::CommonPopup);
    assert!(h.popup_message().contains("FIND A KEY"), "{}", h.popup_message());
    assert_eq!(h.press(InputAction::Confirm), GameStep::Idle);

    let mut def = door_into_wall();
    def.keys.push(KeySpawnDef { x: 0, y: 1 });
    let mut h = Harness::new(def);
    h.idle();
    let start = RoomCoord::new(0, 1);
    assert_eq!(
        h.press(InputAction::MoveUp),
        GameStep::UseKeyPopup {
            room: start,
            direction: Direction::Up
        }
    );
    assert_eq!(h.press(InputAction::Confirm), GameStep::Idle);

    // Unlocked, but the far side is still a wall.
    assert_eq!(h.press(InputAction::MoveUp), GameStep::Idle);
    assert!(h.scene.popup().is_none());
    assert_eq!(h.player_room(), start);
}

#[test]
fn keys_are_picked_up_only_once() {
    let mut def = tutorial();
    def.keys.push(KeySpawnDef { x: 1, y: 1 });
    def.keys.push(KeySpawnDef { x: 1, y: 1 });
    let mut h = Harness::new(def);
    h.walk(InputAction::MoveUp);
    h.walk(InputAction::MoveRight);

    // First match per tick, in item order.
    h.idle();
    assert!(h.scene.world().items[0].is_owned());
    assert!(!h.scene.world().items[1].is_owned());
    h.idle();
    assert_eq!(h.scene.held_keys().count(), 2);
    h.sounds.drain().for_each(drop);

    h.walk(InputAction::MoveLeft);
    h.walk(InputAction::MoveRight);
    h.idle();
    assert_eq!(h.scene.held_keys().count(), 2);
    assert!(!h.heard(SoundCue::KeyPickup));
}

#[test]
fn rescuing_everyone_ends_the_stage_through_the_ok_popup() {
    let mut def = tutorial();
    def.targets.push(spawn(0, 1));
    let mut h = Harness::new(def);
    h.walk(InputAction::MoveUp);

    assert_eq!(h.idle(), GameStep::RescuePopup { target: 0 });
    assert_eq!(h.press(InputAction::Confirm), GameStep::RescueAnim);
    let target = h.scene.world().targets[0];
    assert!(target.rescued);
    assert!(!h
        .scene
        .world()
        .actors
        .get(target.unit)
        .expect("target")
        .is_enable());
    assert!(h.heard(SoundCue::Teleport));

    for _ in 0..6 {
        assert_eq!(h.idle(), GameStep::RescueAnim);
    }
    assert_eq!(h.idle(), GameStep::ReturnPopup);
    assert_eq!(h.popup_style(), PopupStyle::ONLY_OK);

    assert_eq!(h.press(InputAction::Confirm), GameStep::ReturnAnim);
    assert!(h.scene.world().player.is_none());
    for _ in 0..6 {
        assert_eq!(h.idle(), GameStep::ReturnAnim);
    }
    assert_eq!(h.idle(), GameStep::Result);
    assert_eq!(h.idle(), GameStep::End);
    assert_eq!(h.scene.next_scene(), Some(SceneKey::StageSelect));

    let outcome = h.scene.outcome().expect("outcome");
    assert_eq!((outcome.rescued, outcome.total), (1, 1));
    assert!(h.heard(SoundCue::StageClear));
}

#[test]
fn declined_rescue_waits_until_the_player_comes_back() {
    let mut def = tutorial();
    def.targets.push(spawn(0, 1));
    let mut h = Harness::new(def);
    h.walk(InputAction::MoveUp);

    assert_eq!(h.idle(), GameStep::RescuePopup { target: 0 });
    assert_eq!(h.press(InputAction::Cancel), GameStep::Idle);
    assert_eq!(h.idle(), GameStep::Idle);
    assert!(!h.scene.world().targets[0].rescued);

    h.walk(InputAction::MoveDown);
    h.walk(InputAction::MoveUp);
    assert_eq!(h.idle(), GameStep::RescuePopup { target: 0 });
}

#[test]
fn leaving_early_asks_first_and_records_partial_rescue() {
    let mut def = tutorial();
    def.targets.push(spawn(0, 0));
    let mut h = Harness::new(def);

    assert_eq!(h.press(InputAction::ExitStage), GameStep::ReturnPopup);
    assert_eq!(h.popup_style(), PopupStyle::YES_NO_CROSS);
    assert_eq!(h.press(InputAction::Cancel), GameStep::Idle);
    assert!(h.scene.world().player.is_some());

    assert_eq!(h.press(InputAction::ExitStage), GameStep::ReturnPopup);
    assert_eq!(h.press(InputAction::Confirm), GameStep::ReturnAnim);
    while h.idle() == GameStep::ReturnAnim {}
    assert_eq!(h.scene.step(), GameStep::Result);
    assert_eq!(h.idle(), GameStep::End);

    let outcome = h.scene.outcome().expect("outcome");
    assert_eq!((outcome.rescued, outcome.total), (0, 1));
}

#[test]
fn head_on_enemy_steps_aside_and_the_player_passes() {
    let mut h = Harness::new(corridor(Direction::Left));
    assert_eq!(h.press(InputAction::MoveRight), GameStep::Move);
    assert_eq!(h.settle(), GameStep::Idle);

    assert_eq!(h.player_room(), RoomCoord::new(1, 0));
    assert_eq!(h.enemy_room(0), RoomCoord::new(0, 0));
    // Settling against the west wall turns it around.
    assert_eq!(h.scene.world().enemies[0].move_direction, Direction::Right);
    assert_eq!(h.idle(), GameStep::Idle);
}

#[test]
fn enemy_walking_away_blocks_the_room() {
    let mut h = Harness::new(corridor(Direction::Right));
    assert_eq!(h.press(InputAction::MoveRight), GameStep::Idle);
    assert_eq!(h.player_room(), RoomCoord::new(0, 0));
    assert_eq!(h.enemy_room(0), RoomCoord::new(1, 0));
    assert!(!h.scene.world().actors.any_moving());
}

#[test]
fn enemies_patrol_on_every_player_move_and_turn_at_walls() {
    // Row 0 is the patrol lane, row 1 is where the player shuffles.
    let mut def = stage(
        3,
        2,
        vec![
            room(Route::RIGHT, Route::empty()),
            room(Route::LEFT | Route::RIGHT, Route::empty()),
            room(Route::LEFT, Route::empty()),
            closed(),
            room(Route::RIGHT, Route::empty()),
            room(Route::LEFT, Route::empty()),
        ],
        spawn(1, 1),
    );
    def.enemies
        .push(enemy(0, 0, PatrolPattern::LeftRight, Direction::Right));
    def.enemies
        .push(enemy(2, 0, PatrolPattern::Stationary, Direction::Left));
    let mut h = Harness::new(def);

    h.walk(InputAction::MoveRight);
    assert_eq!(h.enemy_room(0), RoomCoord::new(1, 0));
    assert_eq!(h.enemy_room(1), RoomCoord::new(2, 0));

    h.walk(InputAction::MoveLeft);
    assert_eq!(h.enemy_room(0), RoomCoord::new(2, 0));
    assert_eq!(h.scene.world().enemies[0].move_direction, Direction::Left);
    let patrol = h.scene.world().enemies[0].unit;
    assert!(h
        .scene
        .world()
        .actors
        .get(patrol)
        .expect("enemy")
        .is_mirrored());

    h.walk(InputAction::MoveRight);
    assert_eq!(h.enemy_room(0), RoomCoord::new(1, 0));
}

#[test]
fn walking_into_an_enemy_path_is_game_over() {
    let mut def = stage(
        3,
        2,
        vec![
            room(Route::RIGHT, Route::empty()),
            room(Route::LEFT | Route::RIGHT | Route::DOWN, Route::empty()),
            room(Route::LEFT, Route::empty()),
            closed(),
            room(Route::UP, Route::empty()),
            closed(),
        ],
        spawn(1, 1),
    );
    def.enemies
        .push(enemy(0, 0, PatrolPattern::LeftRight, Direction::Right));
    let mut h = Harness::new(def);

    assert_eq!(h.press(InputAction::MoveUp), GameStep::Move);
    assert_eq!(h.settle(), GameStep::Idle);
    assert_eq!(h.idle(), GameStep::GameOver);
    assert!(h.heard(SoundCue::GameOver));
    assert_eq!(h.idle(), GameStep::End);
    assert_eq!(h.scene.next_scene(), Some(SceneKey::StageSelect));
    assert!(h.scene.outcome().is_none());
}

#[test]
fn pause_suspends_play_until_closed() {
    let mut h = Harness::new(tutorial());
    assert_eq!(h.press(InputAction::Pause), GameStep::Pause);
    assert_eq!(h.press(InputAction::MoveUp), GameStep::Pause);
    assert_eq!(h.player_room(), RoomCoord::new(0, 2));

    assert_eq!(h.press(InputAction::Cancel), GameStep::Idle);
    assert_eq!(h.press(InputAction::MoveUp), GameStep::Move);
}

#[test]
fn pause_menu_can_leave_for_the_title() {
    let mut h = Harness::new(tutorial());
    assert_eq!(h.press(InputAction::Pause), GameStep::Pause);
    let title = PauseMenu::new()
        .button_center(PauseChoice::Title)
        .expect("title button");
    assert_eq!(
        h.tick(InputSnapshot::empty().with_click_at(title)),
        GameStep::End
    );
    assert_eq!(h.scene.next_scene(), Some(SceneKey::Title));
}

#[test]
fn finished_stage_changes_scene_and_saves_progress() {
    let temp = TempDir::new().expect("temp");
    let mut data = SceneData::new(AppPaths::from_root(temp.path()), SceneKey::Title);
    data.stages = Some(StageDatabase::default());
    let mut sounds = SoundQueue::default();
    let world = StageWorld::from_def(&tutorial()).expect("stage");
    let mut scene = GameScene::new(world);

    let mut step = |scene: &mut GameScene, input: InputSnapshot| {
        let mut ctx = SceneContext {
            data: &mut data,
            sounds: &mut sounds,
        };
        scene.update(DT, &input, &mut ctx)
    };

    step(&mut scene, InputSnapshot::empty());
    let exit = InputSnapshot::empty().with_action_pressed(InputAction::ExitStage);
    assert_eq!(step(&mut scene, exit), SceneCommand::None);
    // No targets at all counts as everyone rescued.
    assert_eq!(
        scene.popup().expect("popup").style(),
        PopupStyle::ONLY_OK
    );
    let confirm = InputSnapshot::empty().with_action_pressed(InputAction::Confirm);
    assert_eq!(step(&mut scene, confirm), SceneCommand::None);

    let mut command = SceneCommand::None;
    for _ in 0..20 {
        command = step(&mut scene, InputSnapshot::empty());
        if command != SceneCommand::None {
            break;
        }
    }
    assert_eq!(
        command,
        SceneCommand::ChangeTo {
            scene: SceneKey::StageSelect,
            transition: DEFAULT_TRANSITION,
        }
    );
    assert_eq!(
        step(&mut scene, InputSnapshot::empty()),
        SceneCommand::None
    );

    let progress = Progress::load(&progress_path(&temp.path().join("cache"))).expect("progress");
    let record = progress.record(0);
    assert!(record.cleared);
    assert_eq!(record.total_targets, 0);
}

#[test]
fn stage_world_requires_loaded_data_and_a_known_stage() {
    assert!(matches!(
        StageWorld::from_database(None, 0),
        Err(StageBuildError::NotLoaded)
    ));
    let empty = StageDatabase::default();
    assert!(matches!(
        StageWorld::from_database(Some(&empty), 4),
        Err(StageBuildError::UnknownStage(4))
    ));
}

#[test]
fn stage_world_places_everything_on_room_centers() {
    let mut def = tutorial();
    def.targets.push(spawn(0, 0));
    def.enemies
        .push(enemy(1, 1, PatrolPattern::Stationary, Direction::Left));
    let world = StageWorld::from_def(&def).expect("stage");

    assert_eq!(world.actors.len(), 3);
    assert_eq!(world.player_room(), Some(RoomCoord::new(0, 2)));
    let player = world.player_unit().expect("player");
    assert_eq!(player.current_frame().map(|frame| frame.x), Some(128));
    assert_eq!(player.sprite(), Some("player"));
    assert_eq!(world.unit_room(world.targets[0].unit), Some(RoomCoord::new(0, 0)));
    let enemy_unit = world.actors.get(world.enemies[0].unit).expect("enemy");
    assert!(enemy_unit.is_mirrored());
    assert!(!world.all_rescued());
}
