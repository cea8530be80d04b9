use engine::{ActorSpawnDef, AnimFrameDef, StageDatabase, StageDef, Vec2};
use thiserror::Error;

use super::actor::{Actors, Enemy, RescueTarget, Unit, UnitId};
use super::item::Item;
use super::room::{MapData, MapError, RoomCoord, RoomData};

pub(crate) const PLAYER_SPRITE: &str = "player";

#[derive(Debug, Error)]
pub(crate) enum StageBuildError {
    #[error("stage data has not been loaded")]
    NotLoaded,
    #[error("stage {0} does not exist")]
    UnknownStage(u32),
    #[error("stage {stage}: {source}")]
    Map {
        stage: u32,
        #[source]
        source: MapError,
    },
}

/// Everything the GameScene simulates for one stage.
#[derive(Debug, Clone)]
pub(crate) struct StageWorld {
    pub no: u32,
    pub name: String,
    pub tileset: Option<String>,
    pub map: MapData,
    pub actors: Actors,
    pub player: Option<UnitId>,
    pub enemies: Vec<Enemy>,
    pub targets: Vec<RescueTarget>,
    pub items: Vec<Item>,
}

impl StageWorld {
    pub(crate) fn from_database(
        stages: Option<&StageDatabase>,
        stage_no: u32,
    ) -> Result<Self, StageBuildError> {
        let stages = stages.ok_or(StageBuildError::NotLoaded)?;
        let def = stages
            .stage(stage_no)
            .ok_or(StageBuildError::UnknownStage(stage_no))?;
        Self::from_def(def)
    }

    pub(crate) fn from_def(def: &StageDef) -> Result<Self, StageBuildError> {
        let rooms = def.rooms.iter().map(RoomData::from).collect();
        let map = MapData::new(def.width, def.height, def.chip_size, rooms).map_err(|source| {
            StageBuildError::Map {
                stage: def.no,
                source,
            }
        })?;

        let mut actors = Actors::default();
        let player_frames = if def.player.frames.is_empty() {
            default_player_frames()
        } else {
            def.player.frames.clone()
        };
        let player_sprite = def
            .player
            .sprite
            .clone()
            .or_else(|| Some(PLAYER_SPRITE.to_string()));
        let player = actors.spawn(Unit::new(
            spawn_position(&map, def.player.x, def.player.y),
            player_sprite,
            player_frames,
        ));

        let enemies = def
            .enemies
            .iter()
            .map(|enemy| {
                let unit = actors.spawn(spawn_unit(&map, &enemy.spawn));
                if let Some(spawned) = actors.get_mut(unit) {
                    spawned.face(enemy.direction);
                }
                Enemy {
                    unit,
                    move_type: enemy.pattern,
                    move_direction: enemy.direction,
                }
            })
            .collect();

        let targets = def
            .targets
            .iter()
            .map(|target| RescueTarget {
                unit: actors.spawn(spawn_unit(&map, target)),
                rescued: false,
            })
            .collect();

        let items = def
            .keys
            .iter()
            .map(|key| {
                let room = RoomCoord::new(key.x as i32, key.y as i32);
                // Offset from the center so the key does not sit under a unit.
                let offset = map.room_size() * 0.25;
                Item::key(room, map.room_center(room) + Vec2::new(offset, offset))
            })
            .collect();

        Ok(Self {
            no: def.no,
            name: def.name.clone(),
            tileset: def.tileset.clone(),
            map,
            actors,
            player: Some(player),
            enemies,
            targets,
            items,
        })
    }

    pub(crate) fn player_unit(&self) -> Option<&Unit> {
        self.player.and_then(|id| self.actors.get(id))
    }

    pub(crate) fn player_room(&self) -> Option<RoomCoord> {
        self.player_unit()
            .map(|unit| self.map.room_coord_at(unit.position()))
    }

    pub(crate) fn unit_room(&self, id: UnitId) -> Option<RoomCoord> {
        self.actors
            .get(id)
            .map(|unit| self.map.room_coord_at(unit.position()))
    }

    pub(crate) fn rescued_count(&self) -> usize {
        self.targets.iter().filter(|target| target.rescued).count()
    }

    pub(crate) fn all_rescued(&self) -> bool {
        self.targets.iter().all(|target| target.rescued)
    }
}

fn spawn_position(map: &MapData, x: u32, y: u32) -> Vec2 {
    map.room_center(RoomCoord::new(x as i32, y as i32))
}

fn spawn_unit(map: &MapData, spawn: &ActorSpawnDef) -> Unit {
    Unit::new(
        spawn_position(map, spawn.x, spawn.y),
        spawn.sprite.clone(),
        spawn.frames.clone(),
    )
}

/// Four-frame walk cycle on the default character sheet.
pub(crate) fn default_player_frames() -> Vec<AnimFrameDef> {
    [128, 144, 160, 176]
        .into_iter()
        .map(|x| AnimFrameDef {
            seconds: 0.2,
            x,
            y: 64,
            w: 16,
            h: 32,
        })
        .collect()
}
