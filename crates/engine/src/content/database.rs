use serde::{Deserialize, Serialize};

use super::types::{Direction, PatrolPattern, Route};

pub const DEFAULT_CHIP_SIZE: u32 = 16;

/// One frame of a cyclic animation: how long it shows and where it sits on the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimFrameDef {
    pub seconds: f32,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDef {
    pub passable: Route,
    pub locked: Route,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSpawnDef {
    pub x: u32,
    pub y: u32,
    pub sprite: Option<String>,
    pub frames: Vec<AnimFrameDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySpawnDef {
    pub spawn: ActorSpawnDef,
    pub pattern: PatrolPattern,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpawnDef {
    pub x: u32,
    pub y: u32,
}

/// Compiled description of one stage. `rooms` covers the full grid in
/// row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDef {
    pub no: u32,
    pub name: String,
    pub tileset: Option<String>,
    pub chip_size: u32,
    pub width: u32,
    pub height: u32,
    pub rooms: Vec<RoomDef>,
    pub player: ActorSpawnDef,
    pub enemies: Vec<EnemySpawnDef>,
    pub targets: Vec<ActorSpawnDef>,
    pub keys: Vec<KeySpawnDef>,
}

impl StageDef {
    pub fn room(&self, x: u32, y: u32) -> Option<&RoomDef> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.rooms.get((y * self.width + x) as usize)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDatabase {
    stages: Vec<StageDef>,
}

impl StageDatabase {
    pub fn from_stages(mut stages: Vec<StageDef>) -> Self {
        stages.sort_by_key(|stage| stage.no);
        Self { stages }
    }

    pub fn stage(&self, no: u32) -> Option<&StageDef> {
        self.stages
            .binary_search_by_key(&no, |stage| stage.no)
            .ok()
            .map(|index| &self.stages[index])
    }

    pub fn stages(&self) -> &[StageDef] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
