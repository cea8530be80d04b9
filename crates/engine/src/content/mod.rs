mod atomic_io;
mod compiler;
mod database;
mod hashing;
mod manifest;
mod pipeline;
mod planner;
mod types;

pub use atomic_io::{write_bytes_atomic, write_text_atomic};
pub use compiler::{compile_stage_database, ContentCompileError, ContentErrorCode, SourceLocation};
pub use database::{
    ActorSpawnDef, AnimFrameDef, EnemySpawnDef, KeySpawnDef, RoomDef, StageDatabase, StageDef,
    DEFAULT_CHIP_SIZE,
};
pub use pipeline::{build_or_load_stage_database, ContentPipelineError};
pub use planner::build_compile_plan;
pub use types::{
    CompileAction, CompilePlan, CompileReason, ContentPlanError, ContentPlanRequest, Direction,
    PatrolPattern, Route,
};
