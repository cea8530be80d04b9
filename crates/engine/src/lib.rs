use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;
mod asset_keys;

pub use app::{
    run_app, text_size, AppError, Button, ButtonSound, Camera2D, Circle, Color, DrawCommand,
    DrawList, HitRegion, InputAction, InputSnapshot, LoopConfig, Popup, PopupButtons, PopupChoice,
    PopupStyle, Rect, Renderer, Scene, SceneBuildError, SceneCommand, SceneContext, SceneData,
    SceneKey, SceneRegistry, SoundCue, SoundQueue, Vec2, WorldView, CANVAS_HEIGHT, CANVAS_WIDTH,
    DEFAULT_TRANSITION,
};
pub use asset_keys::{validate_asset_key, AssetKeyError};
pub use content::{
    build_compile_plan, build_or_load_stage_database, compile_stage_database, write_bytes_atomic,
    write_text_atomic, ActorSpawnDef, AnimFrameDef, CompileAction, CompilePlan, CompileReason,
    ContentCompileError, ContentErrorCode, ContentPipelineError, ContentPlanError,
    ContentPlanRequest, Direction, EnemySpawnDef, KeySpawnDef, PatrolPattern, RoomDef, Route,
    SourceLocation, StageDatabase, StageDef, DEFAULT_CHIP_SIZE,
};

pub const ROOT_ENV_VAR: &str = "RESCUE_DUNGEON_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub stages_dir: PathBuf,
    pub sprites_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: &Path) -> Self {
        let assets = root.join("assets");
        Self {
            root: root.to_path_buf(),
            stages_dir: assets.join("stages"),
            sprites_dir: assets.join("sprites"),
            cache_dir: root.join("cache"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create cache directory at {path}: {source}")]
    CreateCacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "RESCUE_DUNGEON_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/rescue-dungeon\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let paths = AppPaths::from_root(&root);

    fs::create_dir_all(&paths.cache_dir).map_err(|source| StartupError::CreateCacheDir {
        path: paths.cache_dir.clone(),
        source,
    })?;

    Ok(paths)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
