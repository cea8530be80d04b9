use engine::{
    ContentPlanRequest, LoopConfig, Scene, SceneBuildError, SceneKey, SceneRegistry,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::gameplay::{GameScene, StageBuildError};
use super::scenes::{LoadScene, StageSelectScene, TitleScene};

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) registry: SceneRegistry,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Rescue Dungeon Startup ===");

    let request = ContentPlanRequest {
        compiler_version: env!("CARGO_PKG_VERSION").to_string(),
        game_version: env!("CARGO_PKG_VERSION").to_string(),
    };
    AppWiring {
        config: LoopConfig::default(),
        registry: build_registry(request),
    }
}

/// Every scene key the game can enter, each built fresh on entry.
pub(crate) fn build_registry(request: ContentPlanRequest) -> SceneRegistry {
    let mut registry = SceneRegistry::new();
    registry.register(SceneKey::Load, move |_| {
        Ok(Box::new(LoadScene::new(request.clone())) as Box<dyn Scene>)
    });
    registry.register(SceneKey::Title, |_| {
        Ok(Box::new(TitleScene::new()) as Box<dyn Scene>)
    });
    registry.register(SceneKey::StageSelect, |data| {
        Ok(Box::new(StageSelectScene::new(data)) as Box<dyn Scene>)
    });
    registry.register(SceneKey::Game, |data| {
        GameScene::from_scene_data(data)
            .map(|scene| Box::new(scene) as Box<dyn Scene>)
            .map_err(game_build_error)
    });
    registry
}

fn game_build_error(error: StageBuildError) -> SceneBuildError {
    SceneBuildError::Failed {
        scene: SceneKey::Game,
        message: error.to_string(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use engine::{AppPaths, SceneData};

    use super::*;

    fn request() -> ContentPlanRequest {
        ContentPlanRequest {
            compiler_version: "test".to_string(),
            game_version: "test".to_string(),
        }
    }

    #[test]
    fn registry_covers_every_playable_scene() {
        let registry = build_registry(request());
        for key in [
            SceneKey::Load,
            SceneKey::Title,
            SceneKey::StageSelect,
            SceneKey::Game,
        ] {
            assert!(registry.contains(key), "{key:?}");
        }
        assert!(!registry.contains(SceneKey::Exit));
    }

    #[test]
    fn game_scene_needs_loaded_stages() {
        let registry = build_registry(request());
        let data = SceneData::new(
            AppPaths::from_root(std::path::Path::new("/game")),
            SceneKey::Title,
        );
        assert!(registry.build(SceneKey::Title, &data).is_ok());
        match registry.build(SceneKey::Game, &data) {
            Err(SceneBuildError::Failed { scene, message }) => {
                assert_eq!(scene, SceneKey::Game);
                assert!(message.contains("not been loaded"), "{message}");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("game scene built without stages"),
        }
    }
}
