use std::thread::{self, JoinHandle};

use engine::{
    build_or_load_stage_database, AppPaths, Color, ContentPipelineError, ContentPlanRequest,
    DrawList, InputAction, InputSnapshot, Rect, Scene, SceneCommand, SceneContext, SceneData,
    SceneKey, StageDatabase, Vec2, CANVAS_HEIGHT, CANVAS_WIDTH, DEFAULT_TRANSITION,
};
use tracing::{error, info};

const COMPILE_THREAD_NAME: &str = "stage-compile";
const DOT_INTERVAL_SECONDS: f32 = 0.3;
const MAX_DOTS: usize = 3;

const BACKGROUND: Color = [0, 0, 0, 255];
const CAPTION: Color = [230, 230, 230, 255];
const FAILURE: Color = [240, 90, 90, 255];

type CompileJob = JoinHandle<Result<StageDatabase, ContentPipelineError>>;

enum LoadStep {
    Start,
    Compiling(CompileJob),
    Finished,
    Failed(String),
}

impl LoadStep {
    fn name(&self) -> &'static str {
        match self {
            LoadStep::Start => "Start",
            LoadStep::Compiling(_) => "Compiling",
            LoadStep::Finished => "Finished",
            LoadStep::Failed(_) => "Failed",
        }
    }
}

/// Compiles or loads the stage tables on a worker thread, then hands over
/// to `SceneData::next_scene`.
pub(crate) struct LoadScene {
    request: ContentPlanRequest,
    step: LoadStep,
    elapsed_seconds: f32,
}

impl LoadScene {
    pub(crate) fn new(request: ContentPlanRequest) -> Self {
        Self {
            request,
            step: LoadStep::Start,
            elapsed_seconds: 0.0,
        }
    }

    fn spawn_compile(&self, paths: &AppPaths) -> LoadStep {
        let paths = paths.clone();
        let request = self.request.clone();
        let spawned = thread::Builder::new()
            .name(COMPILE_THREAD_NAME.to_string())
            .spawn(move || build_or_load_stage_database(&paths, &request));
        match spawned {
            Ok(job) => {
                info!(
                    compiler_version = %self.request.compiler_version,
                    game_version = %self.request.game_version,
                    "stage_compile_started"
                );
                LoadStep::Compiling(job)
            }
            Err(err) => {
                error!(error = %err, "stage_compile_spawn_failed");
                LoadStep::Failed(format!("failed to start stage compile: {err}"))
            }
        }
    }

    fn finish_compile(job: CompileJob, data: &mut SceneData) -> (LoadStep, SceneCommand) {
        match job.join() {
            Ok(Ok(database)) => {
                info!(stages = database.len(), "stage_database_ready");
                data.stages = Some(database);
                let command = if data.next_scene == SceneKey::Load {
                    SceneCommand::None
                } else {
                    SceneCommand::ChangeTo {
                        scene: data.next_scene,
                        transition: DEFAULT_TRANSITION,
                    }
                };
                (LoadStep::Finished, command)
            }
            Ok(Err(err)) => {
                error!(error = %err, "stage_compile_failed");
                (LoadStep::Failed(err.to_string()), SceneCommand::None)
            }
            Err(_) => {
                error!("stage_compile_panicked");
                (
                    LoadStep::Failed("stage compile thread panicked".to_string()),
                    SceneCommand::None,
                )
            }
        }
    }

    fn caption(&self) -> String {
        let dots = (self.elapsed_seconds / DOT_INTERVAL_SECONDS) as usize % (MAX_DOTS + 1);
        format!("LOADING{}", ".".repeat(dots))
    }

    #[cfg(test)]
    fn step_name(&self) -> &'static str {
        self.step.name()
    }
}

impl Scene for LoadScene {
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_>,
    ) -> SceneCommand {
        self.elapsed_seconds += fixed_dt_seconds;
        let step = std::mem::replace(&mut self.step, LoadStep::Finished);
        let (next, command) = match step {
            LoadStep::Start => (self.spawn_compile(&ctx.data.paths), SceneCommand::None),
            LoadStep::Compiling(job) if !job.is_finished() => {
                (LoadStep::Compiling(job), SceneCommand::None)
            }
            LoadStep::Compiling(job) => Self::finish_compile(job, ctx.data),
            LoadStep::Finished => (LoadStep::Finished, SceneCommand::None),
            LoadStep::Failed(message) => {
                let command = if input.was_pressed(InputAction::Confirm) {
                    SceneCommand::ChangeTo {
                        scene: SceneKey::Exit,
                        transition: DEFAULT_TRANSITION,
                    }
                } else {
                    SceneCommand::None
                };
                (LoadStep::Failed(message), command)
            }
        };
        self.step = next;
        command
    }

    fn render(&self, _data: &SceneData, draw: &mut DrawList) {
        draw.fill_rect(
            Rect::new(0.0, 0.0, CANVAS_WIDTH as f32, CANVAS_HEIGHT as f32),
            BACKGROUND,
        );
        let center = Vec2::new(CANVAS_WIDTH as f32 * 0.5, CANVAS_HEIGHT as f32 * 0.5);
        match &self.step {
            LoadStep::Failed(message) => {
                draw.text_centered(
                    Vec2::new(center.x, center.y - 80.0),
                    "FAILED TO LOAD STAGES",
                    5,
                    FAILURE,
                );
                for (row, line) in message.lines().enumerate() {
                    draw.text_centered(
                        Vec2::new(center.x, center.y + row as f32 * 24.0),
                        line.to_uppercase(),
                        2,
                        CAPTION,
                    );
                }
                draw.text_centered(
                    Vec2::new(center.x, center.y + 160.0),
                    "PRESS ENTER TO QUIT",
                    3,
                    CAPTION,
                );
            }
            _ => draw.text_centered(center, self.caption(), 5, CAPTION),
        }
    }

    fn debug_title(&self) -> Option<String> {
        Some(format!("Rescue Dungeon | load | {}", self.step.name()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::{Duration, Instant};

    use engine::SoundQueue;
    use tempfile::TempDir;

    use super::*;

    const STAGES_XML: &str = r#"<Stages>
  <Stage no="0">
    <name>Tutorial</name>
    <grid width="1" height="2">
      <room x="0" y="0" passable="down"/>
      <room x="0" y="1" passable="up"/>
    </grid>
    <player x="0" y="1"/>
    <target x="0" y="0"/>
  </Stage>
</Stages>
"#;

    fn scene_data(temp: &TempDir, next_scene: SceneKey) -> SceneData {
        SceneData::new(AppPaths::from_root(temp.path()), next_scene)
    }

    fn request() -> ContentPlanRequest {
        ContentPlanRequest {
            compiler_version: "test".to_string(),
            game_version: "test".to_string(),
        }
    }

    fn run_until_settled(scene: &mut LoadScene, data: &mut SceneData) -> SceneCommand {
        let mut sounds = SoundQueue::default();
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let mut ctx = SceneContext {
                data: &mut *data,
                sounds: &mut sounds,
            };
            let command = scene.update(0.016, &InputSnapshot::empty(), &mut ctx);
            if !matches!(scene.step, LoadStep::Start | LoadStep::Compiling(_)) {
                return command;
            }
            assert!(Instant::now() < deadline, "stage compile did not finish");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn compiles_stages_and_hands_over_to_next_scene() {
        let temp = TempDir::new().expect("temp");
        let paths = AppPaths::from_root(temp.path());
        fs::create_dir_all(&paths.stages_dir).expect("stages dir");
        fs::write(paths.stages_dir.join("stages.xml"), STAGES_XML).expect("write xml");

        let mut data = scene_data(&temp, SceneKey::Title);
        let mut scene = LoadScene::new(request());
        let command = run_until_settled(&mut scene, &mut data);

        assert_eq!(scene.step_name(), "Finished");
        assert_eq!(
            command,
            SceneCommand::ChangeTo {
                scene: SceneKey::Title,
                transition: DEFAULT_TRANSITION,
            }
        );
        let stages = data.stages.as_ref().expect("stages stored");
        assert_eq!(stages.len(), 1);
        assert!(stages.stage(0).is_some());
    }

    #[test]
    fn stays_put_when_next_scene_is_load() {
        let temp = TempDir::new().expect("temp");
        let paths = AppPaths::from_root(temp.path());
        fs::create_dir_all(&paths.stages_dir).expect("stages dir");
        fs::write(paths.stages_dir.join("stages.xml"), STAGES_XML).expect("write xml");

        let mut data = scene_data(&temp, SceneKey::Load);
        let mut scene = LoadScene::new(request());
        assert_eq!(run_until_settled(&mut scene, &mut data), SceneCommand::None);
        assert!(data.stages.is_some());
    }

    #[test]
    fn failure_waits_for_confirm_then_exits() {
        let temp = TempDir::new().expect("temp");
        let paths = AppPaths::from_root(temp.path());
        fs::create_dir_all(&paths.stages_dir).expect("stages dir");
        fs::write(paths.stages_dir.join("broken.xml"), "<Stages>").expect("write xml");

        let mut data = scene_data(&temp, SceneKey::Title);
        let mut scene = LoadScene::new(request());
        assert_eq!(run_until_settled(&mut scene, &mut data), SceneCommand::None);
        assert_eq!(scene.step_name(), "Failed");
        assert!(data.stages.is_none());

        let mut sounds = SoundQueue::default();
        let mut ctx = SceneContext {
            data: &mut data,
            sounds: &mut sounds,
        };
        assert_eq!(
            scene.update(0.016, &InputSnapshot::empty(), &mut ctx),
            SceneCommand::None
        );
        let confirm = InputSnapshot::empty().with_action_pressed(InputAction::Confirm);
        assert_eq!(
            scene.update(0.016, &confirm, &mut ctx),
            SceneCommand::ChangeTo {
                scene: SceneKey::Exit,
                transition: DEFAULT_TRANSITION,
            }
        );
    }

    #[test]
    fn caption_cycles_dots() {
        let mut scene = LoadScene::new(request());
        assert_eq!(scene.caption(), "LOADING");
        scene.elapsed_seconds = 0.65;
        assert_eq!(scene.caption(), "LOADING..");
        scene.elapsed_seconds = 1.25;
        assert_eq!(scene.caption(), "LOADING");
    }
}
