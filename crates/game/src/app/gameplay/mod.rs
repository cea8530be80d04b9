mod actor;
mod game_scene;
mod item;
mod message_log;
mod pause;
mod room;
mod stage;
mod step;
mod teleport;

pub(crate) use game_scene::GameScene;
pub(crate) use stage::StageBuildError;

#[cfg(test)]
mod tests;
