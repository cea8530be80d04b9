use engine::Direction;

use super::room::RoomCoord;

/// GameScene states. Popup states carry the data they act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GameStep {
    Assign,
    Idle,
    Move,
    Pause,
    UseKeyPopup { room: RoomCoord, direction: Direction },
    RescuePopup { target: usize },
    ReturnPopup,
    CommonPopup,
    GameOver,
    RescueAnim,
    ReturnAnim,
    Result,
    End,
}

impl GameStep {
    pub(crate) fn name(self) -> &'static str {
        match self {
            GameStep::Assign => "assign",
            GameStep::Idle => "idle",
            GameStep::Move => "move",
            GameStep::Pause => "pause",
            GameStep::UseKeyPopup { .. } => "use_key_popup",
            GameStep::RescuePopup { .. } => "rescue_popup",
            GameStep::ReturnPopup => "return_popup",
            GameStep::CommonPopup => "common_popup",
            GameStep::GameOver => "game_over",
            GameStep::RescueAnim => "rescue_anim",
            GameStep::ReturnAnim => "return_anim",
            GameStep::Result => "result",
            GameStep::End => "end",
        }
    }

    pub(crate) fn is_popup(self) -> bool {
        matches!(
            self,
            GameStep::UseKeyPopup { .. }
                | GameStep::RescuePopup { .. }
                | GameStep::ReturnPopup
                | GameStep::CommonPopup
        )
    }
}
