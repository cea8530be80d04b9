#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Select,
    Ok,
    Footstep,
    KeyPickup,
    Unlock,
    Teleport,
    GameOver,
    StageClear,
}

impl SoundCue {
    pub fn asset_key(self) -> &'static str {
        match self {
            SoundCue::Select => "se_select",
            SoundCue::Ok => "se_ok",
            SoundCue::Footstep => "se_footstep",
            SoundCue::KeyPickup => "se_key_pickup",
            SoundCue::Unlock => "se_unlock",
            SoundCue::Teleport => "se_teleport",
            SoundCue::GameOver => "se_game_over",
            SoundCue::StageClear => "se_stage_clear",
        }
    }
}

/// Cues raised during one tick, drained by the loop after the tick.
#[derive(Debug, Default)]
pub struct SoundQueue {
    cues: Vec<SoundCue>,
}

impl SoundQueue {
    pub fn play(&mut self, cue: SoundCue) {
        self.cues.push(cue);
    }

    pub fn pending(&self) -> &[SoundCue] {
        &self.cues
    }

    pub fn drain(&mut self) -> impl Iterator<Item = SoundCue> + '_ {
        self.cues.drain(..)
    }
}
