mod load;
mod stage_select;
mod title;

pub(crate) use load::LoadScene;
pub(crate) use stage_select::StageSelectScene;
pub(crate) use title::TitleScene;
