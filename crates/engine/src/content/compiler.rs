use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use crate::validate_asset_key;

use super::database::{
    ActorSpawnDef, AnimFrameDef, EnemySpawnDef, KeySpawnDef, RoomDef, StageDatabase, StageDef,
    DEFAULT_CHIP_SIZE,
};
use super::hashing::collect_xml_files;
use super::types::{ContentPlanError, Direction, PatrolPattern, Route};

/// Largest grid side a stage may declare, in rooms.
const MAX_GRID_SIDE: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownElement,
    DuplicateField,
    MissingField,
    InvalidValue,
    InvalidAssetKey,
    DuplicateStage,
    RoomOutOfBounds,
    DuplicateRoom,
    LockedNotPassable,
    SpawnOutOfBounds,
    PatrolAxisMismatch,
    PatrolBoxedIn,
    NoStages,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

/// Compiles every stage table under `stages_dir`. Files are read in sorted
/// relative-path order; a stage number may only be defined once overall.
pub fn compile_stage_database(stages_dir: &Path) -> Result<StageDatabase, ContentCompileError> {
    let xml_files = collect_xml_files(stages_dir).map_err(|error| match error {
        ContentPlanError::ReadDir { path, source }
        | ContentPlanError::ReadDirEntry { path, source }
        | ContentPlanError::ReadFile { path, source } => read_error(path, source),
        other => ContentCompileError {
            code: ContentErrorCode::ReadFile,
            message: other.to_string(),
            file_path: stages_dir.to_path_buf(),
            location: None,
        },
    })?;

    let mut stages = BTreeMap::<u32, (StageDef, PathBuf)>::new();
    for xml_file in xml_files {
        let raw = fs::read_to_string(&xml_file.path)
            .map_err(|source| read_error(xml_file.path.clone(), source))?;
        let doc = parse_document(&xml_file.path, &raw)?;
        let ctx = ParseContext {
            file_path: &xml_file.path,
            doc: &doc,
        };
        for (stage, node) in parse_stages_root(&ctx)? {
            if let Some((_, first_file)) = stages.get(&stage.no) {
                return Err(ctx.error(
                    ContentErrorCode::DuplicateStage,
                    format!(
                        "stage {} is already defined in {}",
                        stage.no,
                        first_file.display()
                    ),
                    node,
                ));
            }
            stages.insert(stage.no, (stage, xml_file.path.clone()));
        }
    }

    if stages.is_empty() {
        return Err(ContentCompileError {
            code: ContentErrorCode::NoStages,
            message: "no <Stage> definitions found".to_string(),
            file_path: stages_dir.to_path_buf(),
            location: None,
        });
    }

    Ok(StageDatabase::from_stages(
        stages.into_values().map(|(stage, _)| stage).collect(),
    ))
}

fn parse_document<'input>(
    file_path: &Path,
    raw: &'input str,
) -> Result<Document<'input>, ContentCompileError> {
    Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })
}

struct ParseContext<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl<'a, 'input> ParseContext<'a, 'input> {
    fn error(
        &self,
        code: ContentErrorCode,
        message: String,
        node: Node<'_, '_>,
    ) -> ContentCompileError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentCompileError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn required_attr(&self, node: Node<'_, '_>, name: &str) -> Result<String, ContentCompileError> {
        node.attribute(name)
            .map(|value| value.trim().to_string())
            .ok_or_else(|| {
                self.error(
                    ContentErrorCode::MissingField,
                    format!(
                        "missing required attribute '{name}' on <{}>",
                        node.tag_name().name()
                    ),
                    node,
                )
            })
    }

    fn u32_attr(&self, node: Node<'_, '_>, name: &str) -> Result<u32, ContentCompileError> {
        let value = self.required_attr(node, name)?;
        value.parse::<u32>().map_err(|_| {
            self.error(
                ContentErrorCode::InvalidValue,
                format!("attribute '{name}' value '{value}' is not a non-negative integer"),
                node,
            )
        })
    }

    fn positive_u32_attr(
        &self,
        node: Node<'_, '_>,
        name: &str,
    ) -> Result<u32, ContentCompileError> {
        let value = self.u32_attr(node, name)?;
        if value == 0 {
            return Err(self.error(
                ContentErrorCode::InvalidValue,
                format!("attribute '{name}' must be greater than zero"),
                node,
            ));
        }
        Ok(value)
    }

    fn asset_key_attr(
        &self,
        node: Node<'_, '_>,
        name: &str,
    ) -> Result<Option<String>, ContentCompileError> {
        let Some(value) = node.attribute(name) else {
            return Ok(None);
        };
        self.asset_key(node, value.trim()).map(Some)
    }

    fn asset_key(&self, node: Node<'_, '_>, key: &str) -> Result<String, ContentCompileError> {
        validate_asset_key(key).map_err(|error| {
            self.error(
                ContentErrorCode::InvalidAssetKey,
                format!("invalid asset key '{key}': {error}"),
                node,
            )
        })?;
        Ok(key.to_string())
    }

    fn required_text(&self, node: Node<'_, '_>) -> Result<String, ContentCompileError> {
        let value = node.text().map(str::trim).unwrap_or_default().to_string();
        if value.is_empty() {
            return Err(self.error(
                ContentErrorCode::MissingField,
                format!("field <{}> must not be empty", node.tag_name().name()),
                node,
            ));
        }
        Ok(value)
    }

    fn route_attr(&self, node: Node<'_, '_>, name: &str) -> Result<Route, ContentCompileError> {
        Route::parse_list(node.attribute(name).unwrap_or_default()).map_err(|message| {
            self.error(
                ContentErrorCode::InvalidValue,
                format!("attribute '{name}': {message}"),
                node,
            )
        })
    }
}

fn parse_stages_root<'a, 'input>(
    ctx: &ParseContext<'a, 'input>,
) -> Result<Vec<(StageDef, Node<'a, 'input>)>, ContentCompileError> {
    let root = ctx.doc.root_element();
    if root.tag_name().name() != "Stages" {
        return Err(ctx.error(
            ContentErrorCode::InvalidRoot,
            "root element must be <Stages>".to_string(),
            root,
        ));
    }

    let mut stages = Vec::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "Stage" {
            return Err(ctx.error(
                ContentErrorCode::UnknownElement,
                format!(
                    "unsupported element <{}>; expected <Stage>",
                    child.tag_name().name()
                ),
                child,
            ));
        }
        stages.push((parse_stage(ctx, child)?, child));
    }
    Ok(stages)
}

struct GridDef {
    width: u32,
    height: u32,
    rooms: Vec<RoomDef>,
}

fn parse_stage(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<StageDef, ContentCompileError> {
    let no = ctx.u32_attr(node, "no")?;
    let mut seen_fields = HashSet::<String>::new();
    let mut name: Option<String> = None;
    let mut tileset: Option<String> = None;
    let mut chip_size: Option<u32> = None;
    let mut grid: Option<GridDef> = None;
    let mut player: Option<(ActorSpawnDef, Node<'_, '_>)> = None;
    let mut enemies = Vec::new();
    let mut targets = Vec::new();
    let mut keys = Vec::new();

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name();
        let singular = matches!(field_name, "name" | "tileset" | "chipSize" | "grid" | "player");
        if singular && !seen_fields.insert(field_name.to_string()) {
            return Err(ctx.error(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{field_name}> in stage {no}"),
                field,
            ));
        }

        match field_name {
            "name" => name = Some(ctx.required_text(field)?),
            "tileset" => {
                let key = ctx.required_text(field)?;
                tileset = Some(ctx.asset_key(field, &key)?);
            }
            "chipSize" => {
                let value = ctx.required_text(field)?;
                let parsed = value.parse::<u32>().ok().filter(|size| *size > 0);
                chip_size = Some(parsed.ok_or_else(|| {
                    ctx.error(
                        ContentErrorCode::InvalidValue,
                        format!("chipSize '{value}' must be a positive integer"),
                        field,
                    )
                })?);
            }
            "grid" => grid = Some(parse_grid(ctx, field)?),
            "player" => player = Some((parse_actor(ctx, field)?, field)),
            "enemy" => enemies.push((parse_enemy(ctx, field)?, field)),
            "target" => targets.push((parse_actor(ctx, field)?, field)),
            "key" => keys.push((
                KeySpawnDef {
                    x: ctx.u32_attr(field, "x")?,
                    y: ctx.u32_attr(field, "y")?,
                },
                field,
            )),
            _ => {
                return Err(ctx.error(
                    ContentErrorCode::UnknownElement,
                    format!("unknown field <{field_name}> in stage {no}"),
                    field,
                ))
            }
        }
    }

    let missing = |field: &str| {
        ctx.error(
            ContentErrorCode::MissingField,
            format!("missing required field <{field}> in stage {no}"),
            node,
        )
    };
    let name = name.ok_or_else(|| missing("name"))?;
    let grid = grid.ok_or_else(|| missing("grid"))?;
    let (player, player_node) = player.ok_or_else(|| missing("player"))?;

    let check_bounds = |x: u32, y: u32, what: &str, at: Node<'_, '_>| {
        if x >= grid.width || y >= grid.height {
            return Err(ctx.error(
                ContentErrorCode::SpawnOutOfBounds,
                format!(
                    "{what} at ({x},{y}) is outside the {}x{} grid",
                    grid.width, grid.height
                ),
                at,
            ));
        }
        Ok(())
    };
    check_bounds(player.x, player.y, "player", player_node)?;
    for (enemy, at) in &enemies {
        check_bounds(enemy.spawn.x, enemy.spawn.y, "enemy", *at)?;
        let patrol_axis_open = Direction::ALL.into_iter().any(|direction| {
            enemy.pattern.allows(direction)
                && opens_toward(&grid, enemy.spawn.x, enemy.spawn.y, direction)
        });
        if enemy.pattern != PatrolPattern::Stationary && !patrol_axis_open {
            return Err(ctx.error(
                ContentErrorCode::PatrolBoxedIn,
                format!(
                    "enemy at ({},{}) has no open door along its {:?} patrol",
                    enemy.spawn.x, enemy.spawn.y, enemy.pattern
                ),
                *at,
            ));
        }
    }
    for (target, at) in &targets {
        check_bounds(target.x, target.y, "target", *at)?;
    }
    for (key, at) in &keys {
        check_bounds(key.x, key.y, "key", *at)?;
    }

    Ok(StageDef {
        no,
        name,
        tileset,
        chip_size: chip_size.unwrap_or(DEFAULT_CHIP_SIZE),
        width: grid.width,
        height: grid.height,
        rooms: grid.rooms,
        player,
        enemies: enemies.into_iter().map(|(enemy, _)| enemy).collect(),
        targets: targets.into_iter().map(|(target, _)| target).collect(),
        keys: keys.into_iter().map(|(key, _)| key).collect(),
    })
}

/// Whether a unit could step from (x, y) toward `direction` right now: both
/// sides of the wall open and unlocked.
fn opens_toward(grid: &GridDef, x: u32, y: u32, direction: Direction) -> bool {
    let room_at = |x: u32, y: u32| grid.rooms[(y * grid.width + x) as usize];
    let here = room_at(x, y);
    if !here.passable.has(direction) || here.locked.has(direction) {
        return false;
    }
    let (dx, dy) = direction.delta();
    let (nx, ny) = (x as i64 + dx as i64, y as i64 + dy as i64);
    if nx < 0 || ny < 0 || nx >= grid.width as i64 || ny >= grid.height as i64 {
        return false;
    }
    let there = room_at(nx as u32, ny as u32);
    let back = direction.opposite();
    there.passable.has(back) && !there.locked.has(back)
}

fn parse_grid(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<GridDef, ContentCompileError> {
    let width = ctx.positive_u32_attr(node, "width")?;
    let height = ctx.positive_u32_attr(node, "height")?;
    if width > MAX_GRID_SIDE || height > MAX_GRID_SIDE {
        return Err(ctx.error(
            ContentErrorCode::InvalidValue,
            format!("grid {width}x{height} exceeds the {MAX_GRID_SIDE}x{MAX_GRID_SIDE} limit"),
            node,
        ));
    }
    let closed = RoomDef {
        passable: Route::empty(),
        locked: Route::empty(),
    };
    let mut rooms = vec![closed; width as usize * height as usize];
    let mut seen = HashSet::<(u32, u32)>::new();

    for room in node.children().filter(|child| child.is_element()) {
        if room.tag_name().name() != "room" {
            return Err(ctx.error(
                ContentErrorCode::UnknownElement,
                format!("unknown element <{}> in <grid>", room.tag_name().name()),
                room,
            ));
        }
        let x = ctx.u32_attr(room, "x")?;
        let y = ctx.u32_attr(room, "y")?;
        if x >= width || y >= height {
            return Err(ctx.error(
                ContentErrorCode::RoomOutOfBounds,
                format!("room ({x},{y}) is outside the {width}x{height} grid"),
                room,
            ));
        }
        if !seen.insert((x, y)) {
            return Err(ctx.error(
                ContentErrorCode::DuplicateRoom,
                format!("room ({x},{y}) is defined more than once"),
                room,
            ));
        }
        let passable = ctx.route_attr(room, "passable")?;
        let locked = ctx.route_attr(room, "locked")?;
        if !passable.contains(locked) {
            return Err(ctx.error(
                ContentErrorCode::LockedNotPassable,
                format!("room ({x},{y}) locks a direction that is not passable"),
                room,
            ));
        }
        rooms[(y * width + x) as usize] = RoomDef { passable, locked };
    }

    Ok(GridDef {
        width,
        height,
        rooms,
    })
}

fn parse_actor(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<ActorSpawnDef, ContentCompileError> {
    let x = ctx.u32_attr(node, "x")?;
    let y = ctx.u32_attr(node, "y")?;
    let sprite = ctx.asset_key_attr(node, "sprite")?;
    let mut frames = Vec::new();
    for frame in node.children().filter(|child| child.is_element()) {
        if frame.tag_name().name() != "frame" {
            return Err(ctx.error(
                ContentErrorCode::UnknownElement,
                format!(
                    "unknown element <{}> in <{}>",
                    frame.tag_name().name(),
                    node.tag_name().name()
                ),
                frame,
            ));
        }
        let seconds_text = ctx.required_attr(frame, "seconds")?;
        let seconds = seconds_text
            .parse::<f32>()
            .ok()
            .filter(|value| value.is_finite() && *value > 0.0)
            .ok_or_else(|| {
                ctx.error(
                    ContentErrorCode::InvalidValue,
                    format!("frame seconds '{seconds_text}' must be a positive number"),
                    frame,
                )
            })?;
        frames.push(AnimFrameDef {
            seconds,
            x: ctx.u32_attr(frame, "x")?,
            y: ctx.u32_attr(frame, "y")?,
            w: ctx.positive_u32_attr(frame, "w")?,
            h: ctx.positive_u32_attr(frame, "h")?,
        });
    }
    Ok(ActorSpawnDef {
        x,
        y,
        sprite,
        frames,
    })
}

fn parse_enemy(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<EnemySpawnDef, ContentCompileError> {
    let spawn = parse_actor(ctx, node)?;
    let pattern_text = ctx.required_attr(node, "pattern")?;
    let pattern = PatrolPattern::parse(&pattern_text).ok_or_else(|| {
        ctx.error(
            ContentErrorCode::InvalidValue,
            format!(
                "invalid pattern '{pattern_text}'; allowed values: Stationary, UpDown, LeftRight"
            ),
            node,
        )
    })?;
    let direction = match node.attribute("direction") {
        Some(text) => Direction::parse(text.trim()).ok_or_else(|| {
            ctx.error(
                ContentErrorCode::InvalidValue,
                format!("invalid direction '{text}'; allowed values: up, right, down, left"),
                node,
            )
        })?,
        None => default_patrol_direction(pattern),
    };
    if !pattern.allows(direction) {
        return Err(ctx.error(
            ContentErrorCode::PatrolAxisMismatch,
            format!("direction '{}' is not on the {pattern:?} axis", direction.name()),
            node,
        ));
    }
    Ok(EnemySpawnDef {
        spawn,
        pattern,
        direction,
    })
}

fn default_patrol_direction(pattern: PatrolPattern) -> Direction {
    match pattern {
        PatrolPattern::LeftRight => Direction::Right,
        PatrolPattern::Stationary | PatrolPattern::UpDown => Direction::Down,
    }
}

fn read_error(path: PathBuf, source: std::io::Error) -> ContentCompileError {
    ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read stage data: {source}"),
        file_path: path,
        location: None,
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const TUTORIAL: &str = r#"<Stages>
  <Stage no="0">
    <name>Tutorial</name>
    <grid width="2" height="3">
      <room x="0" y="0" passable="down"/>
      <room x="0" y="1" passable="up right down" locked="up"/>
      <room x="1" y="1" passable="left"/>
      <room x="0" y="2" passable="up"/>
    </grid>
    <player x="0" y="2" sprite="player">
      <frame seconds="0.2" x="128" y="64" w="16" h="32"/>
      <frame seconds="0.2" x="144" y="64" w="16" h="32"/>
    </player>
    <key x="1" y="1"/>
    <target x="0" y="0" sprite="villager"/>
  </Stage>
</Stages>"#;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent");
        }
        fs::write(path, content).expect("write file");
    }

    fn compile_single(xml: &str) -> Result<StageDatabase, ContentCompileError> {
        let temp = TempDir::new().expect("temp");
        write_file(&temp.path().join("stages.xml"), xml);
        compile_stage_database(temp.path())
    }

    fn stage_with(body: &str) -> String {
        format!(
            r#"<Stages><Stage no="1"><name>S</name><grid width="2" height="2"><room x="0" y="0" passable="right down"/><room x="1" y="0" passable="left down"/><room x="0" y="1" passable="up right"/><room x="1" y="1" passable="up left"/></grid>{body}</Stage></Stages>"#
        )
    }

    #[test]
    fn tutorial_compiles_with_full_grid_and_spawns() {
        let db = compile_single(TUTORIAL).expect("compile");
        let stage = db.stage(0).expect("stage 0");
        assert_eq!((stage.width, stage.height), (2, 3));
        assert_eq!(stage.chip_size, DEFAULT_CHIP_SIZE);
        assert_eq!(stage.rooms.len(), 6);

        let hub = stage.room(0, 1).expect("hub");
        assert_eq!(hub.passable, Route::UP | Route::RIGHT | Route::DOWN);
        assert_eq!(hub.locked, Route::UP);
        assert_eq!(stage.room(1, 0).expect("closed").passable, Route::empty());

        assert_eq!((stage.player.x, stage.player.y), (0, 2));
        assert_eq!(stage.player.sprite.as_deref(), Some("player"));
        assert_eq!(stage.player.frames.len(), 2);
        assert_eq!(stage.player.frames[1].x, 144);
        assert_eq!(stage.keys, vec![KeySpawnDef { x: 1, y: 1 }]);
        assert_eq!(stage.targets.len(), 1);
        assert!(stage.enemies.is_empty());
    }

    #[test]
    fn malformed_xml_reports_location() {
        let error = compile_single("<Stages>\n  <Stage no=\"0\">\n</Stages>").expect_err("error");
        assert_eq!(error.code, ContentErrorCode::XmlMalformed);
        assert!(error.location.is_some());
    }

    #[test]
    fn locked_direction_must_be_passable() {
        let xml = r#"<Stages><Stage no="0"><name>S</name><grid width="1" height="1"><room x="0" y="0" passable="up" locked="left"/></grid><player x="0" y="0"/></Stage></Stages>"#;
        let error = compile_single(xml).expect_err("error");
        assert_eq!(error.code, ContentErrorCode::LockedNotPassable);
        assert_eq!(error.location.map(|loc| loc.line), Some(1));
    }

    #[test]
    fn room_and_spawn_bounds_are_checked() {
        let xml = r#"<Stages><Stage no="0"><name>S</name><grid width="1" height="1"><room x="1" y="0"/></grid><player x="0" y="0"/></Stage></Stages>"#;
        assert_eq!(
            compile_single(xml).expect_err("room").code,
            ContentErrorCode::RoomOutOfBounds
        );

        let error = compile_single(&stage_with(r#"<player x="0" y="0"/><key x="0" y="2"/>"#))
            .expect_err("key");
        assert_eq!(error.code, ContentErrorCode::SpawnOutOfBounds);
        assert!(error.message.contains("key"));
    }

    #[test]
    fn oversized_grid_is_rejected_with_location() {
        let xml = r#"<Stages>
<Stage no="0"><name>S</name>
<grid width="70000" height="70000"><room x="0" y="0"/></grid>
<player x="0" y="0"/></Stage></Stages>"#;
        let error = compile_single(xml).expect_err("oversized");
        assert_eq!(error.code, ContentErrorCode::InvalidValue);
        assert_eq!(error.location.map(|loc| loc.line), Some(3));
        assert!(error.message.contains("70000x70000"), "{}", error.message);

        let wide = xml.replace(r#"width="70000" height="70000""#, r#"width="65" height="1""#);
        assert_eq!(
            compile_single(&wide).expect_err("wide").code,
            ContentErrorCode::InvalidValue
        );
        let max = xml.replace(r#"width="70000" height="70000""#, r#"width="64" height="64""#);
        compile_single(&max).expect("largest grid");
    }

    #[test]
    fn duplicate_room_and_duplicate_field_error() {
        let xml = r#"<Stages><Stage no="0"><name>S</name><grid width="1" height="1"><room x="0" y="0"/><room x="0" y="0"/></grid><player x="0" y="0"/></Stage></Stages>"#;
        assert_eq!(
            compile_single(xml).expect_err("room").code,
            ContentErrorCode::DuplicateRoom
        );

        let error = compile_single(&stage_with(r#"<player x="0" y="0"/><player x="1" y="0"/>"#))
            .expect_err("player");
        assert_eq!(error.code, ContentErrorCode::DuplicateField);
    }

    #[test]
    fn missing_player_and_unknown_elements_error() {
        let error = compile_single(&stage_with("")).expect_err("player");
        assert_eq!(error.code, ContentErrorCode::MissingField);
        assert!(error.message.contains("player"));

        let error = compile_single(&stage_with(r#"<player x="0" y="0"/><chest x="0" y="0"/>"#))
            .expect_err("chest");
        assert_eq!(error.code, ContentErrorCode::UnknownElement);
    }

    #[test]
    fn enemy_patterns_and_directions_are_validated() {
        let ok = compile_single(&stage_with(
            r#"<player x="0" y="0"/><enemy x="1" y="1" pattern="LeftRight"/><enemy x="1" y="0" pattern="UpDown" direction="up"/>"#,
        ))
        .expect("enemies");
        let stage = ok.stage(1).expect("stage");
        assert_eq!(stage.enemies[0].direction, Direction::Right);
        assert_eq!(stage.enemies[1].direction, Direction::Up);

        let error = compile_single(&stage_with(
            r#"<player x="0" y="0"/><enemy x="1" y="1" pattern="UpDown" direction="left"/>"#,
        ))
        .expect_err("axis");
        assert_eq!(error.code, ContentErrorCode::PatrolAxisMismatch);

        let error = compile_single(&stage_with(
            r#"<player x="0" y="0"/><enemy x="1" y="1" pattern="Diagonal"/>"#,
        ))
        .expect_err("pattern");
        assert_eq!(error.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn patrolling_enemy_needs_an_open_door_on_its_axis() {
        let xml = r#"<Stages><Stage no="0"><name>S</name><grid width="2" height="1"><room x="0" y="0" passable="right" locked="right"/><room x="1" y="0" passable="left"/></grid><player x="1" y="0"/><enemy x="0" y="0" pattern="LeftRight"/><enemy x="0" y="0" pattern="Stationary"/></Stage></Stages>"#;
        let error = compile_single(xml).expect_err("boxed in");
        assert_eq!(error.code, ContentErrorCode::PatrolBoxedIn);

        let unlocked = xml.replace(r#" locked="right""#, "");
        compile_single(&unlocked).expect("open door");
    }

    #[test]
    fn sprite_keys_and_frames_are_validated() {
        let error = compile_single(&stage_with(r#"<player x="0" y="0" sprite="../hero"/>"#))
            .expect_err("sprite");
        assert_eq!(error.code, ContentErrorCode::InvalidAssetKey);

        let error = compile_single(&stage_with(
            r#"<player x="0" y="0"><frame seconds="0" x="0" y="0" w="16" h="16"/></player>"#,
        ))
        .expect_err("frame");
        assert_eq!(error.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn duplicate_stage_across_files_errors() {
        let temp = TempDir::new().expect("temp");
        write_file(&temp.path().join("a.xml"), TUTORIAL);
        write_file(&temp.path().join("b").join("more.xml"), TUTORIAL);

        let error = compile_stage_database(temp.path()).expect_err("duplicate");
        assert_eq!(error.code, ContentErrorCode::DuplicateStage);
        assert!(error.file_path.ends_with("more.xml"));
    }

    #[test]
    fn stages_merge_across_files_in_number_order() {
        let temp = TempDir::new().expect("temp");
        write_file(&temp.path().join("a.xml"), &stage_with(r#"<player x="0" y="0"/>"#));
        write_file(&temp.path().join("b.xml"), TUTORIAL);

        let db = compile_stage_database(temp.path()).expect("compile");
        let numbers = db.stages().iter().map(|stage| stage.no).collect::<Vec<_>>();
        assert_eq!(numbers, vec![0, 1]);
    }

    #[test]
    fn shipped_stage_tables_compile() {
        let stages_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/stages");
        let db = compile_stage_database(&stages_dir).expect("shipped stages");
        assert_eq!(db.stage(0).map(|stage| stage.name.as_str()), Some("Tutorial"));
        assert!(db.stages().iter().any(|stage| !stage.enemies.is_empty()));
    }

    #[test]
    fn wrong_root_and_empty_tables_error() {
        assert_eq!(
            compile_single("<Levels/>").expect_err("root").code,
            ContentErrorCode::InvalidRoot
        );
        assert_eq!(
            compile_single("<Stages/>").expect_err("empty").code,
            ContentErrorCode::NoStages
        );
    }
}
