use std::path::PathBuf;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }

    pub fn route(self) -> Route {
        match self {
            Direction::Up => Route::UP,
            Direction::Right => Route::RIGHT,
            Direction::Down => Route::DOWN,
            Direction::Left => Route::LEFT,
        }
    }

    /// Room-grid step; y grows downward.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    pub fn parse(name: &str) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|direction| direction.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
        }
    }
}

bitflags! {
    /// Set of room openings.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Route: u8 {
        const UP    = 1 << 0;
        const RIGHT = 1 << 1;
        const DOWN  = 1 << 2;
        const LEFT  = 1 << 3;
    }
}

impl Route {
    pub fn has(self, direction: Direction) -> bool {
        self.contains(direction.route())
    }

    /// Parses a list such as `"up right"` or `"up|left"`. Empty text is no route.
    pub fn parse_list(text: &str) -> Result<Route, String> {
        let mut route = Route::empty();
        for token in text
            .split(|ch: char| ch.is_whitespace() || ch == '|' || ch == ',')
            .filter(|token| !token.is_empty())
        {
            let direction =
                Direction::parse(token).ok_or_else(|| format!("unknown direction '{token}'"))?;
            route |= direction.route();
        }
        Ok(route)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatrolPattern {
    Stationary,
    UpDown,
    LeftRight,
}

impl PatrolPattern {
    pub fn parse(name: &str) -> Option<PatrolPattern> {
        match name {
            "Stationary" => Some(PatrolPattern::Stationary),
            "UpDown" => Some(PatrolPattern::UpDown),
            "LeftRight" => Some(PatrolPattern::LeftRight),
            _ => None,
        }
    }

    /// Whether `direction` lies on this pattern's axis. A stationary enemy
    /// accepts any facing.
    pub fn allows(self, direction: Direction) -> bool {
        match self {
            PatrolPattern::Stationary => true,
            PatrolPattern::UpDown => direction.is_vertical(),
            PatrolPattern::LeftRight => !direction.is_vertical(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentPlanRequest {
    pub compiler_version: String,
    pub game_version: String,
}

impl Default for ContentPlanRequest {
    fn default() -> Self {
        Self {
            compiler_version: "dev".to_string(),
            game_version: "dev".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileAction {
    UseCache,
    Compile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileReason {
    CacheValid,
    ManifestMissing,
    ManifestUnreadable,
    CacheFileMissing,
    FormatMismatch,
    VersionMismatch,
    InputHashMismatch,
}

#[derive(Debug, Clone)]
pub struct CompilePlan {
    pub source_dir: PathBuf,
    pub xml_file_count: usize,
    pub input_hash_sha256_hex: String,
    pub cache_path: PathBuf,
    pub manifest_path: PathBuf,
    pub action: CompileAction,
    pub reason: CompileReason,
}

#[derive(Debug, Error)]
pub enum ContentPlanError {
    #[error("stage directory does not exist: {path}")]
    StagesDirMissing { path: PathBuf },
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read directory entry in {path}: {source}")]
    ReadDirEntry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create cache layout at {path}: {source}")]
    CreateCacheLayout {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_an_involution_and_matches_delta() {
        for direction in Direction::ALL {
            assert_eq!(direction.opposite().opposite(), direction);
            let (dx, dy) = direction.delta();
            let (ox, oy) = direction.opposite().delta();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
    }

    #[test]
    fn route_list_parses_mixed_separators() {
        let route = Route::parse_list("up | Right,down").expect("route");
        assert_eq!(route, Route::UP | Route::RIGHT | Route::DOWN);
        assert!(route.has(Direction::Right));
        assert!(!route.has(Direction::Left));
        assert_eq!(Route::parse_list("  ").expect("empty"), Route::empty());
        assert!(Route::parse_list("up sideways").is_err());
    }

    #[test]
    fn patrol_axis_rules() {
        assert!(PatrolPattern::UpDown.allows(Direction::Down));
        assert!(!PatrolPattern::UpDown.allows(Direction::Left));
        assert!(PatrolPattern::LeftRight.allows(Direction::Right));
        assert!(!PatrolPattern::LeftRight.allows(Direction::Up));
        assert!(PatrolPattern::Stationary.allows(Direction::Up));
    }
}
