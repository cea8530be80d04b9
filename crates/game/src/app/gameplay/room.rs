use engine::{Direction, Rect, RoomDef, Route, Vec2};
use thiserror::Error;

/// Rooms are square, this many chips per side.
pub(crate) const ROOM_CHIPS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RoomData {
    passable: Route,
    locked: Route,
}

impl RoomData {
    pub(crate) fn new(passable: Route, locked: Route) -> Self {
        debug_assert!(passable.contains(locked), "locked door without an opening");
        Self {
            passable,
            locked: locked & passable,
        }
    }

    pub(crate) fn can_pass(&self, direction: Direction) -> bool {
        self.passable.has(direction)
    }

    pub(crate) fn is_locked(&self, direction: Direction) -> bool {
        self.locked.has(direction)
    }

    pub(crate) fn unlock(&mut self, direction: Direction) {
        self.locked.remove(direction.route());
    }

    pub(crate) fn passable(&self) -> Route {
        self.passable
    }

    #[cfg(test)]
    pub(crate) fn locked(&self) -> Route {
        self.locked
    }
}

impl From<&RoomDef> for RoomData {
    fn from(def: &RoomDef) -> Self {
        Self::new(def.passable, def.locked)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RoomCoord {
    pub x: i32,
    pub y: i32,
}

impl RoomCoord {
    pub(crate) const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub(crate) fn step(self, direction: Direction) -> RoomCoord {
        let (dx, dy) = direction.delta();
        RoomCoord::new(self.x + dx, self.y + dy)
    }
}

/// Outcome of trying to cross from one room into its neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Travel {
    Open(RoomCoord),
    /// The door bit that blocks the way: the room holding it and the side it sits on.
    Locked {
        room: RoomCoord,
        direction: Direction,
    },
    Blocked,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum MapError {
    #[error("map must be at least 1x1, got {width}x{height}")]
    Empty { width: u32, height: u32 },
    #[error("chip size must be positive")]
    ZeroChipSize,
    #[error("map {width}x{height} needs {expected} rooms, got {actual}")]
    RoomCountMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct MapData {
    width: u32,
    height: u32,
    chip_size: u32,
    rooms: Vec<RoomData>,
}

impl MapData {
    /// `rooms` is the full grid in row-major order.
    pub(crate) fn new(
        width: u32,
        height: u32,
        chip_size: u32,
        rooms: Vec<RoomData>,
    ) -> Result<Self, MapError> {
        if width == 0 || height == 0 {
            return Err(MapError::Empty { width, height });
        }
        if chip_size == 0 {
            return Err(MapError::ZeroChipSize);
        }
        let expected = (width * height) as usize;
        if rooms.len() != expected {
            return Err(MapError::RoomCountMismatch {
                width,
                height,
                expected,
                actual: rooms.len(),
            });
        }
        Ok(Self {
            width,
            height,
            chip_size,
            rooms,
        })
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn chip_size(&self) -> u32 {
        self.chip_size
    }

    pub(crate) fn room_size(&self) -> f32 {
        (self.chip_size * ROOM_CHIPS) as f32
    }

    pub(crate) fn contains(&self, coord: RoomCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as u32) < self.width
            && (coord.y as u32) < self.height
    }

    fn index(&self, coord: RoomCoord) -> Option<usize> {
        self.contains(coord)
            .then(|| coord.y as usize * self.width as usize + coord.x as usize)
    }

    pub(crate) fn room(&self, coord: RoomCoord) -> Option<&RoomData> {
        self.index(coord).map(|index| &self.rooms[index])
    }

    pub(crate) fn room_mut(&mut self, coord: RoomCoord) -> Option<&mut RoomData> {
        self.index(coord).map(move |index| &mut self.rooms[index])
    }

    pub(crate) fn coords(&self) -> impl Iterator<Item = RoomCoord> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| RoomCoord::new(x, y)))
    }

    pub(crate) fn room_center(&self, coord: RoomCoord) -> Vec2 {
        let size = self.room_size();
        Vec2::new(
            size * 0.5 + size * coord.x as f32,
            size * 0.5 + size * coord.y as f32,
        )
    }

    pub(crate) fn room_coord_at(&self, position: Vec2) -> RoomCoord {
        let size = self.room_size();
        RoomCoord::new(
            (position.x / size).floor() as i32,
            (position.y / size).floor() as i32,
        )
    }

    pub(crate) fn room_bounds(&self, coord: RoomCoord) -> Rect {
        let size = self.room_size();
        Rect::new(size * coord.x as f32, size * coord.y as f32, size, size)
    }

    /// Both sides of the shared wall must have an opening. A lock on the
    /// leaving side is reported before the far side is looked at.
    pub(crate) fn travel(&self, from: RoomCoord, direction: Direction) -> Travel {
        let Some(current) = self.room(from) else {
            return Travel::Blocked;
        };
        if !current.can_pass(direction) {
            return Travel::Blocked;
        }
        if current.is_locked(direction) {
            return Travel::Locked {
                room: from,
                direction,
            };
        }
        let to = from.step(direction);
        let back = direction.opposite();
        let Some(next) = self.room(to) else {
            return Travel::Blocked;
        };
        if !next.can_pass(back) {
            return Travel::Blocked;
        }
        if next.is_locked(back) {
            return Travel::Locked {
                room: to,
                direction: back,
            };
        }
        Travel::Open(to)
    }

    pub(crate) fn unlock(&mut self, coord: RoomCoord, direction: Direction) -> bool {
        match self.room_mut(coord) {
            Some(room) => {
                room.unlock(direction);
                true
            }
            None => false,
        }
    }
}
