use crate::math::{TileCoord, Vec2};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use thiserror::Error;

/// Shared handle to a tilemap. Overlay components (collider, health,
/// texture connector, item dropper) each hold one of these.
pub type SharedTilemap<T> = Rc<RefCell<Tilemap<T>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(pub u64);

/// Change notification: the map after the write, the cell that changed
/// (`TileCoord::WHOLE_MAP` when the entire grid was replaced or resized),
/// and the previous value of that cell (default for whole-grid changes).
///
/// Callbacks must read the map through the reference they are handed.
/// Re-entrant writes to the same map from inside a callback are
/// unsupported: the subscriber set is detached while dispatching, so such
/// writes fire no notifications. Writes to *other* maps cascade normally.
pub type ChangeCallback<T> = Box<dyn FnMut(&Tilemap<T>, TileCoord, &T)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TilemapError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
}

/// JSON shape of a serialized tilemap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TilemapDef<T> {
    pub dimensions: [i32; 2],
    pub tile_scale: [f32; 2],
    pub tile_data: Vec<T>,
}

pub struct Tilemap<T> {
    width: i32,
    height: i32,
    cells: Vec<T>,
    origin: Vec2,
    tile_scale: Vec2,
    subscribers: BTreeMap<SubscriberId, ChangeCallback<T>>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for Tilemap<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tilemap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("cells", &self.cells)
            .field("origin", &self.origin)
            .field("tile_scale", &self.tile_scale)
            .finish_non_exhaustive()
    }
}

impl<T> Tilemap<T> {
    pub fn new(width: i32, height: i32) -> Result<Self, TilemapError>
    where
        T: Default + Clone,
    {
        if width < 0 || height < 0 {
            return Err(TilemapError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            cells: vec![T::default(); (width * height) as usize],
            origin: Vec2::ZERO,
            tile_scale: Vec2::new(1.0, 1.0),
            subscribers: BTreeMap::new(),
        })
    }

    /// A 0x0 grid, typically resized later.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            cells: Vec::new(),
            origin: Vec2::ZERO,
            tile_scale: Vec2::new(1.0, 1.0),
            subscribers: BTreeMap::new(),
        }
    }

    pub fn from_def(def: TilemapDef<T>, origin: Vec2) -> Result<Self, TilemapError> {
        let [width, height] = def.dimensions;
        if width < 0 || height < 0 {
            return Err(TilemapError::InvalidDimensions { width, height });
        }
        let expected = (width * height) as usize;
        let actual = def.tile_data.len();
        if expected != actual {
            return Err(TilemapError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            cells: def.tile_data,
            origin,
            tile_scale: Vec2::new(def.tile_scale[0], def.tile_scale[1]),
            subscribers: BTreeMap::new(),
        })
    }

    pub fn to_def(&self) -> TilemapDef<T>
    where
        T: Clone,
    {
        TilemapDef {
            dimensions: [self.width, self.height],
            tile_scale: [self.tile_scale.x, self.tile_scale.y],
            tile_data: self.cells.clone(),
        }
    }

    pub fn into_shared(self) -> SharedTilemap<T> {
        Rc::new(RefCell::new(self))
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Vec2) {
        self.origin = origin;
    }

    pub fn tile_scale(&self) -> Vec2 {
        self.tile_scale
    }

    pub fn set_tile_scale(&mut self, tile_scale: Vec2) {
        self.tile_scale = tile_scale;
    }

    pub fn in_bounds(&self, coord: TileCoord) -> bool {
        coord.x >= 0 && coord.x < self.width && coord.y >= 0 && coord.y < self.height
    }

    pub fn index_of(&self, coord: TileCoord) -> Option<usize> {
        if !self.in_bounds(coord) {
            return None;
        }
        Some(coord.y as usize * self.width as usize + coord.x as usize)
    }

    pub fn get(&self, coord: TileCoord) -> Option<&T> {
        self.index_of(coord).and_then(|index| self.cells.get(index))
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// Writes one cell. Out-of-bounds coordinates are ignored. Subscribers
    /// are notified synchronously, and only when the value actually changed.
    pub fn set(&mut self, coord: TileCoord, value: T)
    where
        T: PartialEq,
    {
        let Some(index) = self.index_of(coord) else {
            return;
        };
        if self.cells[index] == value {
            return;
        }
        let previous = std::mem::replace(&mut self.cells[index], value);
        self.dispatch(coord, &previous);
    }

    /// Replaces the whole grid in one write and fires a single whole-grid
    /// notification. The cell count must match the current dimensions.
    pub fn replace_all(&mut self, cells: Vec<T>) -> Result<(), TilemapError>
    where
        T: Default,
    {
        let expected = (self.width * self.height) as usize;
        if cells.len() != expected {
            return Err(TilemapError::TileCountMismatch {
                expected,
                actual: cells.len(),
            });
        }
        self.cells = cells;
        self.dispatch(TileCoord::WHOLE_MAP, &T::default());
        Ok(())
    }

    /// Reinitializes the grid to the new dimensions with default cells and
    /// fires a whole-grid notification.
    pub fn resize(&mut self, width: i32, height: i32) -> Result<(), TilemapError>
    where
        T: Default + Clone,
    {
        if width < 0 || height < 0 {
            return Err(TilemapError::InvalidDimensions { width, height });
        }
        self.width = width;
        self.height = height;
        self.cells = vec![T::default(); (width * height) as usize];
        self.dispatch(TileCoord::WHOLE_MAP, &T::default());
        Ok(())
    }

    /// Registers a change callback under the given id, replacing any
    /// callback already registered under it. Callbacks run in ascending id
    /// order.
    pub fn subscribe(&mut self, id: SubscriberId, callback: ChangeCallback<T>) {
        self.subscribers.insert(id, callback);
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.remove(&id);
    }

    fn dispatch(&mut self, coord: TileCoord, previous: &T) {
        if self.subscribers.is_empty() {
            return;
        }
        // Detached so callbacks can read the map through the argument while
        // the dispatch loop holds the callbacks mutably.
        let mut subscribers = std::mem::take(&mut self.subscribers);
        for callback in subscribers.values_mut() {
            callback(self, coord, previous);
        }
        self.subscribers = subscribers;
    }

    /// World position of the cell center. The grid hangs below and to the
    /// right of the origin: rows grow downward in world space.
    pub fn tile_to_world(&self, coord: TileCoord) -> Vec2 {
        Vec2 {
            x: self.origin.x + (coord.x as f32 + 0.5) * self.tile_scale.x,
            y: self.origin.y - (coord.y as f32 + 0.5) * self.tile_scale.y,
        }
    }

    /// Cell containing the world position, or `None` when the position is
    /// outside the grid.
    pub fn world_to_tile(&self, position: Vec2) -> Option<TileCoord> {
        let local_x = (position.x - self.origin.x) / self.tile_scale.x;
        let local_y = (position.y - self.origin.y) / -self.tile_scale.y;
        let coord = TileCoord::new(local_x.floor() as i32, local_y.floor() as i32);
        if self.in_bounds(coord) {
            Some(coord)
        } else {
            None
        }
    }
}
