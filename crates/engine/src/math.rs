use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction; the zero vector stays zero.
    pub fn normalized(self) -> Self {
        let length = self.length();
        if length == 0.0 {
            return Self::ZERO;
        }
        Self {
            x: self.x / length,
            y: self.y / length,
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

/// Integer cell address within a tile grid. Negative coordinates are never
/// valid cells; `WHOLE_MAP` marks a change that covered the entire grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const WHOLE_MAP: Self = Self { x: -1, y: -1 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_whole_map(self) -> bool {
        self == Self::WHOLE_MAP
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub position: Vec2,
}

impl Transform {
    pub fn at(position: Vec2) -> Self {
        Self { position }
    }
}

/// Shared, mutable transform handle. Components that follow an entity's
/// position (pathfinder targets, tilemap owners) hold one of these.
pub type TransformHandle = Rc<RefCell<Transform>>;

pub fn transform_handle(position: Vec2) -> TransformHandle {
    Rc::new(RefCell::new(Transform::at(position)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_zero_vector_stays_zero() {
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
    }

    #[test]
    fn normalized_has_unit_length() {
        let v = Vec2::new(3.0, -4.0).normalized();
        assert!((v.length() - 1.0).abs() < 1e-6);
        assert!((v.x - 0.6).abs() < 1e-6);
        assert!((v.y + 0.8).abs() < 1e-6);
    }

    #[test]
    fn whole_map_sentinel_is_minus_one_minus_one() {
        assert_eq!(TileCoord::WHOLE_MAP, TileCoord::new(-1, -1));
        assert!(TileCoord::WHOLE_MAP.is_whole_map());
        assert!(!TileCoord::new(0, 0).is_whole_map());
    }

    #[test]
    fn transform_handle_is_shared() {
        let handle = transform_handle(Vec2::new(1.0, 2.0));
        let alias = handle.clone();
        alias.borrow_mut().position.x = 5.0;
        assert_eq!(handle.borrow().position, Vec2::new(5.0, 2.0));
    }
}
