mod field;

pub use field::{BuildInput, FlowField, Node, NodeKind};

use crate::math::{TileCoord, TransformHandle, Vec2};
use crate::tilemap::{SharedTilemap, SubscriberId, Tilemap};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::warn;

/// Target priority; lower variants pull paths harder. The stored per-node
/// weight is twice the variant value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Priority {
    #[default]
    Highest,
    High,
    Mid,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("priority out of range: {value} (expected 0..=3)")]
pub struct PriorityOutOfRange {
    pub value: u32,
}

impl TryFrom<u32> for Priority {
    type Error = PriorityOutOfRange;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Highest),
            1 => Ok(Self::High),
            2 => Ok(Self::Mid),
            3 => Ok(Self::Low),
            value => Err(PriorityOutOfRange { value }),
        }
    }
}

impl From<Priority> for u32 {
    fn from(priority: Priority) -> u32 {
        priority as u32
    }
}

impl Priority {
    fn node_weight(self) -> u32 {
        self as u32 * 2
    }
}

/// JSON shape of a pathfinder target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PathfinderTargetDef {
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// A destination the flow field converges on. Follows its transform; the
/// next build picks up position, priority, and activity changes.
pub struct PathfinderTarget {
    pub transform: TransformHandle,
    pub priority: Priority,
    pub active: bool,
}

impl PathfinderTarget {
    pub fn new(transform: TransformHandle, def: PathfinderTargetDef) -> Self {
        Self {
            transform,
            priority: def.priority,
            active: def.active,
        }
    }
}

/// JSON shape of the navigation source: the tile ids agents may stand on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PathfinderSource {
    #[serde(default)]
    pub walkables: Vec<i32>,
}

/// Flow-field pathfinder. Builds run on a background thread over a
/// snapshot of the grid and targets; queries always read the last finished
/// field, never a build in progress.
pub struct PathfindSystem {
    tilemap: Option<SharedTilemap<i32>>,
    subscription: Option<SubscriberId>,
    walkables: Vec<i32>,
    targets: Vec<Rc<RefCell<PathfinderTarget>>>,
    field: FlowField,
    done: Arc<AtomicBool>,
    dirty: Arc<AtomicBool>,
    worker: Option<JoinHandle<FlowField>>,
}

impl Default for PathfindSystem {
    fn default() -> Self {
        Self {
            tilemap: None,
            subscription: None,
            walkables: Vec::new(),
            targets: Vec::new(),
            field: FlowField::default(),
            done: Arc::new(AtomicBool::new(true)),
            dirty: Arc::new(AtomicBool::new(true)),
            worker: None,
        }
    }
}

impl PathfindSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the grid to navigate. Grid writes mark the field dirty through
    /// a subscription under the given id.
    pub fn set_active_tilemap(
        &mut self,
        tilemap: SharedTilemap<i32>,
        source: PathfinderSource,
        id: SubscriberId,
    ) {
        self.clear_active_tilemap();
        let dirty = self.dirty.clone();
        tilemap.borrow_mut().subscribe(
            id,
            Box::new(move |_map, _coord, _previous| {
                dirty.store(true, Ordering::Release);
            }),
        );
        self.tilemap = Some(tilemap);
        self.subscription = Some(id);
        self.walkables = source.walkables;
        self.mark_dirty();
    }

    pub fn clear_active_tilemap(&mut self) {
        if let (Some(tilemap), Some(id)) = (&self.tilemap, self.subscription.take()) {
            tilemap.borrow_mut().unsubscribe(id);
        }
        self.tilemap = None;
    }

    pub fn register_target(&mut self, target: Rc<RefCell<PathfinderTarget>>) {
        self.targets.push(target);
        self.mark_dirty();
    }

    pub fn clear_targets(&mut self) {
        self.targets.clear();
        self.mark_dirty();
    }

    /// Requests a rebuild on the next opportunity. Grid writes do this
    /// automatically; call it after moving or toggling targets.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn build_in_progress(&self) -> bool {
        !self.done.load(Ordering::Acquire)
    }

    /// Drives the worker: publishes a finished build and, when the field is
    /// dirty and a grid is bound, snapshots the inputs and starts the next
    /// build.
    pub fn tick(&mut self) {
        if !self.done.load(Ordering::Acquire) {
            return;
        }
        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(field) => self.field = field,
                Err(_) => warn!("flow field build thread panicked, keeping previous field"),
            }
        }
        let Some(tilemap) = &self.tilemap else {
            return;
        };
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return;
        }
        let input = snapshot(&tilemap.borrow(), &self.walkables, &self.targets);
        self.done.store(false, Ordering::Release);
        let done = self.done.clone();
        self.worker = Some(std::thread::spawn(move || {
            let field = input.build();
            done.store(true, Ordering::Release);
            field
        }));
    }

    /// Joins any outstanding build. Scene exit path.
    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(field) => self.field = field,
                Err(_) => warn!("flow field build thread panicked during shutdown"),
            }
        }
    }

    /// The last published field.
    pub fn field(&self) -> &FlowField {
        &self.field
    }

    /// Unit direction toward the nearest target from the given world
    /// position; zero when unbound, out of bounds, or undiscovered.
    pub fn direction_at(&self, position: Vec2) -> Vec2 {
        match self.node_for(position) {
            Some(node) => {
                Vec2::new(node.direction.0 as f32, node.direction.1 as f32).normalized()
            }
            None => Vec2::ZERO,
        }
    }

    /// Travel cost from the given world position to the nearest target, or
    /// -1 when unbound, out of bounds, or unreached.
    pub fn travel_distance_at(&self, position: Vec2) -> i32 {
        match self.node_for(position) {
            Some(node) => node.cost,
            None => -1,
        }
    }

    pub fn is_walkable(&self, position: Vec2) -> bool {
        match self.node_for(position) {
            Some(node) => node.kind != NodeKind::Unwalkable,
            None => false,
        }
    }

    fn node_for(&self, position: Vec2) -> Option<Node> {
        let tilemap = self.tilemap.as_ref()?;
        let coord = tilemap.borrow().world_to_tile(position)?;
        self.field.node_at(coord).copied()
    }
}

impl Drop for PathfindSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn snapshot(
    tilemap: &Tilemap<i32>,
    walkables: &[i32],
    targets: &[Rc<RefCell<PathfinderTarget>>],
) -> BuildInput {
    let width = tilemap.width();
    let walkable = tilemap
        .cells()
        .iter()
        .map(|id| walkables.contains(id))
        .collect();
    let mut seeds = Vec::with_capacity(targets.len());
    for target in targets {
        let target = target.borrow();
        if !target.active {
            continue;
        }
        let position = target.transform.borrow().position;
        if let Some(coord) = tilemap.world_to_tile(position) {
            seeds.push((
                (coord.y * width + coord.x) as usize,
                target.priority.node_weight(),
            ));
        }
    }
    BuildInput {
        width,
        height: tilemap.height(),
        walkable,
        seeds,
    }
}
