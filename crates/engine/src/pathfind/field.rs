use crate::math::TileCoord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Unwalkable,
    Undiscovered,
    Seen,
    Explored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Accumulated travel cost to the nearest target; -1 until discovered.
    pub cost: i32,
    /// Grid step toward the next node on the path, with y flipped into
    /// world orientation. `(0, 0)` at targets and undiscovered nodes.
    pub direction: (i32, i32),
    /// Priority weight inherited from the target that claimed this node.
    pub priority: u32,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            kind: NodeKind::Unwalkable,
            cost: -1,
            direction: (0, 0),
            priority: 0,
        }
    }
}

/// One finished pathfinding pass over a grid snapshot.
#[derive(Debug, Clone, Default)]
pub struct FlowField {
    width: i32,
    height: i32,
    nodes: Vec<Node>,
}

impl FlowField {
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn node_at(&self, coord: TileCoord) -> Option<&Node> {
        if coord.x < 0 || coord.x >= self.width || coord.y < 0 || coord.y >= self.height {
            return None;
        }
        self.nodes
            .get(coord.y as usize * self.width as usize + coord.x as usize)
    }
}

/// Everything a build needs, copied out of the live tilemap so the worker
/// thread never touches shared game state.
#[derive(Debug, Clone)]
pub struct BuildInput {
    pub width: i32,
    pub height: i32,
    /// Per cell, whether its tile id is in the walkable set.
    pub walkable: Vec<bool>,
    /// `(node index, stored priority weight)` per active in-bounds target.
    pub seeds: Vec<(usize, u32)>,
}

/// Neighbor order around a node: counter-clockwise starting from the left,
/// in grid orientation (y grows downward). Even entries are orthogonal,
/// odd entries diagonal.
const NEIGHBORS: [(i32, i32); 8] = [
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
];

impl BuildInput {
    /// Breadth-style sweep that relaxes each node's neighbors until no
    /// frontier remains. Orthogonal steps cost 10 and diagonal steps 14,
    /// both scaled by the claiming target's priority weight plus one.
    /// Diagonals are only taken when both flanking orthogonals are open,
    /// so paths never cut corners.
    pub fn build(&self) -> FlowField {
        let width = self.width;
        let height = self.height;
        let mut nodes: Vec<Node> = self
            .walkable
            .iter()
            .map(|open| Node {
                kind: if *open {
                    NodeKind::Undiscovered
                } else {
                    NodeKind::Unwalkable
                },
                ..Node::default()
            })
            .collect();

        for (index, priority) in &self.seeds {
            if let Some(node) = nodes.get_mut(*index) {
                node.kind = NodeKind::Seen;
                node.direction = (0, 0);
                node.cost = 0;
                node.priority = *priority;
            }
        }

        let mut found = true;
        while found {
            found = false;
            for y in 0..height {
                for x in 0..width {
                    let index = (y * width + x) as usize;
                    if nodes[index].kind != NodeKind::Seen {
                        continue;
                    }
                    nodes[index].kind = NodeKind::Explored;
                    found = true;
                    explore_neighbors(&mut nodes, width, height, x, y);
                }
            }
        }

        FlowField {
            width,
            height,
            nodes,
        }
    }
}

fn explore_neighbors(nodes: &mut [Node], width: i32, height: i32, x: i32, y: i32) {
    let index = (y * width + x) as usize;
    let cost = nodes[index].cost;
    let priority = nodes[index].priority;

    // Walk the neighbor ring, visiting a diagonal only after both of its
    // flanking orthogonals turned out open in this same visit.
    let mut k: i32 = 0;
    let mut previous_open = false;
    while k < 8 {
        let (dx, dy) = NEIGHBORS[k as usize];
        let nx = x + dx;
        let ny = y + dy;

        let this_open;
        if nx < 0 || ny < 0 || nx >= width || ny >= height {
            this_open = false;
        } else {
            let neighbor_index = (ny * width + nx) as usize;
            if nodes[neighbor_index].kind == NodeKind::Unwalkable {
                this_open = false;
            } else {
                this_open = true;
                let step = if k & 1 == 1 { 14 } else { 10 };
                let new_cost = cost + step * (priority as i32 + 1);
                let neighbor = &mut nodes[neighbor_index];
                if neighbor.kind == NodeKind::Undiscovered || neighbor.cost > new_cost {
                    neighbor.kind = NodeKind::Seen;
                    neighbor.cost = new_cost;
                    // Points back at the current node, y flipped into world
                    // orientation.
                    neighbor.direction = (-dx, dy);
                    neighbor.priority = priority;
                }
            }
        }

        if k & 1 == 0 {
            // Orthogonal: if it and the previous orthogonal were both open,
            // step back to the diagonal between them.
            if this_open && previous_open {
                k -= 1;
            } else {
                k += 2;
            }
            previous_open = this_open;
        } else {
            // Diagonal: the next orthogonal was already established open,
            // skip it and the diagonal after it.
            k += 3;
        }

        // Wrap-around: the last diagonal sits between the final orthogonal
        // and the very first (left) neighbor.
        if k == 8
            && previous_open
            && x - 1 >= 0
            && nodes[index - 1].kind == NodeKind::Seen
        {
            k = 7;
        }
    }
}
