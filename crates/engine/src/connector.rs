use crate::math::TileCoord;
use crate::tilemap::{SharedTilemap, SubscriberId, Tilemap};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// JSON shape of the texture connector. Each corner table has eight
/// entries, indexed by the 3-bit neighbor mask for that corner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextureConnectorDef {
    pub first_tile_offset: i32,
    pub textures_per_tile: i32,
    pub top_left_textures: [i32; 8],
    pub top_right_textures: [i32; 8],
    pub bottom_left_textures: [i32; 8],
    pub bottom_right_textures: [i32; 8],
}

/// Neighbor offset triple and output-cell offset per corner, in the order
/// top-left, top-right, bottom-left, bottom-right. Mask bit i corresponds
/// to offset i; a bit is set when that neighbor is in bounds and holds the
/// same tile id.
const CORNERS: [([(i32, i32); 3], (i32, i32)); 4] = [
    ([(0, -1), (-1, -1), (-1, 0)], (0, 0)),
    ([(1, 0), (1, -1), (0, -1)], (1, 0)),
    ([(-1, 0), (-1, 1), (0, 1)], (0, 1)),
    ([(0, 1), (1, 1), (1, 0)], (1, 1)),
];

struct ConnectorShared {
    def: TextureConnectorDef,
    output: SharedTilemap<i32>,
}

impl ConnectorShared {
    fn corner_tables(&self) -> [&[i32; 8]; 4] {
        [
            &self.def.top_left_textures,
            &self.def.top_right_textures,
            &self.def.bottom_left_textures,
            &self.def.bottom_right_textures,
        ]
    }

    /// Writes the four output cells belonging to one source cell.
    fn repaint_cell(&self, source: &Tilemap<i32>, coord: TileCoord, output: &mut Tilemap<i32>) {
        let Some(tile_id) = source.get(coord).copied() else {
            return;
        };
        for ((offsets, (out_x, out_y)), table) in CORNERS.iter().zip(self.corner_tables()) {
            let out_coord = TileCoord::new(coord.x * 2 + out_x, coord.y * 2 + out_y);
            if tile_id == -1 {
                output.set(out_coord, -1);
                continue;
            }
            let mut mask = 0usize;
            for (bit, (dx, dy)) in offsets.iter().enumerate() {
                let neighbor = TileCoord::new(coord.x + dx, coord.y + dy);
                if source.get(neighbor) == Some(&tile_id) {
                    mask |= 1 << bit;
                }
            }
            let value =
                self.def.first_tile_offset + tile_id * self.def.textures_per_tile + table[mask];
            output.set(out_coord, value);
        }
    }

    fn rebuild_all(&self, source: &Tilemap<i32>) {
        let mut output = self.output.borrow_mut();
        let (out_width, out_height) = (source.width() * 2, source.height() * 2);
        if output.width() != out_width || output.height() != out_height {
            // Dimensions are non-negative because the source's are.
            let _ = output.resize(out_width, out_height);
        }
        for y in 0..source.height() {
            for x in 0..source.width() {
                self.repaint_cell(source, TileCoord::new(x, y), &mut output);
            }
        }
    }

    /// A single-cell change can flip corner masks in the 3x3 block around
    /// it, so repaint that whole block (clamped to the grid).
    fn repaint_neighborhood(&self, source: &Tilemap<i32>, coord: TileCoord) {
        let mut output = self.output.borrow_mut();
        for y in (coord.y - 1).max(0)..=(coord.y + 1).min(source.height() - 1) {
            for x in (coord.x - 1).max(0)..=(coord.x + 1).min(source.width() - 1) {
                self.repaint_cell(source, TileCoord::new(x, y), &mut output);
            }
        }
    }
}

/// Autotiler: renders an id grid into a 2x-resolution texture-index grid,
/// picking each quadrant's texture from the corner tables by how the cell's
/// neighbors connect to it.
pub struct TilemapTextureConnector {
    source: SharedTilemap<i32>,
    shared: Rc<ConnectorShared>,
    subscription: Option<SubscriberId>,
}

impl TilemapTextureConnector {
    pub fn new(source: SharedTilemap<i32>, def: TextureConnectorDef) -> Self {
        Self {
            source,
            shared: Rc::new(ConnectorShared {
                def,
                output: Tilemap::empty().into_shared(),
            }),
            subscription: None,
        }
    }

    /// The generated texture-index grid.
    pub fn output(&self) -> SharedTilemap<i32> {
        self.shared.output.clone()
    }

    /// Builds the output from the current source and starts tracking
    /// changes under the given subscriber id.
    pub fn connect(&mut self, id: SubscriberId) {
        self.shared.rebuild_all(&self.source.borrow());
        let shared = self.shared.clone();
        self.source.borrow_mut().subscribe(
            id,
            Box::new(move |source, coord, _previous| {
                if coord.is_whole_map() {
                    shared.rebuild_all(source);
                } else {
                    shared.repaint_neighborhood(source, coord);
                }
            }),
        );
        self.subscription = Some(id);
    }

    pub fn disconnect(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.source.borrow_mut().unsubscribe(id);
        }
    }

    /// Re-parents the connector onto a different source grid: drops the old
    /// subscription, binds the new grid, and rebuilds the output.
    pub fn rebind(&mut self, source: SharedTilemap<i32>) {
        let id = self.subscription.take();
        if let Some(id) = id {
            self.source.borrow_mut().unsubscribe(id);
        }
        self.source = source;
        if let Some(id) = id {
            self.connect(id);
        } else {
            self.shared.rebuild_all(&self.source.borrow());
        }
    }
}

impl Drop for TilemapTextureConnector {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: [i32; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

    fn identity_def() -> TextureConnectorDef {
        TextureConnectorDef {
            first_tile_offset: 100,
            textures_per_tile: 24,
            top_left_textures: IDENTITY,
            top_right_textures: IDENTITY,
            bottom_left_textures: IDENTITY,
            bottom_right_textures: IDENTITY,
        }
    }

    fn connected(cells: Vec<i32>, width: i32, height: i32) -> TilemapTextureConnector {
        let mut map = Tilemap::new(width, height).expect("tilemap");
        map.replace_all(cells).expect("cells");
        let mut connector = TilemapTextureConnector::new(map.into_shared(), identity_def());
        connector.connect(SubscriberId(2));
        connector
    }

    fn output_at(connector: &TilemapTextureConnector, x: i32, y: i32) -> i32 {
        *connector
            .output()
            .borrow()
            .get(TileCoord::new(x, y))
            .expect("output cell")
    }

    #[test]
    fn output_is_twice_the_source_resolution() {
        let connector = connected(vec![0; 6], 3, 2);
        let output = connector.output();
        assert_eq!(output.borrow().width(), 6);
        assert_eq!(output.borrow().height(), 4);
    }

    #[test]
    fn two_by_one_edge_masks() {
        // [5, 5]: the top-right corner of cell (0,0) sees only its east
        // neighbor in bounds, mask 0b001.
        let connector = connected(vec![5, 5], 2, 1);
        assert_eq!(output_at(&connector, 1, 0), 100 + 5 * 24 + 1);
        // Top-left corner of (0,0): all three neighbors out of bounds.
        assert_eq!(output_at(&connector, 0, 0), 100 + 5 * 24);
        // Top-left corner of (1,0): only the west neighbor, bit 2.
        assert_eq!(output_at(&connector, 2, 0), 100 + 5 * 24 + 4);
    }

    #[test]
    fn uniform_interior_cells_use_full_masks() {
        let connector = connected(vec![2; 9], 3, 3);
        // Every corner of the center cell has all three neighbors equal.
        for (x, y) in [(2, 2), (3, 2), (2, 3), (3, 3)] {
            assert_eq!(output_at(&connector, x, y), 100 + 2 * 24 + 7);
        }
    }

    #[test]
    fn empty_cells_produce_empty_output() {
        let connector = connected(vec![-1, 3], 2, 1);
        assert_eq!(output_at(&connector, 0, 0), -1);
        assert_eq!(output_at(&connector, 1, 0), -1);
        assert_eq!(output_at(&connector, 0, 1), -1);
        assert_eq!(output_at(&connector, 1, 1), -1);
        assert_ne!(output_at(&connector, 2, 0), -1);
    }

    #[test]
    fn differing_ids_do_not_connect() {
        let connector = connected(vec![1, 2], 2, 1);
        // Top-right corner of (0,0): east neighbor present but different id.
        assert_eq!(output_at(&connector, 1, 0), 100 + 24);
    }

    #[test]
    fn cell_change_repaints_the_neighborhood() {
        let mut map = Tilemap::new(3, 1).expect("tilemap");
        map.replace_all(vec![5, -1, 5]).expect("cells");
        let shared = map.into_shared();
        let mut connector = TilemapTextureConnector::new(shared.clone(), identity_def());
        connector.connect(SubscriberId(2));
        assert_eq!(output_at(&connector, 1, 0), 100 + 5 * 24);

        shared.borrow_mut().set(TileCoord::new(1, 0), 5);
        // (0,0)'s top-right corner now connects east.
        assert_eq!(output_at(&connector, 1, 0), 100 + 5 * 24 + 1);
        // The new cell connects both ways.
        assert_eq!(output_at(&connector, 2, 0), 100 + 5 * 24 + 4);
        assert_eq!(output_at(&connector, 3, 0), 100 + 5 * 24 + 1);
    }

    #[test]
    fn whole_grid_change_resizes_and_rebuilds() {
        let mut map = Tilemap::new(1, 1).expect("tilemap");
        map.replace_all(vec![0]).expect("cells");
        let shared = map.into_shared();
        let mut connector = TilemapTextureConnector::new(shared.clone(), identity_def());
        connector.connect(SubscriberId(2));
        assert_eq!(connector.output().borrow().width(), 2);

        shared.borrow_mut().resize(2, 3).expect("resize");
        let output = connector.output();
        assert_eq!(output.borrow().width(), 4);
        assert_eq!(output.borrow().height(), 6);
    }

    #[test]
    fn rebind_tracks_the_new_source() {
        let mut first = Tilemap::new(1, 1).expect("tilemap");
        first.replace_all(vec![0]).expect("cells");
        let first = first.into_shared();
        let mut second = Tilemap::new(2, 1).expect("tilemap");
        second.replace_all(vec![3, 3]).expect("cells");
        let second = second.into_shared();

        let mut connector = TilemapTextureConnector::new(first.clone(), identity_def());
        connector.connect(SubscriberId(2));
        connector.rebind(second.clone());

        assert_eq!(connector.output().borrow().width(), 4);
        assert_eq!(output_at(&connector, 1, 0), 100 + 3 * 24 + 1);

        // The old source no longer drives the output.
        first.borrow_mut().set(TileCoord::new(0, 0), 7);
        assert_eq!(output_at(&connector, 1, 0), 100 + 3 * 24 + 1);

        second.borrow_mut().set(TileCoord::new(1, 0), -1);
        assert_eq!(output_at(&connector, 1, 0), 100 + 3 * 24);
    }

    #[test]
    fn def_json_uses_pascal_case_keys() {
        let json = r#"{
            "FirstTileOffset": 10,
            "TexturesPerTile": 8,
            "TopLeftTextures": [0, 1, 2, 3, 4, 5, 6, 7],
            "TopRightTextures": [0, 1, 2, 3, 4, 5, 6, 7],
            "BottomLeftTextures": [0, 1, 2, 3, 4, 5, 6, 7],
            "BottomRightTextures": [7, 6, 5, 4, 3, 2, 1, 0]
        }"#;
        let def: TextureConnectorDef = serde_json::from_str(json).expect("parse");
        assert_eq!(def.first_tile_offset, 10);
        assert_eq!(def.bottom_right_textures[0], 7);
    }
}
