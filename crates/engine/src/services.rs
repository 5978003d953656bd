use crate::archetype::ArchetypeDatabase;
use crate::entity::EntityWorld;
use crate::pathfind::PathfindSystem;
use crate::tile_info::TileInfoSystem;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::rc::Rc;

/// Everything scenes need, constructed once at startup and passed down
/// explicitly. Exactly one instance per process; shutdown order is the
/// reverse of construction, with the pathfinder joined first.
pub struct Services {
    pub tile_info: Rc<TileInfoSystem>,
    pub archetypes: Rc<ArchetypeDatabase>,
    pub entities: Rc<RefCell<EntityWorld>>,
    pub rng: Rc<RefCell<StdRng>>,
    pub pathfind: PathfindSystem,
}

impl Services {
    pub fn new(tile_info: TileInfoSystem, archetypes: ArchetypeDatabase, rng_seed: u64) -> Self {
        Self {
            tile_info: Rc::new(tile_info),
            archetypes: Rc::new(archetypes),
            entities: Rc::new(RefCell::new(EntityWorld::default())),
            rng: Rc::new(RefCell::new(StdRng::seed_from_u64(rng_seed))),
            pathfind: PathfindSystem::new(),
        }
    }

    pub fn shutdown(&mut self) {
        self.pathfind.shutdown();
        self.entities.borrow_mut().clear();
    }
}
