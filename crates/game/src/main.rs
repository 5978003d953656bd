use quarry_engine::{ArchetypeDatabase, Services, TileCoord, TileInfoSystem};
use quarry_game::level::{parse_level_def, LevelError, LevelScene};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const FIXED_DT_SECONDS: f32 = 1.0 / 60.0;
const DEMO_FRAMES: u32 = 120;
const DEMO_RNG_SEED: u64 = 0x51ab;
const PICKAXE_DAMAGE: f32 = 6.0;

fn main() {
    init_tracing();
    info!("=== Quarry startup ===");

    if let Err(err) = run() {
        error!(error = %err, "startup_failed");
        std::process::exit(1);
    }

    info!("=== Quarry shutdown ===");
}

/// Headless demo over the bundled level: swing at one rock tile until it
/// breaks, let the dropped items fly, and keep the flow field current.
fn run() -> Result<(), LevelError> {
    let def = parse_level_def(include_str!("../assets/level.json"))?;
    let mut services = Services::new(
        TileInfoSystem::new(def.tile_info.clone()),
        ArchetypeDatabase::from_defs(def.archetypes.clone())?,
        DEMO_RNG_SEED,
    );
    let mut scene = LevelScene::enter(&def, &mut services)?;
    info!(
        dimensions = ?def.tilemap.dimensions,
        targets = def.targets.len(),
        "level_loaded"
    );

    let mined = TileCoord::new(4, 1);
    for frame in 0..DEMO_FRAMES {
        if frame == 20 || frame == 40 {
            let overkill = scene.destructible().damage_tile(mined, PICKAXE_DAMAGE);
            info!(
                frame,
                overkill,
                health = scene.destructible().health_at(mined),
                "pickaxe_swing"
            );
        }
        scene.update(FIXED_DT_SECONDS, &mut services);
    }

    // Let the last build land before reporting.
    while services.pathfind.build_in_progress() {
        std::thread::yield_now();
    }
    services.pathfind.tick();

    let probe = scene.tile_center(3, 3);
    info!(
        travel_distance = services.pathfind.travel_distance_at(probe),
        item_entities = services.entities.borrow().entity_count(),
        "demo_summary"
    );

    scene.exit(&mut services);
    services.shutdown();
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
