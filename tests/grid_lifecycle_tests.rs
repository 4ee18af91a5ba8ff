// Grid lifecycle: seeding from maps and snapshots, vacuum repair when an
// obstruction comes down, and carrying state across a grid split.

use approx::assert_abs_diff_eq;
use atmo_grid_rust::constants::CELL_VOLUME_L;
use atmo_grid_rust::engine::AtmosphereEngine;
use atmo_grid_rust::error::AtmosError;
use atmo_grid_rust::gas::GasId;
use atmo_grid_rust::grid::{GridAtmosphere, GridAtmosphereData};
use atmo_grid_rust::mixture::GasMixture;
use atmo_grid_rust::topology::{GridId, StaticGridMap, StaticTopology, TopologyProvider};
use glam::IVec2;
use more_asserts::assert_gt;

fn plus_shape_setup() -> (AtmosphereEngine, StaticTopology, GridId) {
    let grid = GridId(1);
    let mut map = StaticGridMap::new();
    for coord in [
        IVec2::new(1, 1), // center
        IVec2::new(1, 2), // north
        IVec2::new(1, 0), // south
        IVec2::new(0, 1), // west
    ] {
        map.insert_tile(coord);
    }
    let mut topology = StaticTopology::new();
    topology.insert(grid, map);
    let mut engine = AtmosphereEngine::new();
    engine.add_grid(grid);
    engine.grid_repopulate_tiles(topology.grid_map(grid).unwrap(), grid);
    (engine, topology, grid)
}

#[test]
fn test_repopulate_seeds_every_map_tile() {
    println!("🗺️ Testing grid repopulation from a 2x2 map");

    let grid = GridId(1);
    let mut map = StaticGridMap::new();
    map.fill_rect(IVec2::ZERO, IVec2::new(1, 1));
    let mut topology = StaticTopology::new();
    topology.insert(grid, map);

    let mut engine = AtmosphereEngine::new();
    engine.grid_repopulate_tiles(topology.grid_map(grid).unwrap(), grid);

    let mixtures = engine.all_tile_mixtures(grid);
    println!("   Seeded {} tile mixtures", mixtures.len());
    assert_eq!(mixtures.len(), 4, "every map tile gets a mixture");
    for (coord, mix) in &mixtures {
        assert_eq!(mix.volume_l(), CELL_VOLUME_L, "tile {coord} volume");
        assert_eq!(mix.total_moles(), 0.0, "seeded tiles start without gas");
    }
    assert_eq!(
        engine.adjacent_tiles(grid, IVec2::ZERO, false).len(),
        2,
        "corner tile has two open neighbors"
    );

    // A tick over the freshly invalidated grid must settle cleanly.
    engine.tick(&topology);
    println!("   ✅ Repopulated grid ticks cleanly");
}

#[test]
fn test_repeated_invalidations_collapse_to_one_visual_update() {
    println!("📣 Testing that hammering one tile yields a single update per tick");

    let grid = GridId(1);
    let mut map = StaticGridMap::new();
    map.fill_rect(IVec2::ZERO, IVec2::new(1, 0));
    let mut topology = StaticTopology::new();
    topology.insert(grid, map);
    let mut engine = AtmosphereEngine::new();
    engine.add_grid(grid);
    engine.grid_repopulate_tiles(topology.grid_map(grid).unwrap(), grid);
    engine.tick(&topology);
    engine.drain_visual_updates();

    // The mutable accessor already invalidates; pile three more on top. The
    // disturbed tile also moves gas this tick, so both the revalidation and
    // the diffusion pass want to report it.
    let west = IVec2::ZERO;
    let air = engine.tile_mixture_mut(grid, west).unwrap();
    air.set_moles(GasId::Nitrogen, 300.0);
    engine.invalidate_tile(grid, west);
    engine.invalidate_tile(grid, west);
    engine.invalidate_tile(grid, west);

    engine.tick(&topology);

    let updates = engine.drain_visual_updates();
    let west_updates = updates.iter().filter(|change| change.tile == west).count();
    println!(
        "   Drained {} update(s), {} for the disturbed tile",
        updates.len(),
        west_updates
    );
    assert_eq!(west_updates, 1, "one tick reports a tile at most once");

    println!("   ✅ Updates collapsed to one entry per tile");
}

#[test]
fn test_vacuum_repair_averages_donor_temperatures() {
    println!("🔧 Testing vacuum repair from three donors at 300/320/340 K");

    let (mut engine, topology, grid) = plus_shape_setup();
    let center = IVec2::new(1, 1);
    let donors = [
        (IVec2::new(1, 2), 300.0),
        (IVec2::new(1, 0), 320.0),
        (IVec2::new(0, 1), 340.0),
    ];
    for (coord, temperature) in donors {
        let air = engine.tile_mixture_mut(grid, coord).unwrap();
        air.set_moles(GasId::Nitrogen, 99.0);
        air.set_temperature_k(temperature);
    }
    engine
        .grid_atmosphere_mut(grid)
        .unwrap()
        .tiles
        .get_mut(&center)
        .unwrap()
        .air = None;

    engine.fix_vacuum(topology.grid_map(grid).unwrap(), grid, center);

    let repaired = engine.get_tile_mixture(grid, center).unwrap();
    println!(
        "   Repaired tile: {:.3} mol at {:.3} K",
        repaired.total_moles(),
        repaired.temperature_k()
    );
    assert_abs_diff_eq!(repaired.temperature_k(), 320.0, epsilon = 1e-9);
    assert_abs_diff_eq!(repaired.total_moles(), 99.0, epsilon = 1e-9);

    for (coord, temperature) in donors {
        let air = engine.get_tile_mixture(grid, coord).unwrap();
        assert_abs_diff_eq!(air.total_moles(), 66.0, epsilon = 1e-9);
        assert_abs_diff_eq!(air.temperature_k(), temperature, epsilon = 1e-9);
    }

    println!("   ✅ Each donor gave a third and the repaired tile landed at the mean");
}

#[test]
fn test_snapshot_load_and_bad_mix_index() {
    println!("📦 Testing snapshot loading");

    let grid = GridId(7);
    let mut map = StaticGridMap::new();
    map.fill_rect(IVec2::ZERO, IVec2::new(2, 0));
    let mut topology = StaticTopology::new();
    topology.insert(grid, map);

    let mut station_air = GasMixture::new(CELL_VOLUME_L);
    station_air.set_moles(GasId::Oxygen, 21.0);
    station_air.set_moles(GasId::Nitrogen, 79.0);
    station_air.set_temperature_k(293.15);
    let data = GridAtmosphereData {
        unique_mixes: vec![station_air],
        tiles_unique_mixes: vec![(IVec2::ZERO, 0), (IVec2::new(1, 0), 0)],
    };

    let mut engine = AtmosphereEngine::new();
    engine
        .load_grid(grid, &data, topology.grid_map(grid).unwrap())
        .expect("snapshot should load");

    let loaded = engine.get_tile_mixture(grid, IVec2::ZERO).unwrap();
    assert_abs_diff_eq!(loaded.get_moles(GasId::Oxygen), 21.0, epsilon = 1e-12);
    // The tile the snapshot skipped still exists, seeded by the map.
    assert!(engine.get_tile_mixture(grid, IVec2::new(2, 0)).is_some());
    println!("   Loaded {} tiles", engine.all_tile_mixtures(grid).len());

    let broken = GridAtmosphereData {
        unique_mixes: Vec::new(),
        tiles_unique_mixes: vec![(IVec2::ZERO, 2)],
    };
    let err = GridAtmosphere::from_snapshot(grid, &broken).unwrap_err();
    println!("   Broken snapshot error: {err}");
    assert!(matches!(err, AtmosError::UnknownMixIndex { index: 2, .. }));

    println!("   ✅ Snapshot loading and validation behave");
}

#[test]
fn test_grid_split_carries_tile_state() {
    println!("✂️ Testing that a grid split clones air and fire state");

    let original = GridId(1);
    let split_off = GridId(2);

    // Before the split the original grid owns both tiles; afterwards the
    // east tile belongs to the new grid's map.
    let mut full_map = StaticGridMap::new();
    full_map.fill_rect(IVec2::ZERO, IVec2::new(1, 0));
    let mut pre_split = StaticTopology::new();
    pre_split.insert(original, full_map);

    let mut remainder_map = StaticGridMap::new();
    remainder_map.insert_tile(IVec2::ZERO);
    let mut split_map = StaticGridMap::new();
    split_map.insert_tile(IVec2::new(1, 0));
    let mut topology = StaticTopology::new();
    topology.insert(original, remainder_map);
    topology.insert(split_off, split_map);

    let mut engine = AtmosphereEngine::new();
    engine.grid_repopulate_tiles(pre_split.grid_map(original).unwrap(), original);

    let moving = IVec2::new(1, 0);
    let air = engine.tile_mixture_mut(original, moving).unwrap();
    air.set_moles(GasId::Plasma, 12.0);
    air.set_moles(GasId::Oxygen, 40.0);
    air.set_temperature_k(310.0);
    engine.hotspot_expose(original, moving, 1000.0, 5.0, false);
    assert!(engine.is_hotspot_active(original, moving));

    engine.on_grid_split(original, &[split_off], &topology);

    let carried = engine.get_tile_mixture(split_off, moving).unwrap();
    println!(
        "   Carried mixture: {:.3} mol plasma at {:.1} K",
        carried.get_moles(GasId::Plasma),
        carried.temperature_k()
    );
    assert_abs_diff_eq!(carried.get_moles(GasId::Plasma), 12.0, epsilon = 1e-12);
    assert_abs_diff_eq!(carried.temperature_k(), 310.0, epsilon = 1e-12);
    assert!(
        engine.is_hotspot_active(split_off, moving),
        "the fire must survive the split"
    );

    // Both sides are queued for revalidation.
    assert!(engine
        .grid_atmosphere(original)
        .unwrap()
        .invalidated
        .contains(&moving));
    assert!(engine
        .grid_atmosphere(split_off)
        .unwrap()
        .invalidated
        .contains(&moving));

    // Ticking against the post-split topology settles both grids: the
    // original's map no longer owns the tile, so it reads as space there,
    // while the new grid keeps simulating it.
    engine.tick(&topology);
    assert!(
        engine.get_tile_mixture(original, moving).is_none(),
        "the original grid must stop tracking air the split took away"
    );
    assert!(!engine.is_hotspot_active(original, moving));
    assert_gt!(
        engine
            .get_tile_mixture(split_off, moving)
            .map(|m| m.total_moles())
            .unwrap_or(0.0),
        0.0
    );

    println!("   ✅ Split grid inherited the tile atmosphere and hotspot");
}
