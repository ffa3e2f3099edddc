//! End-to-end scenarios for the autonomous player
//!
//! These drive [`AiPlayer`] through the simulated world:
//! - Building planning around a lone headquarters
//! - Attack cadence per difficulty level
//! - Deterministic runs for a fixed seed
//! - Defeat handling and job quotas

use colony_ai::core::types::{BuildingType, FrontierDistance, PlayerId};
use colony_ai::map::point::MapPoint;
use colony_ai::player::planning::PLANNED_BUILDINGS;
use colony_ai::world::sim::SimWorld;
use colony_ai::{AiConfig, AiLevel, AiPlayer, Command, GameWorld};

const ME: PlayerId = PlayerId(0);
const ENEMY: PlayerId = PlayerId(1);

fn lone_headquarters() -> SimWorld {
    let mut world = SimWorld::new(48, 48);
    world.claim(ME, MapPoint::new(24, 24), 20);
    world.add_building(ME, MapPoint::new(24, 24), BuildingType::Headquarters);
    world
}

/// Own watchtower at the border, undefended enemy headquarters in reach
fn border_standoff() -> SimWorld {
    let mut world = SimWorld::new(48, 32);
    world.claim(ME, MapPoint::new(8, 16), 8);
    world.claim(ENEMY, MapPoint::new(30, 16), 8);
    world.add_building(ME, MapPoint::new(6, 16), BuildingType::Headquarters);
    let tower = world.add_building(ME, MapPoint::new(14, 16), BuildingType::Watchtower);
    tower.frontier = FrontierDistance::Near;
    tower.troops = 5;
    tower.strength = 10;
    world.add_building(ENEMY, MapPoint::new(26, 16), BuildingType::Headquarters);
    world
}

/// Frames in `0..frames` at which the agent ordered a land attack
fn attack_frames(world: &mut SimWorld, ai: &mut AiPlayer, frames: u32) -> Vec<u32> {
    let mut result = Vec::new();
    for gf in 0..frames {
        let before = world.commands_of(ME).iter().filter(|c| c.is_attack()).count();
        ai.run_gf(world, gf, gf % 20 == 0);
        let after = world.commands_of(ME).iter().filter(|c| c.is_attack()).count();
        if after > before {
            result.push(gf);
        }
    }
    result
}

// ============================================================================
// Planning
// ============================================================================

#[test]
fn test_planning_queues_only_wanted_types() {
    let mut world = lone_headquarters();
    let mut ai = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();

    ai.plan_new_buildings(&mut world, 200);

    let kinds: Vec<BuildingType> =
        ai.construction().build_jobs().filter_map(|j| j.building()).collect();
    assert!(!kinds.is_empty());
    assert!(kinds.iter().all(|k| PLANNED_BUILDINGS.contains(k)));
    assert!(kinds.iter().all(|&k| ai.planner().wanted(k)));
}

#[test]
fn test_planning_queues_nothing_when_demand_is_met() {
    let mut world = lone_headquarters();
    let existing = [
        BuildingType::Forester,
        BuildingType::Woodcutter,
        BuildingType::Woodcutter,
        BuildingType::Woodcutter,
        BuildingType::Woodcutter,
        BuildingType::Sawmill,
        BuildingType::Sawmill,
        BuildingType::Quarry,
        BuildingType::Quarry,
        BuildingType::Fishery,
        BuildingType::Hunter,
    ];
    for (i, kind) in existing.into_iter().enumerate() {
        let pos = MapPoint::new(8 + 3 * (i as u16 % 6), 32 + 4 * (i as u16 / 6));
        world.add_building(ME, pos, kind);
    }
    let mut ai = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();

    ai.plan_new_buildings(&mut world, 200);

    assert_eq!(ai.construction().build_job_count(), 0);
}

// ============================================================================
// Cadence and determinism
// ============================================================================

#[test]
fn test_easy_attacks_once_per_interval() {
    let mut world = border_standoff();
    let mut ai = AiPlayer::new(&world, &AiConfig::new(AiLevel::Easy), ME).unwrap();
    assert_eq!(attack_frames(&mut world, &mut ai, 2600), vec![2500]);
}

#[test]
fn test_medium_attacks_more_often() {
    let mut world = border_standoff();
    let mut ai = AiPlayer::new(&world, &AiConfig::new(AiLevel::Medium), ME).unwrap();
    assert_eq!(attack_frames(&mut world, &mut ai, 2300), vec![750, 1500, 2250]);
}

#[test]
fn test_fixed_seed_gives_identical_runs() {
    fn run(seed: u64) -> Vec<(PlayerId, Command)> {
        let mut world = lone_headquarters();
        world.place_tree(MapPoint::new(30, 20));
        world.place_granite(MapPoint::new(18, 28));
        let config = AiConfig::new(AiLevel::Easy).with_seed(seed);
        let mut ai = AiPlayer::new(&world, &config, ME).unwrap();
        for gf in 0..2100 {
            ai.run_gf(&mut world, gf, gf % 20 == 0);
            if gf % 50 == 0 {
                for site in world.building_sites(ME) {
                    world.complete_site(site.pos);
                }
            }
        }
        world.commands().to_vec()
    }

    let first = run(7);
    assert!(!first.is_empty());
    assert_eq!(first, run(7));
}

// ============================================================================
// Defeat and quotas
// ============================================================================

#[test]
fn test_surrender_once_without_warehouses() {
    let mut world = SimWorld::new(32, 32);
    world.claim(ME, MapPoint::new(16, 16), 6);
    let mut ai = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();

    for gf in 0..40 {
        ai.run_gf(&mut world, gf, false);
    }

    assert!(ai.is_defeated());
    assert!(world.has_surrendered(ME));
    let surrenders = world
        .commands_of(ME)
        .iter()
        .filter(|c| matches!(c, Command::Surrender))
        .count();
    assert_eq!(surrenders, 1);
}

#[test]
fn test_job_quota_capped_by_config() {
    let mut world = lone_headquarters();
    for x in [10u16, 14, 18, 30, 34] {
        world.add_building(ME, MapPoint::new(x, 36), BuildingType::Barracks);
    }
    let config = AiConfig { job_quota_cap: 3, ..AiConfig::default() };
    let ai = AiPlayer::new(&world, &config, ME).unwrap();
    assert_eq!(ai.job_quota(&world), 3);

    let uncapped = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();
    assert_eq!(uncapped.job_quota(&world), 6);
}
