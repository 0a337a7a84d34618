//! Property tests for the simulation invariants.

use hexwar_core::agent::Role;
use hexwar_core::bases::ResourceCost;
use hexwar_core::hex_grid::{CellCoord, HexGrid};
use hexwar_core::math::Fixed;
use hexwar_core::team::TeamId;
use hexwar_test_utils::determinism::strategies::{
    arb_attributes, arb_control, arb_resource_type, arb_role, arb_seed, arb_team,
};
use hexwar_test_utils::determinism::{
    find_first_divergence, run_parallel_worlds, verify_snapshot_determinism, verify_world_determinism,
};
use hexwar_test_utils::fixtures::{empty_world, fixed, full_world, grid_with_bases, point, spawn_at};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn control_stays_in_unit_range(
        start in arb_control(),
        deltas in prop::collection::vec(-300i32..=300, 1..40),
    ) {
        let mut grid = HexGrid::generate(200, 200, 40);
        let cell = grid.cell_mut(CellCoord::new(1, 1)).unwrap();
        cell.control_level = start;
        for d in deltas {
            cell.adjust_control(Fixed::from_num(d) / 100);
            prop_assert!(cell.control_level >= -Fixed::ONE);
            prop_assert!(cell.control_level <= Fixed::ONE);
        }
    }

    #[test]
    fn pickup_never_exceeds_capacity(
        role in arb_role(),
        attributes in arb_attributes(),
        resource_type in arb_resource_type(),
        amount in 1u32..50,
    ) {
        let mut world = empty_world();
        let id = spawn_at(&mut world, TeamId::One, role, Some(attributes), point(200, 150));
        let mut grid = world.grid().clone();
        let cell = grid.cell_at_position_mut(point(200, 150)).unwrap();
        cell.set_resource(resource_type, amount);

        let agent = world.agent_system_mut().agent_mut(id).unwrap();
        let capacity = agent.stats.capacity;
        let taken = agent.pick_up(cell).map_or(0, |(_, n)| n);

        prop_assert_eq!(taken, amount.min(capacity));
        prop_assert!(agent.resource_amount <= capacity);
        prop_assert_eq!(cell.resource_amount, amount - taken);
        prop_assert_eq!(cell.resource_type.is_some(), amount > taken);
    }

    #[test]
    fn damage_is_at_least_one(
        attributes in arb_attributes(),
        raw in 0i32..40,
        defense in 0i32..100,
    ) {
        let mut world = empty_world();
        let id = spawn_at(&mut world, TeamId::Two, Role::Defender, Some(attributes), point(200, 150));
        let agent = world.agent_system_mut().agent_mut(id).unwrap();
        agent.stats.defense = fixed(defense);
        let before = agent.health;

        let dealt = agent.take_damage(fixed(raw));
        prop_assert!(dealt >= Fixed::ONE);
        prop_assert_eq!(dealt, (fixed(raw) - fixed(defense) / 5).max(Fixed::ONE));
        prop_assert_eq!(agent.health, (before - dealt).max(Fixed::ZERO));
    }

    #[test]
    fn spending_is_all_or_nothing(
        team in arb_team(),
        ledger in (0u32..50, 0u32..50, 0u32..50),
        cost in (0u32..50, 0u32..50, 0u32..50),
    ) {
        let (_, mut bases) = grid_with_bases();
        bases.add_resource(team, hexwar_core::hex_grid::ResourceType::Energy, ledger.0);
        bases.add_resource(team, hexwar_core::hex_grid::ResourceType::Materials, ledger.1);
        bases.add_resource(team, hexwar_core::hex_grid::ResourceType::Data, ledger.2);
        let before = *bases.ledger(team);
        let other = *bases.ledger(team.opponent());
        let cost = ResourceCost::new(cost.0, cost.1, cost.2);

        let affordable = before.covers(&cost);
        prop_assert_eq!(bases.use_resources(team, &cost), affordable);
        let after = *bases.ledger(team);
        if affordable {
            prop_assert_eq!(after.energy, before.energy - cost.energy);
            prop_assert_eq!(after.materials, before.materials - cost.materials);
            prop_assert_eq!(after.data, before.data - cost.data);
        } else {
            prop_assert_eq!(after, before);
        }
        prop_assert_eq!(*bases.ledger(team.opponent()), other);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn territory_census_always_balances(seed in arb_seed(), ticks in 1u64..200) {
        let mut world = full_world(seed);
        for _ in 0..ticks {
            world.tick();
            prop_assert!(world.check_territory_invariant());
        }
        let info = world.debug_info().unwrap();
        prop_assert_eq!(
            info.territory.team1 + info.territory.team2 + info.territory.neutral + info.obstacles,
            info.total_cells
        );
    }

    #[test]
    fn carry_bounded_during_play(seed in arb_seed()) {
        let mut world = full_world(seed);
        for _ in 0..300 {
            world.tick();
            for agent in world.agent_system().agents() {
                prop_assert!(agent.resource_amount <= agent.stats.capacity);
                prop_assert!(agent.health >= Fixed::ZERO);
                prop_assert!(agent.health <= agent.stats.max_health);
            }
        }
    }
}

#[test]
fn test_same_seed_same_hash() {
    verify_world_determinism(|| full_world(42), 400).assert_deterministic();
    assert_eq!(find_first_divergence(|| full_world(42), 200), None);
}

#[test]
fn test_worlds_on_threads_agree() {
    run_parallel_worlds(|| full_world(7), 4, 200).assert_deterministic();
}

#[test]
fn test_snapshot_continues_identically() {
    assert!(verify_snapshot_determinism(|| full_world(99), 150));
}
