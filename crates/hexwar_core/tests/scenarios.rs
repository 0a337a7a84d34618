//! End-to-end scenarios driven through the public world API.

use hexwar_core::agent::{AgentId, Role};
use hexwar_core::agent_system::AgentEvent;
use hexwar_core::bases::{BaseSystem, ResourceCost};
use hexwar_core::hex_grid::{CellCoord, ResourceType};
use hexwar_core::math::Fixed;
use hexwar_core::team::TeamId;
use hexwar_core::victory::VictoryCondition;
use hexwar_core::world::WorldSystem;
use hexwar_test_utils::fixtures::{empty_world, fixed, fixed_f, point, small_grid, spawn_at};

/// Spawn an agent that stays where it is put unless combat moves it.
fn planted(world: &mut WorldSystem, team: TeamId, role: Role, x: i32, y: i32) -> AgentId {
    let id = spawn_at(world, team, role, None, point(x, y));
    let agent = world.agent_system_mut().agent_mut(id).unwrap();
    agent.movement.waypoints.clear();
    agent.movement.pattern_duration = fixed(100_000);
    id
}

#[test]
fn test_base_territory_rings() {
    let mut grid = small_grid();
    let base = BaseSystem::find_base_cell(&grid, TeamId::One).unwrap();
    BaseSystem::establish_territory(&mut grid, base, TeamId::One);

    let ring1 = grid.neighbors(base);
    assert!(!ring1.is_empty() && ring1.len() <= 6);
    let mut ring2: Vec<CellCoord> = Vec::new();
    for n in &ring1 {
        for nn in grid.neighbors(*n) {
            if nn != base && !ring1.contains(&nn) && !ring2.contains(&nn) {
                ring2.push(nn);
            }
        }
    }

    assert_eq!(grid.cell(base).unwrap().control_level, -Fixed::ONE);
    for c in &ring1 {
        assert_eq!(grid.cell(*c).unwrap().control_level, -fixed_f(0.8));
    }
    for c in &ring2 {
        assert_eq!(grid.cell(*c).unwrap().control_level, -fixed_f(0.6));
    }
    // Nothing outside the two rings was touched
    let touched = 1 + ring1.len() + ring2.len();
    let seeded = grid.cells().iter().filter(|c| c.control_level != Fixed::ZERO).count();
    assert_eq!(seeded, touched);
}

#[test]
fn test_collect_up_to_capacity() {
    let mut world = empty_world();
    let center = world.grid().cell_at_position(point(200, 150)).unwrap().center;
    let id = spawn_at(&mut world, TeamId::One, Role::Collector, None, center);
    {
        let agent = world.agent_system_mut().agent_mut(id).unwrap();
        agent.movement.waypoints.clear();
        agent.movement.pattern_duration = fixed(100_000);
        agent.stats.capacity = 5;
    }
    assert!(world.add_resource_at(center, ResourceType::Energy, 8));

    let events = world.tick();
    assert!(events.agents.contains(&AgentEvent::Collected {
        agent: id,
        resource_type: ResourceType::Energy,
        amount: 5,
    }));
    let cell = world.grid().cell_at_position(center).unwrap();
    assert_eq!(cell.resource_amount, 3);
    assert_eq!(cell.resource_type, Some(ResourceType::Energy));
    let agent = world.get_agent_by_id(id).unwrap();
    assert_eq!(agent.resource_amount, 5);
    assert_eq!(agent.carried, Some(ResourceType::Energy));
}

#[test]
fn test_duel_to_the_death() {
    let mut world = empty_world();
    let a = planted(&mut world, TeamId::One, Role::Attacker, 185, 150);
    let b = planted(&mut world, TeamId::Two, Role::Attacker, 210, 150);
    for id in [a, b] {
        let agent = world.agent_system_mut().agent_mut(id).unwrap();
        agent.stats.attack_power = fixed(10);
        agent.stats.defense = Fixed::ZERO;
        agent.stats.max_health = fixed(100);
        agent.health = fixed(100);
    }

    let mut hits = 0;
    let mut kills = Vec::new();
    let mut removals = Vec::new();
    let mut last_health = [fixed(100), fixed(100)];
    for _ in 0..2000 {
        let events = world.tick();
        for event in &events.agents {
            match event {
                AgentEvent::Damaged { agent, amount, .. } => {
                    assert_eq!(*amount, fixed(10));
                    hits += 1;
                    let slot = usize::from(*agent != a);
                    last_health[slot] -= *amount;
                }
                AgentEvent::Killed { agent, .. } => kills.push(*agent),
                AgentEvent::Removed { agent, dropped, .. } => removals.push((*agent, *dropped)),
                _ => {}
            }
        }
        // Health tracked from the events matches the agents themselves
        for (slot, id) in [a, b].into_iter().enumerate() {
            if let Some(agent) = world.get_agent_by_id(id) {
                assert_eq!(agent.health, last_health[slot]);
            }
        }
        if !removals.is_empty() {
            break;
        }
    }

    assert_eq!(kills.len(), 1);
    assert_eq!(removals.len(), 1);
    assert_eq!(removals[0], (kills[0], None));
    assert!(hits >= 10);
    assert!(world.get_agent_by_id(kills[0]).is_none());
    assert_eq!(world.outcome().unwrap().condition, VictoryCondition::Elimination);
}

#[test]
fn test_dead_carrier_drops_its_load() {
    let mut world = empty_world();
    let victim = planted(&mut world, TeamId::One, Role::Collector, 185, 150);
    let killer = planted(&mut world, TeamId::Two, Role::Attacker, 210, 150);
    {
        let agent = world.agent_system_mut().agent_mut(victim).unwrap();
        agent.carried = Some(ResourceType::Data);
        agent.resource_amount = 4;
        agent.health = fixed(1);
    }
    world.agent_system_mut().agent_mut(killer).unwrap().stats.attack_power = fixed(50);

    let mut dropped = None;
    for _ in 0..200 {
        let events = world.tick();
        if let Some(AgentEvent::Removed { dropped: d, .. }) =
            events.agents.iter().find(|e| matches!(e, AgentEvent::Removed { .. }))
        {
            dropped = Some(*d);
            break;
        }
    }
    assert_eq!(dropped, Some(Some((ResourceType::Data, 4))));
}

#[test]
fn test_unaffordable_spend_leaves_ledger_alone() {
    let mut world = empty_world();
    let bases = world.bases_mut();
    bases.add_resource(TeamId::One, ResourceType::Energy, 5);
    bases.add_resource(TeamId::One, ResourceType::Materials, 100);
    bases.add_resource(TeamId::One, ResourceType::Data, 100);
    let before = *bases.ledger(TeamId::One);

    assert!(!bases.use_resources(TeamId::One, &ResourceCost::new(10, 5, 5)));
    assert_eq!(*bases.ledger(TeamId::One), before);
    assert_eq!(before, ResourceCost::new(5, 100, 100));

    assert!(bases.use_resources(TeamId::One, &ResourceCost::new(5, 5, 5)));
    assert_eq!(*bases.ledger(TeamId::One), ResourceCost::new(0, 95, 95));
}

#[test]
fn test_territory_hold_wins_at_fifteen_seconds() {
    let mut world = empty_world();
    let centers: Vec<_> = world.grid().cells().iter().map(|c| c.center).collect();
    for center in centers {
        assert!(world.add_control_at(center, TeamId::One, fixed(2)));
    }

    let mut decided = None;
    for _ in 0..(16 * 20) {
        let events = world.tick();
        if let Some(outcome) = events.outcome {
            decided = Some(outcome);
            break;
        }
        assert!(world.victory().held_for() < fixed(15));
    }

    let outcome = decided.expect("match decided within 16 s");
    assert_eq!(outcome.winner, TeamId::One);
    assert_eq!(outcome.condition, VictoryCondition::Territory);
    assert!(outcome.time >= fixed(15));
    assert!(outcome.time < fixed_f(15.2));
    assert!(world.is_game_over());

    // Frozen afterwards
    let tick = world.get_tick();
    assert!(world.tick().is_empty());
    assert_eq!(world.get_tick(), tick);
}
