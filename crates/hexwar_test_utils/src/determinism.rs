//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! A match must replay exactly from its seed. Sources of non-determinism
//! include:
//!
//! - **Floating-point math**: tick arithmetic uses
//!   [`hexwar_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Agents live in a `Vec` and per-agent maps are `BTreeMap`s.
//!
//! - **System randomness**: every roll draws from the world's seeded
//!   [`hexwar_core::rng::SimRng`].

use std::thread;

use hexwar_core::world::WorldSystem;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    fn from_hashes(hashes: Vec<u64>, ticks: u64) -> Self {
        let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
        Self {
            is_deterministic,
            hashes,
            ticks,
        }
    }

    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```ignore
/// use hexwar_test_utils::determinism::verify_determinism;
/// use hexwar_test_utils::fixtures::full_world;
///
/// let result = verify_determinism(
///     3,
///     200,
///     || full_world(7),
///     |world| { world.tick(); },
///     |world| world.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    DeterminismResult::from_hashes(hashes, ticks)
}

/// Build the world twice, tick both `ticks` times and compare hashes.
pub fn verify_world_determinism<F>(setup_fn: F, ticks: u64) -> DeterminismResult
where
    F: Fn() -> WorldSystem,
{
    verify_determinism(
        2,
        ticks,
        setup_fn,
        |world| {
            world.tick();
        },
        WorldSystem::state_hash,
    )
}

/// Run `runs` worlds on separate threads and collect their final hashes.
///
/// Catches state that leaks between worlds through globals or thread
/// locals.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_worlds<F>(setup_fn: F, runs: usize, ticks: u64) -> DeterminismResult
where
    F: Fn() -> WorldSystem + Sync,
{
    let setup_ref = &setup_fn;
    let hashes = thread::scope(|scope| {
        let handles: Vec<_> = (0..runs)
            .map(|_| {
                scope.spawn(move || {
                    let mut world = setup_ref();
                    for _ in 0..ticks {
                        world.tick();
                    }
                    world.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    DeterminismResult::from_hashes(hashes, ticks)
}

/// Compare two runs tick by tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs agree throughout, `Some(tick)` for the first tick
/// after which their hashes differ (0 for the initial state).
pub fn find_first_divergence<F>(setup_fn: F, ticks: u64) -> Option<u64>
where
    F: Fn() -> WorldSystem,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for tick in 1..=ticks {
        a.tick();
        b.tick();

        if a.state_hash() != b.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a bincode round trip preserves the world exactly, and that
/// the restored world keeps evolving identically.
pub fn verify_snapshot_determinism<F>(setup_fn: F, ticks: u64) -> bool
where
    F: Fn() -> WorldSystem,
{
    let mut world = setup_fn();
    for _ in 0..ticks {
        world.tick();
    }

    let Ok(bytes) = world.serialize() else {
        return false;
    };
    let Ok(mut restored) = WorldSystem::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != world.state_hash() {
        return false;
    }

    for _ in 0..ticks {
        world.tick();
        restored.tick();
    }
    restored.state_hash() == world.state_hash()
}

/// Proptest strategies for simulation inputs.
pub mod strategies {
    use proptest::prelude::*;

    use hexwar_core::agent::{AttributeVector, Role};
    use hexwar_core::hex_grid::ResourceType;
    use hexwar_core::math::Fixed;
    use hexwar_core::team::TeamId;

    /// Any role.
    pub fn arb_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    /// Either team.
    pub fn arb_team() -> impl Strategy<Value = TeamId> {
        prop_oneof![Just(TeamId::One), Just(TeamId::Two)]
    }

    /// Any resource kind.
    pub fn arb_resource_type() -> impl Strategy<Value = ResourceType> {
        prop_oneof![
            Just(ResourceType::Energy),
            Just(ResourceType::Materials),
            Just(ResourceType::Data),
        ]
    }

    /// Attribute component in `[0.1, 1.0]` on a 0.01 grid.
    pub fn arb_attribute() -> impl Strategy<Value = Fixed> {
        (10i32..=100).prop_map(|n| Fixed::from_num(n) / 100)
    }

    /// A full attribute vector.
    pub fn arb_attributes() -> impl Strategy<Value = AttributeVector> {
        (arb_attribute(), arb_attribute(), arb_attribute(), arb_attribute(), arb_attribute())
            .prop_map(|(s, h, a, d, c)| AttributeVector::new(s, h, a, d, c))
    }

    /// Control level in `[-1, 1]` on a 0.01 grid.
    pub fn arb_control() -> impl Strategy<Value = Fixed> {
        (-100i32..=100).prop_map(|n| Fixed::from_num(n) / 100)
    }

    /// A world seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }
}
