//! The per-tick entry point and its deduplicated replacement.
//!
//! The host calls [`LevelChunkTickingSystem::tick`] once per simulation step.
//! [`OptimizedChunkTicking`] wraps the host's original system and is installed
//! in its place; whether it actually replaces the step is controlled by a
//! [`TickHook`] that the plugin lifecycle toggles.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::aggregator::aggregate;
use crate::dispatcher::dispatch;
use crate::engine::{EntityRegistry, Level, LevelService};
use crate::locator::locate;
use crate::report::{StepOutcome, StepReport};

/// A system that ticks the chunks of a level once per simulation step.
pub trait LevelChunkTickingSystem<R> {
    /// Runs one step over the live entity index.
    fn tick(&self, registry: &mut R);
}

/// Shared switch deciding whether the replacement step is active.
#[derive(Debug, Clone, Default)]
pub struct TickHook(Arc<AtomicBool>);

impl TickHook {
    /// Creates an uninstalled hook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates the replacement. Returns false if it was already active.
    pub fn install(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Deactivates the replacement. Returns false if it was not active.
    pub fn uninstall(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    /// Whether the replacement is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Runs one deduplicated step against an active level.
///
/// Every simulatable actor marks the resident chunks within its dimension's
/// tick range; each marked chunk is then ticked once, no matter how many
/// actors marked it.
pub fn tick_chunks<L, R>(level: &L, registry: &R) -> StepReport
where
    L: Level + ?Sized,
    R: EntityRegistry,
{
    let mut locator = locate(registry);
    let plan = aggregate(level, locator.by_ref());

    let mut report = StepReport {
        entities: locator.visited(),
        skipped_actors: locator.skipped(),
        dimensions: plan.regions.len(),
        candidates: plan.candidates,
        pending: plan.pending_len(),
        ..StepReport::default()
    };
    dispatch(&plan, &mut report);
    report
}

/// Deduplicated, entity-driven replacement for a level chunk ticking system.
///
/// Falls back to the wrapped system when the hook is inactive or when no level
/// is available at the start of the step. Once a step starts gathering
/// actors, the wrapped system is not called for that step.
pub struct OptimizedChunkTicking<S, L> {
    original: S,
    levels: L,
    hook: TickHook,
}

impl<S, L> OptimizedChunkTicking<S, L> {
    /// Wraps `original`, resolving the active level through `levels`.
    pub fn new(original: S, levels: L, hook: TickHook) -> Self {
        Self {
            original,
            levels,
            hook,
        }
    }

    /// The hook controlling this system.
    #[must_use]
    pub fn hook(&self) -> &TickHook {
        &self.hook
    }

    /// The wrapped system.
    #[must_use]
    pub fn original(&self) -> &S {
        &self.original
    }

    /// The level service.
    #[must_use]
    pub fn levels(&self) -> &L {
        &self.levels
    }
}

impl<S, L: LevelService> OptimizedChunkTicking<S, L> {
    /// Runs one step and reports which path it took.
    pub fn tick_step<R>(&self, registry: &mut R) -> StepOutcome
    where
        R: EntityRegistry,
        S: LevelChunkTickingSystem<R>,
    {
        if !self.hook.is_active() {
            self.original.tick(registry);
            return StepOutcome::Inactive;
        }

        let Some(level) = self.levels.level() else {
            log::trace!("No active level, running original chunk ticking");
            self.original.tick(registry);
            return StepOutcome::Fallback;
        };

        let report = tick_chunks(&*level, registry);
        log::trace!("Chunk tick: {report}");
        StepOutcome::Replaced(report)
    }
}

impl<R, S, L> LevelChunkTickingSystem<R> for OptimizedChunkTicking<S, L>
where
    R: EntityRegistry,
    S: LevelChunkTickingSystem<R>,
    L: LevelService,
{
    fn tick(&self, registry: &mut R) {
        self.tick_step(registry);
    }
}

#[cfg(test)]
mod tests {
    use chunk_ticking_utils::{ChunkPos, DimensionId, math::Vector3};
    use rustc_hash::FxHashSet;

    use super::*;
    use crate::memory::{
        MemoryLevel, MemoryLevelService, MemoryRegistry, MemoryWorld, TickAllLoaded,
    };
    use crate::range::SimulationRange;

    type System = OptimizedChunkTicking<TickAllLoaded, MemoryLevelService>;

    fn system(world: &Arc<MemoryWorld>, level: Option<MemoryLevel>) -> System {
        let levels = match level {
            Some(level) => MemoryLevelService::new(level),
            None => MemoryLevelService::unavailable(),
        };
        let hook = TickHook::new();
        hook.install();
        OptimizedChunkTicking::new(TickAllLoaded::new(world.clone()), levels, hook)
    }

    fn square(center: ChunkPos, radius: i32) -> FxHashSet<ChunkPos> {
        let mut chunks = FxHashSet::default();
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                chunks.insert(ChunkPos::new(center.x() + dx, center.z() + dz));
            }
        }
        chunks
    }

    #[test]
    fn test_hook_install_uninstall() {
        let hook = TickHook::new();
        assert!(!hook.is_active());
        assert!(hook.install());
        assert!(!hook.install());
        assert!(hook.clone().is_active());
        assert!(hook.uninstall());
        assert!(!hook.uninstall());
    }

    #[test]
    fn test_single_entity_scenario() {
        let world = Arc::new(MemoryWorld::new());
        let overworld = world.region(DimensionId::OVERWORLD);
        // Resident: the centre, two neighbours, and one chunk out of range.
        for pos in [(0, 0), (-1, -1), (1, 0), (2, 2)] {
            overworld.load(ChunkPos::new(pos.0, pos.1));
        }

        let mut registry = MemoryRegistry::new();
        registry.spawn(&overworld, Vector3::new(0.0, 64.0, 0.0));

        let system = system(&world, Some(MemoryLevel::uniform(SimulationRange::new(1))));
        let outcome = system.tick_step(&mut registry);

        let Some(report) = outcome.report() else {
            panic!("expected a replaced step, got {outcome:?}");
        };
        assert_eq!(report.candidates, 9);
        assert_eq!(report.ticked, 3);

        let expected: FxHashSet<_> = [(0, 0), (-1, -1), (1, 0)]
            .into_iter()
            .map(|(x, z)| ChunkPos::new(x, z))
            .collect();
        assert_eq!(world.journal().ticked_chunks(DimensionId::OVERWORLD), expected);
        assert_eq!(system.original().calls(), 0);
    }

    #[test]
    fn test_overlap_ticked_once() {
        let world = Arc::new(MemoryWorld::new());
        let overworld = world.region(DimensionId::OVERWORLD);
        overworld.load_area(ChunkPos::new(0, 0), 5);

        let mut registry = MemoryRegistry::new();
        registry.spawn(&overworld, Vector3::new(4.0, 64.0, 4.0));
        registry.spawn(&overworld, Vector3::new(20.0, 64.0, 4.0));

        let system = system(&world, Some(MemoryLevel::uniform(SimulationRange::new(1))));
        system.tick(&mut registry);

        let mut expected = square(ChunkPos::new(0, 0), 1);
        expected.extend(square(ChunkPos::new(1, 0), 1));

        let journal = world.journal();
        assert_eq!(journal.ticked_chunks(DimensionId::OVERWORLD), expected);
        for pos in &expected {
            assert_eq!(journal.ticks_of(DimensionId::OVERWORLD, *pos), 1, "{pos}");
        }
        assert_eq!(journal.len(), expected.len() * 2);
    }

    #[test]
    fn test_two_dimensions_stay_separate() {
        let world = Arc::new(MemoryWorld::new());
        let overworld = world.region(DimensionId::OVERWORLD);
        let nether = world.region(DimensionId::NETHER);
        overworld.load_area(ChunkPos::new(0, 0), 6);
        nether.load_area(ChunkPos::new(0, 0), 6);

        let mut registry = MemoryRegistry::new();
        registry.spawn(&overworld, Vector3::new(3.0, 64.0, 3.0));
        registry.spawn(&nether, Vector3::new(85.0, 64.0, 90.0));

        let system = system(&world, Some(MemoryLevel::uniform(SimulationRange::ZERO)));
        let outcome = system.tick_step(&mut registry);

        assert_eq!(outcome.report().map(|r| r.dimensions), Some(2));
        let journal = world.journal();
        assert_eq!(
            journal.ticked_chunks(DimensionId::OVERWORLD),
            square(ChunkPos::new(0, 0), 0)
        );
        assert_eq!(
            journal.ticked_chunks(DimensionId::NETHER),
            square(ChunkPos::new(5, 5), 0)
        );
        // One residency check and one chunk lookup each.
        assert_eq!(overworld.queries(), 2);
        assert_eq!(nether.queries(), 2);
    }

    #[test]
    fn test_fallback_without_level() {
        let world = Arc::new(MemoryWorld::new());
        let overworld = world.region(DimensionId::OVERWORLD);
        overworld.load_area(ChunkPos::new(0, 0), 3);

        let mut registry = MemoryRegistry::new();
        registry.spawn(&overworld, Vector3::new(0.0, 64.0, 0.0));

        let system = system(&world, None);
        let outcome = system.tick_step(&mut registry);

        assert_eq!(outcome, StepOutcome::Fallback);
        assert!(outcome.ran_original());
        assert_eq!(system.original().calls(), 1);
        // The original ticks everything that is loaded, range or not, and
        // nothing else touches the world.
        let journal = world.journal();
        assert_eq!(journal.ticked_chunks(DimensionId::OVERWORLD).len(), 49);
        assert_eq!(journal.len(), 98);
        assert_eq!(journal.ticks_of(DimensionId::OVERWORLD, ChunkPos::new(0, 0)), 1);
        // Only the original's chunk lookups, no residency checks.
        assert_eq!(overworld.queries(), 49);
    }

    #[test]
    fn test_level_comes_and_goes() {
        let world = Arc::new(MemoryWorld::new());
        let overworld = world.region(DimensionId::OVERWORLD);
        overworld.load_area(ChunkPos::new(0, 0), 2);

        let mut registry = MemoryRegistry::new();
        registry.spawn(&overworld, Vector3::new(0.0, 64.0, 0.0));

        let system = system(&world, None);
        assert_eq!(system.tick_step(&mut registry), StepOutcome::Fallback);

        system
            .levels()
            .set_level(Some(MemoryLevel::uniform(SimulationRange::ZERO)));
        assert!(matches!(
            system.tick_step(&mut registry),
            StepOutcome::Replaced(StepReport { ticked: 1, .. })
        ));

        system.levels().set_level(None);
        assert_eq!(system.tick_step(&mut registry), StepOutcome::Fallback);
        assert_eq!(system.original().calls(), 2);
    }

    #[test]
    fn test_inactive_hook_runs_original() {
        let world = Arc::new(MemoryWorld::new());
        world.region(DimensionId::OVERWORLD).load(ChunkPos::new(7, 7));

        let system = system(&world, Some(MemoryLevel::uniform(SimulationRange::new(1))));
        system.hook().uninstall();

        let outcome = system.tick_step(&mut MemoryRegistry::new());
        assert_eq!(outcome, StepOutcome::Inactive);
        assert_eq!(system.original().calls(), 1);
        assert_eq!(world.journal().ticks_of(DimensionId::OVERWORLD, ChunkPos::new(7, 7)), 1);
    }

    #[test]
    fn test_deterministic_regardless_of_entity_order() {
        let positions = [
            Vector3::new(0.0, 64.0, 0.0),
            Vector3::new(40.0, 64.0, -3.0),
            Vector3::new(-70.0, 64.0, 33.0),
            Vector3::new(41.0, 64.0, -20.0),
        ];

        let run = |order: &[usize]| {
            let world = Arc::new(MemoryWorld::new());
            let overworld = world.region(DimensionId::OVERWORLD);
            overworld.load_area(ChunkPos::new(0, 0), 4);

            let mut registry = MemoryRegistry::new();
            for &i in order {
                registry.spawn(&overworld, positions[i]);
            }

            let system = system(&world, Some(MemoryLevel::uniform(SimulationRange::new(2))));
            let report = system.tick_step(&mut registry);
            (report, world.journal().ticked_chunks(DimensionId::OVERWORLD))
        };

        let forward = run(&[0, 1, 2, 3]);
        let backward = run(&[3, 2, 1, 0]);
        let shuffled = run(&[2, 0, 3, 1]);
        assert_eq!(forward, backward);
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn test_no_memory_between_steps() {
        let world = Arc::new(MemoryWorld::new());
        let overworld = world.region(DimensionId::OVERWORLD);
        overworld.load_area(ChunkPos::new(0, 0), 10);

        let mut registry = MemoryRegistry::new();
        let id = registry.spawn(&overworld, Vector3::new(0.0, 64.0, 0.0));

        let system = system(&world, Some(MemoryLevel::uniform(SimulationRange::new(1))));
        let first = system.tick_step(&mut registry);
        let second = system.tick_step(&mut registry);
        assert_eq!(first, second);

        world.journal().clear();
        if let Some(actor) = registry.actor(id) {
            actor.set_position(Vector3::new(160.0, 64.0, 0.0));
        }
        system.tick_step(&mut registry);

        // Chunks past x = 10 were never loaded.
        let expected: FxHashSet<_> = square(ChunkPos::new(10, 0), 1)
            .into_iter()
            .filter(|pos| pos.x() <= 10)
            .collect();
        assert_eq!(world.journal().ticked_chunks(DimensionId::OVERWORLD), expected);
    }

    #[test]
    fn test_range_correctness_against_brute_force() {
        let world = Arc::new(MemoryWorld::new());
        let overworld = world.region(DimensionId::OVERWORLD);
        // A patchy residency map.
        for x in -12i32..=12 {
            for z in -12..=12 {
                if (x * 7 + z * 3).rem_euclid(4) != 0 {
                    overworld.load(ChunkPos::new(x, z));
                }
            }
        }

        let positions = [
            Vector3::new(-100.0, 64.0, 12.0),
            Vector3::new(7.5, 64.0, 90.0),
            Vector3::new(33.0, 64.0, -64.0),
        ];
        let mut registry = MemoryRegistry::new();
        for pos in positions {
            registry.spawn(&overworld, pos);
        }

        let range = 3;
        let system = system(&world, Some(MemoryLevel::uniform(SimulationRange::new(range))));
        system.tick_step(&mut registry);

        let centers: Vec<_> = positions.iter().map(|p| ChunkPos::from_world(*p)).collect();
        let expected: FxHashSet<_> = overworld
            .loaded_chunks()
            .into_iter()
            .filter(|pos| centers.iter().any(|c| c.chebyshev_distance(*pos) <= range))
            .collect();

        assert!(!expected.is_empty());
        assert_eq!(world.journal().ticked_chunks(DimensionId::OVERWORLD), expected);
    }

    #[test]
    fn test_skipped_actor_contributes_nothing() {
        let world = Arc::new(MemoryWorld::new());
        let overworld = world.region(DimensionId::OVERWORLD);
        overworld.load_area(ChunkPos::new(0, 0), 8);

        let mut registry = MemoryRegistry::new();
        registry.spawn(&overworld, Vector3::new(0.0, 64.0, 0.0));
        let leaving = registry.spawn(&overworld, Vector3::new(100.0, 64.0, 100.0));
        registry.mark_despawning(leaving);

        let system = system(&world, Some(MemoryLevel::uniform(SimulationRange::ZERO)));
        let outcome = system.tick_step(&mut registry);

        assert_eq!(
            outcome.report().map(|r| (r.entities, r.skipped_actors, r.ticked)),
            Some((2, 1, 1))
        );
    }
}
