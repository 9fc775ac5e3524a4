//! First stage of a step: find where every simulatable actor is.

use std::sync::Arc;

use chunk_ticking_utils::{ChunkPos, DimensionId};

use crate::engine::{Actor, EntityRegistry};

/// Region type reachable from a registry's actors.
pub type RegionOf<R> = <<R as EntityRegistry>::Actor as Actor>::Region;

/// An actor's dimension, chunk and region, as seen at the start of the step.
pub struct Located<B> {
    /// Dimension the actor is in.
    pub dimension: DimensionId,
    /// Chunk containing the actor.
    pub chunk: ChunkPos,
    /// Region access for `dimension`.
    pub region: Arc<B>,
}

impl<B> Located<B> {
    /// Snapshots an actor.
    pub fn of<A: Actor<Region = B>>(actor: &A) -> Self {
        Self {
            dimension: actor.dimension_id(),
            chunk: ChunkPos::from_world(actor.position()),
            region: actor.dimension_block_source(),
        }
    }
}

/// Lazy iterator over the actors of an entity registry.
///
/// Entities whose actor can't be resolved are skipped and counted.
pub struct Locator<'a, R: EntityRegistry, I> {
    registry: &'a R,
    entities: I,
    visited: usize,
    skipped: usize,
}

/// Starts locating every simulatable actor in `registry`.
pub fn locate<R: EntityRegistry>(
    registry: &R,
) -> Locator<'_, R, impl Iterator<Item = R::EntityId> + '_> {
    Locator {
        registry,
        entities: registry.simulatable_entities(),
        visited: 0,
        skipped: 0,
    }
}

impl<R: EntityRegistry, I> Locator<'_, R, I> {
    /// Entities pulled from the registry so far.
    #[must_use]
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// Entities skipped because their actor could not be resolved.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R, I> Iterator for Locator<'_, R, I>
where
    R: EntityRegistry,
    I: Iterator<Item = R::EntityId>,
{
    type Item = Located<RegionOf<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entity = self.entities.next()?;
            self.visited += 1;

            let Some(actor) = self.registry.try_get_actor(entity) else {
                self.skipped += 1;
                continue;
            };

            return Some(Located::of(actor));
        }
    }
}

#[cfg(test)]
mod tests {
    use chunk_ticking_utils::math::Vector3;

    use super::*;
    use crate::memory::{MemoryRegistry, MemoryWorld};

    #[test]
    fn test_locates_actor_chunks() {
        let world = MemoryWorld::new();
        let overworld = world.region(DimensionId::OVERWORLD);
        let nether = world.region(DimensionId::NETHER);

        let mut registry = MemoryRegistry::new();
        registry.spawn(&overworld, Vector3::new(0.0, 64.0, 0.0));
        registry.spawn(&nether, Vector3::new(-17.0, 30.0, 40.5));

        let mut located: Vec<_> = locate(&registry)
            .map(|l| (l.dimension, l.chunk))
            .collect();
        located.sort();

        assert_eq!(
            located,
            vec![
                (DimensionId::OVERWORLD, ChunkPos::new(0, 0)),
                (DimensionId::NETHER, ChunkPos::new(-2, 2)),
            ]
        );
    }

    #[test]
    fn test_skips_unresolvable_entities() {
        let world = MemoryWorld::new();
        let overworld = world.region(DimensionId::OVERWORLD);

        let mut registry = MemoryRegistry::new();
        registry.spawn(&overworld, Vector3::new(0.0, 64.0, 0.0));
        let despawning = registry.spawn(&overworld, Vector3::new(100.0, 64.0, 0.0));
        registry.mark_despawning(despawning);

        let mut locator = locate(&registry);
        let chunks: Vec<_> = locator.by_ref().map(|l| l.chunk).collect();

        assert_eq!(chunks, vec![ChunkPos::new(0, 0)]);
        assert_eq!(locator.visited(), 2);
        assert_eq!(locator.skipped(), 1);
    }

    #[test]
    fn test_ignores_entities_without_capability() {
        let world = MemoryWorld::new();
        let overworld = world.region(DimensionId::OVERWORLD);

        let mut registry = MemoryRegistry::new();
        registry.spawn_passive(&overworld, Vector3::new(0.0, 64.0, 0.0));

        let mut locator = locate(&registry);
        assert!(locator.next().is_none());
        assert_eq!(locator.visited(), 0);
    }
}
