//! Read-only view of the host engine consumed by the ticking step.
//!
//! The host implements these traits over its own world types. Every lookup is
//! expected to be an in-memory, non-blocking query; the step never holds on to
//! anything it gets from here past the end of the step.

use std::sync::Arc;

use chunk_ticking_utils::{ChunkPos, DimensionId, math::Vector3};

use crate::range::SimulationRange;

/// Resolves the currently active level.
pub trait LevelService {
    /// The level type handed out by this service.
    type Level: Level + ?Sized;

    /// Returns the active level, or `None` while the server has no level
    /// (startup, shutdown, level switches).
    fn level(&self) -> Option<Arc<Self::Level>>;
}

/// The active level.
pub trait Level {
    /// Returns the chunk tick range configured for a dimension.
    fn chunk_tick_range(&self, dimension: DimensionId) -> SimulationRange;
}

/// The live entity index.
pub trait EntityRegistry {
    /// Handle to an entity in the index.
    type EntityId: Copy;
    /// The actor object owning simulatable entities.
    type Actor: Actor;

    /// Iterates every entity carrying the simulatable actor capability.
    fn simulatable_entities(&self) -> impl Iterator<Item = Self::EntityId> + '_;

    /// Resolves the actor owning an entity.
    ///
    /// Returns `None` when the entity is in a transient state (being spawned or
    /// despawned) and can't be treated as a live actor this tick.
    fn try_get_actor(&self, entity: Self::EntityId) -> Option<&Self::Actor>;
}

/// A live actor in some dimension.
pub trait Actor {
    /// The region type of the actor's dimension.
    type Region: BlockSource;

    /// The dimension the actor is in.
    fn dimension_id(&self) -> DimensionId;

    /// Exact world position.
    fn position(&self) -> Vector3<f64>;

    /// Region access for the actor's dimension.
    ///
    /// Any two actors in the same dimension must hand out interchangeable
    /// regions; there is a single region state per dimension.
    fn dimension_block_source(&self) -> Arc<Self::Region>;
}

/// Region access for one dimension.
pub trait BlockSource {
    /// The chunk type held by the region.
    type Chunk: TickingChunk<Self>;

    /// Whether the chunk at `pos` is currently resident.
    fn has_chunk(&self, pos: ChunkPos) -> bool;

    /// Resolves a resident chunk. `None` if it is not (or no longer) loaded.
    fn get_chunk(&self, pos: ChunkPos) -> Option<Arc<Self::Chunk>>;
}

/// The per-chunk simulation sub-steps.
pub trait TickingChunk<R: ?Sized> {
    /// Ticks terrain: random block ticks and block updates.
    fn tick_blocks(&self, region: &R);

    /// Ticks the block entities stored in the chunk.
    fn tick_block_entities(&self, region: &R);
}
