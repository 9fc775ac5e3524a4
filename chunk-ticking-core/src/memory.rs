//! RAM-only engine.
//!
//! This module provides an in-memory implementation of every engine trait the
//! ticking step consumes. Useful for:
//! - Unit tests and benchmarks
//! - The sandbox host binary
//! - Checking a host integration against a known-good reference
//!
//! Chunks hold no terrain; ticking one only bumps its counters and, when the
//! world records, appends to the shared [`TickJournal`].

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use arc_swap::ArcSwapOption;
use chunk_ticking_utils::{ChunkPos, DimensionId, math::Vector3};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use scc::HashMap;
use uuid::Uuid;

use crate::engine::{Actor, BlockSource, EntityRegistry, Level, LevelService, TickingChunk};
use crate::range::SimulationRange;
use crate::system::LevelChunkTickingSystem;

/// Which per-chunk sub-step ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickPhase {
    /// `tick_blocks`.
    Blocks,
    /// `tick_block_entities`.
    BlockEntities,
}

/// One recorded chunk tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickEvent {
    /// Dimension of the region the tick went through.
    pub dimension: DimensionId,
    /// The ticked chunk.
    pub pos: ChunkPos,
    /// The sub-step.
    pub phase: TickPhase,
}

/// Ordered log of chunk ticks across a world.
pub struct TickJournal {
    events: Mutex<Vec<TickEvent>>,
    recording: AtomicBool,
}

impl TickJournal {
    fn new(recording: bool) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            recording: AtomicBool::new(recording),
        }
    }

    fn record(&self, event: TickEvent) {
        if self.recording.load(Ordering::Relaxed) {
            self.events.lock().push(event);
        }
    }

    /// Returns a copy of all recorded events, in tick order.
    #[must_use]
    pub fn events(&self) -> Vec<TickEvent> {
        self.events.lock().clone()
    }

    /// Number of block ticks recorded for a chunk.
    #[must_use]
    pub fn ticks_of(&self, dimension: DimensionId, pos: ChunkPos) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.dimension == dimension && e.pos == pos && e.phase == TickPhase::Blocks)
            .count()
    }

    /// The set of chunks that got a block tick in a dimension.
    #[must_use]
    pub fn ticked_chunks(&self, dimension: DimensionId) -> FxHashSet<ChunkPos> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.dimension == dimension && e.phase == TickPhase::Blocks)
            .map(|e| e.pos)
            .collect()
    }

    /// Drops every recorded event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

/// A resident chunk with tick counters.
pub struct MemoryChunk {
    pos: ChunkPos,
    block_ticks: AtomicU64,
    block_entity_ticks: AtomicU64,
    journal: Arc<TickJournal>,
}

impl MemoryChunk {
    /// The chunk's position.
    #[must_use]
    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    /// Times `tick_blocks` ran on this chunk.
    #[must_use]
    pub fn block_ticks(&self) -> u64 {
        self.block_ticks.load(Ordering::Relaxed)
    }

    /// Times `tick_block_entities` ran on this chunk.
    #[must_use]
    pub fn block_entity_ticks(&self) -> u64 {
        self.block_entity_ticks.load(Ordering::Relaxed)
    }
}

impl TickingChunk<MemoryRegion> for MemoryChunk {
    fn tick_blocks(&self, region: &MemoryRegion) {
        self.block_ticks.fetch_add(1, Ordering::Relaxed);
        self.journal.record(TickEvent {
            dimension: region.dimension,
            pos: self.pos,
            phase: TickPhase::Blocks,
        });
    }

    fn tick_block_entities(&self, region: &MemoryRegion) {
        self.block_entity_ticks.fetch_add(1, Ordering::Relaxed);
        self.journal.record(TickEvent {
            dimension: region.dimension,
            pos: self.pos,
            phase: TickPhase::BlockEntities,
        });
    }
}

/// Resident chunks of one dimension.
pub struct MemoryRegion {
    dimension: DimensionId,
    chunks: HashMap<ChunkPos, Arc<MemoryChunk>>,
    journal: Arc<TickJournal>,
    queries: AtomicU64,
}

impl MemoryRegion {
    fn new(dimension: DimensionId, journal: Arc<TickJournal>) -> Self {
        Self {
            dimension,
            chunks: HashMap::new(),
            journal,
            queries: AtomicU64::new(0),
        }
    }

    /// The dimension this region belongs to.
    #[must_use]
    pub fn dimension(&self) -> DimensionId {
        self.dimension
    }

    /// Makes a chunk resident. Returns false if it already was.
    pub fn load(&self, pos: ChunkPos) -> bool {
        let chunk = Arc::new(MemoryChunk {
            pos,
            block_ticks: AtomicU64::new(0),
            block_entity_ticks: AtomicU64::new(0),
            journal: self.journal.clone(),
        });
        self.chunks.insert_sync(pos, chunk).is_ok()
    }

    /// Makes every chunk within Chebyshev `radius` of `center` resident.
    pub fn load_area(&self, center: ChunkPos, radius: i32) {
        let radius = i64::from(radius);
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                if let Some(pos) = center.offset(dx, dz) {
                    self.load(pos);
                }
            }
        }
    }

    /// Unloads a chunk. Returns false if it was not resident.
    pub fn unload(&self, pos: ChunkPos) -> bool {
        self.chunks.remove_sync(&pos).is_some()
    }

    /// Positions of every resident chunk, in no particular order.
    #[must_use]
    pub fn loaded_chunks(&self) -> Vec<ChunkPos> {
        let mut chunks = Vec::with_capacity(self.chunks.len());
        self.chunks.iter_sync(|pos, _| {
            chunks.push(*pos);
            true
        });
        chunks
    }

    /// Number of resident chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if no chunk is resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of residency and chunk lookups served so far.
    #[must_use]
    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}

impl BlockSource for MemoryRegion {
    type Chunk = MemoryChunk;

    fn has_chunk(&self, pos: ChunkPos) -> bool {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.chunks.read_sync(&pos, |_, _| ()).is_some()
    }

    fn get_chunk(&self, pos: ChunkPos) -> Option<Arc<MemoryChunk>> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.chunks.read_sync(&pos, |_, chunk| chunk.clone())
    }
}

/// All dimensions of an in-memory world.
pub struct MemoryWorld {
    regions: HashMap<DimensionId, Arc<MemoryRegion>>,
    journal: Arc<TickJournal>,
}

impl MemoryWorld {
    /// Creates a world that records every chunk tick in its journal.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::with_journal(true)
    }

    /// Creates a world that only keeps per-chunk counters.
    #[must_use]
    pub fn untracked() -> Self {
        Self::with_journal(false)
    }

    fn with_journal(recording: bool) -> Self {
        Self {
            regions: HashMap::new(),
            journal: Arc::new(TickJournal::new(recording)),
        }
    }

    /// Returns the region of `dimension`, creating it on first use.
    pub fn region(&self, dimension: DimensionId) -> Arc<MemoryRegion> {
        if let Some(region) = self.regions.read_sync(&dimension, |_, r| r.clone()) {
            return region;
        }

        let region = Arc::new(MemoryRegion::new(dimension, self.journal.clone()));
        match self.regions.insert_sync(dimension, region.clone()) {
            Ok(()) => region,
            // Lost a race with another creator; use theirs.
            Err(_) => self
                .regions
                .read_sync(&dimension, |_, r| r.clone())
                .unwrap_or(region),
        }
    }

    /// Every region created so far.
    #[must_use]
    pub fn regions(&self) -> Vec<Arc<MemoryRegion>> {
        let mut regions = Vec::with_capacity(self.regions.len());
        self.regions.iter_sync(|_, region| {
            regions.push(region.clone());
            true
        });
        regions
    }

    /// The world's tick journal.
    #[must_use]
    pub fn journal(&self) -> &TickJournal {
        &self.journal
    }
}

/// A live actor.
pub struct MemoryActor {
    uuid: Uuid,
    position: Mutex<Vector3<f64>>,
    region: Arc<MemoryRegion>,
}

impl MemoryActor {
    /// The actor's UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Teleports the actor within its dimension.
    pub fn set_position(&self, pos: Vector3<f64>) {
        *self.position.lock() = pos;
    }
}

impl Actor for MemoryActor {
    type Region = MemoryRegion;

    fn dimension_id(&self) -> DimensionId {
        self.region.dimension
    }

    fn position(&self) -> Vector3<f64> {
        *self.position.lock()
    }

    fn dimension_block_source(&self) -> Arc<MemoryRegion> {
        self.region.clone()
    }
}

/// Handle to an entity in a [`MemoryRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryEntityId(pub u32);

struct MemoryEntity {
    actor: MemoryActor,
    simulatable: bool,
    despawning: bool,
}

/// Entity index. Iterates in spawn order.
#[derive(Default)]
pub struct MemoryRegistry {
    entities: Vec<Option<MemoryEntity>>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(
        &mut self,
        region: &Arc<MemoryRegion>,
        pos: Vector3<f64>,
        simulatable: bool,
    ) -> MemoryEntityId {
        let id = MemoryEntityId(self.entities.len() as u32);
        self.entities.push(Some(MemoryEntity {
            actor: MemoryActor {
                uuid: Uuid::new_v4(),
                position: Mutex::new(pos),
                region: region.clone(),
            },
            simulatable,
            despawning: false,
        }));
        id
    }

    /// Spawns a simulatable actor.
    pub fn spawn(&mut self, region: &Arc<MemoryRegion>, pos: Vector3<f64>) -> MemoryEntityId {
        self.insert(region, pos, true)
    }

    /// Spawns an entity without the simulatable capability (e.g. a marker).
    pub fn spawn_passive(
        &mut self,
        region: &Arc<MemoryRegion>,
        pos: Vector3<f64>,
    ) -> MemoryEntityId {
        self.insert(region, pos, false)
    }

    /// Puts an entity in the transient despawning state: still indexed, but its
    /// actor no longer resolves.
    pub fn mark_despawning(&mut self, id: MemoryEntityId) {
        if let Some(Some(entity)) = self.entities.get_mut(id.0 as usize) {
            entity.despawning = true;
        }
    }

    /// Removes an entity from the index.
    pub fn despawn(&mut self, id: MemoryEntityId) -> bool {
        self.entities
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .is_some()
    }

    /// Returns an entity's actor, whatever its state.
    #[must_use]
    pub fn actor(&self, id: MemoryEntityId) -> Option<&MemoryActor> {
        self.entities
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .map(|entity| &entity.actor)
    }

    /// Finds a live entity by its actor's UUID.
    #[must_use]
    pub fn find(&self, uuid: Uuid) -> Option<MemoryEntityId> {
        self.entities
            .iter()
            .position(|entity| entity.as_ref().is_some_and(|e| e.actor.uuid == uuid))
            .map(|index| MemoryEntityId(index as u32))
    }

    /// Number of indexed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.iter().flatten().count()
    }

    /// Returns true if no entity is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntityRegistry for MemoryRegistry {
    type EntityId = MemoryEntityId;
    type Actor = MemoryActor;

    fn simulatable_entities(&self) -> impl Iterator<Item = MemoryEntityId> + '_ {
        self.entities
            .iter()
            .enumerate()
            .filter_map(|(index, entity)| {
                entity
                    .as_ref()
                    .filter(|entity| entity.simulatable)
                    .map(|_| MemoryEntityId(index as u32))
            })
    }

    fn try_get_actor(&self, entity: MemoryEntityId) -> Option<&MemoryActor> {
        self.entities
            .get(entity.0 as usize)?
            .as_ref()
            .filter(|entity| !entity.despawning)
            .map(|entity| &entity.actor)
    }
}

/// Level with per-dimension tick ranges.
pub struct MemoryLevel {
    default_range: SimulationRange,
    ranges: FxHashMap<DimensionId, SimulationRange>,
}

impl MemoryLevel {
    /// A level where every dimension uses `range`.
    #[must_use]
    pub fn uniform(range: SimulationRange) -> Self {
        Self {
            default_range: range,
            ranges: FxHashMap::default(),
        }
    }

    /// Overrides the range of one dimension.
    #[must_use]
    pub fn with_range(mut self, dimension: DimensionId, range: SimulationRange) -> Self {
        self.ranges.insert(dimension, range);
        self
    }
}

impl Level for MemoryLevel {
    fn chunk_tick_range(&self, dimension: DimensionId) -> SimulationRange {
        self.ranges
            .get(&dimension)
            .copied()
            .unwrap_or(self.default_range)
    }
}

/// Hands out the active [`MemoryLevel`], if any.
pub struct MemoryLevelService {
    level: ArcSwapOption<MemoryLevel>,
}

impl MemoryLevelService {
    /// A service with an active level.
    #[must_use]
    pub fn new(level: MemoryLevel) -> Self {
        Self {
            level: ArcSwapOption::new(Some(Arc::new(level))),
        }
    }

    /// A service with no active level.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            level: ArcSwapOption::empty(),
        }
    }

    /// Replaces (or removes) the active level.
    pub fn set_level(&self, level: Option<MemoryLevel>) {
        self.level.store(level.map(Arc::new));
    }
}

impl LevelService for MemoryLevelService {
    type Level = MemoryLevel;

    fn level(&self) -> Option<Arc<MemoryLevel>> {
        self.level.load_full()
    }
}

/// The unoptimised behaviour: tick every resident chunk of every dimension.
pub struct TickAllLoaded {
    world: Arc<MemoryWorld>,
    calls: AtomicU64,
}

impl TickAllLoaded {
    /// Creates the system over `world`.
    #[must_use]
    pub fn new(world: Arc<MemoryWorld>) -> Self {
        Self {
            world,
            calls: AtomicU64::new(0),
        }
    }

    /// How many times this system ran.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl LevelChunkTickingSystem<MemoryRegistry> for TickAllLoaded {
    fn tick(&self, _registry: &mut MemoryRegistry) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        for region in self.world.regions() {
            for pos in region.loaded_chunks() {
                if let Some(chunk) = region.get_chunk(pos) {
                    chunk.tick_blocks(&*region);
                    chunk.tick_block_entities(&*region);
                }
            }
        }
    }
}
