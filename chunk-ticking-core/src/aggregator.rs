//! Second stage of a step: expand actor positions into a deduplicated set of
//! resident chunks per dimension.

use std::sync::Arc;

use chunk_ticking_utils::{ChunkPos, DimensionId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::engine::{BlockSource, Level};
use crate::locator::Located;

/// Unique chunks to tick this step, grouped by dimension.
pub type PendingChunkSet = FxHashMap<DimensionId, FxHashSet<ChunkPos>>;

/// Step-scoped region lookup.
///
/// The first actor seen in a dimension decides which region is used for the
/// rest of the step. Dropped together with the step's [`TickPlan`].
pub struct RegionCache<B> {
    regions: FxHashMap<DimensionId, Arc<B>>,
}

impl<B> RegionCache<B> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regions: FxHashMap::default(),
        }
    }

    /// Returns the cached region of `dimension`, caching `region` on first sight.
    pub fn get_or_insert(&mut self, dimension: DimensionId, region: Arc<B>) -> &Arc<B> {
        self.regions.entry(dimension).or_insert(region)
    }

    /// Returns the cached region of `dimension`.
    #[must_use]
    pub fn get(&self, dimension: DimensionId) -> Option<&Arc<B>> {
        self.regions.get(&dimension)
    }

    /// Number of dimensions with a cached region.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns true if no region has been cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl<B> Default for RegionCache<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Output of the aggregation stage, input of the dispatch stage.
pub struct TickPlan<B> {
    /// Chunks to tick, per dimension.
    pub pending: PendingChunkSet,
    /// Region to tick them through, per dimension.
    pub regions: RegionCache<B>,
    /// Neighbourhood candidates checked for residency.
    pub candidates: u64,
}

impl<B> TickPlan<B> {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: PendingChunkSet::default(),
            regions: RegionCache::new(),
            candidates: 0,
        }
    }

    /// Total number of unique chunks across all dimensions.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.values().map(FxHashSet::len).sum()
    }

    /// Whether `pos` in `dimension` is queued.
    #[must_use]
    pub fn contains(&self, dimension: DimensionId, pos: ChunkPos) -> bool {
        self.pending
            .get(&dimension)
            .is_some_and(|chunks| chunks.contains(&pos))
    }
}

impl<B> Default for TickPlan<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: BlockSource> TickPlan<B> {
    /// Adds the resident part of an actor's neighbourhood to the plan.
    ///
    /// Residency is checked through the dimension's cached region, not the
    /// actor's own handle. Candidates that are not resident are dropped; those
    /// that fall off the 32-bit chunk grid can never be resident and are skipped.
    pub fn add<L: Level + ?Sized>(&mut self, level: &L, located: Located<B>) {
        let Located {
            dimension,
            chunk: center,
            region,
        } = located;

        let region = self.regions.get_or_insert(dimension, region);
        let range = level.chunk_tick_range(dimension);
        self.candidates += range.area();

        let radius = range.radius();
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                let Some(pos) = center.offset(dx, dz) else {
                    continue;
                };
                if region.has_chunk(pos) {
                    self.pending.entry(dimension).or_default().insert(pos);
                }
            }
        }
    }
}

/// Builds the step's plan from located actors.
pub fn aggregate<L, B, I>(level: &L, located: I) -> TickPlan<B>
where
    L: Level + ?Sized,
    B: BlockSource,
    I: IntoIterator<Item = Located<B>>,
{
    let mut plan = TickPlan::new();
    for actor in located {
        plan.add(level, actor);
    }
    plan
}
