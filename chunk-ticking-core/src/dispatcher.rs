//! Last stage of a step: tick every planned chunk exactly once.

use crate::aggregator::TickPlan;
use crate::engine::{BlockSource, TickingChunk};
use crate::report::StepReport;

/// Ticks every chunk in `plan` through its dimension's cached region.
///
/// Each chunk gets its block tick followed by its block entity tick. Chunks
/// unloaded since aggregation are skipped; residency was a snapshot, not a lock.
pub fn dispatch<B: BlockSource>(plan: &TickPlan<B>, report: &mut StepReport) {
    for (&dimension, chunks) in &plan.pending {
        debug_assert!(
            plan.regions.get(dimension).is_some(),
            "no region cached for {dimension}"
        );
        let Some(region) = plan.regions.get(dimension) else {
            log::warn!(
                "Skipping {} chunk(s) in {dimension}: no region cached",
                chunks.len()
            );
            report.skipped_dimensions += 1;
            continue;
        };
        let region: &B = region;

        for &pos in chunks {
            let Some(chunk) = region.get_chunk(pos) else {
                report.missed_chunks += 1;
                continue;
            };

            chunk.tick_blocks(region);
            chunk.tick_block_entities(region);
            report.ticked += 1;
        }
    }
}
