//! Per-step diagnostics.

use std::fmt::{self, Display};
use std::ops::AddAssign;

/// Counters collected while running one replacement step.
///
/// A report only ever describes a single step; nothing in it is carried over
/// to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepReport {
    /// Entities carrying the simulatable capability.
    pub entities: usize,
    /// Entities whose actor could not be resolved.
    pub skipped_actors: usize,
    /// Dimensions that had at least one actor.
    pub dimensions: usize,
    /// Neighbourhood candidates checked for residency.
    pub candidates: u64,
    /// Unique resident chunks queued for dispatch.
    pub pending: usize,
    /// Chunks that were ticked.
    pub ticked: usize,
    /// Queued chunks that were unloaded before dispatch.
    pub missed_chunks: usize,
    /// Dimensions skipped at dispatch because no region was cached.
    pub skipped_dimensions: usize,
}

impl AddAssign for StepReport {
    fn add_assign(&mut self, rhs: Self) {
        self.entities += rhs.entities;
        self.skipped_actors += rhs.skipped_actors;
        self.dimensions += rhs.dimensions;
        self.candidates += rhs.candidates;
        self.pending += rhs.pending;
        self.ticked += rhs.ticked;
        self.missed_chunks += rhs.missed_chunks;
        self.skipped_dimensions += rhs.skipped_dimensions;
    }
}

impl Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entities ({} skipped) in {} dimension(s), {} candidates, {} pending, {} ticked, {} missed",
            self.entities,
            self.skipped_actors,
            self.dimensions,
            self.candidates,
            self.pending,
            self.ticked,
            self.missed_chunks,
        )
    }
}

/// What a call to the ticking system ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The override is installed but not active; the original system ran.
    Inactive,
    /// No level was available; the original system ran unmodified.
    Fallback,
    /// The deduplicated step ran and owned the whole tick.
    Replaced(StepReport),
}

impl StepOutcome {
    /// The report, if the replacement step ran.
    #[must_use]
    pub const fn report(&self) -> Option<&StepReport> {
        match self {
            Self::Replaced(report) => Some(report),
            Self::Inactive | Self::Fallback => None,
        }
    }

    /// Whether the original system handled this tick.
    #[must_use]
    pub const fn ran_original(&self) -> bool {
        matches!(self, Self::Inactive | Self::Fallback)
    }
}
