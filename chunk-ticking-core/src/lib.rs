//! # Chunk Ticking Core
//!
//! Entity-driven, deduplicated chunk ticking for a voxel world engine.
//!
//! Each simulation step collects the resident chunks within simulation range
//! of any active entity, groups them per dimension and ticks every one of them
//! exactly once, instead of once per nearby entity.
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    missing_docs,
    clippy::unwrap_used
)]
#![allow(
    clippy::single_call_fn,
    clippy::multiple_inherent_impl,
    clippy::shadow_unrelated,
    clippy::missing_errors_doc,
    clippy::struct_excessive_bools,
    clippy::needless_pass_by_value,
    clippy::cargo_common_metadata
)]

pub mod aggregator;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod locator;
pub mod memory;
pub mod plugin;
pub mod range;
pub mod report;
pub mod system;

pub use config::{ConfigError, TickingConfig};
pub use range::{RangeError, SimulationRange};
pub use report::{StepOutcome, StepReport};
pub use system::{LevelChunkTickingSystem, OptimizedChunkTicking, TickHook, tick_chunks};
