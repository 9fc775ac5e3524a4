//! # Chunk Ticking Utils
//!
//! Shared value types for the chunk ticking workspace: chunk and dimension
//! identifiers and the small vector types positions are expressed in.

pub mod math;
mod types;

pub use types::{CHUNK_SHIFT, ChunkPos, DimensionId};
