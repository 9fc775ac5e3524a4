//! A small in-memory world for the host to tick.

use std::f64::consts::TAU;
use std::sync::Arc;

use chunk_ticking_core::memory::{MemoryEntityId, MemoryRegistry, MemoryWorld};
use chunk_ticking_utils::{ChunkPos, DimensionId, math::Vector3};

/// Chunks kept loaded around spawn in every dimension.
const LOADED_RADIUS: i32 = 12;
const WALKERS_PER_DIMENSION: u32 = 6;
/// Blocks between a walker and the center of its circle.
const WALK_RADIUS: f64 = 96.0;
/// Radians per step.
const ANGULAR_SPEED: f64 = 0.01;

struct Walker {
    id: MemoryEntityId,
    center: Vector3<f64>,
    phase: f64,
}

impl Walker {
    fn position_at(&self, step: u64) -> Vector3<f64> {
        let angle = self.phase + step as f64 * ANGULAR_SPEED;
        Vector3::new(
            self.center.x + WALK_RADIUS * angle.cos(),
            self.center.y,
            self.center.z + WALK_RADIUS * angle.sin(),
        )
    }
}

/// Entities walking in circles over a loaded square of chunks.
pub struct Sandbox {
    world: Arc<MemoryWorld>,
    registry: MemoryRegistry,
    walkers: Vec<Walker>,
    step: u64,
}

impl Sandbox {
    /// Builds the world with one loaded square and a few walkers per dimension.
    pub fn new(dimensions: &[DimensionId]) -> Self {
        let world = Arc::new(MemoryWorld::untracked());
        let mut registry = MemoryRegistry::new();
        let mut walkers = Vec::new();

        for (row, &dimension) in dimensions.iter().enumerate() {
            let region = world.region(dimension);
            region.load_area(ChunkPos::new(0, 0), LOADED_RADIUS);

            for i in 0..WALKERS_PER_DIMENSION {
                let walker = Walker {
                    id: MemoryEntityId(0),
                    center: Vector3::new(f64::from(i) * 24.0 - 60.0, 64.0, row as f64 * 32.0),
                    phase: f64::from(i) * TAU / f64::from(WALKERS_PER_DIMENSION),
                };
                let id = registry.spawn(&region, walker.position_at(0));
                walkers.push(Walker { id, ..walker });
            }

            // Dropped item: indexed but never simulated.
            registry.spawn_passive(&region, Vector3::new(8.0, 64.0, 8.0));
        }

        log::info!(
            "Sandbox ready: {} dimension(s), {} entities, {} walking",
            dimensions.len(),
            registry.len(),
            walkers.len()
        );

        Self {
            world,
            registry,
            walkers,
            step: 0,
        }
    }

    /// The world the walkers live in.
    pub fn world(&self) -> &Arc<MemoryWorld> {
        &self.world
    }

    /// The entity index handed to the ticking system.
    pub fn registry_mut(&mut self) -> &mut MemoryRegistry {
        &mut self.registry
    }

    /// Moves every walker one step along its circle.
    pub fn advance(&mut self) {
        self.step += 1;
        for walker in &self.walkers {
            if let Some(actor) = self.registry.actor(walker.id) {
                actor.set_position(walker.position_at(self.step));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chunk_ticking_core::engine::{Actor, EntityRegistry};

    use super::*;

    #[test]
    fn test_only_walkers_are_simulatable() {
        let mut sandbox = Sandbox::new(&[DimensionId::OVERWORLD, DimensionId::NETHER]);
        let registry = sandbox.registry_mut();

        assert_eq!(registry.len(), 14);
        assert_eq!(registry.simulatable_entities().count(), 12);
        assert_eq!(sandbox.world().regions().len(), 2);
    }

    #[test]
    fn test_advance_moves_walkers() {
        let mut sandbox = Sandbox::new(&[DimensionId::OVERWORLD]);
        let id = MemoryEntityId(0);
        let before = sandbox.registry_mut().actor(id).map(Actor::position);

        sandbox.advance();
        let after = sandbox.registry_mut().actor(id).map(Actor::position);

        assert!(before.is_some());
        assert_ne!(before, after);
    }
}
