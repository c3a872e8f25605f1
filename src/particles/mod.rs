//! Particle allocation engine
//!
//! Live simulation state (tiles, pawns, effects) is stored as typed particles
//! grouped in allocations; each layer turns its allocations into one vertex
//! buffer and draws it in a single batched call.

pub mod allocation;
pub mod kind;
pub mod layer;
pub mod manager;

pub use allocation::{AllocationId, Ownership, ParticleAllocation};
pub use kind::ParticleKind;
pub use layer::{ParticleLayer, ParticleLayerBase};
pub use manager::ParticleManager;
