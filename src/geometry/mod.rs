//! Geometry primitives shared by the particle and level runtimes

pub mod aabb;
pub mod scissor;

pub use aabb::Aabb;
pub use scissor::BoxScissoring;
