//! Core math and geometry primitives for `arcam`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt3`, ...),
//! - the pinhole camera with Brown-Conrady lens distortion,
//! - the projection engine mapping target points into pixels,
//! - the declarative overlay shape library,
//! - observation containers and synthetic data helpers used by tests.
//!
//! Camera pipeline:
//! `pixel = K ∘ distortion ∘ perspective_divide ∘ (R p + t)`

/// Linear algebra type aliases and helpers.
pub mod math;
/// Camera models and distortion utilities.
pub mod models;
/// Wireframe shapes rendered on top of a tracked target.
pub mod overlay;
/// Projection of target-frame points into image pixels.
pub mod projection;
/// Deterministic synthetic targets, poses and noise.
pub mod synthetic;
/// Observation containers.
pub mod types;

pub use math::*;
pub use models::*;
pub use overlay::*;
pub use projection::*;
pub use types::*;
