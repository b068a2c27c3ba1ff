//! Finite-field and scalar kernels for multi-scalar multiplication.
//!
//! The crate is organized around a flat [`MemoryArena`] of field elements
//! addressed by opaque [`Ptr`] handles. A [`FieldEngine`] owns one arena
//! and provides Montgomery arithmetic, batch inversion and square roots
//! over a runtime modulus; [`GlvDecomposer`] and [`GeneralGlvDecomposer`]
//! split MSM scalars into endomorphism halves. The [`bls12_381`] module
//! carries the curve preset these kernels are tuned for.

mod arena;
mod arithmetic;
pub mod bls12_381;
mod curve;
mod error;
mod field;
mod glv;
mod inverse;
mod layout;
mod sqrt;

pub use arena::{MemoryArena, Ptr};
pub use error::Error;
pub use field::{FieldConstants, FieldEngine};
pub use glv::{GeneralGlvDecomposer, GlvDecomposer};
pub use layout::{LimbLayout, MAX_LIMB_WIDTH};

#[cfg(test)]
mod tests;
