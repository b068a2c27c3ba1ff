//! BLS12-381 parameter preset.
//!
//! The curve is `y^2 = x^3 + 4` over `F_p`, with the cube-root
//! endomorphism pair `(lambda, beta)`: `lambda^3 = 1 (mod q)`,
//! `beta^3 = 1 (mod p)` and `(beta * x, y) = lambda * (x, y)` on G1. Two
//! valid pairs exist; this preset fixes `lambda = z^2 - 1`, whose negative
//! `q - z^2` pairs with the other cube root. The scalar field satisfies
//! `q = lambda^2 + lambda + 1` exactly, which the fast GLV split relies
//! on.

use lazy_static::lazy_static;
use num_bigint::BigUint;

/// Limb width for base-field engines; `R = 2^384 > 4p` holds.
pub const BASE_LIMB_WIDTH: u32 = 32;
/// Limb width for scalar-field work. 32 would give `k = 256` and violate
/// `R > 4q`; 29 gives `k = 261`.
pub const SCALAR_LIMB_WIDTH: u32 = 29;
/// Negated curve parameter (the BLS12-381 `z` is negative).
pub const MINUS_Z: u64 = 0xd201_0000_0001_0000;
/// Short-Weierstrass constant of `y^2 = x^3 + 4`.
pub const COEFF_B: u64 = 4;

lazy_static! {
    /// Base field modulus `p`, 381 bits.
    pub static ref MODULUS: BigUint = BigUint::parse_bytes(
        b"1a0111ea397fe69a4b1ba7b6434bacd764774b84f38512bf6730d2a0f6b0f6241eabfffeb153ffffb9feffffffffaaab",
        16
    )
    .unwrap();
    /// Scalar field modulus `q`, 255 bits.
    pub static ref SCALAR_MODULUS: BigUint = BigUint::parse_bytes(
        b"73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001",
        16
    )
    .unwrap();
    /// Endomorphism eigenvalue `lambda = z^2 - 1`, 128 bits.
    pub static ref LAMBDA: BigUint = BigUint::from(MINUS_Z) * MINUS_Z - 1u32;
    /// The cube root of unity in `F_p` matching `LAMBDA`.
    pub static ref BETA: BigUint = BigUint::parse_bytes(
        b"1a0111ea397fe699ec02408663d4de85aa0d857d89759ad4897d29650fb85f9b409427eb4f49fffd8bfd00000000aaac",
        16
    )
    .unwrap();
    /// G1 generator x coordinate.
    pub static ref G1_X: BigUint = BigUint::parse_bytes(
        b"17f1d3a73197d7942695638c4fa9ac0fc3688c4f9774b905a14e3a3f171bac586c55e83ff97a1aeffb3af00adb22c6bb",
        16
    )
    .unwrap();
    /// G1 generator y coordinate.
    pub static ref G1_Y: BigUint = BigUint::parse_bytes(
        b"08b3f481e3aaa0f1a09e30ed741d8ae4fcf5e095d5d00af600db18cb2c04b3edd03cc744a2888ae40caa232946c5e7e1",
        16
    )
    .unwrap();
}
