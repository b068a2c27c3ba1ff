//! Full-size tests over the BLS12-381 presets, checked against num-bigint.

use rand_core::SeedableRng;
use rand_xorshift::XorShiftRng;

use crate::bls12_381;
use crate::{FieldEngine, GlvDecomposer};

mod field;

pub(crate) const SEED: [u8; 16] = [
    0x59, 0x62, 0xbe, 0x5d, 0x76, 0x3d, 0x31, 0x8d, 0x17, 0xdb, 0x37, 0x32, 0x54, 0x06, 0xbc, 0xe5,
];

pub(crate) fn rng() -> XorShiftRng {
    XorShiftRng::from_seed(SEED)
}

pub(crate) fn base_engine() -> FieldEngine {
    FieldEngine::new(&bls12_381::MODULUS, bls12_381::BASE_LIMB_WIDTH).unwrap()
}

pub(crate) fn scalar_glv() -> GlvDecomposer {
    GlvDecomposer::new(
        &bls12_381::SCALAR_MODULUS,
        &bls12_381::LAMBDA,
        bls12_381::SCALAR_LIMB_WIDTH,
    )
    .unwrap()
}
