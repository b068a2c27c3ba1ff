//! Limb layout derived from a modulus and a limb width.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::Error;

/// Limbs wider than 32 bits would overflow the `u64` carry chains.
pub const MAX_LIMB_WIDTH: u32 = 32;

/// Derived constants for a `(modulus, w)` pair.
///
/// An element occupies `n` limbs of `w` bits each, where
/// `n = ceil((bit_length + 1) / w)`. The extra bit guarantees the Montgomery
/// radix `R = 2^k` with `k = n * w` satisfies `R > 2 * modulus`, which the
/// lazy-reduction representation relies on. The modulus need not be prime
/// or odd here; Montgomery-specific requirements are checked by the field
/// engine.
#[derive(Clone, Debug)]
pub struct LimbLayout {
    pub w: u32,
    pub n: usize,
    pub k: u32,
    pub bit_length: u32,
    pub n_packed_bytes: usize,
    pub limb_mask: u64,
}

impl LimbLayout {
    pub fn new(modulus: &BigUint, w: u32) -> Result<Self, Error> {
        if w == 0 {
            return Err(Error::WordSizeZero);
        }
        if w > MAX_LIMB_WIDTH {
            return Err(Error::WordSizeTooLarge(w));
        }
        let bit_length = modulus.bits() as u32;
        let n = ((bit_length + 1 + w - 1) / w) as usize;
        Ok(LimbLayout {
            w,
            n,
            k: n as u32 * w,
            bit_length,
            n_packed_bytes: ((bit_length + 7) / 8) as usize,
            limb_mask: (1u64 << w) - 1,
        })
    }

    /// Little-endian w-bit limbs of `x`, `len` of them. `x` must fit.
    pub fn to_limbs_len(&self, x: &BigUint, len: usize) -> Vec<u64> {
        let mut limbs = vec![0u64; len];
        bytes_to_limbs(&mut limbs, &x.to_bytes_le(), self.w);
        limbs
    }

    pub fn to_limbs(&self, x: &BigUint) -> Vec<u64> {
        self.to_limbs_len(x, self.n)
    }

    pub fn from_limbs(&self, limbs: &[u64]) -> BigUint {
        let mut x = BigUint::zero();
        for &limb in limbs.iter().rev() {
            x = (x << self.w) | BigUint::from(limb);
        }
        x
    }
}

/// Repack little-endian bytes into little-endian w-bit limbs, zero-padding
/// the tail. The value must fit the limb capacity.
pub(crate) fn bytes_to_limbs(limbs: &mut [u64], bytes: &[u8], w: u32) {
    let mask = (1u64 << w) - 1;
    let mut acc: u64 = 0;
    let mut acc_bits = 0;
    let mut i = 0;
    for &byte in bytes {
        // acc never holds more than w - 1 + 8 <= 39 bits
        acc |= (byte as u64) << acc_bits;
        acc_bits += 8;
        while acc_bits >= w {
            debug_assert!(i < limbs.len(), "value exceeds limb capacity");
            limbs[i] = acc & mask;
            i += 1;
            acc >>= w;
            acc_bits -= w;
        }
    }
    if acc_bits > 0 {
        debug_assert!(i < limbs.len() || acc == 0, "value exceeds limb capacity");
        if i < limbs.len() {
            limbs[i] = acc;
            i += 1;
        }
    }
    limbs[i..].fill(0);
}

/// Repack little-endian w-bit limbs into little-endian bytes. Limb content
/// beyond the byte capacity must be zero.
pub(crate) fn limbs_to_bytes(bytes: &mut [u8], limbs: &[u64], w: u32) {
    let mut acc: u64 = 0;
    let mut acc_bits = 0;
    let mut i = 0;
    for &limb in limbs {
        acc |= limb << acc_bits;
        acc_bits += w;
        while acc_bits >= 8 {
            if i == bytes.len() {
                debug_assert!(acc == 0, "value exceeds byte capacity");
                return;
            }
            bytes[i] = acc as u8;
            i += 1;
            acc >>= 8;
            acc_bits -= 8;
        }
    }
    while i < bytes.len() {
        bytes[i] = acc as u8;
        i += 1;
        acc >>= 8;
    }
}
