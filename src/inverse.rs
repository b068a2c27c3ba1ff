//! Montgomery inverse by right-shift binary extended GCD, and batched
//! inversion by the chained-product trick.

use crate::arena::Ptr;
use crate::arithmetic;
use crate::field::FieldEngine;

impl FieldEngine {
    /// Strip the trailing zero bits of `x` in place, returning their count.
    pub fn make_odd(&mut self, x: Ptr) -> u32 {
        let w = self.layout.w;
        let limbs = self.arena.limbs_mut(x);
        match arithmetic::trailing_zeros(limbs, w) {
            Some(0) | None => 0,
            Some(tz) => {
                arithmetic::shr_in_place(limbs, tz, w);
                tz
            }
        }
    }

    /// Montgomery inverse: for `x = a * R`, computes `out = a^-1 * R mod p`.
    ///
    /// Needs three elements of scratch, all distinct from `out` and `x`.
    /// `x` must not be congruent to zero mod p.
    ///
    /// Phase one is the binary extended GCD over the limb value of `x`,
    /// maintaining `u * s + v * r = p` (so `r` and `s` never outgrow `p`)
    /// and yielding `s = x^-1 * 2^k mod p` with `k <= 2 * bit_length`.
    /// Phase two shifts `s` up to the fixed exponent `2 * bit_length` and
    /// multiplies by `r2corr = 2^(3k - 2 * bit_length)`, which folds the
    /// accumulated powers of two back into a single factor of R.
    pub fn inverse(&mut self, scratch: &[Ptr], out: Ptr, x: Ptr) {
        debug_assert!(!self.is_zero(x));
        let (u, v, r) = (scratch[0], scratch[1], scratch[2]);
        let s = out;
        let c = self.constants();
        let (modulus, zero, one, r2corr) = (c.modulus, c.zero, c.one, c.r2corr);

        self.copy(u, modulus);
        self.copy(v, x);
        self.copy(r, zero);
        self.copy(s, one);
        let mut k = self.make_odd(v);

        while !self.is_equal(u, v) {
            if self.is_greater(u, v) {
                self.subtract_positive(u, u, v);
                let carry = self.add_raw(r, r, s);
                debug_assert_eq!(carry, 0);
                let tz = self.make_odd(u);
                for _ in 0..tz {
                    let carry = self.add_raw(s, s, s);
                    debug_assert_eq!(carry, 0);
                }
                k += tz;
            } else {
                self.subtract_positive(v, v, u);
                let carry = self.add_raw(s, s, r);
                debug_assert_eq!(carry, 0);
                let tz = self.make_odd(v);
                for _ in 0..tz {
                    let carry = self.add_raw(r, r, r);
                    debug_assert_eq!(carry, 0);
                }
                k += tz;
            }
        }
        // gcd reached: u = v = 1, s = x^-1 * 2^k mod p
        let shift = 2 * self.layout.bit_length - k;
        self.left_shift(s, s, shift);
        self.multiply(out, out, r2corr);
    }

    /// Invert a whole slice with a single `inverse` call. Needs four
    /// elements of scratch; `out` and `x` must not overlap. Any input
    /// congruent to zero violates the `inverse` precondition.
    pub fn batch_inverse(&mut self, scratch: &[Ptr], out: &[Ptr], x: &[Ptr]) {
        debug_assert_eq!(out.len(), x.len());
        let count = x.len();
        if count == 0 {
            return;
        }
        self.copy(out[0], x[0]);
        for i in 1..count {
            self.multiply(out[i], out[i - 1], x[i]);
        }
        let inv = scratch[3];
        self.inverse(&scratch[..3], inv, out[count - 1]);
        for i in (1..count).rev() {
            self.multiply(out[i], inv, out[i - 1]);
            self.multiply(inv, inv, x[i]);
        }
        self.copy(out[0], inv);
    }
}
