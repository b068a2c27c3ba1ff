//! Tonelli-Shanks square roots.
//!
//! Per-engine setup factors `p - 1 = 2^s * t` with `t` odd, locates the
//! smallest quadratic non-residue `z` by Euler's criterion and pins
//! `c = z^t`, a primitive `2^s`-th root of unity. Each call works on a
//! scratch copy of `c`, so the pinned constant is never clobbered, and
//! every loop is bounded by the strictly decreasing order exponent.

use num_bigint::BigUint;
use num_traits::One;
use tracing::debug;

use crate::arena::Ptr;
use crate::field::FieldEngine;

impl FieldEngine {
    pub(crate) fn init_sqrt_tables(&mut self) {
        let mut t = self.modulus() - 1u32;
        let mut s = 0u32;
        while !t.bit(0) {
            t >>= 1;
            s += 1;
        }
        let euler = (self.modulus() - 1u32) >> 1;

        let mark = self.checkpoint();
        let z = self.alloc();
        let pow_scratch = self.alloc();
        let acc = self.alloc();
        let (mg1, mg2) = {
            let c = self.constants();
            (c.mg1, c.mg2)
        };

        self.copy(z, mg2);
        let mut z0 = 2u32;
        loop {
            // Euler's criterion: z is a square iff z^((p-1)/2) = 1
            self.power(pow_scratch, acc, z, &euler);
            self.reduce(acc);
            if !self.is_equal(acc, mg1) {
                break;
            }
            z0 += 1;
            self.add(z, z, mg1);
        }
        let c = self.sqrt_c;
        self.power(pow_scratch, c, z, &t);
        self.reset_to(mark);
        debug!(z = z0, s, "tonelli-shanks setup");

        self.sqrt_s = s;
        self.sqrt_t_half = (&t + 1u32) >> 1;
        self.sqrt_t = t;
    }

    /// Square root of `x`, written to `out`. Returns `false` when `x` is a
    /// quadratic non-residue; `out` is unspecified in that case. The root
    /// of zero is zero.
    ///
    /// Needs five elements of scratch, all distinct from `out` and `x`.
    pub fn sqrt(&mut self, scratch: &[Ptr], out: Ptr, x: Ptr) -> bool {
        let (t, sq, b, c, pw) = (scratch[0], scratch[1], scratch[2], scratch[3], scratch[4]);
        let (zero, mg1) = {
            let k = self.constants();
            (k.zero, k.mg1)
        };
        let mut m = self.sqrt_s;
        let exp_t = self.sqrt_t.clone();
        let exp_half = self.sqrt_t_half.clone();
        let sqrt_c = self.sqrt_c;

        self.copy(c, sqrt_c);
        self.power(pw, t, x, &exp_t);
        self.reduce(t);
        self.power(pw, out, x, &exp_half);

        loop {
            if self.is_equal(t, zero) {
                self.copy(out, zero);
                return true;
            }
            if self.is_equal(t, mg1) {
                return true;
            }
            // least i with t^(2^i) = 1; for a residue the order of t
            // divides 2^(m-1), so hitting m proves a non-residue
            let mut i = 0u32;
            self.copy(sq, t);
            while !self.is_equal(sq, mg1) {
                self.square(sq, sq);
                self.reduce(sq);
                i += 1;
                if i == m {
                    return false;
                }
            }
            self.power(pw, b, c, &(BigUint::one() << (m - i - 1)));
            m = i;
            self.square(c, b);
            self.multiply(t, t, c);
            self.reduce(t);
            self.multiply(out, out, b);
        }
    }
}
